use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hasher::HashError;

/// An object observed in the remote store by the last listing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub key: String,
    pub size: u64,
    /// Listing-provided content signature (an ETag for S3-compatible stores).
    pub digest: String,
    /// Set when `digest` is not a direct hash of the full content, e.g. a
    /// composite digest produced by a segmented upload.
    pub digest_ambiguous: bool,
    pub content_hash: Option<String>,
    pub last_modified: DateTime<Utc>,
    pub observed_at: DateTime<Utc>,
}

impl ObjectRecord {
    /// Final `/`-delimited segment of the key.
    pub fn file_name(&self) -> &str {
        file_name(&self.key)
    }

    pub fn is_placeholder(&self) -> bool {
        self.size == 0
    }

    /// Same size and matching strong hashes. Without a hash on both sides,
    /// matching digests count only when neither digest is ambiguous.
    pub fn same_content(&self, other: &ObjectRecord) -> bool {
        if self.size != other.size {
            return false;
        }
        match (&self.content_hash, &other.content_hash) {
            (Some(a), Some(b)) => a == b,
            _ => !self.digest_ambiguous && !other.digest_ambiguous && self.digest == other.digest,
        }
    }
}

pub(crate) fn file_name(key: &str) -> &str {
    key.rsplit_once('/').map_or(key, |(_, name)| name)
}

/// Every pair of members is provably the same content. `same_content` is
/// not transitive across hashed and unhashed records, so all pairs are checked.
pub(crate) fn all_same_content(members: &[&ObjectRecord]) -> bool {
    members
        .iter()
        .enumerate()
        .all(|(i, a)| members[i + 1..].iter().all(|b| a.same_content(b)))
}

/// How a duplicate group was proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evidence {
    /// Identical size and identical non-ambiguous digest.
    Digest,
    /// Identical strong content hash.
    ContentHash,
}

/// Objects proven byte-identical.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateGroup {
    pub fingerprint: String,
    pub evidence: Evidence,
    pub size: u64,
    pub wasted_bytes: u64,
    /// Sorted by key.
    pub members: Vec<ObjectRecord>,
}

impl DuplicateGroup {
    pub(crate) fn new(fingerprint: String, evidence: Evidence, size: u64, mut members: Vec<ObjectRecord>) -> Self {
        members.sort_by(|a, b| a.key.cmp(&b.key));
        let wasted_bytes = size * (members.len() as u64).saturating_sub(1);
        Self {
            fingerprint,
            evidence,
            size,
            wasted_bytes,
            members,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.key.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HashFailure {
    pub key: String,
    pub error: HashError,
}

/// A digest-ambiguous candidate set whose identity could not be proven
/// because some members failed to hash. Never merged into a group.
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedPartition {
    pub size: u64,
    pub digest: String,
    pub keys: Vec<String>,
    pub failures: Vec<HashFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuspectMember {
    pub record: ObjectRecord,
    /// Lower is cleaner.
    pub quality_score: u32,
}

/// Objects whose names normalize to the same value while their content differs.
#[derive(Debug, Clone, Serialize)]
pub struct SuspectGroup {
    pub normalized_name: String,
    pub members: Vec<SuspectMember>,
}

/// Tag metadata extracted from a media object by an external collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTags {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TagError {
    #[error("tags unavailable: {0}")]
    Unavailable(String),
    #[error("missing artist or title")]
    Incomplete,
}

#[derive(Debug, Clone)]
pub struct TaggedRecord {
    pub record: ObjectRecord,
    pub tags: Result<MediaTags, TagError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaMember {
    pub record: ObjectRecord,
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
}

/// Objects carrying the same logical work under different encodings.
#[derive(Debug, Clone, Serialize)]
pub struct MediaGroup {
    pub artist: String,
    pub title: String,
    pub members: Vec<MediaMember>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaExclusion {
    pub key: String,
    pub error: TagError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionDecision {
    pub keep: String,
    pub drop: Vec<String>,
}
