use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use s3dedup_core::index::is_composite_digest;
use s3dedup_core::model::{MediaTags, TagError};
use s3dedup_core::{IndexSnapshot, ObjectRecord};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// One row of a bucket listing export.
#[derive(Debug, Deserialize)]
struct IndexRow {
    key: String,
    size: u64,
    digest: String,
    #[serde(default)]
    digest_ambiguous: Option<bool>,
    #[serde(default)]
    content_hash: Option<String>,
    last_modified: DateTime<Utc>,
    #[serde(default)]
    observed_at: Option<DateTime<Utc>>,
}

impl From<IndexRow> for ObjectRecord {
    fn from(row: IndexRow) -> Self {
        let digest = row.digest.trim_matches('"').to_string();
        let digest_ambiguous = row
            .digest_ambiguous
            .unwrap_or_else(|| is_composite_digest(&digest));
        ObjectRecord {
            key: row.key,
            size: row.size,
            digest,
            digest_ambiguous,
            content_hash: row.content_hash.filter(|h| !h.is_empty()),
            last_modified: row.last_modified,
            observed_at: row.observed_at.unwrap_or(row.last_modified),
        }
    }
}

/// Load the index export (`key,size,digest,last_modified` plus optional
/// `digest_ambiguous`, `content_hash`, `observed_at` columns).
pub fn load_index(path: &Path) -> Result<IndexSnapshot> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open index {}", path.display()))?;

    let mut records = Vec::new();
    for (line, row) in reader.deserialize::<IndexRow>().enumerate() {
        let row = row.with_context(|| format!("{}: invalid row {}", path.display(), line + 2))?;
        records.push(ObjectRecord::from(row));
    }
    let read = records.len();
    let snapshot = IndexSnapshot::from_records(records);
    info!(
        "Loaded {} objects from {} ({} rows)",
        snapshot.len(),
        path.display(),
        read
    );
    Ok(snapshot)
}

/// One row of the tag extraction output. A non-empty `error` marks the
/// object as unreadable.
#[derive(Debug, Deserialize)]
struct TagRow {
    key: String,
    #[serde(default)]
    artist: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    codec: Option<String>,
    #[serde(default)]
    bitrate: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

pub fn load_tags(path: &Path) -> Result<BTreeMap<String, Result<MediaTags, TagError>>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open tags {}", path.display()))?;

    let mut tags = BTreeMap::new();
    for (line, row) in reader.deserialize::<TagRow>().enumerate() {
        let row: TagRow =
            row.with_context(|| format!("{}: invalid row {}", path.display(), line + 2))?;
        let entry = match row.error.filter(|e| !e.is_empty()) {
            Some(error) => Err(TagError::Unavailable(error)),
            None => Ok(MediaTags {
                artist: row.artist,
                album: row.album,
                title: row.title,
                codec: row.codec,
                bitrate: row.bitrate,
            }),
        };
        tags.insert(row.key, entry);
    }
    debug!("Loaded tags for {} objects", tags.len());
    Ok(tags)
}
