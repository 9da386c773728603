use ahash::AHashMap;
use glob::Pattern;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::Error;
use crate::model::{DuplicateGroup, ObjectRecord};

/// Immutable view of the object index taken at the start of a run.
///
/// Records are kept sorted by key. Every operation that changes the view
/// returns a new snapshot.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    records: Vec<ObjectRecord>,
    positions: AHashMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct IndexStats {
    pub total_objects: usize,
    pub total_size: u64,
    pub duplicate_groups: usize,
    pub duplicate_objects: usize,
    pub wasted_bytes: u64,
}

impl IndexSnapshot {
    /// Build a snapshot from listing output. A key seen more than once keeps
    /// the most recently observed record.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ObjectRecord>,
    {
        let mut by_key: BTreeMap<String, ObjectRecord> = BTreeMap::new();
        for record in records {
            match by_key.get(&record.key) {
                Some(existing) if existing.observed_at > record.observed_at => {}
                _ => {
                    by_key.insert(record.key.clone(), record);
                }
            }
        }
        Self::from_sorted(by_key.into_values().collect())
    }

    fn from_sorted(records: Vec<ObjectRecord>) -> Self {
        let positions = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key.clone(), i))
            .collect();
        Self { records, positions }
    }

    pub fn records(&self) -> &[ObjectRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ObjectRecord> {
        self.positions.get(key).map(|&i| &self.records[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn with_prefix(&self, prefix: &str) -> Self {
        Self::from_sorted(
            self.records
                .iter()
                .filter(|r| r.key.starts_with(prefix))
                .cloned()
                .collect(),
        )
    }

    /// Drop every record whose key matches one of the glob patterns.
    pub fn without_ignored(&self, ignore_globs: &[String]) -> Result<Self, Error> {
        let patterns = ignore_globs
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|source| Error::IgnorePattern {
                    pattern: glob.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if patterns.is_empty() {
            return Ok(self.clone());
        }

        let kept: Vec<ObjectRecord> = self
            .records
            .iter()
            .filter(|r| !patterns.iter().any(|p| p.matches(&r.key)))
            .cloned()
            .collect();
        debug!(
            "Ignore patterns removed {} of {} records",
            self.records.len() - kept.len(),
            self.records.len()
        );
        Ok(Self::from_sorted(kept))
    }

    /// Return a new snapshot with strong hashes filled in for the given keys.
    /// Keys absent from the snapshot are ignored.
    pub fn with_content_hashes(&self, hashes: &BTreeMap<String, String>) -> Self {
        let records = self
            .records
            .iter()
            .map(|r| match hashes.get(&r.key) {
                Some(hash) => ObjectRecord {
                    content_hash: Some(hash.clone()),
                    ..r.clone()
                },
                None => r.clone(),
            })
            .collect();
        Self::from_sorted(records)
    }

    pub fn stats(&self, groups: &[DuplicateGroup]) -> IndexStats {
        IndexStats {
            total_objects: self.records.len(),
            total_size: self.records.iter().map(|r| r.size).sum(),
            duplicate_groups: groups.len(),
            duplicate_objects: groups.iter().map(|g| g.members.len().saturating_sub(1)).sum(),
            wasted_bytes: groups.iter().map(|g| g.wasted_bytes).sum(),
        }
    }
}

/// Detect a composite digest of the form `<hex>-<parts>`, as produced by
/// multipart uploads. Such a digest is not a hash of the full content.
pub fn is_composite_digest(digest: &str) -> bool {
    let clean = digest.trim_matches('"');
    match clean.rsplit_once('-') {
        Some((_, parts)) => !parts.is_empty() && parts.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
