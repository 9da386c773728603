use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::hasher::{CancelToken, ContentHasher, HashBatch, HashError};
use crate::model::{DuplicateGroup, Evidence, HashFailure, ObjectRecord, UnresolvedPartition};
use crate::progress::ProgressReporter;

/// What to do with the successfully hashed members of a digest-ambiguous
/// partition when some of its other members failed to hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartialHashPolicy {
    /// The whole partition is reported as unresolved.
    #[default]
    Unresolved,
    /// The partition is still reported, and members whose hashes agree also
    /// form proven groups.
    KeepProven,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub hash_workers: usize,
    pub partial_hash_policy: PartialHashPolicy,
    pub cancel: CancelToken,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// Sorted by descending wasted bytes.
    pub groups: Vec<DuplicateGroup>,
    pub unresolved: Vec<UnresolvedPartition>,
    /// Strong hashes computed during this run, keyed by object key.
    pub computed_hashes: BTreeMap<String, String>,
}

impl DuplicateReport {
    pub fn wasted_bytes(&self) -> u64 {
        self.groups.iter().map(|g| g.wasted_bytes).sum()
    }
}

/// Cascading identity check:
/// 1. Partition by size, dropping singletons
/// 2. Sub-partition by digest; partitions with only non-ambiguous digests are proven
/// 3. Strong-hash the members of ambiguous partitions and split by hash
///
/// Zero-size records never take part.
pub fn compute_duplicate_groups(
    records: &[ObjectRecord],
    hasher: &dyn ContentHasher,
    options: &ResolveOptions,
    reporter: &dyn ProgressReporter,
) -> DuplicateReport {
    let start = Instant::now();

    // Pass 1: size
    let mut by_size: AHashMap<u64, Vec<&ObjectRecord>> = AHashMap::new();
    for record in records.iter().filter(|r| !r.is_placeholder()) {
        by_size.entry(record.size).or_default().push(record);
    }
    by_size.retain(|_, members| members.len() > 1);
    debug!("Size pass: {} candidate sizes", by_size.len());

    // Pass 2: digest
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut ambiguous: Vec<(u64, &str, Vec<&ObjectRecord>)> = Vec::new();
    for (size, members) in by_size {
        let mut by_digest: AHashMap<&str, Vec<&ObjectRecord>> = AHashMap::new();
        for record in members {
            by_digest.entry(record.digest.as_str()).or_default().push(record);
        }
        for (digest, members) in by_digest {
            if members.len() < 2 {
                continue;
            }
            if members.iter().any(|m| m.digest_ambiguous) {
                ambiguous.push((size, digest, members));
            } else {
                groups.push(DuplicateGroup::new(
                    digest.to_string(),
                    Evidence::Digest,
                    size,
                    members.into_iter().cloned().collect(),
                ));
            }
        }
    }
    debug!(
        "Digest pass: {} proven groups, {} ambiguous partitions",
        groups.len(),
        ambiguous.len()
    );

    // Pass 3: strong hash, only for members that do not carry one yet
    let to_hash: Vec<&ObjectRecord> = ambiguous
        .iter()
        .flat_map(|(_, _, members)| members.iter().copied())
        .filter(|m| m.content_hash.is_none())
        .collect();
    let batch = HashBatch::new()
        .with_workers(options.hash_workers)
        .with_cancel_token(options.cancel.clone());
    let results = batch.run(&to_hash, hasher, reporter);

    let mut unresolved: Vec<UnresolvedPartition> = Vec::new();
    for (size, digest, members) in ambiguous {
        let mut by_hash: BTreeMap<&str, Vec<&ObjectRecord>> = BTreeMap::new();
        let mut failures: Vec<HashFailure> = Vec::new();

        for &member in &members {
            let hash = match &member.content_hash {
                Some(hash) => Ok(hash.as_str()),
                None => match results.get(&member.key) {
                    Some(Ok(hash)) => Ok(hash.as_str()),
                    Some(Err(e)) => Err(e.clone()),
                    None => Err(HashError::Unavailable("no hash result".to_string())),
                },
            };
            match hash {
                Ok(hash) => by_hash.entry(hash).or_default().push(member),
                Err(error) => failures.push(HashFailure {
                    key: member.key.clone(),
                    error,
                }),
            }
        }

        if !failures.is_empty() {
            warn!(
                "{} of {} candidates of size {} (digest {}) could not be hashed, partition unresolved",
                failures.len(),
                members.len(),
                size,
                digest
            );
            failures.sort_by(|a, b| a.key.cmp(&b.key));
            let mut keys: Vec<String> = members.iter().map(|m| m.key.clone()).collect();
            keys.sort();
            unresolved.push(UnresolvedPartition {
                size,
                digest: digest.to_string(),
                keys,
                failures,
            });
            if options.partial_hash_policy == PartialHashPolicy::Unresolved {
                continue;
            }
        }

        for (hash, members) in by_hash {
            if members.len() > 1 {
                groups.push(DuplicateGroup::new(
                    hash.to_string(),
                    Evidence::ContentHash,
                    size,
                    members.into_iter().cloned().collect(),
                ));
            }
        }
    }

    groups.sort_by(|a, b| {
        b.wasted_bytes
            .cmp(&a.wasted_bytes)
            .then_with(|| a.members[0].key.cmp(&b.members[0].key))
    });
    unresolved.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.keys.cmp(&b.keys)));

    let computed_hashes: BTreeMap<String, String> = results
        .into_iter()
        .filter_map(|(key, outcome)| outcome.ok().map(|hash| (key, hash)))
        .collect();

    info!(
        "{} duplicate groups, {} unresolved partitions, {} objects hashed in {:.2}s",
        groups.len(),
        unresolved.len(),
        computed_hashes.len(),
        start.elapsed().as_secs_f64()
    );

    DuplicateReport {
        groups,
        unresolved,
        computed_hashes,
    }
}
