use ahash::AHashSet;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::model::{file_name, ObjectRecord};
use crate::names::split_ext;

pub const DEFAULT_MAX_SUFFIX_ATTEMPTS: u32 = 10_000;

/// A pure, total key transformation. Returning the input unchanged means
/// the rule does not apply.
pub trait CleanRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn apply(&self, key: &str) -> String;
}

/// Trims leading and trailing whitespace from every `/`-delimited segment.
/// Segments made only of whitespace disappear; genuinely empty segments
/// (leading `/`, trailing `/`) are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripSpaces;

impl CleanRule for StripSpaces {
    fn name(&self) -> &'static str {
        "strip-spaces"
    }

    fn description(&self) -> &'static str {
        "Trim leading/trailing spaces in every path segment"
    }

    fn apply(&self, key: &str) -> String {
        let cleaned: Vec<&str> = key
            .split('/')
            .filter(|segment| segment.is_empty() || !segment.trim().is_empty())
            .map(str::trim)
            .collect();
        let cleaned = cleaned.join("/");
        if cleaned.is_empty() {
            key.to_string()
        } else {
            cleaned
        }
    }
}

pub const AVAILABLE_RULES: &[&str] = &["strip-spaces"];

pub fn rule_by_name(name: &str) -> Result<Box<dyn CleanRule>, Error> {
    match name.trim() {
        "strip-spaces" => Ok(Box::new(StripSpaces)),
        other => Err(Error::UnknownCleanRule {
            name: other.to_string(),
            available: AVAILABLE_RULES.join(", "),
        }),
    }
}

pub fn rules_from_names<S: AsRef<str>>(names: &[S]) -> Result<Vec<Box<dyn CleanRule>>, Error> {
    names.iter().map(|n| rule_by_name(n.as_ref())).collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenameError {
    #[error("no free target for '{proposed}' after {attempts} suffixes")]
    NoCleanTarget { proposed: String, attempts: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameEntry {
    pub original: String,
    /// Output of the rules, before collision resolution.
    pub proposed: String,
    pub target: String,
}

impl RenameEntry {
    pub fn is_rename(&self) -> bool {
        self.original != self.target
    }

    pub fn conflict_resolved(&self) -> bool {
        self.is_rename() && self.proposed != self.target
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameFailure {
    pub key: String,
    pub error: RenameError,
}

/// Target key for every record of the index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenamePlan {
    /// One entry per record, sorted by original key.
    pub entries: Vec<RenameEntry>,
    pub conflicts_resolved: usize,
    /// Number of keys each rule changed.
    pub per_rule: BTreeMap<String, usize>,
    /// Keys left in place because no free target was found.
    pub failures: Vec<RenameFailure>,
}

impl RenamePlan {
    pub fn renames(&self) -> impl Iterator<Item = &RenameEntry> {
        self.entries.iter().filter(|e| e.is_rename())
    }

    pub fn rename_count(&self) -> usize {
        self.renames().count()
    }

    pub fn target_of(&self, key: &str) -> Option<&str> {
        self.entries
            .binary_search_by(|e| e.original.as_str().cmp(key))
            .ok()
            .map(|i| self.entries[i].target.as_str())
    }
}

/// Apply `rules` to every key of `records`, then resolve collisions.
///
/// `index` is the whole object index; `records` is the part of it being
/// cleaned. A proposed target collides when it is a key of either, or was
/// assigned to an earlier key (by ascending original key). Colliding
/// targets get `_2`, `_3`, ... before the extension until a free one is
/// found.
pub fn plan_renames(
    records: &[ObjectRecord],
    index: &[ObjectRecord],
    rules: &[Box<dyn CleanRule>],
    max_suffix_attempts: u32,
) -> RenamePlan {
    let mut per_rule: BTreeMap<String, usize> = BTreeMap::new();
    let mut proposals: Vec<(&str, String)> = records
        .iter()
        .map(|record| {
            let mut key = record.key.clone();
            for rule in rules {
                let next = rule.apply(&key);
                if next != key {
                    *per_rule.entry(rule.name().to_string()).or_default() += 1;
                    key = next;
                }
            }
            (record.key.as_str(), key)
        })
        .collect();
    proposals.sort_by(|a, b| a.0.cmp(b.0));

    let existing: AHashSet<&str> = index
        .iter()
        .chain(records)
        .map(|r| r.key.as_str())
        .collect();
    // Unchanged keys hold their own name before any rename is placed.
    let mut assigned: AHashSet<String> = proposals
        .iter()
        .filter(|(original, proposed)| *original == proposed.as_str())
        .map(|(original, _)| original.to_string())
        .collect();

    let mut entries = Vec::with_capacity(proposals.len());
    let mut failures = Vec::new();
    let mut conflicts_resolved = 0;

    for (original, proposed) in proposals {
        if original == proposed {
            entries.push(RenameEntry {
                original: original.to_string(),
                target: proposed.clone(),
                proposed,
            });
            continue;
        }

        let is_free = |candidate: &str, assigned: &AHashSet<String>| {
            !existing.contains(candidate) && !assigned.contains(candidate)
        };

        let target = if is_free(proposed.as_str(), &assigned) {
            proposed.clone()
        } else {
            match (2..=max_suffix_attempts.saturating_add(1))
                .map(|n| suffixed(&proposed, n))
                .find(|candidate| is_free(candidate.as_str(), &assigned))
            {
                Some(candidate) => {
                    debug!("Rename conflict on '{}': '{}' -> '{}'", proposed, original, candidate);
                    conflicts_resolved += 1;
                    candidate
                }
                None => {
                    let error = RenameError::NoCleanTarget {
                        proposed: proposed.clone(),
                        attempts: max_suffix_attempts,
                    };
                    warn!("Leaving '{}' in place: {}", original, error);
                    failures.push(RenameFailure {
                        key: original.to_string(),
                        error,
                    });
                    original.to_string()
                }
            }
        };

        assigned.insert(target.clone());
        entries.push(RenameEntry {
            original: original.to_string(),
            proposed,
            target,
        });
    }

    let plan = RenamePlan {
        entries,
        conflicts_resolved,
        per_rule,
        failures,
    };
    info!(
        "Rename plan: {} keys, {} renames, {} conflicts resolved, {} failures",
        plan.entries.len(),
        plan.rename_count(),
        plan.conflicts_resolved,
        plan.failures.len()
    );
    plan
}

/// `dir/name.ext` -> `dir/name_<n>.ext`
fn suffixed(target: &str, n: u32) -> String {
    let (_, ext) = split_ext(file_name(target));
    let root = &target[..target.len() - ext.len()];
    format!("{}_{}{}", root, n, ext)
}
