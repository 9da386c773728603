use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

use crate::error::Error;
use crate::model::{DuplicateGroup, MediaGroup, ObjectRecord, RetentionDecision, SuspectGroup};
use crate::names::quality_score;

/// One retention criterion, a total order over group members where the
/// smallest member is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    /// Shortest final path segment.
    Shortest,
    /// Earliest `last_modified`.
    Oldest,
    /// Latest `last_modified`.
    Newest,
    /// Lowest name quality score.
    Cleanest,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::Shortest,
        Criterion::Oldest,
        Criterion::Newest,
        Criterion::Cleanest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Shortest => "shortest",
            Criterion::Oldest => "oldest",
            Criterion::Newest => "newest",
            Criterion::Cleanest => "cleanest",
        }
    }

    pub fn compare(&self, a: &ObjectRecord, b: &ObjectRecord) -> Ordering {
        match self {
            Criterion::Shortest => a
                .file_name()
                .chars()
                .count()
                .cmp(&b.file_name().chars().count()),
            Criterion::Oldest => a.last_modified.cmp(&b.last_modified),
            Criterion::Newest => b.last_modified.cmp(&a.last_modified),
            Criterion::Cleanest => quality_score(&a.key).cmp(&quality_score(&b.key)),
        }
    }
}

impl FromStr for Criterion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Criterion::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                let valid: Vec<&str> = Criterion::ALL.iter().map(|c| c.name()).collect();
                Error::InvalidPolicy(format!(
                    "unknown criterion '{}' (valid: {})",
                    name,
                    valid.join(", ")
                ))
            })
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, non-empty list of criteria. The first is primary; later ones
/// only break ties. Remaining ties go to the smallest key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    criteria: Vec<Criterion>,
}

impl RetentionPolicy {
    pub fn new(criteria: Vec<Criterion>) -> Result<Self, Error> {
        if criteria.is_empty() {
            return Err(Error::InvalidPolicy("at least one criterion is required".to_string()));
        }
        Ok(Self { criteria })
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn compare(&self, a: &ObjectRecord, b: &ObjectRecord) -> Ordering {
        self.criteria
            .iter()
            .map(|c| c.compare(a, b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.key.cmp(&b.key))
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            criteria: vec![Criterion::Cleanest, Criterion::Shortest, Criterion::Oldest],
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = Error;

    /// Parse the comma-separated form, e.g. `cleanest,shortest,oldest`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let criteria = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Criterion>, Error>>()?;
        Self::new(criteria)
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.criteria.iter().map(|c| c.name()).collect();
        f.write_str(&names.join(","))
    }
}

/// A group whose members can be ranked. `members` must return the group's
/// canonical member order.
pub trait Rankable {
    fn members(&self) -> Vec<&ObjectRecord>;
}

impl Rankable for DuplicateGroup {
    fn members(&self) -> Vec<&ObjectRecord> {
        self.members.iter().collect()
    }
}

impl Rankable for SuspectGroup {
    fn members(&self) -> Vec<&ObjectRecord> {
        self.members.iter().map(|m| &m.record).collect()
    }
}

impl Rankable for MediaGroup {
    fn members(&self) -> Vec<&ObjectRecord> {
        self.members.iter().map(|m| &m.record).collect()
    }
}

impl Rankable for [ObjectRecord] {
    fn members(&self) -> Vec<&ObjectRecord> {
        self.iter().collect()
    }
}

/// Pick the member to keep. Every other member is a drop candidate, listed
/// in the group's canonical order. Group membership is never changed.
pub fn rank<G>(group: &G, policy: &RetentionPolicy) -> Result<RetentionDecision, Error>
where
    G: Rankable + ?Sized,
{
    let members = group.members();
    let keep = members
        .iter()
        .copied()
        .min_by(|a, b| policy.compare(a, b))
        .ok_or(Error::EmptyGroup)?;

    let drop: Vec<String> = members
        .iter()
        .filter(|m| m.key != keep.key)
        .map(|m| m.key.clone())
        .collect();

    trace!("Keeping '{}' over {} members ({})", keep.key, drop.len(), policy);
    Ok(RetentionDecision {
        keep: keep.key.clone(),
        drop,
    })
}

/// A retention decision for every duplicate group, in report order.
pub fn plan_deletions(
    groups: &[DuplicateGroup],
    policy: &RetentionPolicy,
) -> Result<Vec<RetentionDecision>, Error> {
    groups.iter().map(|g| rank(g, policy)).collect()
}
