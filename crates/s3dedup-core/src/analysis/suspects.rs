use std::collections::BTreeMap;
use tracing::debug;

use crate::model::{all_same_content, ObjectRecord, SuspectGroup, SuspectMember};
use crate::names::{normalize_name, quality_score};

/// Group objects whose names normalize to the same value but whose content
/// is not all identical. Partitions whose members all share content are
/// left to the duplicate report.
///
/// Groups are ordered by normalized name, members by key.
pub fn compute_suspect_groups(records: &[ObjectRecord]) -> Vec<SuspectGroup> {
    let mut by_name: BTreeMap<String, Vec<&ObjectRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_placeholder()) {
        by_name.entry(normalize_name(&record.key)).or_default().push(record);
    }

    let groups: Vec<SuspectGroup> = by_name
        .into_iter()
        .filter(|(_, members)| members.len() > 1 && !all_same_content(members))
        .map(|(normalized_name, mut members)| {
            members.sort_by(|a, b| a.key.cmp(&b.key));
            SuspectGroup {
                normalized_name,
                members: members
                    .into_iter()
                    .map(|record| SuspectMember {
                        quality_score: quality_score(&record.key),
                        record: record.clone(),
                    })
                    .collect(),
            }
        })
        .collect();

    debug!("{} suspect name groups", groups.len());
    groups
}
