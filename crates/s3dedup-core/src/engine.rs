use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info};

use crate::analysis::duplicates::{self, DuplicateReport};
use crate::analysis::media::{self, MediaReport};
use crate::analysis::rename_plan::{self, RenamePlan};
use crate::analysis::{retention, suspects};
use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher::{CancelToken, ContentHasher};
use crate::index::IndexSnapshot;
use crate::model::{MediaTags, RetentionDecision, SuspectGroup, TagError, TaggedRecord};
use crate::progress::ProgressReporter;

/// Runs the analyses over an index snapshot with one configuration.
pub struct AnalysisEngine {
    config: AppConfig,
    cancel: CancelToken,
}

impl AnalysisEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Restrict the snapshot to `prefix` and drop ignored keys.
    pub fn prepare(&self, snapshot: &IndexSnapshot, prefix: Option<&str>) -> Result<IndexSnapshot, Error> {
        let scoped = match prefix {
            Some(prefix) => snapshot.with_prefix(prefix),
            None => snapshot.clone(),
        };
        let prepared = scoped.without_ignored(&self.config.ignore_patterns)?;
        debug!(
            "Prepared snapshot: {} of {} objects in scope",
            prepared.len(),
            snapshot.len()
        );
        Ok(prepared)
    }

    pub fn duplicates(
        &self,
        snapshot: &IndexSnapshot,
        hasher: &dyn ContentHasher,
        reporter: &dyn ProgressReporter,
    ) -> DuplicateReport {
        info!("Resolving identities for {} objects...", snapshot.len());
        let mut options = self.config.resolve_options();
        options.cancel = self.cancel.clone();
        duplicates::compute_duplicate_groups(snapshot.records(), hasher, &options, reporter)
    }

    /// Strong-hash the digest-ambiguous candidates and return a snapshot
    /// carrying the computed hashes, so name and tag grouping can tell
    /// ambiguous look-alikes apart.
    pub fn with_resolved_hashes(
        &self,
        snapshot: &IndexSnapshot,
        hasher: &dyn ContentHasher,
        reporter: &dyn ProgressReporter,
    ) -> IndexSnapshot {
        let report = self.duplicates(snapshot, hasher, reporter);
        snapshot.with_content_hashes(&report.computed_hashes)
    }

    pub fn suspects(&self, snapshot: &IndexSnapshot) -> Vec<SuspectGroup> {
        let start = Instant::now();
        let groups = suspects::compute_suspect_groups(snapshot.records());
        info!(
            "{} suspect groups in {:.2}s",
            groups.len(),
            start.elapsed().as_secs_f64()
        );
        groups
    }

    /// Group media objects by their tags. Media keys with no entry in `tags`
    /// are excluded as unavailable.
    pub fn media(
        &self,
        snapshot: &IndexSnapshot,
        tags: &BTreeMap<String, Result<MediaTags, TagError>>,
    ) -> MediaReport {
        let tagged: Vec<TaggedRecord> = snapshot
            .records()
            .iter()
            .filter(|r| media::is_media_key(&r.key, &self.config.media_extensions))
            .map(|record| TaggedRecord {
                record: record.clone(),
                tags: tags
                    .get(&record.key)
                    .cloned()
                    .unwrap_or_else(|| Err(TagError::Unavailable("no tags extracted".to_string()))),
            })
            .collect();
        debug!("{} media objects considered", tagged.len());

        let report = media::compute_media_groups(&tagged);
        info!(
            "{} media groups, {} objects excluded",
            report.groups.len(),
            report.excluded.len()
        );
        report
    }

    pub fn deletion_plan(&self, report: &DuplicateReport) -> Result<Vec<RetentionDecision>, Error> {
        let policy = self.config.retention_policy()?;
        info!("Ranking {} duplicate groups with policy {}", report.groups.len(), policy);
        retention::plan_deletions(&report.groups, &policy)
    }

    /// Plan renames for the keys of `scoped`. Every key of `index` blocks a
    /// target, including keys the scope filtered out.
    pub fn rename_plan(&self, index: &IndexSnapshot, scoped: &IndexSnapshot) -> Result<RenamePlan, Error> {
        let rules = rename_plan::rules_from_names(&self.config.clean_rules)?;
        Ok(rename_plan::plan_renames(
            scoped.records(),
            index.records(),
            &rules,
            self.config.max_suffix_attempts,
        ))
    }
}
