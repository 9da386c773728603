use ahash::AHashMap;
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, trace, warn};

use super::{CancelToken, ContentHasher, HashError};
use crate::model::ObjectRecord;
use crate::progress::ProgressReporter;

/// Outcome of every hash request, keyed by object key.
pub type HashResults = AHashMap<String, Result<String, HashError>>;

/// Scatters independent hash requests over a rayon pool and gathers the
/// outcomes. A failed request never aborts the batch.
#[derive(Debug, Clone, Default)]
pub struct HashBatch {
    workers: usize,
    cancel: CancelToken,
}

impl HashBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of a dedicated pool; 0 runs on the global rayon pool.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(
        &self,
        records: &[&ObjectRecord],
        hasher: &dyn ContentHasher,
        reporter: &dyn ProgressReporter,
    ) -> HashResults {
        if records.is_empty() {
            return HashResults::new();
        }

        reporter.on_hash_start(records.len());
        let start = Instant::now();

        let results = if self.workers > 0 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .build()
            {
                Ok(pool) => pool.install(|| self.scatter(records, hasher, reporter)),
                Err(e) => {
                    warn!("Could not build a {} worker hash pool, using the global pool: {}", self.workers, e);
                    self.scatter(records, hasher, reporter)
                }
            }
        } else {
            self.scatter(records, hasher, reporter)
        };

        let failed = results.values().filter(|r| r.is_err()).count();
        let duration = start.elapsed().as_secs_f64();
        debug!(
            "Hashed {} objects in {:.2}s ({} failed)",
            results.len() - failed,
            duration,
            failed
        );
        reporter.on_hash_complete(results.len() - failed, failed, duration);

        results
    }

    fn scatter(
        &self,
        records: &[&ObjectRecord],
        hasher: &dyn ContentHasher,
        reporter: &dyn ProgressReporter,
    ) -> HashResults {
        let results: DashMap<String, Result<String, HashError>> = DashMap::new();
        let done = AtomicUsize::new(0);
        let total = records.len();

        records.par_iter().for_each(|record| {
            let outcome = if self.cancel.is_cancelled() {
                Err(HashError::Cancelled)
            } else {
                hasher.content_hash(record)
            };

            match &outcome {
                Ok(hash) => trace!("Hashed '{}': {}", record.key, hash),
                Err(HashError::Cancelled) => debug!("Hash of '{}' cancelled", record.key),
                Err(e) => warn!("Error hashing '{}': {}", record.key, e),
            }

            results.insert(record.key.clone(), outcome);
            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            reporter.on_hash_progress(finished, total);
        });

        results.into_iter().collect()
    }
}
