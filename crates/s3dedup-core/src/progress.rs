/// Trait for reporting progress of the strong-hash pass.
///
/// The CLI implements it with indicatif progress bars. All methods have
/// default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_hash_start(&self, _total: usize) {}
    fn on_hash_progress(&self, _done: usize, _total: usize) {}
    fn on_hash_complete(&self, _hashed: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
