pub mod batch;

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::model::ObjectRecord;

pub use batch::{HashBatch, HashResults};

/// Strong content hashing of a single object, typically by streaming it
/// from the remote store. Only consulted for digest-ambiguous candidates.
///
/// Implementations surface timeouts and transport failures as
/// [`HashError::Unavailable`] for that item.
pub trait ContentHasher: Send + Sync {
    fn content_hash(&self, record: &ObjectRecord) -> Result<String, HashError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum HashError {
    #[error("hash unavailable: {0}")]
    Unavailable(String),

    #[error("hash request cancelled")]
    Cancelled,
}

/// Shared cancellation flag for a hashing batch. Requests that have not
/// started when the flag is raised resolve to [`HashError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl<F> ContentHasher for F
where
    F: Fn(&ObjectRecord) -> Result<String, HashError> + Send + Sync,
{
    fn content_hash(&self, record: &ObjectRecord) -> Result<String, HashError> {
        self(record)
    }
}
