pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod index;
pub mod model;
pub mod names;
pub mod progress;

pub use config::AppConfig;
pub use engine::AnalysisEngine;
pub use error::Error;
pub use index::{IndexSnapshot, IndexStats};
pub use model::ObjectRecord;
pub use progress::{ProgressReporter, SilentReporter};
