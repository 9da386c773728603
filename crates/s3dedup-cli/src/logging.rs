use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "info";
const DEFAULT_LOG_FILE: &str = "./logs/s3dedup.log";

/// Where and how much the CLI logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub filter: String,
    pub directory: PathBuf,
    pub file_name: PathBuf,
    /// Colored stdout; off when `NO_COLOR` is set.
    pub ansi: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads `TRACING_LEVEL`, `LOG_FILE_PATH` and `NO_COLOR` through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let filter = lookup("TRACING_LEVEL")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        let path = lookup("LOG_FILE_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        let (directory, file_name) = split_log_path(&path);
        Self {
            filter,
            directory,
            file_name,
            ansi: lookup("NO_COLOR").is_none(),
        }
    }
}

fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("s3dedup.log"));
    (directory, file_name)
}

/// Stdout plus file logging. `main` holds the guard so the file writer
/// flushes on exit.
pub fn init_logger(settings: &LogSettings) -> WorkerGuard {
    let (filter_layer, rejected) = match EnvFilter::try_new(&settings.filter) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(DEFAULT_FILTER), Some(e)),
    };

    let file_appender = tracing_appender::rolling::never(&settings.directory, &settings.file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(settings.ansi),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    if let Some(e) = rejected {
        warn!("Ignoring TRACING_LEVEL '{}': {}", settings.filter, e);
    }
    info!(
        "Logging to stdout and {}",
        settings.directory.join(&settings.file_name).display()
    );

    guard
}
