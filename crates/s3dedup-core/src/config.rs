use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File as ConfigFile};
use serde::Deserialize;

use crate::analysis::duplicates::{PartialHashPolicy, ResolveOptions};
use crate::analysis::rename_plan::DEFAULT_MAX_SUFFIX_ATTEMPTS;
use crate::analysis::retention::RetentionPolicy;
use crate::error::Error;

const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "opus", "m4a", "aac", "wav", "wma", "aiff", "mp4", "m4v", "mkv", "avi",
    "mov", "webm",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Retention criteria, most significant first.
    pub keep: String,
    pub clean_rules: Vec<String>,
    /// Threads used for strong hashing; 0 uses the rayon default.
    pub hash_workers: usize,
    pub partial_hash_policy: PartialHashPolicy,
    /// Glob patterns on keys excluded from every computation.
    pub ignore_patterns: Vec<String>,
    pub media_extensions: Vec<String>,
    /// Local directory mirroring the store, used to hash ambiguous candidates.
    pub mirror_root: Option<String>,
    pub max_suffix_attempts: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keep: RetentionPolicy::default().to_string(),
            clean_rules: vec!["strip-spaces".to_string()],
            hash_workers: 0,
            partial_hash_policy: PartialHashPolicy::default(),
            ignore_patterns: Vec::new(),
            media_extensions: DEFAULT_MEDIA_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            mirror_root: None,
            max_suffix_attempts: DEFAULT_MAX_SUFFIX_ATTEMPTS,
        }
    }
}

impl AppConfig {
    pub fn retention_policy(&self) -> Result<RetentionPolicy, Error> {
        self.keep.parse()
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            hash_workers: self.hash_workers,
            partial_hash_policy: self.partial_hash_policy,
            ..ResolveOptions::default()
        }
    }
}

/// Load `S3Dedup.toml` (optional) and `S3DEDUP__*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, Error> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("S3Dedup").required(false))
        .add_source(
            Environment::with_prefix("S3DEDUP")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("clean_rules")
                .with_list_parse_key("ignore_patterns")
                .with_list_parse_key("media_extensions"),
        );
    from_builder(builder)
}

fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<AppConfig, Error> {
    let config = builder.build()?.try_deserialize::<AppConfig>()?;
    // Fail at startup rather than when the first plan is ranked.
    config.retention_policy()?;
    Ok(config)
}
