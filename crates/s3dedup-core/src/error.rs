use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid retention policy: {0}")]
    InvalidPolicy(String),

    #[error("Unknown clean rule '{name}' (available: {available})")]
    UnknownCleanRule { name: String, available: String },

    #[error("Invalid ignore pattern '{pattern}': {source}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Cannot rank an empty group")]
    EmptyGroup,
}
