use thiserror::Error;

/// Errors raised while loading schema or statistics configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Invalid statistics: {0}")]
    InvalidStatistics(String),
}

/// Configuration loading result
pub type ConfigResult<T> = Result<T, ConfigError>;
