//! Errors raised while loading or parsing configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("malformed topology expression '{expr}': {reason}")]
    Topology { expr: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
