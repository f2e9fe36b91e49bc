use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {kind} document {path}: {source}")]
    Parse {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize {kind} document: {source}")]
    Serialize {
        kind: &'static str,
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Caller addressed a definition entry that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{kind} position {position} is out of range (have {len})")]
    PositionOutOfRange {
        kind: &'static str,
        position: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
