//! Resolution error types.

use std::path::PathBuf;

use jobroute_core::ConfigError;
use thiserror::Error;

/// A job input could not be measured.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("input '{name}' points at a missing file: '{}'", path.display())]
    MissingFile { name: String, path: PathBuf },

    #[error("input '{0}' is not a file")]
    NotAFile(String),

    #[error("failed to read input '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type MeasureResult<T> = Result<T, MeasureError>;

/// No usable destination could be picked for a job.
#[derive(Debug, Error)]
pub enum JobMappingError {
    /// A matched rule routes to `fail`; carries its fail message.
    #[error("{0}")]
    Failed(String),

    #[error("{0}")]
    NoDestination(String),

    #[error("could not measure job inputs: {0}")]
    Measurement(#[from] MeasureError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl JobMappingError {
    /// Human-readable reason, suitable for showing to the requester.
    pub fn reason(&self) -> String {
        match self {
            JobMappingError::Failed(reason) | JobMappingError::NoDestination(reason) => {
                reason.clone()
            }
            other => other.to_string(),
        }
    }
}

pub type MappingResult<T> = Result<T, JobMappingError>;
