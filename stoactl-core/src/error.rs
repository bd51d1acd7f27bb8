/// Structured error types for stoactl-core.
///
/// Library crates get composable `thiserror` errors; the `stoactl` binary
/// wraps them in `anyhow` at the edges.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationError;

/// Main error type for stoactl-core operations
#[derive(Error, Debug)]
pub enum StoaError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// JSON parsing or serialization failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid config file {path:?}: {reason}")]
    InvalidConfig { path: PathBuf, reason: String },

    /// Request or row data failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown leasing dataset key
    #[error("Unknown dataset key '{key}'")]
    UnknownDataset { key: String },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Result type alias for stoactl-core operations
pub type Result<T> = std::result::Result<T, StoaError>;

impl StoaError {
    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown dataset error
    pub fn unknown_dataset(key: impl Into<String>) -> Self {
        Self::UnknownDataset { key: key.into() }
    }

    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoaError::unknown_dataset("rentroll");
        assert_eq!(err.to_string(), "Unknown dataset key 'rentroll'");

        let err = StoaError::invalid_config("/tmp/stoactl.toml", "expected table");
        assert!(err.to_string().contains("Invalid config file"));
        assert!(err.to_string().contains("/tmp/stoactl.toml"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let stoa_err: StoaError = io_err.into();

        assert!(matches!(stoa_err, StoaError::Io { .. }));
    }

    #[test]
    fn validation_errors_pass_through_display() {
        let err: StoaError = ValidationError::Empty { field: "ProjectName" }.into();
        assert_eq!(err.to_string(), "ProjectName cannot be empty");
    }
}
