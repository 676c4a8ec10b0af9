//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Oracle could not be reached or gave nothing usable
    #[error("Oracle error: {message}")]
    Oracle {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON output error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Healix library error
    #[error("Healix error: {0}")]
    Healix(#[from] healix::HealixError),

    /// Healing memory could not be written
    #[error("Storage error: {0}")]
    Storage(#[from] healix::StorageError),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an oracle error
    #[must_use]
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CliError::config("bad config");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("bad config"));
    }

    #[test]
    fn test_invalid_argument_error() {
        let err = CliError::invalid_argument("bad arg");
        assert!(err.to_string().contains("Invalid argument"));
    }

    #[test]
    fn test_oracle_error() {
        let err = CliError::oracle("connection refused");
        assert_eq!(err.to_string(), "Oracle error: connection refused");
    }

    #[test]
    fn test_from_healix_error() {
        let err: CliError = healix::HealixError::ProposalNotFound {
            id: "abc".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Proposal not found: abc"));
    }
}
