//! Result and error types for Healix.
//!
//! Only [`HealingExhausted`] ever leaves the resolution engine. The other
//! kinds are absorbed inside it: [`ActionError`] drives escalation,
//! [`OracleError`] folds into "no suggestion", and [`StorageError`] puts the
//! memory store into degraded mode.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type for Healix operations
pub type HealixResult<T> = Result<T, HealixError>;

/// Errors surfaced by configuration loading and reviewer tooling
#[derive(Debug, Error)]
pub enum HealixError {
    /// Configuration file could not be used
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// No proposal carries the requested id
    #[error("Proposal not found: {id}")]
    ProposalNotFound {
        /// Requested proposal id
        id: String,
    },

    /// Backing store failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HealixError {
    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// The executor could not perform a requested action
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// No element matched the locator
    #[error("No element matches '{locator}'")]
    NotFound {
        /// Locator that failed
        locator: String,
    },

    /// An element matched but refused the interaction
    #[error("Element '{locator}' is not interactable: {message}")]
    NotInteractable {
        /// Locator that failed
        locator: String,
        /// Error message
        message: String,
    },

    /// The action did not complete in time
    #[error("Action on '{locator}' timed out after {ms}ms")]
    Timeout {
        /// Locator that failed
        locator: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A fill was requested but the caller supplied no value
    #[error("Fill on '{locator}' requires a value")]
    MissingValue {
        /// Locator that failed
        locator: String,
    },

    /// Backend-specific failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },
}

impl ActionError {
    /// Create a not-found error
    #[must_use]
    pub fn not_found(locator: impl Into<String>) -> Self {
        Self::NotFound {
            locator: locator.into(),
        }
    }

    /// Create a timeout error from a duration
    #[must_use]
    pub fn timeout(locator: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            locator: locator.into(),
            ms: after.as_millis() as u64,
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }
}

/// Failure talking to the suggestion oracle
#[derive(Debug, Error)]
pub enum OracleError {
    /// HTTP request failed
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Oracle returned {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// No response within the bounded wait
    #[error("Oracle timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Response did not match the suggestion contract
    #[error("Malformed oracle response: {message}")]
    Malformed {
        /// Error message
        message: String,
    },

    /// No probe endpoint answered
    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),
}

impl OracleError {
    /// Create a malformed-response error
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }
}

/// Cache or ledger could not be read or written
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backing file I/O failed
    #[error("Storage I/O failed for {path}: {source}")]
    Io {
        /// File involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Backing file held something other than the expected JSON shape
    #[error("Storage file {path} is corrupted: {source}")]
    Corrupted {
        /// File involved
        path: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Backend refused the operation
    #[error("Storage unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },
}

impl StorageError {
    /// Create an unavailable error
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Which recovery tier a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// First suggestion round (cache or oracle)
    PlanA,
    /// Escalated suggestion round with the Plan A failure as context
    PlanB,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlanA => f.write_str("plan A"),
            Self::PlanB => f.write_str("plan B"),
        }
    }
}

/// Why a resolution run ended in `FAILED`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureReason {
    /// The oracle produced nothing usable
    #[error("{tier}: no suggestion available")]
    NoSuggestion {
        /// Tier that asked
        tier: Tier,
    },

    /// A suggestion arrived but was not trusted
    #[error("{tier}: confidence {confidence:.2} below threshold {threshold:.2}")]
    LowConfidence {
        /// Tier that asked
        tier: Tier,
        /// Reported confidence
        confidence: f64,
        /// Required confidence
        threshold: f64,
    },

    /// The accepted suggestion did not work either
    #[error("{tier}: substitute '{locator}' failed: {error}")]
    ExecutionFailed {
        /// Tier that executed
        tier: Tier,
        /// Locator that was tried
        locator: String,
        /// What the executor reported
        error: ActionError,
    },

    /// The request itself cannot run, so no locator was healed
    #[error("invalid request: {error}")]
    InvalidRequest {
        /// Why the original attempt was refused
        error: ActionError,
    },
}

impl FailureReason {
    /// Whether this failure came from the confidence gate
    #[must_use]
    pub const fn is_low_confidence(&self) -> bool {
        matches!(self, Self::LowConfidence { .. })
    }
}

/// Terminal error: both tiers failed or were rejected
///
/// The calling test framework should report this as the test's own failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Healing exhausted for '{locator}': {reason}")]
pub struct HealingExhausted {
    /// The locator the caller originally used
    pub locator: String,
    /// Terminal reason
    pub reason: FailureReason,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_error() {
        let err = HealixError::invalid_config("bad thresholds");
        assert!(err.to_string().contains("Invalid configuration"));
        assert!(err.to_string().contains("bad thresholds"));
    }

    #[test]
    fn test_action_timeout_reports_millis() {
        let err = ActionError::timeout("#go", Duration::from_secs(2));
        assert_eq!(err.to_string(), "Action on '#go' timed out after 2000ms");
    }

    #[test]
    fn test_low_confidence_display() {
        let reason = FailureReason::LowConfidence {
            tier: Tier::PlanA,
            confidence: 0.4,
            threshold: 0.7,
        };
        assert!(reason.is_low_confidence());
        assert_eq!(
            reason.to_string(),
            "plan A: confidence 0.40 below threshold 0.70"
        );
    }

    #[test]
    fn test_healing_exhausted_carries_locator() {
        let err = HealingExhausted {
            locator: "#old-id".to_string(),
            reason: FailureReason::NoSuggestion { tier: Tier::PlanB },
        };
        let msg = err.to_string();
        assert!(msg.contains("#old-id"));
        assert!(msg.contains("plan B"));
    }

    #[test]
    fn test_storage_error_into_healix_error() {
        let err: HealixError = StorageError::unavailable("read-only").into();
        assert!(err.to_string().contains("read-only"));
    }
}
