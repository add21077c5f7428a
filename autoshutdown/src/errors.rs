//! Error types for the shutdown job
//!
//! Per-machine failures (`ControlApiError`) are recovered by the orchestrator and
//! counted; `ShutdownError` is reserved for failures that end the whole run.

use std::time::Duration;
use thiserror::Error;

/// Orchestration-level error that aborts a run
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The VM inventory or the tagged resource groups could not be listed
    #[error("Inventory fetch failed: {0}")]
    Inventory(#[source] ControlApiError),

    /// The run did not finish within the configured deadline
    #[error("Run exceeded deadline of {}s", .limit.as_secs())]
    DeadlineExceeded { limit: Duration },
}

/// Configuration error variants
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to load configuration file
    #[error("Failed to load config from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    /// Invalid configuration value
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    /// Configuration parsing error
    #[error("Failed to parse config: {reason}")]
    ParseError { reason: String },
}

/// Failure talking to the cloud inventory/control API
///
/// The transient/permanent split is only reported; nothing is retried within a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlApiError {
    /// Throttling, timeouts, 5xx and connection failures
    #[error("transient failure during {operation} on {target}: {reason}")]
    Transient {
        operation: String,
        target: String,
        reason: String,
    },

    /// Rejected requests (authorization, not found, bad request)
    #[error("permanent failure during {operation} on {target}: {reason}")]
    Permanent {
        operation: String,
        target: String,
        reason: String,
    },

    /// The API answered but the payload could not be understood
    #[error("unreadable response during {operation} on {target}: {reason}")]
    Decode {
        operation: String,
        target: String,
        reason: String,
    },
}

impl ControlApiError {
    pub fn transient(operation: &str, target: &str, reason: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.to_string(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub fn permanent(operation: &str, target: &str, reason: impl Into<String>) -> Self {
        Self::Permanent {
            operation: operation.to_string(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub fn decode(operation: &str, target: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            operation: operation.to_string(),
            target: target.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Short label used in log lines
    pub fn class(&self) -> &'static str {
        match self {
            Self::Transient { .. } => "transient",
            Self::Permanent { .. } => "permanent",
            Self::Decode { .. } => "decode",
        }
    }
}
