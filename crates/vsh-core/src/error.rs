//! Common error types for the bridge and its backends

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by a device-state backend
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Data point does not exist in the backend
    #[error("State not found: {0}")]
    StateNotFound(String),

    /// Backend could not be reached (I/O failure, disconnected adapter)
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    /// Value rejected by the backend
    #[error("Invalid value for {id}: {message}")]
    InvalidValue { id: String, message: String },

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Rate limit violations raised by the write-quota ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// Too many writes to one endpoint within the current hour
    #[error("Hourly limit of {limit} requests exceeded for endpoint {endpoint_id}")]
    HourlyLimitExceeded { endpoint_id: String, limit: u32 },

    /// Too many writes across all endpoints within the current day
    #[error("Daily limit of {limit} requests exceeded")]
    DailyLimitExceeded { limit: u32 },
}

/// Error vocabulary surfaced to the protocol peer in `payload.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    EndpointUnreachable,
    InternalError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::EndpointUnreachable => "ENDPOINT_UNREACHABLE",
            ErrorType::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while handling one directive
///
/// Every variant is recoverable: the manager turns it into an error event
/// via [`crate::EventEnvelope::error`].
#[derive(Debug, Clone, Error)]
pub enum DirectiveError {
    /// No property of the control matches the directive
    #[error("{interface} is not supported by control {control}")]
    NotSupportedByControl {
        control: String,
        interface: String,
        message_id: String,
        payload_version: String,
    },

    /// No control of the device supports the directive
    #[error("{interface} is not supported by endpoint {endpoint_id}")]
    NotSupportedByDevice {
        endpoint_id: String,
        interface: String,
    },

    /// Endpoint id unknown to the manager
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// Directive absorbed by an enforced capability
    #[error("{interface} on control {control} has no native backing")]
    Enforced { control: String, interface: String },

    /// Directive payload is missing or malformed
    #[error("Invalid directive: {0}")]
    InvalidDirective(String),

    /// Value could not be converted between domains
    #[error("Conversion failed: {0}")]
    Conversion(String),

    /// Current value needed by the directive could not be read
    #[error("No value available for {0}")]
    NoValue(String),

    /// Write quota exhausted
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    /// Backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DirectiveError {
    /// Wire error type reported for this error
    pub fn error_type(&self) -> ErrorType {
        match self {
            DirectiveError::RateLimited(_)
            | DirectiveError::NoValue(_)
            | DirectiveError::Backend(BackendError::Unreachable(_))
            | DirectiveError::Backend(BackendError::StateNotFound(_)) => {
                ErrorType::EndpointUnreachable
            }
            _ => ErrorType::InternalError,
        }
    }
}
