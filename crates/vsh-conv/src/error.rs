//! Error types for value conversion

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while converting between protocol and backend values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvError {
    /// Value is not (and cannot be parsed as) a number
    #[error("not a number: {0}")]
    NotNumeric(Value),

    /// Value outside the declared range
    #[error("value out of range: {value} not in [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Range bounds unusable for scaling
    #[error("invalid range: min {min} must be below max {max}")]
    InvalidRange { min: f64, max: f64 },

    /// No mapping exists for the value
    #[error("no mapping for value: {0}")]
    UnknownValue(Value),

    /// Colour value malformed
    #[error("invalid color: {0}")]
    InvalidColor(String),
}

/// Result type for conversion operations
pub type ConvResult<T> = Result<T, ConvError>;
