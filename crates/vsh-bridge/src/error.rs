//! Error types for the bridge

use thiserror::Error;
use vsh_core::Role;

/// Configuration errors; fatal at construction time
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Mandatory setting absent or empty
    #[error("Missing configuration: {0}")]
    Missing(String),

    /// Setting present but unusable
    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },

    /// Document could not be parsed
    #[error("Configuration parse error: {0}")]
    Parse(String),
}

/// Errors raised while building a control from a descriptor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// Type tag not in the control registry
    #[error("Unknown control type: {0}")]
    UnknownType(String),

    /// A role the control kind cannot work without is absent
    #[error("Control {control} ({kind}) is missing mandatory role {role}")]
    MissingRole {
        control: String,
        kind: String,
        role: Role,
    },

    /// Descriptor wires no capability at all
    #[error("Control {0} exposes no capability")]
    NoCapabilities(String),
}
