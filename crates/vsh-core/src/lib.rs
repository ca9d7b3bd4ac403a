//! vsh-core - Core traits and types for the voice smart-home bridge
//!
//! This crate provides the protocol envelopes exchanged with the voice
//! assistant, the control descriptors delivered by the device-state backend,
//! and the [`StateBackend`] trait every backend implements.

pub mod backend;
pub mod error;
pub mod models;

pub use backend::StateBackend;
pub use error::{BackendError, BackendResult, DirectiveError, ErrorType, RateLimitError};
pub use models::*;
