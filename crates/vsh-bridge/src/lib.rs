//! vsh-bridge - Directive engine for the voice smart-home bridge
//!
//! Turns the control descriptors of a [`StateBackend`] into protocol
//! endpoints and answers voice directives against them.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        DeviceManager                            │
//! │  - routes directives (system / endpoint)                        │
//! │  - rate limits writes                                           │
//! │  - emits change reports on backend changes                      │
//! └──────────────────────────────┬─────────────────────────────────┘
//!                                │
//!               ┌────────────────┼────────────────┐
//!               ▼                ▼                ▼
//!        ┌─────────────┐  ┌─────────────┐  ┌─────────────┐
//!        │   Device    │  │   Device    │  │   Device    │
//!        │ (endpoint)  │  │ (room+func) │  │ (group)     │
//!        └──────┬──────┘  └──────┬──────┘  └─────────────┘
//!               ▼                ▼
//!        Control ── Capability ── Property ── Conversion ──► StateBackend
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vsh_bridge::{BridgeConfig, DeviceManager};
//!
//! let manager = DeviceManager::new(Arc::new(backend), BridgeConfig::default())?;
//! manager.collect_endpoints().await?;
//!
//! let response = manager.handle_directive(&envelope.directive).await;
//! ```

pub mod capability;
pub mod config;
pub mod control;
pub mod device;
pub mod directives;
pub mod endpoint;
pub mod error;
pub mod grouping;
pub mod manager;
pub mod property;
pub mod rate_limiter;

#[cfg(test)]
mod test_log;

pub use capability::{Capability, CapabilityKind};
pub use config::{
    BridgeConfig, ControlDefaults, DiscoveryConfig, RateLimitConfig, TemperatureScale,
};
pub use control::{Control, ControlKind};
pub use device::Device;
pub use error::{ConfigError, ControlError};
pub use grouping::build_devices;
pub use manager::{DeviceManager, EndpointSummary};
pub use property::{Property, PropertyKind};
pub use rate_limiter::RateLimiter;

// Re-export core types for convenience
pub use vsh_core::{
    BackendError, BackendResult, ControlDescriptor, Directive, DirectiveEnvelope, EventEnvelope,
    StateBackend, StateChange,
};
