//! vsh-memory - In-memory device-state backend
//!
//! A [`StateBackend`](vsh_core::StateBackend) keeping all data points in a
//! map. The discovery feed and initial values come from a TOML, YAML or JSON
//! file. Connectivity can be switched off to simulate an unreachable backend,
//! writes are journaled, and every write to a subscribed point is echoed as a
//! [`StateChange`](vsh_core::StateChange), acknowledged or not depending on
//! `auto_ack`.

mod backend;
mod config;
mod error;

pub use backend::MemoryBackend;
pub use config::{load_feed, MemoryBackendConfig};
pub use error::MemoryBackendError;
