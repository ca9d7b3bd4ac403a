//! StateBackend trait - the collaborator that owns device state

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BackendError, BackendResult};
use crate::models::ControlDescriptor;

/// The device-state backend the bridge reads from and writes to.
///
/// The bridge never owns device state: every read, write and subscription
/// goes through this trait. Implementations only need the four state calls
/// and the discovery feed; live changes are pushed into the bridge by the
/// host via `DeviceManager::handle_backend_change`.
#[async_trait]
pub trait StateBackend: Send + Sync {
    /// Read the current value of a data point (`None` when it has no value yet)
    async fn get_state(&self, id: &str) -> BackendResult<Option<Value>>;

    /// Write a data point
    async fn set_state(&self, id: &str, value: Value) -> BackendResult<()>;

    /// Start receiving changes of a data point
    async fn subscribe(&self, id: &str) -> BackendResult<()> {
        let _ = id;
        Ok(())
    }

    /// Stop receiving changes of a data point
    async fn unsubscribe(&self, id: &str) -> BackendResult<()> {
        let _ = id;
        Ok(())
    }

    /// Enumerate the controls currently declared by the backend
    async fn discover(&self) -> BackendResult<Vec<ControlDescriptor>> {
        Err(BackendError::NotSupported("discover".to_string()))
    }
}
