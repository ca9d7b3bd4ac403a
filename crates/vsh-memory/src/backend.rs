//! MemoryBackend - StateBackend over an in-process map

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};
use vsh_core::{BackendResult, ControlDescriptor, StateBackend, StateChange};

use crate::config::MemoryBackendConfig;
use crate::error::MemoryBackendError;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-memory device-state backend
pub struct MemoryBackend {
    latency_ms: u64,
    auto_ack: bool,
    connected: AtomicBool,
    states: RwLock<HashMap<String, Value>>,
    controls: RwLock<Vec<ControlDescriptor>>,
    subscriptions: RwLock<BTreeSet<String>>,
    /// Every accepted write, in order
    writes: Mutex<Vec<(String, Value)>>,
    discover_calls: AtomicUsize,
    changes_tx: broadcast::Sender<StateChange>,
}

impl MemoryBackend {
    pub fn new(config: &MemoryBackendConfig) -> Self {
        let (changes_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        info!(
            states = config.states.len(),
            controls = config.controls.len(),
            auto_ack = config.auto_ack,
            "Memory backend created"
        );
        Self {
            latency_ms: config.latency_ms,
            auto_ack: config.auto_ack,
            connected: AtomicBool::new(true),
            states: RwLock::new(
                config
                    .states
                    .iter()
                    .map(|(id, v)| (id.clone(), v.clone()))
                    .collect(),
            ),
            controls: RwLock::new(config.controls.clone()),
            subscriptions: RwLock::new(BTreeSet::new()),
            writes: Mutex::new(Vec::new()),
            discover_calls: AtomicUsize::new(0),
            changes_tx,
        }
    }

    /// Set connection state; while disconnected every call fails as unreachable
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Replace the discovery feed
    pub fn set_controls(&self, controls: Vec<ControlDescriptor>) {
        *self.controls.write() = controls;
    }

    pub fn add_control(&self, control: ControlDescriptor) {
        self.controls.write().push(control);
    }

    /// Current value without connectivity checks or latency
    pub fn peek(&self, id: &str) -> Option<Value> {
        self.states.read().get(id).cloned()
    }

    /// Write journal
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.writes.lock().clone()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    /// Data points currently subscribed
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.read().iter().cloned().collect()
    }

    /// Number of discovery calls served so far
    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    /// Changes of subscribed points, as the host would receive them
    pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChange> {
        self.changes_tx.subscribe()
    }

    /// Simulate a change originating at the device.
    ///
    /// Acknowledged values are stored; the change is published only when the
    /// point is subscribed.
    pub fn inject_change(&self, change: StateChange) {
        if change.ack {
            self.states
                .write()
                .insert(change.id.clone(), change.value.clone());
        }
        self.publish(change);
    }

    fn publish(&self, change: StateChange) {
        if !self.subscriptions.read().contains(&change.id) {
            return;
        }
        debug!(id = %change.id, value = %change.value, ack = change.ack, "Publishing change");
        // no receivers is fine
        let _ = self.changes_tx.send(change);
    }

    fn is_read_only(&self, id: &str) -> bool {
        self.controls
            .read()
            .iter()
            .flat_map(|c| c.states.values())
            .any(|point| point.id == id && !point.write)
    }

    async fn round_trip(&self) -> Result<(), MemoryBackendError> {
        if !self.is_connected() {
            return Err(MemoryBackendError::Disconnected);
        }
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(&MemoryBackendConfig::default())
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn get_state(&self, id: &str) -> BackendResult<Option<Value>> {
        self.round_trip().await?;
        Ok(self.peek(id))
    }

    async fn set_state(&self, id: &str, value: Value) -> BackendResult<()> {
        self.round_trip().await?;
        if self.is_read_only(id) {
            return Err(MemoryBackendError::ReadOnly(id.to_string()).into());
        }

        debug!(id = %id, value = %value, "Memory backend: write");
        self.writes.lock().push((id.to_string(), value.clone()));
        self.states.write().insert(id.to_string(), value.clone());

        let change = if self.auto_ack {
            StateChange::acked(id, value)
        } else {
            StateChange::unacked(id, value)
        };
        self.publish(change);
        Ok(())
    }

    async fn subscribe(&self, id: &str) -> BackendResult<()> {
        self.round_trip().await?;
        self.subscriptions.write().insert(id.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, id: &str) -> BackendResult<()> {
        self.round_trip().await?;
        self.subscriptions.write().remove(id);
        Ok(())
    }

    async fn discover(&self) -> BackendResult<Vec<ControlDescriptor>> {
        self.round_trip().await?;
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.controls.read().clone())
    }
}
