//! DeviceManager - directive routing, endpoint collection, change propagation

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use vsh_core::{
    BackendResult, Directive, DirectiveError, EventEnvelope, StateBackend, StateChange,
};

use crate::config::BridgeConfig;
use crate::device::Device;
use crate::directives::{authorization, change_report, discovery, report_state, SystemDirective};
use crate::error::ConfigError;
use crate::grouping::build_devices;
use crate::rate_limiter::RateLimiter;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Summary of one endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub endpoint_id: String,
    pub friendly_name: String,
    pub control_ids: Vec<String>,
    pub auto_detected: bool,
}

#[derive(Debug, Default)]
struct CollectState {
    running: bool,
    pending: bool,
}

/// Top-level orchestrator of the bridge
pub struct DeviceManager {
    backend: Arc<dyn StateBackend>,
    config: BridgeConfig,
    rate_limiter: RateLimiter,
    devices: RwLock<Vec<Arc<Device>>>,
    subscriptions: Mutex<BTreeSet<String>>,
    collect_state: Mutex<CollectState>,
    changes: broadcast::Sender<EventEnvelope>,
}

impl DeviceManager {
    /// Create a manager; the configuration is validated here
    pub fn new(backend: Arc<dyn StateBackend>, config: BridgeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            backend,
            rate_limiter: RateLimiter::new(&config.rate_limit),
            config,
            devices: RwLock::new(Vec::new()),
            subscriptions: Mutex::new(BTreeSet::new()),
            collect_state: Mutex::new(CollectState::default()),
            changes,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Receive every change report emitted from now on
    pub fn subscribe_changes(&self) -> broadcast::Receiver<EventEnvelope> {
        self.changes.subscribe()
    }

    /// Snapshot of the current devices
    pub fn devices(&self) -> Vec<Arc<Device>> {
        self.devices.read().clone()
    }

    pub fn device(&self, endpoint_id: &str) -> Option<Arc<Device>> {
        self.devices
            .read()
            .iter()
            .find(|d| d.id() == endpoint_id)
            .cloned()
    }

    pub fn endpoints(&self) -> Vec<EndpointSummary> {
        self.devices
            .read()
            .iter()
            .map(|d| EndpointSummary {
                endpoint_id: d.id().to_string(),
                friendly_name: d.friendly_name().to_string(),
                control_ids: d.controls().iter().map(|c| c.id().to_string()).collect(),
                auto_detected: d.is_auto_detected(),
            })
            .collect()
    }

    /// Data points currently subscribed at the backend
    pub fn backend_ids(&self) -> Vec<String> {
        self.subscriptions.lock().iter().cloned().collect()
    }

    /// Rebuild all devices from the backend's discovery feed.
    ///
    /// A call arriving while a rebuild runs only marks a follow-up rebuild,
    /// which the running call performs once it finishes.
    pub async fn collect_endpoints(&self) -> BackendResult<()> {
        {
            let mut state = self.collect_state.lock();
            if state.running {
                debug!("Endpoint collection in progress, scheduling follow-up");
                state.pending = true;
                return Ok(());
            }
            state.running = true;
        }

        loop {
            let result = self.rebuild().await;
            let again = {
                let mut state = self.collect_state.lock();
                if state.pending {
                    state.pending = false;
                    true
                } else {
                    state.running = false;
                    false
                }
            };
            if !again {
                return result;
            }
            if let Err(e) = result {
                warn!(error = %e, "Endpoint collection failed, running follow-up");
            }
        }
    }

    async fn rebuild(&self) -> BackendResult<()> {
        let descriptors = self.backend.discover().await?;
        let devices: Vec<Arc<Device>> = build_devices(&descriptors, &self.config.defaults)
            .into_iter()
            .map(Arc::new)
            .collect();
        info!(
            controls = descriptors.len(),
            endpoints = devices.len(),
            "Endpoints collected"
        );

        *self.devices.write() = devices.clone();
        self.reconcile_subscriptions(&devices).await;
        Ok(())
    }

    async fn reconcile_subscriptions(&self, devices: &[Arc<Device>]) {
        let wanted: BTreeSet<String> = devices.iter().flat_map(|d| d.backend_ids()).collect();
        let current = self.subscriptions.lock().clone();

        let mut subscribed = 0usize;
        let mut unsubscribed = 0usize;
        let mut active = BTreeSet::new();

        for id in current.difference(&wanted) {
            match self.backend.unsubscribe(id).await {
                Ok(()) => unsubscribed += 1,
                Err(e) => warn!(id = %id, error = %e, "Failed to unsubscribe"),
            }
        }
        for id in &wanted {
            if current.contains(id) {
                active.insert(id.clone());
                continue;
            }
            match self.backend.subscribe(id).await {
                Ok(()) => {
                    subscribed += 1;
                    active.insert(id.clone());
                }
                Err(e) => warn!(id = %id, error = %e, "Failed to subscribe"),
            }
        }

        debug!(
            subscribed,
            unsubscribed,
            total = active.len(),
            "Subscriptions reconciled"
        );
        *self.subscriptions.lock() = active;
    }

    /// Answer one directive; always yields a response or an error event
    pub async fn handle_directive(&self, directive: &Directive) -> EventEnvelope {
        match SystemDirective::classify(directive) {
            Some(SystemDirective::Discover) => {
                discovery::handle(directive, &self.devices(), &self.config)
            }
            Some(SystemDirective::ReportState) => {
                let device = directive.endpoint_id().and_then(|id| self.device(id));
                report_state::handle(directive, device.as_deref(), self.backend.as_ref()).await
            }
            Some(SystemDirective::ChangeReport) => self.handle_change_report(directive).await,
            Some(SystemDirective::AcceptGrant) => authorization::handle(directive),
            None => match self.handle_endpoint_directive(directive).await {
                Ok(envelope) => envelope,
                Err(e) => {
                    let endpoint_id = directive.endpoint_id().unwrap_or_default();
                    if let DirectiveError::RateLimited(limit) = &e {
                        warn!(
                            endpoint_id,
                            namespace = %directive.namespace(),
                            name = %directive.name(),
                            error = %limit,
                            "Rate limit exceeded, directive dropped"
                        );
                    } else {
                        warn!(
                            endpoint_id,
                            namespace = %directive.namespace(),
                            name = %directive.name(),
                            error = %e,
                            error_type = %e.error_type(),
                            "Directive failed"
                        );
                    }
                    EventEnvelope::error(directive, &e)
                }
            },
        }
    }

    async fn handle_endpoint_directive(
        &self,
        directive: &Directive,
    ) -> Result<EventEnvelope, DirectiveError> {
        let endpoint_id = directive
            .endpoint_id()
            .ok_or_else(|| DirectiveError::InvalidDirective("missing endpoint".to_string()))?;
        let device = self
            .device(endpoint_id)
            .ok_or_else(|| DirectiveError::UnknownEndpoint(endpoint_id.to_string()))?;
        if !device.supports(directive) {
            return Err(DirectiveError::NotSupportedByDevice {
                endpoint_id: endpoint_id.to_string(),
                interface: directive.namespace().to_string(),
            });
        }

        self.rate_limiter.increment_and_get(endpoint_id)?;
        let reported = device.handle(self.backend.as_ref(), directive).await?;
        debug!(
            endpoint_id = %endpoint_id,
            name = %directive.name(),
            value = %reported.value,
            "Directive handled"
        );
        Ok(EventEnvelope::response(directive, vec![reported]))
    }

    /// Change report for the addressed endpoint against its last emitted state
    async fn handle_change_report(&self, directive: &Directive) -> EventEnvelope {
        let Some(device) = directive.endpoint_id().and_then(|id| self.device(id)) else {
            let id = directive.endpoint_id().unwrap_or_default().to_string();
            return EventEnvelope::error(directive, &DirectiveError::UnknownEndpoint(id));
        };
        let state = device.report_state(self.backend.as_ref()).await;
        change_report::build(&device, state.clone())
            .unwrap_or_else(|| EventEnvelope::change_report(device.id(), Vec::new(), state))
    }

    /// Ingest a backend change.
    ///
    /// Unacknowledged and same-value changes are dropped. Otherwise every
    /// device reading the point recomputes its state and, when that state
    /// differs from the last one emitted, a change report is broadcast.
    /// Returns the reports emitted.
    pub async fn handle_backend_change(&self, change: &StateChange) -> Vec<EventEnvelope> {
        if !change.ack {
            debug!(id = %change.id, "Ignoring unacknowledged change");
            return Vec::new();
        }

        let mut reports = Vec::new();
        for device in self.devices() {
            if !device.observe(&change.id, &change.value) {
                continue;
            }
            let state = device.report_state(self.backend.as_ref()).await;
            if let Some(report) = change_report::build(&device, state) {
                // no receivers is fine
                let _ = self.changes.send(report.clone());
                reports.push(report);
            }
        }
        reports
    }
}
