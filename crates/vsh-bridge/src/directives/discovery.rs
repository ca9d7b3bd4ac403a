//! `Alexa.Discovery/Discover`

use std::sync::Arc;

use tracing::{info, warn};
use vsh_core::{Directive, EventEnvelope};

use crate::config::BridgeConfig;
use crate::device::Device;

/// Announce at most `discovery.max_endpoints` devices
pub fn handle(directive: &Directive, devices: &[Arc<Device>], config: &BridgeConfig) -> EventEnvelope {
    let limit = config.discovery.max_endpoints;
    if devices.len() > limit {
        warn!(
            count = devices.len(),
            limit,
            "Too many endpoints, discovery response truncated"
        );
    }

    let endpoints = devices
        .iter()
        .take(limit)
        .map(|d| d.discovery(&config.manufacturer_name))
        .collect::<Vec<_>>();
    info!(endpoints = endpoints.len(), "Discovery answered");
    EventEnvelope::discovery_response(directive, endpoints)
}
