//! `Alexa/ReportState`

use vsh_core::{Directive, DirectiveError, EventEnvelope, StateBackend};

use crate::device::Device;

/// Answer with the merged state of the addressed device
pub async fn handle(
    directive: &Directive,
    device: Option<&Device>,
    backend: &dyn StateBackend,
) -> EventEnvelope {
    let Some(device) = device else {
        let id = directive.endpoint_id().unwrap_or_default().to_string();
        return EventEnvelope::error(directive, &DirectiveError::UnknownEndpoint(id));
    };
    let state = device.report_state(backend).await;
    EventEnvelope::state_report(directive, state)
}
