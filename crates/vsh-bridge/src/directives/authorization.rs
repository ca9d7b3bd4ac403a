//! `Alexa.Authorization/AcceptGrant`

use tracing::info;
use vsh_core::{Directive, EventEnvelope};

/// Acknowledge an authorization grant; the grant code itself is not used
pub fn handle(directive: &Directive) -> EventEnvelope {
    let grantee = directive
        .payload_field("grantee")
        .and_then(|g| g.get("type"))
        .and_then(|t| t.as_str())
        .unwrap_or("unknown");
    info!(grantee = %grantee, "Authorization grant accepted");
    EventEnvelope::accept_grant_response(directive)
}
