//! Handlers of system-level directives
//!
//! Endpoint-targeted directives are routed to devices by the manager; the
//! directives below address the bridge itself and are answered here.

pub mod authorization;
pub mod change_report;
pub mod discovery;
pub mod report_state;

use vsh_core::Directive;

/// Directives answered by the bridge rather than by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemDirective {
    Discover,
    ReportState,
    ChangeReport,
    AcceptGrant,
}

impl SystemDirective {
    /// Classify a directive by interface and name
    pub fn classify(directive: &Directive) -> Option<Self> {
        match (directive.namespace(), directive.name()) {
            ("Alexa.Discovery", "Discover") => Some(SystemDirective::Discover),
            ("Alexa", "ReportState") => Some(SystemDirective::ReportState),
            ("Alexa", "ChangeReport") => Some(SystemDirective::ChangeReport),
            ("Alexa.Authorization", "AcceptGrant") => Some(SystemDirective::AcceptGrant),
            _ => None,
        }
    }
}
