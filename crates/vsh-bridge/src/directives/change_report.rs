//! `Alexa/ChangeReport` construction and deduplication

use tracing::debug;
use vsh_core::{EventEnvelope, ReportedProperty};

use crate::device::Device;

/// Change report for `state`, or `None` when nothing changed since the last
/// report emitted for the device
pub fn build(device: &Device, state: Vec<ReportedProperty>) -> Option<EventEnvelope> {
    let previous = device.replace_last_state(&state)?.unwrap_or_default();

    let (changed, unchanged): (Vec<_>, Vec<_>) = state
        .into_iter()
        .partition(|p| !previous.contains(p));
    if changed.is_empty() {
        return None;
    }

    debug!(
        endpoint_id = %device.id(),
        changed = changed.len(),
        unchanged = unchanged.len(),
        "Change report"
    );
    Some(EventEnvelope::change_report(device.id(), changed, unchanged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlDefaults;
    use crate::control::tests::light;
    use crate::control::Control;
    use serde_json::json;

    fn device() -> Device {
        let control = Control::from_descriptor(&light("a"), &ControlDefaults::default()).unwrap();
        Device::new("lamp", "Lamp", vec![control])
    }

    fn power(value: &str) -> ReportedProperty {
        ReportedProperty::new("Alexa.PowerController", "powerState", json!(value))
    }

    fn brightness(value: i64) -> ReportedProperty {
        ReportedProperty::new("Alexa.BrightnessController", "brightness", json!(value))
    }

    #[test]
    fn test_first_report_lists_everything_as_changed() {
        let device = device();
        let report = build(&device, vec![power("ON")]).unwrap();
        assert_eq!(report.event.header.name, "ChangeReport");
        assert_eq!(
            report.event.payload["change"]["cause"]["type"],
            json!("PHYSICAL_INTERACTION")
        );
        assert_eq!(report.event.payload["change"]["properties"][0]["value"], json!("ON"));
        assert!(report.properties().is_empty());
    }

    #[test]
    fn test_same_state_is_not_reported_twice() {
        let device = device();
        assert!(build(&device, vec![power("ON"), brightness(40)]).is_some());
        assert!(build(&device, vec![power("ON"), brightness(40)]).is_none());

        let report = build(&device, vec![power("ON"), brightness(60)]).unwrap();
        let changed = report.event.payload["change"]["properties"].as_array().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0]["name"], json!("brightness"));
        assert_eq!(report.properties().len(), 1);
        assert_eq!(report.properties()[0].name, "powerState");
    }
}
