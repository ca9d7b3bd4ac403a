//! Openings: blind, gate, lock

use serde_json::{json, Value};
use vsh_conv::{to_json_number, Conversion};
use vsh_core::Role;

use super::kind::Wired;
use super::Wiring;
use crate::capability::{mode_capability, Capability, CapabilityKind, ModeSpec};
use crate::error::ControlError;
use crate::property::{Adjust, Property, PropertyKind};

pub(crate) const BLIND_INSTANCE: &str = "Blind.Position";
pub(crate) const GATE_INSTANCE: &str = "Gate.Position";

const OPENING_ASSET: &str = "Alexa.Setting.Opening";

fn open_close_modes(open: &'static str, close: &'static str) -> [ModeSpec; 2] {
    [
        ModeSpec {
            value: open,
            asset: "Alexa.Value.Open",
            action: Some("Alexa.Actions.Open"),
            state: Some("Alexa.States.Open"),
        },
        ModeSpec {
            value: close,
            asset: "Alexa.Value.Close",
            action: Some("Alexa.Actions.Close"),
            state: Some("Alexa.States.Closed"),
        },
    ]
}

/// blind: percentage and an up/down mode over the level on SET; power absorbed
pub(super) fn blind(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let (min, max) = set.range().unwrap_or((0.0, 100.0));

    let percentage = Property::new(
        PropertyKind::Percentage,
        &set.id,
        Conversion::Percent { min, max },
    )
    .with_get_id(w.actual_id())
    .with_adjust(Adjust::Percent);

    let (up, down): (Value, Value) = (to_json_number(max), to_json_number(min));
    let position = Property::new(
        PropertyKind::Mode,
        &set.id,
        Conversion::Lookup(vec![
            (json!("Position.Up"), up.clone()),
            (json!("Position.Down"), down.clone()),
        ]),
    )
    .with_get_id(w.actual_id())
    .with_instance(BLIND_INSTANCE);

    let power = Property::new(
        PropertyKind::PowerState,
        &set.id,
        Conversion::Power { on: up, off: down },
    )
    .with_get_id(w.actual_id());

    Ok(Wired {
        supported: vec![
            Capability::single(CapabilityKind::PercentageController, percentage),
            mode_capability(
                BLIND_INSTANCE,
                OPENING_ASSET,
                &open_close_modes("Position.Up", "Position.Down"),
                position,
            ),
        ],
        enforced: vec![Capability::single(CapabilityKind::PowerController, power)],
        mode_memory: None,
    })
}

/// gate: open/closed mode over a boolean on SET
pub(super) fn gate(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let position = Property::new(
        PropertyKind::Mode,
        &set.id,
        Conversion::Lookup(vec![
            (json!("Position.Open"), json!(true)),
            (json!("Position.Closed"), json!(false)),
        ]),
    )
    .with_get_id(w.actual_id())
    .with_instance(GATE_INSTANCE);

    Ok(Wired {
        supported: vec![mode_capability(
            GATE_INSTANCE,
            OPENING_ASSET,
            &open_close_modes("Position.Open", "Position.Closed"),
            position,
        )],
        ..Default::default()
    })
}

/// lock: `true` on the point means unlocked
pub(super) fn lock(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let state = Property::new(
        PropertyKind::LockState,
        &set.id,
        Conversion::Lookup(vec![
            (json!("LOCKED"), json!(false)),
            (json!("UNLOCKED"), json!(true)),
        ]),
    )
    .with_get_id(w.actual_id());

    Ok(Wired {
        supported: vec![Capability::single(CapabilityKind::LockController, state)],
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlDefaults;
    use crate::control::tests::TestBackend;
    use crate::control::Control;
    use pretty_assertions::assert_eq;
    use vsh_core::{ControlDescriptor, DataPoint, Directive, DirectiveError};

    fn blind_control() -> Control {
        let desc = ControlDescriptor::new("blind", "blind")
            .with_name("Shutter")
            .with_state(
                Role::Set,
                DataPoint::number("blind.level").with_range(0.0, 100.0),
            )
            .with_state(Role::Actual, DataPoint::number("blind.level_actual"));
        Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap()
    }

    #[tokio::test]
    async fn test_blind_mode_open_close() {
        let blind = blind_control();
        let backend = TestBackend::with(&[("blind.level_actual", json!(30))]);

        let close = Directive::new("Alexa.ModeController", "SetMode")
            .with_instance(BLIND_INSTANCE)
            .with_payload(json!({"mode": "Position.Down"}));
        let reported = blind.handle(&backend, &close, None).await.unwrap();
        assert_eq!(reported.instance.as_deref(), Some(BLIND_INSTANCE));
        assert_eq!(reported.value, json!("Position.Down"));
        assert_eq!(backend.writes.lock()[0], ("blind.level".to_string(), json!(0)));

        let report = blind_control().report_state(&backend).await;
        let names: Vec<&str> = report.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["percentage", "mode"]);
        assert_eq!(report[1].value, json!("Position.Down"));
    }

    #[tokio::test]
    async fn test_blind_power_is_enforced() {
        let blind = blind_control();
        let backend = TestBackend::default();
        let on = Directive::new("Alexa.PowerController", "TurnOn");
        let err = blind.handle(&backend, &on, None).await.unwrap_err();
        assert!(matches!(err, DirectiveError::Enforced { .. }));
        assert_eq!(backend.writes.lock()[0].1, json!(100));
    }

    #[tokio::test]
    async fn test_lock_inverts_point() {
        let desc = ControlDescriptor::new("door", "lock")
            .with_state(Role::Set, DataPoint::boolean("door.unlocked"));
        let lock = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        let backend = TestBackend::default();
        let d = Directive::new("Alexa.LockController", "Lock");
        let reported = lock.handle(&backend, &d, None).await.unwrap();
        assert_eq!(reported.value, json!("LOCKED"));
        assert_eq!(backend.writes.lock()[0].1, json!(false));
    }

    #[tokio::test]
    async fn test_gate_position() {
        let desc = ControlDescriptor::new("garage", "gate")
            .with_state(Role::Set, DataPoint::boolean("garage.open"));
        let gate = Control::from_descriptor(&desc, &ControlDefaults::default()).unwrap();
        let backend = TestBackend::with(&[("garage.open", json!(true))]);
        let report = gate.report_state(&backend).await;
        assert_eq!(report[0].value, json!("Position.Open"));
        assert_eq!(gate.category(), "GARAGE_DOOR");
    }
}
