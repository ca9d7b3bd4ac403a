//! Binary sensors: door, window, motion

use serde_json::json;
use vsh_conv::Conversion;
use vsh_core::Role;

use super::kind::Wired;
use super::Wiring;
use crate::capability::{Capability, CapabilityKind};
use crate::error::ControlError;
use crate::property::{Property, PropertyKind};

fn detection(w: &Wiring<'_>, kind: CapabilityKind) -> Result<Wired, ControlError> {
    let (_, point) = w.require_any(&[Role::Actual, Role::Set])?;
    let property = Property::new(
        PropertyKind::DetectionState,
        &point.id,
        Conversion::Lookup(vec![
            (json!("DETECTED"), json!(true)),
            (json!("NOT_DETECTED"), json!(false)),
        ]),
    );
    Ok(Wired {
        supported: vec![Capability::single(kind, property)],
        ..Default::default()
    })
}

/// door, window: `DETECTED` while open
pub(super) fn contact(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    detection(w, CapabilityKind::ContactSensor)
}

pub(super) fn motion(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    detection(w, CapabilityKind::MotionSensor)
}
