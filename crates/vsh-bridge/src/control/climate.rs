//! Climate: temperature sensor, thermostat, air conditioner

use serde_json::{json, Value};
use vsh_conv::{loose_eq, Conversion};
use vsh_core::{DataPoint, Role};

use super::kind::Wired;
use super::{ModeMemory, Wiring};
use crate::capability::{Capability, CapabilityKind};
use crate::error::ControlError;
use crate::property::{Adjust, Property, PropertyKind};

const PROTOCOL_MODES: [&str; 5] = ["AUTO", "HEAT", "COOL", "ECO", "OFF"];

fn unbounded() -> Conversion {
    Conversion::Numeric {
        min: None,
        max: None,
    }
}

fn sensor(w: &Wiring<'_>, point: &DataPoint) -> Capability {
    Capability::single(
        CapabilityKind::TemperatureSensor,
        Property::new(PropertyKind::Temperature, &point.id, unbounded())
            .with_scale(w.defaults.temperature_scale),
    )
}

/// Protocol mode named by a backend label, if any
fn protocol_mode(label: &str) -> Option<&'static str> {
    let label = label.to_ascii_uppercase();
    PROTOCOL_MODES
        .into_iter()
        .find(|mode| label.contains(*mode))
}

/// Backend keys arrive as strings; numeric and boolean keys are written typed
fn backend_key(key: &str) -> Value {
    if let Ok(n) = key.parse::<i64>() {
        return json!(n);
    }
    match key {
        "true" => json!(true),
        "false" => json!(false),
        _ => json!(key),
    }
}

/// `(protocol, backend)` pairs of a mode point
fn mode_table(point: &DataPoint) -> Vec<(Value, Value)> {
    let table: Vec<(Value, Value)> = point
        .states
        .iter()
        .flatten()
        .filter_map(|(key, label)| protocol_mode(label).map(|mode| (json!(mode), backend_key(key))))
        .collect();
    if table.is_empty() {
        PROTOCOL_MODES
            .into_iter()
            .map(|mode| (json!(mode), json!(mode)))
            .collect()
    } else {
        table
    }
}

/// temperature: sensor on ACTUAL
pub(super) fn temperature(w: &Wiring<'_>) -> Result<Wired, ControlError> {
    let actual = w.require(Role::Actual)?;
    Ok(Wired {
        supported: vec![sensor(w, actual)],
        ..Default::default()
    })
}

/// thermostat / airCondition: setpoint on SET, mode on MODE, power on POWER or
/// derived from MODE with the last non-off mode remembered
pub(super) fn thermostat(w: &Wiring<'_>, requires_mode: bool) -> Result<Wired, ControlError> {
    let set = w.require(Role::Set)?;
    let mode = if requires_mode {
        Some(w.require(Role::Mode)?)
    } else {
        w.point(Role::Mode)
    };

    let (min, max) = (set.min, set.max);
    let mut properties = vec![Property::new(
        PropertyKind::TargetSetpoint,
        &set.id,
        Conversion::Numeric { min, max },
    )
    .with_adjust(Adjust::Bounded { min, max })
    .with_scale(w.defaults.temperature_scale)];

    let mut configuration = json!({ "supportsScheduling": false });
    let mut mode_power = None;
    if let Some(mode) = mode {
        let table = mode_table(mode);
        let mut supported_modes: Vec<&Value> = Vec::new();
        for (protocol, _) in &table {
            if !supported_modes.contains(&protocol) {
                supported_modes.push(protocol);
            }
        }
        configuration["supportedModes"] = json!(supported_modes);

        let off = table
            .iter()
            .find(|(protocol, _)| protocol == "OFF")
            .map(|(_, backend)| backend.clone());
        let on = table
            .iter()
            .find(|(_, backend)| off.as_ref().map_or(true, |off| !loose_eq(backend, off)))
            .map(|(_, backend)| backend.clone());
        if let (Some(on), Some(off)) = (on, off) {
            mode_power = Some((mode.id.clone(), on, off));
        }

        properties.push(Property::new(
            PropertyKind::ThermostatMode,
            &mode.id,
            Conversion::Lookup(table),
        ));
    }

    let mut supported = vec![Capability::new(CapabilityKind::ThermostatController, properties)
        .with_configuration(configuration)];
    if let Some(actual) = w.point(Role::Actual) {
        supported.push(sensor(w, actual));
    }

    let mut mode_memory = None;
    if let Some(power) = w.point(Role::Power) {
        supported.push(Capability::single(
            CapabilityKind::PowerController,
            Property::new(
                PropertyKind::PowerState,
                &power.id,
                Conversion::Power {
                    on: json!(true),
                    off: json!(false),
                },
            ),
        ));
    } else if let Some((mode_id, on, off)) = mode_power {
        supported.push(Capability::single(
            CapabilityKind::PowerController,
            Property::new(
                PropertyKind::PowerState,
                &mode_id,
                Conversion::ModePower {
                    on: on.clone(),
                    off: off.clone(),
                },
            ),
        ));
        mode_memory = Some(ModeMemory::new(mode_id, off, on));
    }

    Ok(Wired {
        supported,
        enforced: Vec::new(),
        mode_memory,
    })
}
