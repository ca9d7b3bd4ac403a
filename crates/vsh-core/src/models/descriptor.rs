//! Control descriptors delivered by the backend discovery feed

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical role of a data point inside a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Set,
    Actual,
    OnSet,
    OnActual,
    Power,
    Mode,
    Hue,
    Dimmer,
    Brightness,
    Saturation,
    Temperature,
    On,
    Mute,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Set => "SET",
            Role::Actual => "ACTUAL",
            Role::OnSet => "ON_SET",
            Role::OnActual => "ON_ACTUAL",
            Role::Power => "POWER",
            Role::Mode => "MODE",
            Role::Hue => "HUE",
            Role::Dimmer => "DIMMER",
            Role::Brightness => "BRIGHTNESS",
            Role::Saturation => "SATURATION",
            Role::Temperature => "TEMPERATURE",
            Role::On => "ON",
            Role::Mute => "MUTE",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared value type of a data point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Number,
    String,
    #[default]
    Mixed,
}

/// One backend data point bound to a role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Backend state id
    pub id: String,
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Enumerated values: backend value (as string) → label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<BTreeMap<String, String>>,
    #[serde(default = "default_true")]
    pub read: bool,
    #[serde(default = "default_true")]
    pub write: bool,
}

fn default_true() -> bool {
    true
}

impl DataPoint {
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            value_type,
            min: None,
            max: None,
            unit: None,
            states: None,
            read: true,
            write: true,
        }
    }

    pub fn boolean(id: impl Into<String>) -> Self {
        Self::new(id, ValueType::Boolean)
    }

    pub fn number(id: impl Into<String>) -> Self {
        Self::new(id, ValueType::Number)
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_states(mut self, states: BTreeMap<String, String>) -> Self {
        self.states = Some(states);
        self
    }

    /// Declared range, when both bounds are present
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

/// A raw control as declared by the backend discovery feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDescriptor {
    /// Unique backend id of the control (usually the channel/device object id)
    pub id: String,
    /// Control type tag, e.g. `dimmer` or `thermostat`
    #[serde(rename = "type")]
    pub control_type: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Role → data point mapping
    #[serde(default)]
    pub states: BTreeMap<Role, DataPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Non-room smart groups the control belongs to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Turn plain "on" directives into toggles for the resulting endpoint
    #[serde(default)]
    pub toggle: bool,
}

impl ControlDescriptor {
    pub fn new(id: impl Into<String>, control_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            control_type: control_type.into(),
            name: None,
            states: BTreeMap::new(),
            room: None,
            function: None,
            groups: Vec::new(),
            toggle: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_state(mut self, role: Role, point: DataPoint) -> Self {
        self.states.insert(role, point);
        self
    }

    pub fn in_room(mut self, room: impl Into<String>, function: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self.function = Some(function.into());
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_toggle(mut self, toggle: bool) -> Self {
        self.toggle = toggle;
        self
    }

    /// Name to show, falling back to the backend id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn state(&self, role: Role) -> Option<&DataPoint> {
        self.states.get(&role)
    }
}

/// A value change pushed by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub id: String,
    #[serde(rename = "val")]
    pub value: Value,
    /// Whether the backend confirmed the value (as opposed to an optimistic write)
    #[serde(default)]
    pub ack: bool,
}

impl StateChange {
    pub fn acked(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
            ack: true,
        }
    }

    pub fn unacked(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: id.into(),
            value,
            ack: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_from_json() {
        let raw = json!({
            "id": "zigbee.0.lamp",
            "type": "dimmer",
            "name": "Desk Lamp",
            "states": {
                "SET": { "id": "zigbee.0.lamp.level", "type": "number", "min": 0, "max": 254 },
                "ON_SET": { "id": "zigbee.0.lamp.state", "type": "boolean" }
            },
            "room": "Office",
            "function": "Lighting",
            "groups": ["Evening"]
        });

        let desc: ControlDescriptor = serde_json::from_value(raw).unwrap();
        assert_eq!(desc.control_type, "dimmer");
        assert_eq!(desc.display_name(), "Desk Lamp");
        let level = desc.state(Role::Set).unwrap();
        assert_eq!(level.range(), Some((0.0, 254.0)));
        assert!(level.write);
        assert_eq!(desc.state(Role::OnSet).unwrap().value_type, ValueType::Boolean);
        assert_eq!(desc.groups, vec!["Evening".to_string()]);
        assert!(!desc.toggle);
    }

    #[test]
    fn test_state_change_wire_name() {
        let change: StateChange =
            serde_json::from_value(json!({"id": "a.b", "val": 3, "ack": true})).unwrap();
        assert_eq!(change, StateChange::acked("a.b", json!(3)));
    }
}
