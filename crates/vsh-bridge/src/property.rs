//! Property - one controllable or reportable value bound to backend data points

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use vsh_conv::{as_number, Conversion};
use vsh_core::{Directive, DirectiveError, StateBackend};

use crate::config::TemperatureScale;

/// Protocol property names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    PowerState,
    Brightness,
    Color,
    ColorTemperature,
    Percentage,
    TargetSetpoint,
    Temperature,
    ThermostatMode,
    LockState,
    Mode,
    Volume,
    Muted,
    DetectionState,
}

impl PropertyKind {
    /// Name of the property on the wire
    pub fn name(&self) -> &'static str {
        match self {
            PropertyKind::PowerState => "powerState",
            PropertyKind::Brightness => "brightness",
            PropertyKind::Color => "color",
            PropertyKind::ColorTemperature => "colorTemperatureInKelvin",
            PropertyKind::Percentage => "percentage",
            PropertyKind::TargetSetpoint => "targetSetpoint",
            PropertyKind::Temperature => "temperature",
            PropertyKind::ThermostatMode => "thermostatMode",
            PropertyKind::LockState => "lockState",
            PropertyKind::Mode => "mode",
            PropertyKind::Volume => "volume",
            PropertyKind::Muted => "muted",
            PropertyKind::DetectionState => "detectionState",
        }
    }

    /// Directive names that set the property
    fn set_actions(&self) -> &'static [&'static str] {
        match self {
            PropertyKind::PowerState => &["TurnOn", "TurnOff"],
            PropertyKind::Brightness => &["SetBrightness"],
            PropertyKind::Color => &["SetColor"],
            PropertyKind::ColorTemperature => &["SetColorTemperature"],
            PropertyKind::Percentage => &["SetPercentage"],
            PropertyKind::TargetSetpoint => &["SetTargetTemperature"],
            PropertyKind::ThermostatMode => &["SetThermostatMode"],
            PropertyKind::LockState => &["Lock", "Unlock"],
            PropertyKind::Mode => &["SetMode"],
            PropertyKind::Volume => &["SetVolume"],
            PropertyKind::Muted => &["SetMute"],
            PropertyKind::Temperature | PropertyKind::DetectionState => &[],
        }
    }

    /// Directive names that adjust the property relative to its current value
    fn adjust_actions(&self) -> &'static [&'static str] {
        match self {
            PropertyKind::Brightness => &["AdjustBrightness"],
            PropertyKind::ColorTemperature => {
                &["IncreaseColorTemperature", "DecreaseColorTemperature"]
            }
            PropertyKind::Percentage => &["AdjustPercentage"],
            PropertyKind::TargetSetpoint => &["AdjustTargetTemperature"],
            PropertyKind::Mode => &["AdjustMode"],
            PropertyKind::Volume => &["AdjustVolume"],
            _ => &[],
        }
    }
}

/// Whether a directive sets an absolute value or adjusts the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Set,
    Adjust,
}

/// How an adjust directive moves the current value
#[derive(Debug, Clone, PartialEq)]
pub enum Adjust {
    /// Add the delta in the 0–100 domain, clamped to 0–100
    Percent,
    /// Add the delta, clamped to optional bounds
    Bounded { min: Option<f64>, max: Option<f64> },
    /// Step through the colour temperature table; the delta sign picks the direction
    ColorTemperatureSteps,
}

/// One value of a capability, bound to a write point and a read point
#[derive(Debug)]
pub struct Property {
    kind: PropertyKind,
    instance: Option<String>,
    set_id: String,
    get_id: String,
    conversion: Conversion,
    adjust: Option<Adjust>,
    scale: Option<TemperatureScale>,
    /// `(key, point)` pairs of a value spread over several points
    parts: Vec<(&'static str, String)>,
    /// Backend-domain value, filled lazily
    current: Mutex<Option<Value>>,
}

impl Property {
    pub fn new(kind: PropertyKind, set_id: impl Into<String>, conversion: Conversion) -> Self {
        let set_id = set_id.into();
        Self {
            kind,
            instance: None,
            get_id: set_id.clone(),
            set_id,
            conversion,
            adjust: None,
            scale: None,
            parts: Vec::new(),
            current: Mutex::new(None),
        }
    }

    /// Read from a different point than the one written
    pub fn with_get_id(mut self, get_id: Option<impl Into<String>>) -> Self {
        if let Some(get_id) = get_id {
            self.get_id = get_id.into();
        }
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_adjust(mut self, adjust: Adjust) -> Self {
        self.adjust = Some(adjust);
        self
    }

    /// Report values as `{value, scale}` temperature objects
    pub fn with_scale(mut self, scale: TemperatureScale) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Spread the backend value over several points: it becomes an object
    /// with one key per part, each key stored at its own point. The first
    /// part is mandatory when reading.
    pub fn with_parts(mut self, parts: Vec<(&'static str, String)>) -> Self {
        self.parts = parts;
        self
    }

    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn set_id(&self) -> &str {
        &self.set_id
    }

    pub fn get_id(&self) -> &str {
        &self.get_id
    }

    /// Points this property reads
    pub fn read_ids(&self) -> Vec<&str> {
        if self.parts.is_empty() {
            vec![self.get_id.as_str()]
        } else {
            self.parts.iter().map(|(_, id)| id.as_str()).collect()
        }
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn adjust(&self) -> Option<&Adjust> {
        self.adjust.as_ref()
    }

    /// Protocol value → backend value
    pub fn value(&self, protocol: &Value) -> Result<Value, DirectiveError> {
        self.conversion
            .to_backend(protocol)
            .map_err(|e| DirectiveError::Conversion(format!("{}: {e}", self.name())))
    }

    /// Backend value → protocol value
    pub fn alexa_value(&self, backend: &Value) -> Result<Value, DirectiveError> {
        self.conversion
            .to_protocol(backend)
            .map_err(|e| DirectiveError::Conversion(format!("{}: {e}", self.name())))
    }

    /// Whether the directive addresses this property
    pub fn matches(&self, directive: &Directive) -> bool {
        if directive.header.instance.as_deref() != self.instance.as_deref() {
            return false;
        }
        let name = directive.name();
        self.kind.set_actions().iter().any(|a| *a == name)
            || (self.adjust.is_some() && self.kind.adjust_actions().iter().any(|a| *a == name))
    }

    pub fn directive_kind(&self, directive: &Directive) -> DirectiveKind {
        if self.kind.adjust_actions().iter().any(|a| *a == directive.name()) {
            DirectiveKind::Adjust
        } else {
            DirectiveKind::Set
        }
    }

    /// Extract the operand of a directive: an absolute protocol value for set
    /// directives, a signed delta for adjust directives
    pub fn directive_value(&self, directive: &Directive) -> Result<Value, DirectiveError> {
        let adjust = self.directive_kind(directive) == DirectiveKind::Adjust;
        let name = directive.name();
        let field = |key: &str| {
            directive
                .payload_field(key)
                .cloned()
                .ok_or_else(|| DirectiveError::InvalidDirective(format!("{name}: missing {key}")))
        };
        let nested = |key: &str| {
            directive
                .payload_field(key)
                .and_then(|v| v.get("value"))
                .cloned()
                .ok_or_else(|| {
                    DirectiveError::InvalidDirective(format!("{name}: missing {key}.value"))
                })
        };

        match self.kind {
            PropertyKind::PowerState => Ok(json!(if name == "TurnOn" { "ON" } else { "OFF" })),
            PropertyKind::LockState => Ok(json!(if name == "Lock" {
                "LOCKED"
            } else {
                "UNLOCKED"
            })),
            PropertyKind::Brightness if adjust => field("brightnessDelta"),
            PropertyKind::Brightness => field("brightness"),
            PropertyKind::Color => field("color"),
            PropertyKind::ColorTemperature if adjust => Ok(json!(
                if name == "IncreaseColorTemperature" {
                    1
                } else {
                    -1
                }
            )),
            PropertyKind::ColorTemperature => field("colorTemperatureInKelvin"),
            PropertyKind::Percentage if adjust => field("percentageDelta"),
            PropertyKind::Percentage => field("percentage"),
            PropertyKind::TargetSetpoint if adjust => nested("targetSetpointDelta"),
            PropertyKind::TargetSetpoint => nested("targetSetpoint"),
            PropertyKind::ThermostatMode => nested("thermostatMode"),
            PropertyKind::Mode if adjust => field("modeDelta"),
            PropertyKind::Mode => field("mode"),
            PropertyKind::Volume => field("volume"),
            PropertyKind::Muted => field("mute"),
            PropertyKind::Temperature | PropertyKind::DetectionState => Err(
                DirectiveError::InvalidDirective(format!("{} is read-only", self.name())),
            ),
        }
    }

    /// Wrap a protocol value the way it is reported in a context
    pub fn report_value(&self, value: Value) -> Value {
        match self.scale {
            Some(scale) => json!({ "value": value, "scale": scale.as_str() }),
            None => value,
        }
    }

    /// Cached backend value, if any
    pub fn current(&self) -> Option<Value> {
        self.current.lock().clone()
    }

    pub fn set_current(&self, value: Value) {
        *self.current.lock() = Some(value);
    }

    /// Apply an acknowledged value of point `id`; true when the cache changed
    pub fn observe(&self, id: &str, value: &Value) -> bool {
        let mut current = self.current.lock();
        if self.parts.is_empty() {
            if self.get_id != id || current.as_ref() == Some(value) {
                return false;
            }
            *current = Some(value.clone());
            return true;
        }

        let Some((key, _)) = self.parts.iter().find(|(_, point)| point == id) else {
            return false;
        };
        let mut parts = match current.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let changed = parts.get(*key) != Some(value);
        parts.insert(key.to_string(), value.clone());
        *current = Some(Value::Object(parts));
        changed
    }

    /// Write a backend value, part by part for values spread over points
    pub async fn write(&self, backend: &dyn StateBackend, value: &Value) -> Result<(), DirectiveError> {
        if self.parts.is_empty() {
            backend.set_state(&self.set_id, value.clone()).await?;
            return Ok(());
        }
        for (key, id) in &self.parts {
            if let Some(part) = value.get(*key) {
                backend.set_state(id, part.clone()).await?;
            }
        }
        Ok(())
    }

    /// Read-through: the cached value, else the backend's
    pub async fn resolve_current(&self, backend: &dyn StateBackend) -> Result<Value, DirectiveError> {
        if !self.parts.is_empty() {
            return self.resolve_parts(backend).await;
        }
        if let Some(value) = self.current() {
            return Ok(value);
        }
        let value = backend
            .get_state(&self.get_id)
            .await?
            .filter(|v| !v.is_null())
            .ok_or_else(|| DirectiveError::NoValue(self.get_id.clone()))?;
        self.set_current(value.clone());
        Ok(value)
    }

    /// Cached parts, completed from the backend where missing
    async fn resolve_parts(&self, backend: &dyn StateBackend) -> Result<Value, DirectiveError> {
        let mut parts = match self.current() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, id) in &self.parts {
            if parts.contains_key(*key) {
                continue;
            }
            if let Some(value) = backend.get_state(id).await?.filter(|v| !v.is_null()) {
                parts.insert(key.to_string(), value);
            }
        }
        if let Some((key, id)) = self.parts.first() {
            if !parts.contains_key(*key) {
                return Err(DirectiveError::NoValue(id.clone()));
            }
        }
        let value = Value::Object(parts);
        self.set_current(value.clone());
        Ok(value)
    }

    /// Current value in the protocol domain, as a number
    pub async fn resolve_number(&self, backend: &dyn StateBackend) -> Result<f64, DirectiveError> {
        let current = self.resolve_current(backend).await?;
        let protocol = self.alexa_value(&current)?;
        as_number(&protocol).ok_or_else(|| {
            DirectiveError::Conversion(format!("{}: {protocol} is not numeric", self.name()))
        })
    }
}
