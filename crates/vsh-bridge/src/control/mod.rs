//! Control - one backend unit mapped onto protocol capabilities
//!
//! A control is built from a [`ControlDescriptor`]: the descriptor's type tag
//! selects a [`ControlKind`], whose wiring function picks capabilities from the
//! roles present. Capabilities are split into *supported* (natively backed,
//! announced in discovery, reported) and *enforced* (absorbed without native
//! backing: the write happens, the answer is always an error).

mod climate;
mod covers;
mod kind;
mod lights;
mod media;
mod sensors;

pub use kind::ControlKind;

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};
use vsh_conv::{
    as_number, clamp_percent, color, loose_eq, round_for_step, to_json_number, Conversion, ON,
};
use vsh_core::{
    ControlDescriptor, DataPoint, Directive, DirectiveError, ReportedProperty, Role, StateBackend,
};

use crate::capability::Capability;
use crate::config::ControlDefaults;
use crate::error::ControlError;
use crate::property::{Adjust, DirectiveKind, Property, PropertyKind};

/// Remembers the last non-off mode so power-on can restore it
#[derive(Debug)]
pub struct ModeMemory {
    mode_id: String,
    off: Value,
    fallback: Value,
    last: Mutex<Option<Value>>,
}

impl ModeMemory {
    pub fn new(mode_id: impl Into<String>, off: Value, fallback: Value) -> Self {
        Self {
            mode_id: mode_id.into(),
            off,
            fallback,
            last: Mutex::new(None),
        }
    }

    /// Record an observed backend mode; off and empty values are ignored
    pub fn remember(&self, value: &Value) {
        if !value.is_null() && !loose_eq(value, &self.off) {
            *self.last.lock() = Some(value.clone());
        }
    }

    /// Mode to write when powering on
    pub fn restore(&self) -> Value {
        self.last
            .lock()
            .clone()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn mode_id(&self) -> &str {
        &self.mode_id
    }
}

/// Descriptor plus defaults, handed to the wiring functions
pub(crate) struct Wiring<'a> {
    pub desc: &'a ControlDescriptor,
    pub defaults: &'a ControlDefaults,
    pub kind: ControlKind,
}

impl<'a> Wiring<'a> {
    pub fn point(&self, role: Role) -> Option<&'a DataPoint> {
        self.desc.state(role)
    }

    /// First present role of `roles`
    pub fn first(&self, roles: &[Role]) -> Option<(Role, &'a DataPoint)> {
        roles
            .iter()
            .find_map(|role| self.point(*role).map(|point| (*role, point)))
    }

    pub fn require(&self, role: Role) -> Result<&'a DataPoint, ControlError> {
        self.point(role).ok_or_else(|| self.missing(role))
    }

    /// First present role of `roles`; the error names the first one
    pub fn require_any(&self, roles: &[Role]) -> Result<(Role, &'a DataPoint), ControlError> {
        self.first(roles)
            .ok_or_else(|| self.missing(roles.first().copied().unwrap_or(Role::Set)))
    }

    pub fn missing(&self, role: Role) -> ControlError {
        ControlError::MissingRole {
            control: self.desc.id.clone(),
            kind: self.kind.tag().to_string(),
            role,
        }
    }

    /// Id of the ACTUAL point, used as read point of SET-written properties
    pub fn actual_id(&self) -> Option<&'a str> {
        self.point(Role::Actual).map(|p| p.id.as_str())
    }
}

/// A backend control with its wired capabilities
#[derive(Debug)]
pub struct Control {
    id: String,
    name: String,
    kind: ControlKind,
    states: BTreeMap<Role, DataPoint>,
    supported: Vec<Capability>,
    enforced: Vec<Capability>,
    mode_memory: Option<ModeMemory>,
}

impl Control {
    /// Build a control from a descriptor
    pub fn from_descriptor(
        desc: &ControlDescriptor,
        defaults: &ControlDefaults,
    ) -> Result<Self, ControlError> {
        let kind = ControlKind::from_tag(&desc.control_type)
            .ok_or_else(|| ControlError::UnknownType(desc.control_type.clone()))?;
        let wiring = Wiring {
            desc,
            defaults,
            kind,
        };
        let wired = kind.wire(&wiring)?;
        if wired.supported.is_empty() {
            return Err(ControlError::NoCapabilities(desc.id.clone()));
        }

        debug!(
            control_id = %desc.id,
            kind = %kind,
            supported = wired.supported.len(),
            enforced = wired.enforced.len(),
            "Control wired"
        );

        Ok(Self {
            id: desc.id.clone(),
            name: desc.display_name().to_string(),
            kind,
            states: desc.states.clone(),
            supported: wired.supported,
            enforced: wired.enforced,
            mode_memory: wired.mode_memory,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ControlKind {
        self.kind
    }

    pub fn category(&self) -> &'static str {
        self.kind.display_category()
    }

    /// Role → data point map of the descriptor
    pub fn states(&self) -> &BTreeMap<Role, DataPoint> {
        &self.states
    }

    pub fn supported(&self) -> &[Capability] {
        &self.supported
    }

    pub fn enforced(&self) -> &[Capability] {
        &self.enforced
    }

    /// Whether any supported or enforced property matches the directive
    pub fn supports(&self, directive: &Directive) -> bool {
        self.find(directive).is_some()
    }

    fn find(&self, directive: &Directive) -> Option<(&Capability, &Property, bool)> {
        let native = self
            .supported
            .iter()
            .find_map(|c| c.find_property(directive).map(|p| (c, p, false)));
        native.or_else(|| {
            self.enforced
                .iter()
                .find_map(|c| c.find_property(directive).map(|p| (c, p, true)))
        })
    }

    fn properties(&self) -> impl Iterator<Item = &Property> {
        self.supported
            .iter()
            .chain(self.enforced.iter())
            .flat_map(|c| c.properties().iter())
    }

    /// Data points whose changes this control needs to see
    pub fn backend_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .properties()
            .flat_map(|p| p.read_ids())
            .map(str::to_string)
            .collect();
        if let Some(memory) = &self.mode_memory {
            ids.push(memory.mode_id().to_string());
        }
        ids.sort();
        ids.dedup();
        ids
    }

    /// Handle a directive; returns the applied value as a reported property.
    ///
    /// `snapshot` is the device's last reported state, passed for
    /// toggle-enabled devices only.
    pub async fn handle(
        &self,
        backend: &dyn StateBackend,
        directive: &Directive,
        snapshot: Option<&[ReportedProperty]>,
    ) -> Result<ReportedProperty, DirectiveError> {
        let Some((capability, property, enforced)) = self.find(directive) else {
            return Err(DirectiveError::NotSupportedByControl {
                control: self.name.clone(),
                interface: directive.namespace().to_string(),
                message_id: directive.header.message_id.clone(),
                payload_version: directive.header.payload_version.clone(),
            });
        };

        let applied = match (property.directive_kind(directive), property.adjust()) {
            (DirectiveKind::Adjust, Some(adjust)) => {
                self.adjust(backend, property, adjust, directive).await?
            }
            _ => self.set(backend, property, directive, snapshot).await?,
        };

        if enforced {
            debug!(
                control_id = %self.id,
                interface = %capability.interface(),
                "Directive absorbed by enforced capability"
            );
            return Err(DirectiveError::Enforced {
                control: self.name.clone(),
                interface: capability.interface().to_string(),
            });
        }

        Ok(
            ReportedProperty::new(capability.interface(), property.name(), property.report_value(applied))
                .with_instance(property.instance().map(str::to_string)),
        )
    }

    async fn set(
        &self,
        backend: &dyn StateBackend,
        property: &Property,
        directive: &Directive,
        snapshot: Option<&[ReportedProperty]>,
    ) -> Result<Value, DirectiveError> {
        let mut operand = property.directive_value(directive)?;

        if property.kind() == PropertyKind::PowerState && operand == ON {
            let already_on = snapshot
                .into_iter()
                .flatten()
                .any(|p| p.name == PropertyKind::PowerState.name() && p.value == ON);
            if already_on {
                debug!(control_id = %self.id, "Toggle: already on, switching off");
                operand = Value::from(vsh_conv::OFF);
            }
        }

        let mut value = property.value(&operand)?;
        if let (Some(memory), Conversion::ModePower { .. }) = (&self.mode_memory, property.conversion()) {
            if operand == ON {
                value = memory.restore();
            }
        }

        property.write(backend, &value).await?;
        property.set_current(value.clone());
        self.remember_mode(property.set_id(), &value);

        property.alexa_value(&value)
    }

    async fn adjust(
        &self,
        backend: &dyn StateBackend,
        property: &Property,
        adjust: &Adjust,
        directive: &Directive,
    ) -> Result<Value, DirectiveError> {
        let operand = property.directive_value(directive)?;
        let delta = as_number(&operand).ok_or_else(|| {
            DirectiveError::InvalidDirective(format!("{}: delta {operand} is not numeric", directive.name()))
        })?;
        let current = property.resolve_number(backend).await?;

        let target = match adjust {
            Adjust::Percent => clamp_percent(current + delta),
            Adjust::Bounded { min, max } => {
                let target = round_for_step(current + delta, 0.1);
                let target = min.map_or(target, |min| target.max(min));
                max.map_or(target, |max| target.min(max))
            }
            Adjust::ColorTemperatureSteps => {
                f64::from(color::step_color_temperature(current, delta > 0.0))
            }
        };
        let target = to_json_number(target);

        let value = property.value(&target)?;
        property.write(backend, &value).await?;
        property.set_current(value);
        Ok(target)
    }

    fn remember_mode(&self, id: &str, value: &Value) {
        if let Some(memory) = &self.mode_memory {
            if memory.mode_id() == id {
                memory.remember(value);
            }
        }
    }

    /// Report every supported property; unreadable ones are skipped
    pub async fn report_state(&self, backend: &dyn StateBackend) -> Vec<ReportedProperty> {
        let mut reported = Vec::new();
        for capability in self.supported.iter().filter(|c| c.is_retrievable()) {
            for property in capability.properties() {
                let value = match property.resolve_current(backend).await {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            control_id = %self.id,
                            property = property.name(),
                            id = %property.get_id(),
                            error = %e,
                            "Failed to read property"
                        );
                        continue;
                    }
                };
                self.remember_mode(property.get_id(), &value);
                match property.alexa_value(&value) {
                    Ok(protocol) => reported.push(
                        ReportedProperty::new(
                            capability.interface(),
                            property.name(),
                            property.report_value(protocol),
                        )
                        .with_instance(property.instance().map(str::to_string)),
                    ),
                    Err(e) => warn!(
                        control_id = %self.id,
                        property = property.name(),
                        id = %property.get_id(),
                        error = %e,
                        "Failed to convert property"
                    ),
                }
            }
        }
        reported
    }

    /// Apply an acknowledged backend value; true when a cached value changed
    pub fn observe(&self, id: &str, value: &Value) -> bool {
        let changed = self
            .properties()
            .fold(false, |changed, p| p.observe(id, value) || changed);
        self.remember_mode(id, value);
        changed
    }

    /// Discovery entries of the supported capabilities
    pub fn discovery_capabilities(&self) -> impl Iterator<Item = &Capability> {
        self.supported.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashMap;
    use vsh_core::{BackendError, BackendResult, ErrorType};

    /// Minimal backend recording writes
    #[derive(Default)]
    pub(crate) struct TestBackend {
        pub states: Mutex<HashMap<String, Value>>,
        pub writes: Mutex<Vec<(String, Value)>>,
        pub offline: bool,
    }

    impl TestBackend {
        pub fn with(states: &[(&str, Value)]) -> Self {
            Self {
                states: Mutex::new(
                    states
                        .iter()
                        .map(|(id, v)| (id.to_string(), v.clone()))
                        .collect(),
                ),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl StateBackend for TestBackend {
        async fn get_state(&self, id: &str) -> BackendResult<Option<Value>> {
            if self.offline {
                return Err(BackendError::Unreachable(id.to_string()));
            }
            Ok(self.states.lock().get(id).cloned())
        }

        async fn set_state(&self, id: &str, value: Value) -> BackendResult<()> {
            if self.offline {
                return Err(BackendError::Unreachable(id.to_string()));
            }
            self.writes.lock().push((id.to_string(), value.clone()));
            self.states.lock().insert(id.to_string(), value);
            Ok(())
        }
    }

    pub(crate) fn light(id: &str) -> ControlDescriptor {
        ControlDescriptor::new(id, "light")
            .with_name("Desk Lamp")
            .with_state(Role::Set, DataPoint::boolean(format!("{id}.on")))
            .with_state(Role::Actual, DataPoint::boolean(format!("{id}.on_actual")))
    }

    pub(crate) fn dimmer(id: &str) -> ControlDescriptor {
        ControlDescriptor::new(id, "dimmer").with_state(
            Role::Brightness,
            DataPoint::number(format!("{id}.level")).with_range(0.0, 100.0),
        )
    }

    fn control(desc: &ControlDescriptor) -> Control {
        Control::from_descriptor(desc, &ControlDefaults::default()).unwrap()
    }

    #[test]
    fn test_unknown_type_and_missing_role() {
        let defaults = ControlDefaults::default();
        let unknown = ControlDescriptor::new("x", "vacuumCleaner");
        assert_eq!(
            Control::from_descriptor(&unknown, &defaults).unwrap_err(),
            ControlError::UnknownType("vacuumCleaner".to_string())
        );

        let incomplete = ControlDescriptor::new("lamp", "light");
        assert!(matches!(
            Control::from_descriptor(&incomplete, &defaults),
            Err(ControlError::MissingRole { role: Role::Set, .. })
        ));
    }

    #[tokio::test]
    async fn test_unmatched_directive_names_control() {
        let backend = TestBackend::default();
        let lamp = control(&light("lamp"));
        let directive = Directive::new("Alexa.ColorController", "SetColor");
        let err = lamp.handle(&backend, &directive, None).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::InternalError);
        assert!(err.to_string().contains("Desk Lamp"));
        match err {
            DirectiveError::NotSupportedByControl {
                interface,
                message_id,
                payload_version,
                ..
            } => {
                assert_eq!(interface, "Alexa.ColorController");
                assert_eq!(message_id, directive.header.message_id);
                assert_eq!(payload_version, "3");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_writes_and_reports_applied_value() {
        let backend = TestBackend::default();
        let lamp = control(&light("lamp"));
        let on = Directive::new("Alexa.PowerController", "TurnOn");
        let reported = lamp.handle(&backend, &on, None).await.unwrap();
        assert_eq!(reported.namespace, "Alexa.PowerController");
        assert_eq!(reported.value, json!("ON"));
        assert_eq!(
            backend.writes.lock().clone(),
            vec![("lamp.on".to_string(), json!(true))]
        );
    }

    #[tokio::test]
    async fn test_toggle_flips_when_snapshot_is_on() {
        let backend = TestBackend::default();
        let lamp = control(&light("lamp"));
        let snapshot = vec![ReportedProperty::new(
            "Alexa.PowerController",
            "powerState",
            json!("ON"),
        )];
        let on = Directive::new("Alexa.PowerController", "TurnOn");
        let reported = lamp.handle(&backend, &on, Some(&snapshot)).await.unwrap();
        assert_eq!(reported.value, json!("OFF"));
        assert_eq!(backend.writes.lock()[0].1, json!(false));
    }

    #[tokio::test]
    async fn test_enforced_capability_writes_then_errors() {
        let backend = TestBackend::default();
        let lamp = control(&light("lamp"));
        let directive = Directive::new("Alexa.BrightnessController", "SetBrightness")
            .with_payload(json!({"brightness": 40}));
        let err = lamp.handle(&backend, &directive, None).await.unwrap_err();
        assert!(matches!(err, DirectiveError::Enforced { .. }));
        assert_eq!(err.error_type(), ErrorType::InternalError);
        assert_eq!(
            backend.writes.lock().clone(),
            vec![("lamp.on".to_string(), json!(true))]
        );
    }

    #[tokio::test]
    async fn test_adjust_is_clamped() {
        let backend = TestBackend::with(&[("dim.level", json!(90))]);
        let dim = control(&dimmer("dim"));

        let up = Directive::new("Alexa.BrightnessController", "AdjustBrightness")
            .with_payload(json!({"brightnessDelta": 25}));
        let reported = dim.handle(&backend, &up, None).await.unwrap();
        assert_eq!(reported.value, json!(100));

        for delta in [-250, -1, 0, 1, 250] {
            let d = Directive::new("Alexa.BrightnessController", "AdjustBrightness")
                .with_payload(json!({ "brightnessDelta": delta }));
            let value = dim.handle(&backend, &d, None).await.unwrap().value;
            let value = value.as_f64().unwrap();
            assert!((0.0..=100.0).contains(&value), "delta {delta} gave {value}");
        }
    }

    #[tokio::test]
    async fn test_adjust_fails_when_current_unreadable() {
        let backend = TestBackend::default();
        let dim = control(&dimmer("dim"));
        let up = Directive::new("Alexa.BrightnessController", "AdjustBrightness")
            .with_payload(json!({"brightnessDelta": 10}));
        let err = dim.handle(&backend, &up, None).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::EndpointUnreachable);
        assert!(backend.writes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_report_state_skips_unreadable_properties() {
        let backend = TestBackend::with(&[("lamp.on_actual", json!(true))]);
        let lamp = control(&light("lamp"));
        let reported = lamp.report_state(&backend).await;
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].value, json!("ON"));

        let offline = TestBackend {
            offline: true,
            ..Default::default()
        };
        assert!(control(&light("lamp")).report_state(&offline).await.is_empty());
    }

    #[tokio::test]
    async fn test_observe_ignores_same_value() {
        let lamp = control(&light("lamp"));
        assert!(lamp.observe("lamp.on_actual", &json!(true)));
        assert!(!lamp.observe("lamp.on_actual", &json!(true)));
        assert!(lamp.observe("lamp.on_actual", &json!(false)));
        assert!(lamp
            .properties()
            .all(|p| p.current() == Some(json!(false))));
        assert!(!lamp.observe("other.point", &json!(true)));
        assert_eq!(lamp.backend_ids(), vec!["lamp.on_actual".to_string()]);
    }
}
