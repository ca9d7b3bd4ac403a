//! Capability - properties grouped under one versioned protocol interface

use serde_json::{json, Map, Value};
use vsh_core::Directive;

use crate::property::Property;

/// Protocol interfaces the bridge can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    PowerController,
    BrightnessController,
    ColorController,
    ColorTemperatureController,
    PercentageController,
    ThermostatController,
    TemperatureSensor,
    LockController,
    ModeController,
    Speaker,
    ContactSensor,
    MotionSensor,
}

impl CapabilityKind {
    /// Interface name on the wire
    pub fn interface(&self) -> &'static str {
        match self {
            CapabilityKind::PowerController => "Alexa.PowerController",
            CapabilityKind::BrightnessController => "Alexa.BrightnessController",
            CapabilityKind::ColorController => "Alexa.ColorController",
            CapabilityKind::ColorTemperatureController => "Alexa.ColorTemperatureController",
            CapabilityKind::PercentageController => "Alexa.PercentageController",
            CapabilityKind::ThermostatController => "Alexa.ThermostatController",
            CapabilityKind::TemperatureSensor => "Alexa.TemperatureSensor",
            CapabilityKind::LockController => "Alexa.LockController",
            CapabilityKind::ModeController => "Alexa.ModeController",
            CapabilityKind::Speaker => "Alexa.Speaker",
            CapabilityKind::ContactSensor => "Alexa.ContactSensor",
            CapabilityKind::MotionSensor => "Alexa.MotionSensor",
        }
    }

    pub fn version(&self) -> &'static str {
        "3"
    }
}

/// One protocol interface of a control
#[derive(Debug)]
pub struct Capability {
    kind: CapabilityKind,
    properties: Vec<Property>,
    proactively_reported: bool,
    retrievable: bool,
    instance: Option<String>,
    configuration: Option<Value>,
    semantics: Option<Value>,
    resources: Option<Value>,
}

impl Capability {
    pub fn new(kind: CapabilityKind, properties: Vec<Property>) -> Self {
        Self {
            kind,
            properties,
            proactively_reported: true,
            retrievable: true,
            instance: None,
            configuration: None,
            semantics: None,
            resources: None,
        }
    }

    /// Single-property capability
    pub fn single(kind: CapabilityKind, property: Property) -> Self {
        Self::new(kind, vec![property])
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
        self
    }

    pub fn with_semantics(mut self, semantics: Value) -> Self {
        self.semantics = Some(semantics);
        self
    }

    pub fn with_resources(mut self, resources: Value) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn interface(&self) -> &'static str {
        self.kind.interface()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn is_retrievable(&self) -> bool {
        self.retrievable
    }

    /// Property addressed by the directive, if the directive targets this interface
    pub fn find_property(&self, directive: &Directive) -> Option<&Property> {
        if directive.namespace() != self.interface() {
            return None;
        }
        self.properties.iter().find(|p| p.matches(directive))
    }

    /// Discovery entry for this capability
    pub fn discovery(&self) -> Value {
        let supported: Vec<Value> = self
            .properties
            .iter()
            .map(|p| json!({ "name": p.name() }))
            .collect();

        let mut entry = Map::new();
        entry.insert("type".to_string(), json!("AlexaInterface"));
        entry.insert("interface".to_string(), json!(self.interface()));
        entry.insert("version".to_string(), json!(self.kind.version()));
        if let Some(instance) = &self.instance {
            entry.insert("instance".to_string(), json!(instance));
        }
        entry.insert(
            "properties".to_string(),
            json!({
                "supported": supported,
                "proactivelyReported": self.proactively_reported,
                "retrievable": self.retrievable,
            }),
        );
        if let Some(resources) = &self.resources {
            entry.insert("capabilityResources".to_string(), resources.clone());
        }
        if let Some(configuration) = &self.configuration {
            entry.insert("configuration".to_string(), configuration.clone());
        }
        if let Some(semantics) = &self.semantics {
            entry.insert("semantics".to_string(), semantics.clone());
        }
        Value::Object(entry)
    }
}

/// Friendly-name resource built from catalog asset ids
pub fn asset_names(asset_ids: &[&str]) -> Value {
    let names: Vec<Value> = asset_ids
        .iter()
        .map(|id| json!({ "@type": "asset", "value": { "assetId": id } }))
        .collect();
    json!({ "friendlyNames": names })
}

/// Friendly-name resource built from plain text
pub fn text_names(texts: &[&str]) -> Value {
    let names: Vec<Value> = texts
        .iter()
        .map(|text| json!({ "@type": "text", "value": { "text": text, "locale": "en-US" } }))
        .collect();
    json!({ "friendlyNames": names })
}

/// One voice-actionable mode of a mode controller
#[derive(Debug, Clone)]
pub struct ModeSpec {
    /// Protocol mode value, e.g. `Position.Up`
    pub value: &'static str,
    /// Catalog asset naming the mode
    pub asset: &'static str,
    /// Semantic action mapped onto this mode (`Alexa.Actions.Open`)
    pub action: Option<&'static str>,
    /// Semantic state mapped onto this mode (`Alexa.States.Open`)
    pub state: Option<&'static str>,
}

/// Mode controller with friendly names and open/close semantics
pub fn mode_capability(
    instance: &str,
    setting_asset: &str,
    modes: &[ModeSpec],
    property: Property,
) -> Capability {
    let supported_modes: Vec<Value> = modes
        .iter()
        .map(|m| json!({ "value": m.value, "modeResources": asset_names(&[m.asset]) }))
        .collect();
    let action_mappings: Vec<Value> = modes
        .iter()
        .filter_map(|m| {
            m.action.map(|action| {
                json!({
                    "@type": "ActionsToDirective",
                    "actions": [action],
                    "directive": { "name": "SetMode", "payload": { "mode": m.value } },
                })
            })
        })
        .collect();
    let state_mappings: Vec<Value> = modes
        .iter()
        .filter_map(|m| {
            m.state.map(|state| {
                json!({ "@type": "StatesToValue", "states": [state], "value": m.value })
            })
        })
        .collect();

    Capability::single(CapabilityKind::ModeController, property)
        .with_instance(instance)
        .with_resources(asset_names(&[setting_asset]))
        .with_configuration(json!({ "ordered": false, "supportedModes": supported_modes }))
        .with_semantics(json!({
            "actionMappings": action_mappings,
            "stateMappings": state_mappings,
        }))
}
