//! Inbound directive envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level wrapper: `{"directive": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveEnvelope {
    pub directive: Directive,
}

/// A request naming an interface, an action and (optionally) a target endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directive {
    pub header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    #[serde(default)]
    pub payload: Value,
}

/// Directive/event header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Interface name, e.g. `Alexa.PowerController`
    pub namespace: String,
    /// Action name, e.g. `TurnOn`
    pub name: String,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
    #[serde(default = "default_payload_version")]
    pub payload_version: String,
    /// Capability instance for multi-instance interfaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

pub(crate) fn default_payload_version() -> String {
    "3".to_string()
}

/// Endpoint reference carried by directives and events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub endpoint_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<Value>,
}

/// Bearer scope of the directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "type")]
    pub scope_type: String,
    pub token: String,
}

impl Directive {
    /// Build a directive for the given interface and action (mostly for tests and tooling)
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            header: Header {
                namespace: namespace.into(),
                name: name.into(),
                message_id: uuid::Uuid::new_v4().to_string(),
                correlation_token: None,
                payload_version: default_payload_version(),
                instance: None,
            },
            endpoint: None,
            payload: Value::Object(serde_json::Map::new()),
        }
    }

    /// Target the directive at an endpoint
    pub fn with_endpoint(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint = Some(Endpoint {
            endpoint_id: endpoint_id.into(),
            scope: None,
            cookie: None,
        });
        self
    }

    /// Set the directive payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the capability instance
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.header.instance = Some(instance.into());
        self
    }

    /// Set the correlation token
    pub fn with_correlation_token(mut self, token: impl Into<String>) -> Self {
        self.header.correlation_token = Some(token.into());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.header.namespace
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Endpoint id targeted by this directive, if any
    pub fn endpoint_id(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.endpoint_id.as_str())
    }

    /// Look up a payload field
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}
