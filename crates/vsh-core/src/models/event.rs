//! Outbound event envelope and its builders

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::directive::{default_payload_version, Directive, Endpoint, Header};
use crate::error::DirectiveError;

/// Top-level wrapper: `{"event": {...}, "context": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: Event,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

/// Event body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub header: Header,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Endpoint>,
    #[serde(default)]
    pub payload: Value,
}

/// Context carrying property states
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub properties: Vec<ContextProperty>,
}

/// One property state as sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextProperty {
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub name: String,
    pub value: Value,
    pub time_of_sample: DateTime<Utc>,
    pub uncertainty_in_milliseconds: u64,
}

/// A property state as reported by a control, before it is stamped for the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedProperty {
    /// Interface the property belongs to
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub name: String,
    pub value: Value,
}

impl ReportedProperty {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, value: Value) -> Self {
        Self {
            namespace: namespace.into(),
            instance: None,
            name: name.into(),
            value,
        }
    }

    pub fn with_instance(mut self, instance: Option<String>) -> Self {
        self.instance = instance;
        self
    }

    /// Identity of the property inside one endpoint
    pub fn key(&self) -> (&str, Option<&str>, &str) {
        (&self.namespace, self.instance.as_deref(), &self.name)
    }

    /// Stamp with the current time
    pub fn into_context(self, time_of_sample: DateTime<Utc>) -> ContextProperty {
        ContextProperty {
            namespace: self.namespace,
            instance: self.instance,
            name: self.name,
            value: self.value,
            time_of_sample,
            uncertainty_in_milliseconds: 0,
        }
    }
}

fn event_header(namespace: &str, name: &str, correlation_token: Option<String>) -> Header {
    Header {
        namespace: namespace.to_string(),
        name: name.to_string(),
        message_id: uuid::Uuid::new_v4().to_string(),
        correlation_token,
        payload_version: default_payload_version(),
        instance: None,
    }
}

fn context_of(properties: Vec<ReportedProperty>) -> Context {
    let now = Utc::now();
    Context {
        properties: properties
            .into_iter()
            .map(|p| p.into_context(now))
            .collect(),
    }
}

impl EventEnvelope {
    /// `Alexa/Response` to a successful control directive
    pub fn response(directive: &Directive, properties: Vec<ReportedProperty>) -> Self {
        Self {
            event: Event {
                header: event_header(
                    "Alexa",
                    "Response",
                    directive.header.correlation_token.clone(),
                ),
                endpoint: directive.endpoint.clone(),
                payload: json!({}),
            },
            context: Some(context_of(properties)),
        }
    }

    /// `Alexa/StateReport` answering a report-state directive
    pub fn state_report(directive: &Directive, properties: Vec<ReportedProperty>) -> Self {
        let mut envelope = Self::response(directive, properties);
        envelope.event.header.name = "StateReport".to_string();
        envelope
    }

    /// `Alexa/ErrorResponse` carrying the wire error type
    pub fn error(directive: &Directive, error: &DirectiveError) -> Self {
        Self {
            event: Event {
                header: event_header(
                    "Alexa",
                    "ErrorResponse",
                    directive.header.correlation_token.clone(),
                ),
                endpoint: directive.endpoint.clone(),
                payload: json!({
                    "type": error.error_type(),
                    "message": error.to_string(),
                }),
            },
            context: None,
        }
    }

    /// `Alexa.Discovery/Discover.Response`; never carries an endpoint
    pub fn discovery_response(directive: &Directive, endpoints: Vec<Value>) -> Self {
        Self {
            event: Event {
                header: event_header(
                    "Alexa.Discovery",
                    "Discover.Response",
                    directive.header.correlation_token.clone(),
                ),
                endpoint: None,
                payload: json!({ "endpoints": endpoints }),
            },
            context: None,
        }
    }

    /// `Alexa.Authorization/AcceptGrant.Response`; never carries an endpoint
    pub fn accept_grant_response(directive: &Directive) -> Self {
        Self {
            event: Event {
                header: event_header(
                    "Alexa.Authorization",
                    "AcceptGrant.Response",
                    directive.header.correlation_token.clone(),
                ),
                endpoint: None,
                payload: json!({}),
            },
            context: None,
        }
    }

    /// Proactive `Alexa/ChangeReport` for one endpoint
    ///
    /// `changed` lands in `payload.change.properties`, `unchanged` in the context.
    pub fn change_report(
        endpoint_id: &str,
        changed: Vec<ReportedProperty>,
        unchanged: Vec<ReportedProperty>,
    ) -> Self {
        let now = Utc::now();
        let changed: Vec<ContextProperty> =
            changed.into_iter().map(|p| p.into_context(now)).collect();
        Self {
            event: Event {
                header: event_header("Alexa", "ChangeReport", None),
                endpoint: Some(Endpoint {
                    endpoint_id: endpoint_id.to_string(),
                    scope: None,
                    cookie: None,
                }),
                payload: json!({
                    "change": {
                        "cause": { "type": "PHYSICAL_INTERACTION" },
                        "properties": changed,
                    }
                }),
            },
            context: Some(context_of(unchanged)),
        }
    }

    /// Error type of an `ErrorResponse`, if this is one
    pub fn error_type(&self) -> Option<&str> {
        if self.event.header.name != "ErrorResponse" {
            return None;
        }
        self.event.payload.get("type").and_then(Value::as_str)
    }

    /// Context properties (empty when the event has no context)
    pub fn properties(&self) -> &[ContextProperty] {
        self.context
            .as_ref()
            .map(|c| c.properties.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RateLimitError;
    use pretty_assertions::assert_eq;

    fn power_directive() -> Directive {
        Directive::new("Alexa.PowerController", "TurnOn")
            .with_endpoint("lamp")
            .with_correlation_token("corr-1")
    }

    #[test]
    fn test_response_echoes_endpoint_and_token() {
        let directive = power_directive();
        let envelope = EventEnvelope::response(
            &directive,
            vec![ReportedProperty::new(
                "Alexa.PowerController",
                "powerState",
                json!("ON"),
            )],
        );

        assert_eq!(envelope.event.header.namespace, "Alexa");
        assert_eq!(envelope.event.header.name, "Response");
        assert_eq!(
            envelope.event.header.correlation_token.as_deref(),
            Some("corr-1")
        );
        assert_eq!(envelope.event.endpoint.as_ref().unwrap().endpoint_id, "lamp");
        assert_eq!(envelope.properties().len(), 1);
        assert_eq!(envelope.properties()[0].value, json!("ON"));
        assert!(envelope.error_type().is_none());
    }

    #[test]
    fn test_error_payload_shape() {
        let directive = power_directive();
        let err: DirectiveError = RateLimitError::HourlyLimitExceeded {
            endpoint_id: "lamp".to_string(),
            limit: 60,
        }
        .into();
        let envelope = EventEnvelope::error(&directive, &err);

        assert_eq!(envelope.error_type(), Some("ENDPOINT_UNREACHABLE"));
        assert!(envelope.context.is_none());
        let wire = serde_json::to_value(&envelope).unwrap();
        assert_eq!(wire["event"]["endpoint"]["endpointId"], json!("lamp"));
    }

    #[test]
    fn test_discovery_has_no_endpoint() {
        let directive = Directive::new("Alexa.Discovery", "Discover");
        let envelope = EventEnvelope::discovery_response(&directive, vec![json!({"a": 1})]);
        let wire = serde_json::to_value(&envelope).unwrap();
        assert!(wire["event"].get("endpoint").is_none());
        assert_eq!(wire["event"]["payload"]["endpoints"], json!([{"a": 1}]));
    }

    #[test]
    fn test_context_property_wire_names() {
        let prop = ReportedProperty::new("Alexa.ModeController", "mode", json!("Position.Up"))
            .with_instance(Some("Blind.Position".to_string()))
            .into_context(Utc::now());
        let wire = serde_json::to_value(&prop).unwrap();
        assert_eq!(wire["instance"], json!("Blind.Position"));
        assert_eq!(wire["uncertaintyInMilliseconds"], json!(0));
        assert!(wire.get("timeOfSample").is_some());
    }

    #[test]
    fn test_change_report_splits_changed_and_unchanged() {
        let envelope = EventEnvelope::change_report(
            "lamp",
            vec![ReportedProperty::new("Alexa.PowerController", "powerState", json!("OFF"))],
            vec![ReportedProperty::new("Alexa.BrightnessController", "brightness", json!(40))],
        );
        assert_eq!(envelope.event.header.name, "ChangeReport");
        let changed = &envelope.event.payload["change"]["properties"];
        assert_eq!(changed[0]["name"], json!("powerState"));
        assert_eq!(envelope.properties()[0].name, "brightness");
    }
}
