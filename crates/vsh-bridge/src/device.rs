//! Device - one protocol endpoint backed by one or more controls

use std::collections::BTreeSet;

use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;
use vsh_conv::{as_number, OFF, ON};
use vsh_core::{Directive, DirectiveError, ReportedProperty, StateBackend};

use crate::control::Control;

/// A protocol-visible endpoint
#[derive(Debug)]
pub struct Device {
    id: String,
    friendly_name: String,
    controls: Vec<Control>,
    auto_detected: bool,
    toggle: bool,
    last_state: Mutex<Option<Vec<ReportedProperty>>>,
}

impl Device {
    pub fn new(id: impl Into<String>, friendly_name: impl Into<String>, controls: Vec<Control>) -> Self {
        Self {
            id: id.into(),
            friendly_name: friendly_name.into(),
            controls,
            auto_detected: false,
            toggle: false,
            last_state: Mutex::new(None),
        }
    }

    /// Mark as built by room/function grouping rather than declared explicitly
    pub fn auto_detected(mut self, auto_detected: bool) -> Self {
        self.auto_detected = auto_detected;
        self
    }

    /// Turn plain `TurnOn` into a toggle
    pub fn with_toggle(mut self, toggle: bool) -> Self {
        self.toggle = toggle;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn is_auto_detected(&self) -> bool {
        self.auto_detected
    }

    pub fn is_toggle(&self) -> bool {
        self.toggle
    }

    pub fn supports(&self, directive: &Directive) -> bool {
        self.controls.iter().any(|c| c.supports(directive))
    }

    /// Dispatch to every control concurrently.
    ///
    /// The first success in control order wins. Without a success, the first
    /// error of a control that supports the directive is returned, else the
    /// first error overall.
    pub async fn handle(
        &self,
        backend: &dyn StateBackend,
        directive: &Directive,
    ) -> Result<ReportedProperty, DirectiveError> {
        let snapshot = if self.toggle {
            Some(self.report_state(backend).await)
        } else {
            None
        };

        let outcomes = join_all(
            self.controls
                .iter()
                .map(|c| c.handle(backend, directive, snapshot.as_deref())),
        )
        .await;

        let mut first_error = None;
        let mut first_owned_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(reported) => return Ok(reported),
                Err(e) => {
                    if first_owned_error.is_none()
                        && !matches!(e, DirectiveError::NotSupportedByControl { .. })
                    {
                        first_owned_error = Some(e.clone());
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_owned_error
            .or(first_error)
            .unwrap_or_else(|| DirectiveError::NotSupportedByDevice {
                endpoint_id: self.id.clone(),
                interface: directive.namespace().to_string(),
            }))
    }

    /// Merged state of all controls
    pub async fn report_state(&self, backend: &dyn StateBackend) -> Vec<ReportedProperty> {
        let reports = join_all(self.controls.iter().map(|c| c.report_state(backend))).await;
        merge(reports.into_iter().flatten())
    }

    /// Apply an acknowledged backend value; true when any cached value changed
    pub fn observe(&self, id: &str, value: &Value) -> bool {
        self.controls
            .iter()
            .fold(false, |changed, c| c.observe(id, value) || changed)
    }

    /// Data points the device listens to
    pub fn backend_ids(&self) -> BTreeSet<String> {
        self.controls.iter().flat_map(|c| c.backend_ids()).collect()
    }

    /// Store `state` as the last emitted snapshot.
    ///
    /// Returns the previous snapshot, or `None` when `state` equals it.
    pub fn replace_last_state(
        &self,
        state: &[ReportedProperty],
    ) -> Option<Option<Vec<ReportedProperty>>> {
        let mut last = self.last_state.lock();
        if last.as_deref() == Some(state) {
            return None;
        }
        Some(last.replace(state.to_vec()))
    }

    /// Discovery entry of the endpoint
    pub fn discovery(&self, manufacturer_name: &str) -> Value {
        let categories: Vec<&str> = self
            .controls
            .iter()
            .map(|c| c.category())
            .fold(Vec::new(), |mut acc, category| {
                if !acc.contains(&category) {
                    acc.push(category);
                }
                acc
            });

        let mut seen = BTreeSet::new();
        let mut capabilities = vec![json!({
            "type": "AlexaInterface",
            "interface": "Alexa",
            "version": "3",
        })];
        for capability in self.controls.iter().flat_map(|c| c.discovery_capabilities()) {
            let key = (capability.interface(), capability.instance().map(str::to_string));
            if seen.insert(key) {
                capabilities.push(capability.discovery());
            } else {
                debug!(
                    endpoint_id = %self.id,
                    interface = %capability.interface(),
                    "Capability already announced by another control"
                );
            }
        }

        let control_ids: Vec<&str> = self.controls.iter().map(|c| c.id()).collect();
        json!({
            "endpointId": self.id,
            "manufacturerName": manufacturer_name,
            "friendlyName": self.friendly_name,
            "description": format!("{} via {}", self.friendly_name, manufacturer_name),
            "displayCategories": categories,
            "cookie": { "controls": control_ids.join(",") },
            "capabilities": capabilities,
        })
    }
}

/// Merge reports of several controls by (interface, instance, name).
///
/// ON beats OFF, booleans OR, numbers and temperature objects take the
/// maximum; anything else keeps the first value.
pub fn merge(properties: impl IntoIterator<Item = ReportedProperty>) -> Vec<ReportedProperty> {
    let mut merged: Vec<ReportedProperty> = Vec::new();
    for property in properties {
        match merged.iter_mut().find(|p| p.key() == property.key()) {
            Some(existing) => {
                if let Some(value) = combine(&existing.value, &property.value) {
                    existing.value = value;
                }
            }
            None => merged.push(property),
        }
    }
    merged
}

fn combine(a: &Value, b: &Value) -> Option<Value> {
    match (a, b) {
        (Value::String(x), Value::String(y)) if is_power(x) && is_power(y) => {
            Some(json!(if x == ON || y == ON { ON } else { OFF }))
        }
        (Value::Bool(x), Value::Bool(y)) => Some(Value::Bool(*x || *y)),
        (Value::Number(_), Value::Number(_)) => {
            let (x, y) = (as_number(a)?, as_number(b)?);
            Some(if y > x { b.clone() } else { a.clone() })
        }
        (Value::Object(x), Value::Object(y)) => {
            let (vx, vy) = (x.get("value").and_then(as_number)?, y.get("value").and_then(as_number)?);
            Some(if vy > vx { b.clone() } else { a.clone() })
        }
        _ => None,
    }
}

fn is_power(s: &str) -> bool {
    s == ON || s == OFF
}
