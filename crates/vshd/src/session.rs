//! Line-delimited JSON session over an async reader
//!
//! Each inbound line is one of
//!
//! - `{"directive": {...}}` - a protocol directive, answered with one event
//! - `{"state": {"id": "...", "val": ..., "ack": true}}` - a backend change
//! - `{"collect": {}}` - re-run endpoint collection
//!
//! Outbound events (responses and change reports) are sent to `out`.

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vsh_bridge::DeviceManager;
use vsh_core::{Directive, EventEnvelope, StateChange};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Inbound {
    Directive(Directive),
    State(StateChange),
    Collect {},
}

/// Handle one line; returns the direct answer to a directive, if any.
///
/// Change reports caused by a state line are broadcast by the manager.
pub async fn handle_line(
    manager: &DeviceManager,
    line: &str,
) -> anyhow::Result<Option<EventEnvelope>> {
    match serde_json::from_str::<Inbound>(line)? {
        Inbound::Directive(directive) => {
            debug!(
                namespace = %directive.namespace(),
                name = %directive.name(),
                "Directive received"
            );
            Ok(Some(manager.handle_directive(&directive).await))
        }
        Inbound::State(change) => {
            manager.handle_backend_change(&change).await;
            Ok(None)
        }
        Inbound::Collect {} => {
            manager.collect_endpoints().await?;
            info!(endpoints = manager.endpoints().len(), "Endpoints re-collected");
            Ok(None)
        }
    }
}

/// Serve lines until the reader is exhausted or `out` is closed
pub async fn serve<R>(
    manager: Arc<DeviceManager>,
    reader: R,
    out: mpsc::UnboundedSender<EventEnvelope>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match handle_line(&manager, line).await {
            Ok(Some(event)) => {
                if out.send(event).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Rejected input line"),
        }
    }
    debug!("Input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use vsh_bridge::BridgeConfig;
    use vsh_core::{ControlDescriptor, DataPoint, Role};
    use vsh_memory::{MemoryBackend, MemoryBackendConfig};

    async fn manager() -> Arc<DeviceManager> {
        let config = MemoryBackendConfig {
            controls: vec![ControlDescriptor::new("plug", "socket")
                .with_state(Role::Set, DataPoint::boolean("plug.on"))],
            ..Default::default()
        };
        let backend = Arc::new(MemoryBackend::new(&config));
        let manager = DeviceManager::new(backend, BridgeConfig::default()).unwrap();
        manager.collect_endpoints().await.unwrap();
        Arc::new(manager)
    }

    #[tokio::test]
    async fn test_directive_line_is_answered() {
        let manager = manager().await;
        let line = json!({
            "directive": {
                "header": {
                    "namespace": "Alexa.PowerController",
                    "name": "TurnOn",
                    "messageId": "m-1",
                    "correlationToken": "c-1",
                    "payloadVersion": "3"
                },
                "endpoint": {"endpointId": "plug"},
                "payload": {}
            }
        })
        .to_string();

        let event = handle_line(&manager, &line).await.unwrap().unwrap();
        assert_eq!(event.event.header.name, "Response");
        assert_eq!(event.properties()[0].value, json!("ON"));
    }

    #[tokio::test]
    async fn test_state_line_emits_change_report() {
        let manager = manager().await;
        let mut changes = manager.subscribe_changes();
        let line = r#"{"state": {"id": "plug.on", "val": true, "ack": true}}"#;
        assert!(handle_line(&manager, line).await.unwrap().is_none());
        assert_eq!(changes.try_recv().unwrap().event.header.name, "ChangeReport");
    }

    #[tokio::test]
    async fn test_serve_skips_bad_lines() {
        let manager = manager().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let input = concat!(
            "not json\n",
            "\n",
            r#"{"collect": {}}"#,
            "\n",
            r#"{"directive": {"header": {"namespace": "Alexa.Discovery", "name": "Discover", "messageId": "m", "payloadVersion": "3"}, "payload": {}}}"#,
            "\n",
        );

        serve(manager, input.as_bytes(), tx).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event.header.name, "Discover.Response");
        assert!(rx.recv().await.is_none());
    }
}
