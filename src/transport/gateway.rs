//! Gateway (push) transport adapter
//!
//! Interactions arrive over a long-lived connection whose client has
//! already authenticated the session — the adapter trusts its input.
//! There is no held request to satisfy, so acknowledgements travel as
//! network calls through the injected response sender instead of an HTTP
//! response body; the response protocol contract is otherwise identical.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::types::{Interaction, Transport};
use futures::Stream;
use std::sync::Arc;
use tokio_stream::StreamExt;

/// Push transport: persistent-connection ingestion
///
/// Register [`receive`](GatewayTransport::receive) as the connection
/// client's interaction-create callback, or hand an event stream to
/// [`run`](GatewayTransport::run).
pub struct GatewayTransport {
    dispatcher: Arc<Dispatcher>,
}

impl GatewayTransport {
    /// Create the adapter
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Accept one pushed interaction event
    ///
    /// Converts the event to the canonical form and dispatches it; returns
    /// immediately, the handler runs on its own task. Pings have no
    /// meaning on this transport and are ignored.
    pub fn receive(&self, event: serde_json::Value) -> Result<()> {
        let interaction = Interaction::from_wire(event, Transport::Push)?;

        if interaction.is_ping() {
            tracing::debug!(interaction_id = %interaction.id, "Ignoring ping on push transport");
            return Ok(());
        }

        self.dispatcher.dispatch(interaction);
        Ok(())
    }

    /// Drive a stream of pushed events until it ends
    ///
    /// Malformed events are logged and skipped — one bad payload must not
    /// stop the feed.
    pub async fn run<S>(&self, mut events: S)
    where
        S: Stream<Item = serde_json::Value> + Unpin,
    {
        tracing::info!("Gateway transport running");
        while let Some(event) = events.next().await {
            if let Err(e) = self.receive(event) {
                tracing::warn!(error = %e, "Dropped malformed gateway event");
            }
        }
        tracing::info!("Gateway event stream ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::registry::{CommandMetadata, Registry};
    use crate::response::MemorySender;
    use std::time::Duration;

    fn fixture() -> (GatewayTransport, Arc<MemorySender>) {
        let mut registry = Registry::new();
        registry
            .register_command(
                "greet",
                CommandMetadata::new("greet"),
                handler_fn(|ctx| async move {
                    ctx.respond(serde_json::json!({"content": "hi"})).await
                }),
            )
            .unwrap();

        let sender = Arc::new(MemorySender::default());
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), sender.clone()));
        (GatewayTransport::new(dispatcher), sender)
    }

    fn command_event(id: &str, name: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": 2,
            "token": format!("tok-{}", id),
            "data": {"name": name, "type": 1}
        })
    }

    async fn wait_for_responses(sender: &MemorySender, count: usize) {
        for _ in 0..200 {
            if sender.responses().await.len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {} responses", count);
    }

    #[tokio::test]
    async fn test_receive_dispatches_via_sender() {
        let (transport, sender) = fixture();

        transport.receive(command_event("int-1", "greet")).unwrap();
        wait_for_responses(&sender, 1).await;

        let responses = sender.responses().await;
        assert_eq!(responses[0].interaction_id, "int-1");
        assert_eq!(responses[0].token, "tok-int-1");
    }

    #[tokio::test]
    async fn test_ping_ignored() {
        let (transport, sender) = fixture();

        transport
            .receive(serde_json::json!({"id": "p-1", "type": 1, "token": "tok"}))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(sender.responses().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_event_rejected() {
        let (transport, _) = fixture();
        assert!(transport.receive(serde_json::json!({"id": "x"})).is_err());
    }

    #[tokio::test]
    async fn test_run_consumes_stream() {
        let (transport, sender) = fixture();

        let events = tokio_stream::iter(vec![
            command_event("int-2", "greet"),
            serde_json::json!({"bad": true}),
            command_event("int-3", "greet"),
        ]);
        transport.run(events).await;

        wait_for_responses(&sender, 2).await;
        let ids: Vec<String> = sender
            .responses()
            .await
            .into_iter()
            .map(|r| r.interaction_id)
            .collect();
        assert!(ids.contains(&"int-2".to_string()));
        assert!(ids.contains(&"int-3".to_string()));
    }
}
