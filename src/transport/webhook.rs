//! Webhook (pull) transport adapter
//!
//! One signed HTTP request per interaction. The adapter authenticates the
//! request, normalizes the body, answers pings directly, and otherwise
//! holds the request open until the response state machine produces the
//! acknowledgement — which becomes the HTTP response body.
//!
//! The HTTP listener itself is an external collaborator: wire
//! [`WebhookTransport::handle`] into whatever framework route serves the
//! platform's endpoint, passing the two signature headers and the raw
//! body bytes exactly as received.

use crate::auth::Authenticator;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::response::InteractionResponse;
use crate::types::{Interaction, Transport};
use bytes::Bytes;
use std::sync::Arc;

/// Framework-agnostic HTTP reply
#[derive(Debug, Clone)]
pub struct WebhookReply {
    /// HTTP status code
    pub status: u16,
    /// JSON response body
    pub body: serde_json::Value,
}

impl WebhookReply {
    fn ok(body: serde_json::Value) -> Self {
        Self { status: 200, body }
    }

    fn unauthorized() -> Self {
        Self {
            status: 401,
            body: serde_json::json!({"error": "invalid request signature"}),
        }
    }

    fn bad_request(detail: String) -> Self {
        Self {
            status: 400,
            body: serde_json::json!({"error": detail}),
        }
    }
}

/// Pull transport: signed HTTP webhook ingestion
pub struct WebhookTransport {
    authenticator: Authenticator,
    dispatcher: Arc<Dispatcher>,
}

impl WebhookTransport {
    /// Create the adapter from the application's hex-encoded public key
    pub fn new(public_key_hex: &str, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        Ok(Self {
            authenticator: Authenticator::new(public_key_hex)?,
            dispatcher,
        })
    }

    /// Process one inbound request
    ///
    /// `timestamp` and `signature` are the values of the
    /// `X-Signature-Timestamp` and `X-Signature-Ed25519` headers; either
    /// missing rejects the request before any verification work. `body`
    /// must be the raw bytes as received — re-serialized JSON breaks the
    /// signature.
    ///
    /// Resolves once the interaction is acknowledged (or the dispatch
    /// closes without acknowledgement, which yields the generic error
    /// acknowledgement so the platform gets a well-formed reply).
    pub async fn handle(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: Bytes,
    ) -> WebhookReply {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            tracing::warn!("Webhook request missing signature headers");
            return WebhookReply::unauthorized();
        };

        if let Err(e) = self.authenticator.verify(timestamp, &body, signature) {
            tracing::warn!(error = %e, "Webhook request failed signature verification");
            return WebhookReply::unauthorized();
        }

        let value: serde_json::Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => return WebhookReply::bad_request(format!("invalid JSON body: {}", e)),
        };
        let interaction = match Interaction::from_wire(value, Transport::Pull) {
            Ok(interaction) => interaction,
            Err(e) => return WebhookReply::bad_request(e.to_string()),
        };

        if interaction.is_ping() {
            tracing::debug!(interaction_id = %interaction.id, "Ping acknowledged");
            return WebhookReply::ok(ack_body(&InteractionResponse::pong()));
        }

        let error_ack = InteractionResponse::message(self.dispatcher.config().error_data());
        let receiver = self.dispatcher.dispatch_endpoint(interaction);

        match receiver.await {
            Ok(response) => WebhookReply::ok(ack_body(&response)),
            // Dispatch closed without acknowledging: unknown identity,
            // handler fault, or deadline lapse. The platform still needs
            // a well-formed reply on the held connection.
            Err(_) => WebhookReply::ok(ack_body(&error_ack)),
        }
    }
}

fn ack_body(response: &InteractionResponse) -> serde_json::Value {
    serde_json::to_value(response).expect("acknowledgement serializes")
}
