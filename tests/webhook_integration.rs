//! Webhook (pull) transport integration tests
//!
//! End-to-end tests driving signed HTTP requests through the full
//! pipeline: authentication, ping short-circuit, held-request
//! acknowledgement, and the failure replies.

use bytes::Bytes;
use ed25519_dalek::{Signer, SigningKey};
use interaction_engine::{
    handler_fn, CommandMetadata, DispatchConfig, Dispatcher, FaultKind, InteractionError,
    MemoryReporter, MemorySender, Registry, WebhookTransport,
};
use std::sync::Arc;
use std::time::Duration;

struct App {
    transport: WebhookTransport,
    signing: SigningKey,
    sender: Arc<MemorySender>,
    reporter: Arc<MemoryReporter>,
}

fn app(registry: Registry) -> App {
    app_with_deadline(registry, Duration::from_secs(3))
}

fn app_with_deadline(registry: Registry, deadline: Duration) -> App {
    let signing = SigningKey::generate(&mut rand::thread_rng());
    let public_key = hex::encode(signing.verifying_key().to_bytes());

    let sender = Arc::new(MemorySender::default());
    let reporter = Arc::new(MemoryReporter::default());
    let dispatcher = Arc::new(
        Dispatcher::new(Arc::new(registry), sender.clone())
            .with_reporter(reporter.clone())
            .with_config(DispatchConfig {
                ack_deadline: deadline,
                ..DispatchConfig::default()
            }),
    );

    App {
        transport: WebhookTransport::new(&public_key, dispatcher).unwrap(),
        signing,
        sender,
        reporter,
    }
}

impl App {
    fn sign(&self, timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(self.signing.sign(&message).to_bytes())
    }

    async fn post(&self, body: serde_json::Value) -> interaction_engine::WebhookReply {
        let raw = serde_json::to_vec(&body).unwrap();
        let timestamp = "1700000000";
        let signature = self.sign(timestamp, &raw);
        self.transport
            .handle(Some(timestamp), Some(&signature), Bytes::from(raw))
            .await
    }
}

fn echo_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_command(
            "echo",
            CommandMetadata::new("Echo text back"),
            handler_fn(|ctx| async move {
                let text = ctx.interaction().option("text").cloned().unwrap_or_default();
                ctx.respond(serde_json::json!({"content": text})).await
            }),
        )
        .unwrap();
    registry
}

// ─── Authentication ──────────────────────────────────────────────

#[tokio::test]
async fn test_unsigned_request_rejected() {
    let app = app(Registry::new());
    let body = Bytes::from_static(br#"{"id": "1", "type": 1}"#);

    let reply = app.transport.handle(None, None, body).await;
    assert_eq!(reply.status, 401);
}

#[tokio::test]
async fn test_single_bit_body_mutation_rejected() {
    let app = app(Registry::new());

    let raw = serde_json::to_vec(&serde_json::json!({"id": "1", "type": 1, "token": "t"})).unwrap();
    let signature = app.sign("1700000000", &raw);

    // Untampered request passes
    let reply = app
        .transport
        .handle(Some("1700000000"), Some(&signature), Bytes::from(raw.clone()))
        .await;
    assert_eq!(reply.status, 200);

    // Flip one bit in the body
    let mut tampered = raw;
    tampered[0] ^= 0x01;
    let reply = app
        .transport
        .handle(Some("1700000000"), Some(&signature), Bytes::from(tampered))
        .await;
    assert_eq!(reply.status, 401);
}

#[tokio::test]
async fn test_foreign_key_rejected() {
    let app = app(Registry::new());
    let other = SigningKey::generate(&mut rand::thread_rng());

    let raw = serde_json::to_vec(&serde_json::json!({"id": "1", "type": 1})).unwrap();
    let mut message = b"1700000000".to_vec();
    message.extend_from_slice(&raw);
    let signature = hex::encode(other.sign(&message).to_bytes());

    let reply = app
        .transport
        .handle(Some("1700000000"), Some(&signature), Bytes::from(raw))
        .await;
    assert_eq!(reply.status, 401);
}

// ─── Ping ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ping_yields_pong_without_handlers() {
    let mut registry = Registry::new();
    // A registered handler that must never run for a ping
    registry
        .register_command(
            "anything",
            CommandMetadata::new("must not run"),
            handler_fn(|_ctx| async move { panic!("ping must bypass dispatch") }),
        )
        .unwrap();
    let app = app(registry);

    let reply = app
        .post(serde_json::json!({"id": "ping-1", "type": 1, "token": "t"}))
        .await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, serde_json::json!({"type": 1}));
    assert!(app.sender.responses().await.is_empty());
}

// ─── Held-request acknowledgement ────────────────────────────────

#[tokio::test]
async fn test_command_acknowledgement_is_http_body() {
    let app = app(echo_registry());

    let reply = app
        .post(serde_json::json!({
            "id": "int-1",
            "type": 2,
            "token": "tok",
            "data": {
                "name": "echo",
                "type": 1,
                "options": [{"name": "text", "type": 3, "value": "over http"}]
            }
        }))
        .await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["type"], 4);
    assert_eq!(reply.body["data"]["content"], "over http");
    // Pull acknowledgements never go through the REST sender
    assert!(app.sender.responses().await.is_empty());
}

#[tokio::test]
async fn test_defer_over_http_then_followup_via_sender() {
    let mut registry = Registry::new();
    registry
        .register_command(
            "slow",
            CommandMetadata::new("Defer then follow up"),
            handler_fn(|ctx| async move {
                ctx.defer().await?;
                ctx.followup(serde_json::json!({"content": "finished"})).await
            }),
        )
        .unwrap();
    let app = app(registry);

    let reply = app
        .post(serde_json::json!({
            "id": "int-2",
            "type": 2,
            "token": "tok-slow",
            "data": {"name": "slow", "type": 1}
        }))
        .await;

    // The held request resolves with the deferred marker
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["type"], 5);

    // The followup goes out as a network call with the interaction token
    for _ in 0..200 {
        if !app.sender.followups().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let followups = app.sender.followups().await;
    assert_eq!(followups.len(), 1);
    assert_eq!(followups[0].token, "tok-slow");
    assert_eq!(followups[0].data["content"], "finished");
}

// ─── Failure replies ─────────────────────────────────────────────

#[tokio::test]
async fn test_handler_fault_resolves_request_with_error_ack() {
    let mut registry = Registry::new();
    registry
        .register_command(
            "broken",
            CommandMetadata::new("always fails"),
            handler_fn(|_ctx| async move {
                Err(InteractionError::Handler {
                    kind: "command",
                    identity: "broken".to_string(),
                    reason: "boom".to_string(),
                })
            }),
        )
        .unwrap();
    let app = app(registry);

    let reply = app
        .post(serde_json::json!({
            "id": "int-3",
            "type": 2,
            "token": "tok",
            "data": {"name": "broken", "type": 1}
        }))
        .await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["type"], 4);
    assert_eq!(reply.body["data"]["flags"], 64);

    for _ in 0..200 {
        if app.reporter.count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(app.reporter.list(1).await[0].kind, FaultKind::HandlerFault);
}

#[tokio::test]
async fn test_deadline_lapse_resolves_request_and_reports() {
    let mut registry = Registry::new();
    registry
        .register_command(
            "sleepy",
            CommandMetadata::new("never acknowledges"),
            handler_fn(|_ctx| async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }),
        )
        .unwrap();
    let app = app_with_deadline(registry, Duration::from_millis(50));

    let reply = app
        .post(serde_json::json!({
            "id": "int-4",
            "type": 2,
            "token": "tok",
            "data": {"name": "sleepy", "type": 1}
        }))
        .await;

    // The held request still gets a well-formed reply
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["type"], 4);

    for _ in 0..200 {
        if app.reporter.count().await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let reports = app.reporter.list(10).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].kind, FaultKind::AcknowledgementTimeout);
    assert_eq!(reports[0].interaction_id, "int-4");
}

#[tokio::test]
async fn test_unknown_command_resolves_request_without_dispatch() {
    let app = app(Registry::new());

    let reply = app
        .post(serde_json::json!({
            "id": "int-5",
            "type": 2,
            "token": "tok",
            "data": {"name": "missing", "type": 1}
        }))
        .await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body["type"], 4);
    // Unknown interactions are discarded, not reported as faults
    assert_eq!(app.reporter.count().await, 0);
}
