//! # interaction-engine
//!
//! Interaction routing and time-boxed response management for chat
//! platform applications.
//!
//! ## Overview
//!
//! `interaction-engine` receives externally-triggered interaction events
//! (slash commands, context menus, component callbacks) over either of the
//! platform's two transports, resolves each to exactly one registered
//! handler, and enforces the platform's response protocol: one
//! acknowledgement within a short deadline, then any number of followups.
//!
//! ## Quick Start
//!
//! ```rust
//! use interaction_engine::{
//!     handler_fn, CommandMetadata, Dispatcher, GatewayTransport, MemorySender, Registry,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> interaction_engine::Result<()> {
//! // Declare handlers before any transport starts
//! let mut registry = Registry::new();
//! registry.register_command(
//!     "ping",
//!     CommandMetadata::new("Measure latency"),
//!     handler_fn(|ctx| async move {
//!         ctx.respond(serde_json::json!({"content": "pong!"})).await
//!     }),
//! )?;
//!
//! // The sender is the REST client that talks to the platform
//! let sender = Arc::new(MemorySender::default());
//! let dispatcher = Arc::new(Dispatcher::new(Arc::new(registry), sender));
//!
//! // Wire the push transport into the connection client
//! let gateway = GatewayTransport::new(dispatcher);
//! # let _ = gateway;
//! # Ok(())
//! # }
//! ```
//!
//! ## Transports
//!
//! - **webhook** — Signed HTTP requests, verified per-request with the
//!   application's Ed25519 public key; the acknowledgement is the HTTP
//!   response body
//! - **gateway** — Already-authenticated persistent connection; the
//!   acknowledgement is a network call through the injected sender
//!
//! ## Architecture
//!
//! - **Registry** — declared identities mapped to handlers; read-only once
//!   transports start
//! - **Dispatcher** — resolves interactions, spawns one task per dispatch,
//!   absorbs handler faults
//! - **ResponseTracker** — per-interaction state machine enforcing the
//!   acknowledge/defer/followup contract and its deadline
//! - **InteractionHandler** — the application seam; outcomes flow through
//!   `Context` operations only

pub mod auth;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod registry;
pub mod report;
pub mod response;
pub mod transport;
pub mod types;

// Re-export core types
pub use auth::{Authenticator, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use config::DispatchConfig;
pub use context::Context;
pub use dispatch::Dispatcher;
pub use error::{InteractionError, Result};
pub use handler::{handler_fn, InteractionHandler};
pub use registry::{CommandMetadata, HandlerEntry, Registry};
pub use report::{FaultKind, FaultReport, FaultReporter, MemoryReporter, TracingReporter};
pub use response::{
    InteractionResponse, MemorySender, ResponseKind, ResponseSender, ResponseState, SentFollowup,
    SentResponse,
};
pub use types::{Interaction, InteractionKind, MenuTarget, TargetIdentity, Transport};

// Re-export transports for convenience
pub use transport::{GatewayTransport, WebhookReply, WebhookTransport};
