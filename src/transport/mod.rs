//! Transport adapters — normalize inbound events and drive dispatch
//!
//! Two delivery paths exist for the same canonical interaction: discrete
//! signed HTTP requests (webhook, pull) and an already-authenticated
//! persistent connection (gateway, push). Both funnel into one
//! [`Dispatcher`](crate::dispatch::Dispatcher); running both against the
//! same application at once is an unsupported configuration.

pub mod gateway;
pub mod webhook;

pub use gateway::GatewayTransport;
pub use webhook::{WebhookReply, WebhookTransport};
