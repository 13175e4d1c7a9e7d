//! Error types for interaction-engine

use thiserror::Error;

/// Errors that can occur in the interaction engine
#[derive(Debug, Error)]
pub enum InteractionError {
    /// Request signature missing, malformed, or failed verification (webhook transport)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No handler registered for the inbound interaction
    #[error("No handler registered for {kind} '{identity}'")]
    UnknownInteraction {
        kind: &'static str,
        identity: String,
    },

    /// Registration-time conflict — an identical identity pattern already exists
    #[error("Duplicate {kind} handler for '{pattern}'")]
    DuplicateHandler {
        kind: &'static str,
        pattern: String,
    },

    /// Followup attempted before the interaction was acknowledged
    #[error("Protocol order violation: {0}")]
    ProtocolOrder(String),

    /// A second acknowledgement attempted — the platform accepts exactly one
    #[error("Interaction '{0}' was already acknowledged")]
    AlreadyAcknowledged(String),

    /// Acknowledgement deadline elapsed while the interaction was still pending
    #[error("Interaction '{0}' was not acknowledged before the deadline")]
    AcknowledgementTimeout(String),

    /// Uncaught fault inside an application handler
    #[error("Handler failed for {kind} '{identity}': {reason}")]
    Handler {
        kind: &'static str,
        identity: String,
        reason: String,
    },

    /// Inbound payload could not be parsed into an interaction
    #[error("Malformed interaction payload: {0}")]
    Payload(String),

    /// Outbound delivery through the response sender failed
    #[error("Failed to send response for interaction '{interaction_id}': {reason}")]
    Send {
        interaction_id: String,
        reason: String,
    },

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for interaction operations
pub type Result<T> = std::result::Result<T, InteractionError>;
