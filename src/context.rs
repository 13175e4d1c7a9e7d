//! Per-interaction context handed to handlers
//!
//! A `Context` binds one interaction to its response state machine and the
//! transport-specific delivery route. It is the only way a handler
//! communicates outcomes.

use crate::error::{InteractionError, Result};
use crate::response::{
    AckDelivery, InteractionResponse, ResponseKind, ResponseSender, ResponseState, ResponseTracker,
};
use crate::types::Interaction;
use std::sync::Arc;

/// Mutable per-interaction state, exclusively owned by one dispatch
///
/// Cheap to clone — handlers may move clones into spawned tasks that
/// deliver followups after the handler itself returns.
#[derive(Clone)]
pub struct Context {
    interaction: Arc<Interaction>,
    tracker: Arc<ResponseTracker>,
    sender: Arc<dyn ResponseSender>,
}

impl Context {
    pub(crate) fn new(
        interaction: Arc<Interaction>,
        tracker: Arc<ResponseTracker>,
        sender: Arc<dyn ResponseSender>,
    ) -> Self {
        Self {
            interaction,
            tracker,
            sender,
        }
    }

    /// The interaction being handled
    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// Current response state
    pub fn state(&self) -> ResponseState {
        self.tracker.state()
    }

    /// Acknowledge with an immediate final message
    ///
    /// Legal exactly once, before any other acknowledgement. The payload is
    /// opaque message formatting (content, embeds, components).
    pub async fn respond(&self, data: serde_json::Value) -> Result<()> {
        self.deliver_ack(InteractionResponse::message(data)).await
    }

    /// Acknowledge with a custom response envelope (e.g. a component
    /// message update)
    pub async fn respond_with(&self, response: InteractionResponse) -> Result<()> {
        self.deliver_ack(response).await
    }

    /// Acknowledge with a deferred placeholder — the platform shows a
    /// loading indicator until a followup arrives
    pub async fn defer(&self) -> Result<()> {
        self.deliver_ack(InteractionResponse::deferred()).await
    }

    /// Deferred acknowledgement for a component callback, without a loading
    /// indicator
    pub async fn defer_update(&self) -> Result<()> {
        self.deliver_ack(InteractionResponse::deferred_update()).await
    }

    /// Send a followup message
    ///
    /// Legal any number of times after acknowledgement; each call is one
    /// network delivery. Fails with a protocol-order error before the
    /// acknowledgement.
    pub async fn followup(&self, data: serde_json::Value) -> Result<()> {
        self.tracker.ensure_acknowledged(&self.interaction.id)?;

        self.sender
            .create_followup(&self.interaction.token, &data)
            .await?;

        tracing::debug!(
            interaction_id = %self.interaction.id,
            "Followup delivered"
        );
        Ok(())
    }

    /// Fault path: close the interaction while emitting one final error
    /// acknowledgement, if it is still pending
    ///
    /// Returns true when this call performed the close.
    pub(crate) async fn emit_error_ack(&self, data: serde_json::Value) -> bool {
        let Some(delivery) = self.tracker.close_with_ack() else {
            return false;
        };

        let response = InteractionResponse::message(data);
        match delivery {
            AckDelivery::Endpoint(tx) => {
                // Receiver gone means the webhook request already resolved
                tx.send(response).ok();
            }
            AckDelivery::Rest => {
                if let Err(e) = self
                    .sender
                    .create_response(&self.interaction.id, &self.interaction.token, &response)
                    .await
                {
                    tracing::warn!(
                        interaction_id = %self.interaction.id,
                        error = %e,
                        "Failed to deliver error acknowledgement"
                    );
                }
            }
        }
        true
    }

    async fn deliver_ack(&self, response: InteractionResponse) -> Result<()> {
        let next = match response.kind {
            ResponseKind::DeferredChannelMessage | ResponseKind::DeferredUpdate => {
                ResponseState::AcknowledgedDeferred
            }
            _ => ResponseState::AcknowledgedImmediate,
        };

        let delivery = self.tracker.begin_ack(next, &self.interaction.id)?;
        match delivery {
            AckDelivery::Endpoint(tx) => tx.send(response).map_err(|_| InteractionError::Send {
                interaction_id: self.interaction.id.clone(),
                reason: "webhook request no longer held".to_string(),
            })?,
            AckDelivery::Rest => {
                self.sender
                    .create_response(&self.interaction.id, &self.interaction.token, &response)
                    .await?
            }
        }

        tracing::debug!(
            interaction_id = %self.interaction.id,
            state = ?next,
            "Acknowledgement delivered"
        );
        Ok(())
    }
}
