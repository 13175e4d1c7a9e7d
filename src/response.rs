//! Response protocol state machine
//!
//! The platform accepts exactly one acknowledgement per interaction, within
//! a short deadline, optionally followed by any number of followup
//! messages. `ResponseTracker` owns that state for one interaction and
//! rejects illegal transitions; actual network delivery is delegated to an
//! injected [`ResponseSender`].

use crate::error::{InteractionError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::{oneshot, Notify, RwLock};

/// Wire codes for acknowledgement types
///
/// The numeric values are platform-defined and appear verbatim in the
/// acknowledgement JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ResponseKind {
    /// Reply to a platform liveness check
    Pong = 1,
    /// Immediate final message
    ChannelMessage = 4,
    /// Deferred acknowledgement — platform shows a loading indicator
    DeferredChannelMessage = 5,
    /// Deferred acknowledgement for a component, no loading indicator
    DeferredUpdate = 6,
    /// Edit the message the component lives on
    UpdateMessage = 7,
}

impl From<ResponseKind> for u8 {
    fn from(kind: ResponseKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for ResponseKind {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(ResponseKind::Pong),
            4 => Ok(ResponseKind::ChannelMessage),
            5 => Ok(ResponseKind::DeferredChannelMessage),
            6 => Ok(ResponseKind::DeferredUpdate),
            7 => Ok(ResponseKind::UpdateMessage),
            other => Err(format!("unknown response type {}", other)),
        }
    }
}

/// One acknowledgement envelope
///
/// For the pull transport this becomes the HTTP response body; for the
/// push transport it is posted to the platform's response endpoint. The
/// `data` payload (message content, embeds, components) is opaque to the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResponse {
    /// Acknowledgement type code
    #[serde(rename = "type")]
    pub kind: ResponseKind,

    /// Opaque message payload, absent for pong and deferred types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl InteractionResponse {
    /// The fixed reply to a platform ping
    pub fn pong() -> Self {
        Self { kind: ResponseKind::Pong, data: None }
    }

    /// An immediate final message
    pub fn message(data: serde_json::Value) -> Self {
        Self { kind: ResponseKind::ChannelMessage, data: Some(data) }
    }

    /// A deferred acknowledgement ("received, full response forthcoming")
    pub fn deferred() -> Self {
        Self { kind: ResponseKind::DeferredChannelMessage, data: None }
    }

    /// A deferred acknowledgement for a component callback
    pub fn deferred_update() -> Self {
        Self { kind: ResponseKind::DeferredUpdate, data: None }
    }

    /// An edit of the message the triggering component belongs to
    pub fn update(data: serde_json::Value) -> Self {
        Self { kind: ResponseKind::UpdateMessage, data: Some(data) }
    }
}

/// Response lifecycle of one interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseState {
    /// No acknowledgement yet — the deadline clock is running
    Pending,
    /// Acknowledged with a final message
    AcknowledgedImmediate,
    /// Acknowledged with a deferred placeholder
    AcknowledgedDeferred,
    /// Terminal — deadline lapsed or the dispatch faulted before acknowledging
    Closed,
}

/// Where the single acknowledgement must be delivered
enum AckRoute {
    /// Pull transport: resolve the held HTTP request
    Endpoint(Option<oneshot::Sender<InteractionResponse>>),
    /// Push transport: one call to the platform's response endpoint
    Rest,
}

/// How a permitted acknowledgement gets delivered, handed to the caller
/// after the state transition committed
pub(crate) enum AckDelivery {
    /// Resolve the held webhook request with this sender
    Endpoint(oneshot::Sender<InteractionResponse>),
    /// Deliver through the [`ResponseSender`] collaborator
    Rest,
}

struct TrackerInner {
    state: ResponseState,
    route: AckRoute,
}

/// Per-interaction response state machine
///
/// The state transition and the claiming of the delivery route happen under
/// one lock, so a second acknowledgement attempt always observes the new
/// state — at-most-once delivery is structural, not best-effort. The lock
/// is never held across an await point.
pub struct ResponseTracker {
    inner: Mutex<TrackerInner>,
    acked: Notify,
}

impl ResponseTracker {
    /// Tracker for a pull-transport interaction; the returned receiver
    /// resolves when the acknowledgement is made (or errs if the dispatch
    /// closes without one)
    pub(crate) fn endpoint() -> (Self, oneshot::Receiver<InteractionResponse>) {
        let (tx, rx) = oneshot::channel();
        let tracker = Self {
            inner: Mutex::new(TrackerInner {
                state: ResponseState::Pending,
                route: AckRoute::Endpoint(Some(tx)),
            }),
            acked: Notify::new(),
        };
        (tracker, rx)
    }

    /// Tracker for a push-transport interaction
    pub(crate) fn rest() -> Self {
        Self {
            inner: Mutex::new(TrackerInner {
                state: ResponseState::Pending,
                route: AckRoute::Rest,
            }),
            acked: Notify::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> ResponseState {
        self.lock().state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attempt the single acknowledgement transition
    ///
    /// `next` must be one of the acknowledged states. Fails with
    /// `AlreadyAcknowledged` from any state but `Pending`.
    pub(crate) fn begin_ack(
        &self,
        next: ResponseState,
        interaction_id: &str,
    ) -> Result<AckDelivery> {
        debug_assert!(matches!(
            next,
            ResponseState::AcknowledgedImmediate | ResponseState::AcknowledgedDeferred
        ));

        let delivery = {
            let mut inner = self.lock();
            if inner.state != ResponseState::Pending {
                return Err(InteractionError::AlreadyAcknowledged(
                    interaction_id.to_string(),
                ));
            }
            inner.state = next;
            match &mut inner.route {
                AckRoute::Endpoint(tx) => AckDelivery::Endpoint(
                    tx.take().expect("endpoint route claimed exactly once"),
                ),
                AckRoute::Rest => AckDelivery::Rest,
            }
        };

        self.acked.notify_one();
        Ok(delivery)
    }

    /// Check that a followup is legal in the current state
    pub(crate) fn ensure_acknowledged(&self, interaction_id: &str) -> Result<()> {
        match self.state() {
            ResponseState::AcknowledgedImmediate | ResponseState::AcknowledgedDeferred => Ok(()),
            ResponseState::Pending => Err(InteractionError::ProtocolOrder(format!(
                "followup before acknowledgement on interaction '{}'",
                interaction_id
            ))),
            ResponseState::Closed => Err(InteractionError::ProtocolOrder(format!(
                "followup on closed interaction '{}'",
                interaction_id
            ))),
        }
    }

    /// Deadline path: force `Pending → Closed`
    ///
    /// Returns true if this call performed the transition. An unresolved
    /// endpoint route is dropped, which unblocks a held webhook request.
    pub(crate) fn force_close(&self) -> bool {
        let closed = {
            let mut inner = self.lock();
            if inner.state != ResponseState::Pending {
                return false;
            }
            inner.state = ResponseState::Closed;
            if let AckRoute::Endpoint(tx) = &mut inner.route {
                tx.take();
            }
            true
        };
        self.acked.notify_one();
        closed
    }

    /// Fault path: `Pending → Closed` while emitting one final error
    /// acknowledgement through the route
    ///
    /// Returns the delivery route if this call performed the transition,
    /// `None` when the interaction was already acknowledged or closed.
    pub(crate) fn close_with_ack(&self) -> Option<AckDelivery> {
        let delivery = {
            let mut inner = self.lock();
            if inner.state != ResponseState::Pending {
                return None;
            }
            inner.state = ResponseState::Closed;
            match &mut inner.route {
                AckRoute::Endpoint(tx) => AckDelivery::Endpoint(
                    tx.take().expect("endpoint route claimed exactly once"),
                ),
                AckRoute::Rest => AckDelivery::Rest,
            }
        };
        self.acked.notify_one();
        Some(delivery)
    }

    /// Resolves once the state leaves `Pending` — cancels the deadline
    /// watchdog the instant an acknowledgement happens
    pub(crate) async fn acknowledged(&self) {
        self.acked.notified().await;
    }
}

/// Outbound delivery collaborator — the REST client that actually talks to
/// the platform
///
/// The engine decides *what* to send and *whether* a send is legal; the
/// sender owns transmission. Failed followup delivery is surfaced to the
/// caller and not retried by the engine.
#[async_trait]
pub trait ResponseSender: Send + Sync {
    /// Deliver the initial acknowledgement for a push-transport interaction
    async fn create_response(
        &self,
        interaction_id: &str,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<()>;

    /// Deliver a followup message after acknowledgement
    async fn create_followup(&self, token: &str, data: &serde_json::Value) -> Result<()>;
}

/// A recorded acknowledgement delivery
#[derive(Debug, Clone)]
pub struct SentResponse {
    /// Interaction the acknowledgement belongs to
    pub interaction_id: String,
    /// Response credential used
    pub token: String,
    /// The acknowledgement envelope
    pub response: InteractionResponse,
}

/// A recorded followup delivery
#[derive(Debug, Clone)]
pub struct SentFollowup {
    /// Response credential used
    pub token: String,
    /// Followup payload
    pub data: serde_json::Value,
}

/// In-memory sender for development and testing
///
/// Records every delivery instead of performing network calls.
#[derive(Default)]
pub struct MemorySender {
    responses: RwLock<Vec<SentResponse>>,
    followups: RwLock<Vec<SentFollowup>>,
}

impl MemorySender {
    /// All recorded acknowledgements, in delivery order
    pub async fn responses(&self) -> Vec<SentResponse> {
        self.responses.read().await.clone()
    }

    /// All recorded followups, in delivery order
    pub async fn followups(&self) -> Vec<SentFollowup> {
        self.followups.read().await.clone()
    }
}

#[async_trait]
impl ResponseSender for MemorySender {
    async fn create_response(
        &self,
        interaction_id: &str,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<()> {
        self.responses.write().await.push(SentResponse {
            interaction_id: interaction_id.to_string(),
            token: token.to_string(),
            response: response.clone(),
        });
        Ok(())
    }

    async fn create_followup(&self, token: &str, data: &serde_json::Value) -> Result<()> {
        self.followups.write().await.push(SentFollowup {
            token: token.to_string(),
            data: data.clone(),
        });
        Ok(())
    }
}
