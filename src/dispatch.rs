//! Dispatcher — resolve interactions to handlers and run them
//!
//! One logical task per interaction, plus a deadline watchdog that
//! force-closes anything still unacknowledged when the platform's budget
//! runs out. Handler faults are absorbed here; nothing a handler does can
//! crash the engine or disturb another in-flight interaction.

use crate::config::DispatchConfig;
use crate::context::Context;
use crate::error::InteractionError;
use crate::handler::InteractionHandler;
use crate::registry::Registry;
use crate::report::{FaultKind, FaultReport, FaultReporter, TracingReporter};
use crate::response::{InteractionResponse, ResponseSender, ResponseTracker};
use crate::types::Interaction;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;

/// The dispatch engine
///
/// Holds the read-only registry and the injected collaborators. Cheap to
/// share behind an `Arc`; both transports dispatch through one instance.
pub struct Dispatcher {
    registry: Arc<Registry>,
    sender: Arc<dyn ResponseSender>,
    reporter: Arc<dyn FaultReporter>,
    config: DispatchConfig,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration and log-only
    /// fault reporting
    pub fn new(registry: Arc<Registry>, sender: Arc<dyn ResponseSender>) -> Self {
        Self {
            registry,
            sender,
            reporter: Arc::new(TracingReporter),
            config: DispatchConfig::default(),
        }
    }

    /// Replace the fault reporting channel
    pub fn with_reporter(mut self, reporter: Arc<dyn FaultReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the dispatch configuration
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// The active configuration
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The registry this dispatcher resolves against
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Dispatch a push-transport interaction
    ///
    /// The acknowledgement and all followups go out through the response
    /// sender. Returns immediately; the handler runs on its own task.
    pub fn dispatch(&self, interaction: Interaction) {
        let Some(entry) = self.registry.lookup(&interaction.identity) else {
            self.discard_unknown(&interaction);
            return;
        };
        let handler = entry.handler();
        self.spawn_dispatch(interaction, handler, Arc::new(ResponseTracker::rest()));
    }

    /// Dispatch a pull-transport interaction
    ///
    /// The returned receiver resolves with the acknowledgement once the
    /// handler makes one; it errs if the dispatch closes without
    /// acknowledging (unknown identity, handler fault after the route was
    /// claimed, or deadline lapse).
    pub(crate) fn dispatch_endpoint(
        &self,
        interaction: Interaction,
    ) -> oneshot::Receiver<InteractionResponse> {
        let (tracker, receiver) = ResponseTracker::endpoint();

        match self.registry.lookup(&interaction.identity) {
            Some(entry) => {
                let handler = entry.handler();
                self.spawn_dispatch(interaction, handler, Arc::new(tracker));
            }
            None => {
                // Dropping the tracker drops the route; the held request
                // resolves without an acknowledgement.
                self.discard_unknown(&interaction);
            }
        }

        receiver
    }

    fn discard_unknown(&self, interaction: &Interaction) {
        let err = InteractionError::UnknownInteraction {
            kind: interaction.kind.label(),
            identity: interaction.identity.to_string(),
        };
        tracing::warn!(
            interaction_id = %interaction.id,
            error = %err,
            "Interaction discarded"
        );
    }

    fn spawn_dispatch(
        &self,
        interaction: Interaction,
        handler: Arc<dyn InteractionHandler>,
        tracker: Arc<ResponseTracker>,
    ) {
        let interaction = Arc::new(interaction);
        let ctx = Context::new(interaction.clone(), tracker.clone(), self.sender.clone());

        self.spawn_watchdog(interaction.clone(), tracker);

        let reporter = self.reporter.clone();
        let error_data = self.config.error_data();
        tokio::spawn(async move {
            tracing::debug!(
                interaction_id = %interaction.id,
                kind = interaction.kind.label(),
                identity = %interaction.identity,
                transport = %interaction.transport,
                "Dispatching interaction"
            );

            // Both error returns and panics are faults; neither may escape
            // this boundary.
            let fault = match AssertUnwindSafe(handler.handle(ctx.clone()))
                .catch_unwind()
                .await
            {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(panic) => Some(panic_message(panic)),
            };

            if let Some(reason) = fault {
                ctx.emit_error_ack(error_data).await;

                let report = FaultReport::new(
                    &interaction.id,
                    interaction.identity.clone(),
                    FaultKind::HandlerFault,
                    reason,
                );
                if let Err(e) = reporter.report(report).await {
                    tracing::warn!(error = %e, "Fault reporter failed");
                }
            }
        });
    }

    /// Watchdog: force-close the interaction if it is still pending when
    /// the deadline fires. Cancelled the instant an acknowledgement (or a
    /// fault close) happens.
    fn spawn_watchdog(&self, interaction: Arc<Interaction>, tracker: Arc<ResponseTracker>) {
        let deadline = self.config.ack_deadline;
        let reporter = self.reporter.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    if tracker.force_close() {
                        let err = InteractionError::AcknowledgementTimeout(interaction.id.clone());
                        let report = FaultReport::new(
                            &interaction.id,
                            interaction.identity.clone(),
                            FaultKind::AcknowledgementTimeout,
                            err.to_string(),
                        );
                        if let Err(e) = reporter.report(report).await {
                            tracing::warn!(error = %e, "Fault reporter failed");
                        }
                    }
                }
                _ = tracker.acknowledged() => {}
            }
        });
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", message)
    } else {
        "handler panicked".to_string()
    }
}
