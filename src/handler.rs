//! Handler trait — the seam between the engine and application code
//!
//! A handler produces no return value of its own; every outcome flows
//! through [`Context`](crate::context::Context) operations. Returning an
//! error counts as an uncaught fault and is absorbed at the dispatcher
//! boundary.

use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// An application handler for one command, menu, or component identity
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    /// Handle one interaction
    ///
    /// The context is owned — handlers may clone it into spawned work for
    /// later followups. The acknowledgement deadline keeps running while
    /// this executes; handlers doing slow work should `defer()` promptly
    /// and deliver the result as a followup.
    async fn handle(&self, ctx: Context) -> Result<()>;
}

/// Wrap an async function or closure into a registrable handler
///
/// The function-pointer equivalent of the decorator registration style the
/// platform SDKs use:
///
/// ```rust
/// use interaction_engine::handler_fn;
///
/// let handler = handler_fn(|ctx| async move {
///     ctx.respond(serde_json::json!({"content": "pong!"})).await
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn InteractionHandler>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> InteractionHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: Context) -> Result<()> {
        (self.0)(ctx).await
    }
}
