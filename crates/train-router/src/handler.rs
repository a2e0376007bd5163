//! Handler trait and adapters

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use train_core::{Context, HandlerResult, Result};

/// Unit of application logic registered against one lifecycle phase
#[async_trait]
pub trait Handler<S, R>: Send + Sync {
    /// Run the handler against the request context
    async fn call(&self, ctx: &mut Context<S, R>) -> Result<HandlerResult>;
}

/// Shared handler reference
pub type BoxHandler<S, R> = Arc<dyn Handler<S, R>>;

/// Handler built from a closure returning a boxed future
#[derive(Clone)]
pub(crate) struct FnHandler<F>(pub(crate) F);

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHandler")
    }
}

/// Adapt a closure returning a boxed future into a [`Handler`]
///
/// Useful with [`crate::Router::on_handler`] when the same closure is registered on
/// several phases.
pub fn handler_fn<S, R, F>(f: F) -> impl Handler<S, R> + Clone
where
    S: Send + Sync + 'static,
    R: Send + 'static,
    F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
        + Clone
        + Send
        + Sync
        + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<S, R, F> Handler<S, R> for FnHandler<F>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
    F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
        + Send
        + Sync,
{
    async fn call(&self, ctx: &mut Context<S, R>) -> Result<HandlerResult> {
        (self.0)(ctx).await
    }
}
