//! Method and path guarded handlers

use crate::handler::{BoxHandler, Handler};
use crate::matcher::PathMatcher;
use async_trait::async_trait;
use http::Method;
use std::fmt;
use train_core::{Context, HandlerResult, Result};

/// `onHandle` handler that only runs when method and path match
pub(crate) struct Route<S, R> {
    method: Option<Method>,
    matcher: PathMatcher,
    inner: BoxHandler<S, R>,
}

impl<S, R> Route<S, R> {
    pub(crate) fn new(method: Option<Method>, matcher: PathMatcher, inner: BoxHandler<S, R>) -> Self {
        Self {
            method,
            matcher,
            inner,
        }
    }

    fn method_matches(&self, method: &Method) -> bool {
        match &self.method {
            None => true,
            Some(expected) => expected == method || (*expected == Method::GET && *method == Method::HEAD),
        }
    }
}

impl<S, R> fmt::Debug for Route<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.matcher.pattern())
            .finish()
    }
}

#[async_trait]
impl<S, R> Handler<S, R> for Route<S, R>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    async fn call(&self, ctx: &mut Context<S, R>) -> Result<HandlerResult> {
        if !self.method_matches(ctx.req.method()) {
            return Ok(HandlerResult::Absent);
        }

        let Some(params) = self.matcher.matches(ctx.req.path()) else {
            return Ok(HandlerResult::Absent);
        };

        tracing::trace!(
            method = %ctx.req.method(),
            pattern = %self.matcher.pattern(),
            "Route matched"
        );

        ctx.req.set_params(params);
        self.inner.call(ctx).await
    }
}
