//! Lifecycle pipeline
//!
//! Drives one [`Context`] through every phase exactly once:
//!
//! `onRequest → preParsing → (body init) → preHandling → onHandle → postHandling →
//! (response preparation) → preSending → (transmission) → postSending`
//!
//! Only `onHandle` is guarded. Errors there become responses and the pipeline moves on;
//! errors from any other phase or implicit step are returned to the caller untouched.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use train_core::{
    Context, Error, HandlerResult, LifecyclePhase, ResponseBody, ResponseState, Result,
    StatusCode,
};
use train_router::HookRegistry;

/// Body sent for any error that is not a client error
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error!";

/// What the `onHandle` result does to the response
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Nothing answered the request: 404
    NotFound,
    /// Leave the response as handlers left it
    Keep,
    /// Replace the body with a returned value
    Replace(ResponseBody),
}

/// Decide what an `onHandle` result means for the response
///
/// Absent result with no body is the only not-found trigger. A pass-through, or an absent
/// result after a handler set the body directly, keeps the response. A concrete value always
/// wins over a previously set body.
pub fn resolve(result: HandlerResult, body_is_set: bool) -> Resolution {
    match result {
        HandlerResult::Absent if !body_is_set => Resolution::NotFound,
        HandlerResult::Absent | HandlerResult::PassThrough => Resolution::Keep,
        HandlerResult::Value(body) => Resolution::Replace(body),
    }
}

/// Apply a [`Resolution`] to the response of a request
pub fn apply_resolution(
    res: &mut ResponseState,
    resolution: Resolution,
    method: &http::Method,
    uri: &http::Uri,
) {
    match resolution {
        Resolution::NotFound => {
            res.set_body(format!("Requested route {method} {uri} not found!"))
                .set_status(StatusCode::NOT_FOUND);
        }
        Resolution::Keep => {}
        Resolution::Replace(body) => {
            res.set_body(body);
        }
    }
}

/// How the guarded `onHandle` phase ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Handlers finished and the result was resolved
    Completed,
    /// A client error was turned into a response with its own status
    ClientError(StatusCode),
    /// Any other error or a panic was turned into a 500
    InternalError,
}

/// Run one unguarded phase; its result is ignored
pub async fn run_hook<S, R>(
    registry: &dyn HookRegistry<S, R>,
    ctx: &mut Context<S, R>,
    phase: LifecyclePhase,
) -> Result<()> {
    tracing::trace!(phase = %phase, request_id = %ctx.req.id(), "Running phase");
    registry.run_phase(ctx, phase).await?;
    Ok(())
}

/// Run `onHandle` inside the error boundary and resolve its result
pub async fn run_handle<S, R>(
    registry: &dyn HookRegistry<S, R>,
    ctx: &mut Context<S, R>,
) -> HandleOutcome {
    tracing::trace!(phase = %LifecyclePhase::OnHandle, request_id = %ctx.req.id(), "Running phase");

    let outcome = AssertUnwindSafe(registry.run_phase(ctx, LifecyclePhase::OnHandle))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(Error::Internal(format!(
                "Handler panicked: {}",
                panic_message(panic.as_ref())
            )))
        });

    match outcome {
        Ok(result) => {
            let resolution = resolve(result, ctx.res.body_is_set());
            if resolution == Resolution::NotFound {
                tracing::debug!(
                    method = %ctx.req.method(),
                    path = %ctx.req.path(),
                    "No route matched"
                );
            }
            let (method, uri) = (ctx.req.method().clone(), ctx.req.uri().clone());
            apply_resolution(&mut ctx.res, resolution, &method, &uri);
            HandleOutcome::Completed
        }
        Err(Error::Client { status, message }) => {
            tracing::debug!(
                status = status.as_u16(),
                message = %message,
                request_id = %ctx.req.id(),
                "Client error"
            );
            ctx.res.set_body(message).set_status(status);
            HandleOutcome::ClientError(status)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                method = %ctx.req.method(),
                path = %ctx.req.path(),
                request_id = %ctx.req.id(),
                "Request handler error"
            );
            ctx.res
                .set_body(INTERNAL_ERROR_MESSAGE)
                .set_status(StatusCode::INTERNAL_SERVER_ERROR);
            HandleOutcome::InternalError
        }
    }
}

/// Drive a context through the whole lifecycle
pub async fn drive<S, R>(
    registry: &dyn HookRegistry<S, R>,
    ctx: &mut Context<S, R>,
) -> Result<HandleOutcome> {
    run_hook(registry, ctx, LifecyclePhase::OnRequest).await?;
    run_hook(registry, ctx, LifecyclePhase::PreParsing).await?;
    ctx.init().await?;
    run_hook(registry, ctx, LifecyclePhase::PreHandling).await?;
    let outcome = run_handle(registry, ctx).await;
    run_hook(registry, ctx, LifecyclePhase::PostHandling).await?;
    ctx.prepare_response().await?;
    run_hook(registry, ctx, LifecyclePhase::PreSending).await?;
    ctx.respond()?;
    run_hook(registry, ctx, LifecyclePhase::PostSending).await?;
    Ok(outcome)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
