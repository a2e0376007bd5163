//! # Train Router
//!
//! Registry of lifecycle hooks for the Train web framework:
//! - Ordered handler lists per lifecycle phase
//! - Path-pattern routes (`/users/:id`, `/static/*filepath`) on the `onHandle` phase
//! - Method-based routing
//!
//! The pipeline only sees the [`HookRegistry`] trait; [`Router`] is the default registry.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod handler;
pub mod matcher;
mod route;

pub use handler::{handler_fn, BoxHandler, Handler};
pub use matcher::PathMatcher;

use async_trait::async_trait;
use futures::future::BoxFuture;
use handler::FnHandler;
use http::Method;
use route::Route;
use std::fmt;
use std::sync::Arc;
use train_core::{Context, HandlerResult, LifecyclePhase, Result};

/// Runs every handler registered for a phase against a context
#[async_trait]
pub trait HookRegistry<S, R>: Send + Sync {
    /// Run all handlers of `phase`, returning the phase's combined result
    async fn run_phase(&self, ctx: &mut Context<S, R>, phase: LifecyclePhase)
        -> Result<HandlerResult>;
}

/// Default hook registry
///
/// Handlers of a phase run one after another in registration order. A handler returning
/// [`HandlerResult::Value`] ends the phase with that value. [`HandlerResult::PassThrough`]
/// is remembered while the remaining handlers still run, and [`HandlerResult::Absent`]
/// simply moves on. The first error ends the phase.
pub struct Router<S, R> {
    hooks: [Vec<BoxHandler<S, R>>; LifecyclePhase::COUNT],
}

impl<S, R> Router<S, R>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    /// Create an empty router
    pub fn new() -> Self {
        Self {
            hooks: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Register a closure on a phase
    pub fn on<F>(&mut self, phase: LifecyclePhase, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.on_handler(phase, FnHandler(f))
    }

    /// Register a [`Handler`] implementation on a phase
    pub fn on_handler(&mut self, phase: LifecyclePhase, handler: impl Handler<S, R> + 'static) -> &mut Self {
        self.hooks[phase.index()].push(Arc::new(handler));
        tracing::debug!(phase = %phase, "Hook registered");
        self
    }

    /// Register an `onHandle` route; `None` matches every method
    pub fn route<F>(&mut self, method: Option<Method>, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        let matcher = PathMatcher::new(pattern)?;
        tracing::debug!(method = ?method, pattern = %pattern, "Route added to router");
        let route = Route::new(method, matcher, Arc::new(FnHandler(f)));
        Ok(self.on_handler(LifecyclePhase::OnHandle, route))
    }

    /// Register a GET route (also answers HEAD)
    pub fn get<F>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.route(Some(Method::GET), pattern, f)
    }

    /// Register a POST route
    pub fn post<F>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.route(Some(Method::POST), pattern, f)
    }

    /// Register a PUT route
    pub fn put<F>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.route(Some(Method::PUT), pattern, f)
    }

    /// Register a PATCH route
    pub fn patch<F>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.route(Some(Method::PATCH), pattern, f)
    }

    /// Register a DELETE route
    pub fn delete<F>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.route(Some(Method::DELETE), pattern, f)
    }

    /// Register a route for every method
    pub fn all<F>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: for<'a> Fn(&'a mut Context<S, R>) -> BoxFuture<'a, Result<HandlerResult>>
            + Send
            + Sync
            + 'static,
    {
        self.route(None, pattern, f)
    }

    /// Number of handlers registered on a phase
    pub fn hook_count(&self, phase: LifecyclePhase) -> usize {
        self.hooks[phase.index()].len()
    }
}

impl<S, R> Default for Router<S, R>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, R> fmt::Debug for Router<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Router");
        for phase in LifecyclePhase::ALL {
            dbg.field(phase.as_str(), &self.hooks[phase.index()].len());
        }
        dbg.finish()
    }
}

#[async_trait]
impl<S, R> HookRegistry<S, R> for Router<S, R>
where
    S: Send + Sync + 'static,
    R: Send + 'static,
{
    async fn run_phase(
        &self,
        ctx: &mut Context<S, R>,
        phase: LifecyclePhase,
    ) -> Result<HandlerResult> {
        let mut outcome = HandlerResult::Absent;

        for handler in &self.hooks[phase.index()] {
            match handler.call(ctx).await? {
                HandlerResult::Value(body) => return Ok(HandlerResult::Value(body)),
                HandlerResult::PassThrough => outcome = HandlerResult::PassThrough,
                HandlerResult::Absent => {}
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Uri};
    use train_core::{
        AppHandle, CookieOptions, Error, MemoryCookieStorage, RequestFacade, ResponseBody,
        Transmitter,
    };

    type Trail = Vec<&'static str>;

    fn context(method: Method, uri: &'static str) -> Context<(), Trail> {
        let app = Arc::new(AppHandle::new(
            (),
            "train.ticket",
            CookieOptions::default(),
            Arc::new(MemoryCookieStorage::new()),
        ));
        let req = RequestFacade::new(method, Uri::from_static(uri), HeaderMap::new(), Bytes::new());
        let (tx, _rx) = Transmitter::channel();
        Context::new(req, app, tx)
    }

    #[tokio::test]
    async fn test_empty_phase_is_absent() {
        let router: Router<(), Trail> = Router::new();
        let mut ctx = context(Method::GET, "/");
        let result = router.run_phase(&mut ctx, LifecyclePhase::OnHandle).await.unwrap();
        assert!(result.is_absent());
    }

    #[tokio::test]
    async fn test_value_stops_phase() {
        let mut router: Router<(), Trail> = Router::new();
        router
            .on(LifecyclePhase::OnHandle, |ctx| {
                Box::pin(async move {
                    ctx.data_mut().push("first");
                    Ok(HandlerResult::PassThrough)
                })
            })
            .on(LifecyclePhase::OnHandle, |ctx| {
                Box::pin(async move {
                    ctx.data_mut().push("second");
                    Ok(HandlerResult::value("done"))
                })
            })
            .on(LifecyclePhase::OnHandle, |ctx| {
                Box::pin(async move {
                    ctx.data_mut().push("third");
                    Ok(HandlerResult::Absent)
                })
            });

        let mut ctx = context(Method::GET, "/");
        let result = router.run_phase(&mut ctx, LifecyclePhase::OnHandle).await.unwrap();
        assert_eq!(result, HandlerResult::Value(ResponseBody::Text("done".to_string())));
        assert_eq!(ctx.data(), &vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_pass_through_survives_later_absent() {
        let mut router: Router<(), Trail> = Router::new();
        router
            .on(LifecyclePhase::PreHandling, |_ctx| {
                Box::pin(async move { Ok(HandlerResult::PassThrough) })
            })
            .on(LifecyclePhase::PreHandling, |ctx| {
                Box::pin(async move {
                    ctx.data_mut().push("ran");
                    Ok(HandlerResult::Absent)
                })
            });

        let mut ctx = context(Method::GET, "/");
        let result = router.run_phase(&mut ctx, LifecyclePhase::PreHandling).await.unwrap();
        assert!(result.is_pass_through());
        assert_eq!(ctx.data(), &vec!["ran"]);
        assert_eq!(router.hook_count(LifecyclePhase::PreHandling), 2);
        assert_eq!(router.hook_count(LifecyclePhase::OnHandle), 0);
    }

    #[tokio::test]
    async fn test_error_stops_phase() {
        let mut router: Router<(), Trail> = Router::new();
        router
            .on(LifecyclePhase::OnRequest, |_ctx| {
                Box::pin(async move { Err(Error::forbidden("nope")) })
            })
            .on(LifecyclePhase::OnRequest, |ctx| {
                Box::pin(async move {
                    ctx.data_mut().push("unreachable");
                    Ok(HandlerResult::Absent)
                })
            });

        let mut ctx = context(Method::GET, "/");
        let err = router.run_phase(&mut ctx, LifecyclePhase::OnRequest).await.unwrap_err();
        assert!(err.is_client());
        assert!(ctx.data().is_empty());
    }

    #[tokio::test]
    async fn test_routes_match_method_and_path() {
        let mut router: Router<(), Trail> = Router::new();
        router
            .get("/users/:id", |ctx| {
                Box::pin(async move {
                    let id = ctx.req.param("id").unwrap_or_default().to_string();
                    Ok(HandlerResult::value(format!("user {id}")))
                })
            })
            .unwrap()
            .post("/users", |_ctx| {
                Box::pin(async move { Ok(HandlerResult::value("created")) })
            })
            .unwrap();

        let mut ctx = context(Method::GET, "/users/7?verbose=1");
        let result = router.run_phase(&mut ctx, LifecyclePhase::OnHandle).await.unwrap();
        assert_eq!(result, HandlerResult::value("user 7"));

        let mut ctx = context(Method::HEAD, "/users/7");
        let result = router.run_phase(&mut ctx, LifecyclePhase::OnHandle).await.unwrap();
        assert!(result.is_value());

        let mut ctx = context(Method::DELETE, "/users/7");
        let result = router.run_phase(&mut ctx, LifecyclePhase::OnHandle).await.unwrap();
        assert!(result.is_absent());

        let mut ctx = context(Method::POST, "/users");
        let result = router.run_phase(&mut ctx, LifecyclePhase::OnHandle).await.unwrap();
        assert_eq!(result, HandlerResult::value("created"));
    }

    #[tokio::test]
    async fn test_shared_handler_on_several_phases() {
        let mut router: Router<(), Trail> = Router::new();
        let mark = handler_fn::<(), Trail, _>(|ctx| {
            Box::pin(async move {
                ctx.data_mut().push("mark");
                Ok(HandlerResult::Absent)
            })
        });
        router
            .on_handler(LifecyclePhase::OnRequest, mark.clone())
            .on_handler(LifecyclePhase::PostSending, mark);

        let mut ctx = context(Method::GET, "/");
        router.run_phase(&mut ctx, LifecyclePhase::OnRequest).await.unwrap();
        router.run_phase(&mut ctx, LifecyclePhase::PostSending).await.unwrap();
        assert_eq!(ctx.data(), &vec!["mark", "mark"]);
    }

    #[test]
    fn test_invalid_route_pattern() {
        let mut router: Router<(), Trail> = Router::new();
        let result = router.all("no-slash", |_ctx| Box::pin(async move { Ok(HandlerResult::Absent) }));
        assert!(result.is_err());
    }
}
