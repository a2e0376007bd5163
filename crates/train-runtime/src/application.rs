//! Application: options, shared data and hooks

use crate::pipeline::{self, HandleOutcome};
use crate::server::Server;
use crate::shutdown::SignalHandler;
use std::fmt;
use std::sync::Arc;
use train_config::AppOptions;
use train_core::{
    AppHandle, Context, CookieStorage, MemoryCookieStorage, RequestFacade, Result, Transmitter,
};
use train_router::Router;

/// A Train application
///
/// `S` is data shared by every request, `R` is per-request data created with `R::default()`.
pub struct Application<S, R> {
    options: AppOptions,
    router: Router<S, R>,
    handle: Arc<AppHandle<S>>,
}

impl<S, R> Application<S, R>
where
    S: Send + Sync + 'static,
    R: Default + Send + 'static,
{
    /// Create an application with in-memory cookie storage
    pub fn new(options: AppOptions, data: S) -> Self {
        Self::with_cookie_storage(options, data, Arc::new(MemoryCookieStorage::new()))
    }

    /// Create an application with a custom cookie storage backend
    pub fn with_cookie_storage(
        options: AppOptions,
        data: S,
        cookie_storage: Arc<dyn CookieStorage>,
    ) -> Self {
        let handle = Arc::new(AppHandle::new(
            data,
            options.cookie_key.clone(),
            options.cookie_options.clone(),
            cookie_storage,
        ));

        Self {
            options,
            router: Router::new(),
            handle,
        }
    }

    /// Application options
    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Application data
    pub fn data(&self) -> &S {
        self.handle.data()
    }

    /// Session storage backend
    pub fn cookie_storage(&self) -> &Arc<dyn CookieStorage> {
        self.handle.cookie_storage()
    }

    /// Registered hooks
    pub fn router(&self) -> &Router<S, R> {
        &self.router
    }

    /// Register hooks and routes
    pub fn router_mut(&mut self) -> &mut Router<S, R> {
        &mut self.router
    }

    /// Run one request through the whole lifecycle
    ///
    /// Errors raised by `onHandle` handlers are turned into responses. Errors from any other
    /// phase are returned; if they happen before transmission nothing is sent through
    /// `transmitter`.
    pub async fn handle_request(
        &self,
        request: RequestFacade,
        transmitter: Transmitter,
    ) -> Result<HandleOutcome> {
        let mut ctx: Context<S, R> = Context::new(request, Arc::clone(&self.handle), transmitter);
        pipeline::drive(&self.router, &mut ctx).await
    }

    /// Serve the application until SIGINT/SIGTERM
    pub async fn run(self) -> Result<()> {
        let server = Server::new(Arc::new(self));
        tokio::spawn(SignalHandler::new(server.shutdown_signal()).run());
        server.run().await
    }
}

impl<S, R> fmt::Debug for Application<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("options", &self.options)
            .field("router", &self.router)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode, Uri};
    use http_body_util::BodyExt;
    use tracing_test::traced_test;
    use train_core::{Error, HandlerResult, LifecyclePhase};

    fn app() -> Application<(), ()> {
        Application::new(AppOptions::new("127.0.0.1"), ())
    }

    fn get(uri: &'static str) -> RequestFacade {
        RequestFacade::new(Method::GET, Uri::from_static(uri), HeaderMap::new(), Bytes::new())
    }

    async fn body_text(response: http::Response<train_core::Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_internal_error_is_logged_not_leaked() {
        let mut app = app();
        app.router_mut().on(LifecyclePhase::OnHandle, |_ctx| {
            Box::pin(async move {
                Err(Error::Handler(anyhow::anyhow!("connection string postgres://secret")))
            })
        });

        let (tx, rx) = Transmitter::channel();
        let outcome = app.handle_request(get("/"), tx).await.unwrap();
        assert_eq!(outcome, HandleOutcome::InternalError);

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert_eq!(body, pipeline::INTERNAL_ERROR_MESSAGE);
        assert!(!body.contains("secret"));

        assert!(logs_contain("postgres://secret"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_client_error_skips_internal_path() {
        let mut app = app();
        app.router_mut().on(LifecyclePhase::OnHandle, |_ctx| {
            Box::pin(async move { Err(Error::forbidden("forbidden")) })
        });

        let (tx, rx) = Transmitter::channel();
        let outcome = app.handle_request(get("/"), tx).await.unwrap();
        assert_eq!(outcome, HandleOutcome::ClientError(StatusCode::FORBIDDEN));

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, "forbidden");
        assert!(!logs_contain("Request handler error"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_panicking_handler_is_contained() {
        let mut app = app();
        app.router_mut()
            .on(LifecyclePhase::OnHandle, |_ctx| {
                Box::pin(async move {
                    if true {
                        panic!("handler blew up");
                    }
                    Ok(HandlerResult::Absent)
                })
            })
            .on(LifecyclePhase::PostHandling, |ctx| {
                Box::pin(async move {
                    ctx.res.set_header(
                        http::header::HeaderName::from_static("x-post-handling"),
                        http::HeaderValue::from_static("ran"),
                    );
                    Ok(HandlerResult::Absent)
                })
            });

        let (tx, rx) = Transmitter::channel();
        let outcome = app.handle_request(get("/"), tx).await.unwrap();
        assert_eq!(outcome, HandleOutcome::InternalError);

        let response = rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get("x-post-handling").unwrap(), "ran");
        assert!(logs_contain("handler blew up"));
    }

    #[tokio::test]
    async fn test_uncontained_error_skips_transmission() {
        let mut app = app();
        app.router_mut().on(LifecyclePhase::PreHandling, |_ctx| {
            Box::pin(async move { Err(Error::Runtime("framework hook failed".to_string())) })
        });

        let (tx, rx) = Transmitter::channel();
        let err = app.handle_request(get("/"), tx).await.unwrap_err();
        assert!(matches!(err, Error::Runtime(_)));
        assert!(rx.await.is_err());
    }
}
