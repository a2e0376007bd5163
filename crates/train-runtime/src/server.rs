//! HTTP server implementation

use crate::application::Application;
use crate::pipeline::INTERNAL_ERROR_MESSAGE;
use crate::shutdown::ShutdownSignal;
use crate::RuntimeState;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use train_core::{Body, Error, RequestFacade, Result, Transmitter};

/// HTTP server feeding raw requests into an [`Application`]
pub struct Server<S, R> {
    app: Arc<Application<S, R>>,
    state: Arc<RwLock<RuntimeState>>,
    shutdown: ShutdownSignal,
    request_count: Arc<AtomicUsize>,
    active_requests: Arc<AtomicUsize>,
}

impl<S, R> std::fmt::Debug for Server<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("app", &self.app)
            .field("request_count", &self.request_count)
            .field("active_requests", &self.active_requests)
            .finish()
    }
}

impl<S, R> Server<S, R>
where
    S: Send + Sync + 'static,
    R: Default + Send + 'static,
{
    /// Create a server for an application
    pub fn new(app: Arc<Application<S, R>>) -> Self {
        Self {
            app,
            state: Arc::new(RwLock::new(RuntimeState::Initializing)),
            shutdown: ShutdownSignal::new(),
            request_count: Arc::new(AtomicUsize::new(0)),
            active_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the current state
    pub async fn state(&self) -> RuntimeState {
        *self.state.read().await
    }

    /// Get request count
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Requests whose lifecycle has not finished yet
    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Get shutdown signal
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bind `hostname:port` and serve until shutdown
    pub async fn run(&self) -> Result<()> {
        let options = self.app.options();
        let addr = options.listen_addr()?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Runtime(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("Serving on http://{}:{}/", options.hostname, options.port);

        self.serve(listener).await
    }

    /// Serve connections from an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Running;
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        let purge = self.spawn_session_purge();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::trace!("Accepted connection from {}", addr);
                            self.spawn_connection(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        purge.abort();

        {
            let mut state = self.state.write().await;
            *state = RuntimeState::ShuttingDown;
        }

        self.drain(self.app.options().shutdown_timeout).await;

        {
            let mut state = self.state.write().await;
            *state = RuntimeState::Stopped;
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    fn spawn_connection(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        let app = Arc::clone(&self.app);
        let request_count = Arc::clone(&self.request_count);
        let active_requests = Arc::clone(&self.active_requests);

        tokio::spawn(async move {
            let service = hyper::service::service_fn(move |req| {
                let app = Arc::clone(&app);
                let active_requests = Arc::clone(&active_requests);
                request_count.fetch_add(1, Ordering::Relaxed);
                async move {
                    Ok::<_, Infallible>(serve_request(app, req, addr, active_requests).await)
                }
            });

            let io = hyper_util::rt::TokioIo::new(stream);
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(io, service)
                .await
            {
                tracing::error!("HTTP connection error: {}", e);
            }
        });
    }

    /// Purge expired sessions every `session_purge_interval` until aborted
    fn spawn_session_purge(&self) -> tokio::task::JoinHandle<()> {
        let storage = Arc::clone(self.app.cookie_storage());
        let period = self.app.options().session_purge_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                match storage.purge_expired().await {
                    Ok(0) => {}
                    Ok(removed) => tracing::debug!(removed, "Purged expired sessions"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge expired sessions"),
                }
            }
        })
    }

    /// Wait for in-flight lifecycles to finish, up to `timeout`
    async fn drain(&self, timeout: Duration) {
        let start = Instant::now();

        tracing::info!(
            timeout_secs = timeout.as_secs(),
            "Waiting for in-flight requests to complete"
        );

        loop {
            let active = self.active_requests.load(Ordering::Relaxed);

            if active == 0 {
                tracing::info!("All requests completed, shutting down cleanly");
                break;
            }

            if start.elapsed() >= timeout {
                tracing::warn!(
                    active_requests = active,
                    "Shutdown timeout reached, forcing shutdown"
                );
                break;
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

/// Collect the body, run the lifecycle on its own task, and wait for transmission
///
/// `postSending` hooks keep running on the spawned task after the response is returned.
async fn serve_request<S, R>(
    app: Arc<Application<S, R>>,
    req: Request<Incoming>,
    remote_addr: SocketAddr,
    active_requests: Arc<AtomicUsize>,
) -> Response<Body>
where
    S: Send + Sync + 'static,
    R: Default + Send + 'static,
{
    let (parts, body) = req.into_parts();
    let limit = app.options().max_body_size;

    let bytes = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            let err = if e.downcast_ref::<LengthLimitError>().is_some() {
                Error::PayloadTooLarge(limit)
            } else {
                Error::Runtime(format!("Failed to read request body: {e}"))
            };
            tracing::debug!(error = %err, "Rejecting request body");
            return error_response(&err);
        }
    };

    let request = RequestFacade::from_parts(parts, bytes).with_remote_addr(remote_addr);
    let (tx, rx) = Transmitter::channel();

    let in_flight = InFlight::enter(active_requests);
    let task = tokio::spawn(async move {
        let _in_flight = in_flight;
        let result = app.handle_request(request, tx).await;

        if let Err(e) = &result {
            if e.is_client() {
                tracing::debug!(error = %e, "Request rejected outside the handling phase");
            } else {
                tracing::error!(error = %e, "Request failed outside the handling phase");
            }
        }
        result
    });

    match rx.await {
        Ok(response) => response,
        Err(_) => {
            let err = match task.await {
                Ok(Err(e)) => e,
                Ok(Ok(_)) => Error::Internal("Lifecycle finished without a response".to_string()),
                Err(e) => Error::Internal(format!("Lifecycle task failed: {e}")),
            };
            error_response(&err)
        }
    }
}

/// Counts one lifecycle as active until dropped, even if the lifecycle task panics
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(active_requests: Arc<AtomicUsize>) -> Self {
        active_requests.fetch_add(1, Ordering::Relaxed);
        Self(active_requests)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Response for an error that escaped the lifecycle
///
/// Client errors keep their message. Anything else gets a generic message only.
pub fn error_response(err: &Error) -> Response<Body> {
    let status = err.to_status_code();
    let message = match err {
        Error::Client { message, .. } => message.clone(),
        _ if status.is_server_error() => INTERNAL_ERROR_MESSAGE.to_string(),
        _ => status.canonical_reason().unwrap_or("Error").to_string(),
    };

    let mut response = Response::new(Full::new(Bytes::from(message)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
