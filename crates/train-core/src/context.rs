//! Per-request context

use crate::cookies::{expired_cookie, serialize_cookie, CookieOptions};
use crate::request::RequestFacade;
use crate::response::ResponseState;
use crate::session::{CookieStorage, Session};
use crate::{Body, Error, Result};
use http::header::{HeaderValue, SET_COOKIE};
use http::Response;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Process-wide state shared by every request of an application
pub struct AppHandle<S> {
    data: S,
    cookie_key: String,
    cookie_options: CookieOptions,
    cookie_storage: Arc<dyn CookieStorage>,
}

impl<S> AppHandle<S> {
    /// Create a handle
    pub fn new(
        data: S,
        cookie_key: impl Into<String>,
        cookie_options: CookieOptions,
        cookie_storage: Arc<dyn CookieStorage>,
    ) -> Self {
        Self {
            data,
            cookie_key: cookie_key.into(),
            cookie_options,
            cookie_storage,
        }
    }

    /// Application data
    pub fn data(&self) -> &S {
        &self.data
    }

    /// Name of the session cookie
    pub fn cookie_key(&self) -> &str {
        &self.cookie_key
    }

    /// Attributes of the session cookie
    pub fn cookie_options(&self) -> &CookieOptions {
        &self.cookie_options
    }

    /// Session storage backend
    pub fn cookie_storage(&self) -> &Arc<dyn CookieStorage> {
        &self.cookie_storage
    }
}

impl<S> fmt::Debug for AppHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppHandle")
            .field("cookie_key", &self.cookie_key)
            .field("cookie_options", &self.cookie_options)
            .field("cookie_storage", &self.cookie_storage)
            .finish()
    }
}

/// One-shot channel to the connection that is waiting for the response
#[derive(Debug)]
pub struct Transmitter(oneshot::Sender<Response<Body>>);

impl Transmitter {
    /// Create a transmitter and the receiver the transport awaits
    pub fn channel() -> (Self, oneshot::Receiver<Response<Body>>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }
}

/// State carried through every lifecycle phase of one request
///
/// `S` is the application data shared across requests, `R` the per-request data
/// that starts from `R::default()` and dies with the context.
pub struct Context<S, R> {
    /// Incoming request
    pub req: RequestFacade,
    /// Outgoing response
    pub res: ResponseState,
    app: Arc<AppHandle<S>>,
    data: R,
    session: Option<Session>,
    transmitter: Option<Transmitter>,
    initialized: bool,
}

impl<S, R: Default> Context<S, R> {
    /// Create a context for a freshly arrived request
    pub fn new(req: RequestFacade, app: Arc<AppHandle<S>>, transmitter: Transmitter) -> Self {
        Self {
            req,
            res: ResponseState::new(),
            app,
            data: R::default(),
            session: None,
            transmitter: Some(transmitter),
            initialized: false,
        }
    }
}

impl<S, R> Context<S, R> {
    /// Owning application
    pub fn app(&self) -> &Arc<AppHandle<S>> {
        &self.app
    }

    /// Application data
    pub fn app_data(&self) -> &S {
        self.app.data()
    }

    /// Request data
    pub fn data(&self) -> &R {
        &self.data
    }

    /// Mutable request data
    pub fn data_mut(&mut self) -> &mut R {
        &mut self.data
    }

    /// Session loaded from the request cookie, if any
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Session of this request, created on first use
    pub fn session_mut(&mut self) -> &mut Session {
        self.session.get_or_insert_with(Session::new)
    }

    /// Delete the session and expire its cookie
    pub fn destroy_session(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.destroy();
        }
    }

    /// Whether body initialization ran
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Parse query, cookies and body, then load the session
    pub async fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        self.req.parse()?;

        let stored = match self.req.cookie(self.app.cookie_key()) {
            Some(id) => self
                .app
                .cookie_storage()
                .load(id)
                .await?
                .map(|data| Session::from_stored(id, data)),
            None => None,
        };
        self.session = stored;

        self.initialized = true;
        Ok(())
    }

    /// Persist the session and freeze the response for transmission
    pub async fn prepare_response(&mut self) -> Result<()> {
        if let Some(session) = &self.session {
            let storage = self.app.cookie_storage();
            let options = self.app.cookie_options();
            let key = self.app.cookie_key();

            let cookie = if session.is_destroyed() {
                if !session.is_new() {
                    storage.remove(session.id()).await?;
                }
                Some(expired_cookie(key, options))
            } else if session.is_dirty() {
                storage
                    .store(session.id(), session.data().clone(), options.max_age)
                    .await?;
                Some(serialize_cookie(key, session.id(), options))
            } else {
                None
            };

            if let Some(cookie) = cookie {
                let value = HeaderValue::from_str(&cookie)
                    .map_err(|e| Error::Internal(format!("Invalid Set-Cookie header: {e}")))?;
                self.res.headers_mut().append(SET_COOKIE, value);
            }
        }

        self.res.prepare()
    }

    /// Hand the prepared response to the transport
    ///
    /// Fails with [`Error::AlreadySent`] on a second call.
    pub fn respond(&mut self) -> Result<()> {
        let transmitter = self.transmitter.take().ok_or(Error::AlreadySent)?;
        let response = self.res.take_for_transmit()?;

        if transmitter.0.send(response).is_err() {
            tracing::debug!(request_id = %self.req.id(), "Client went away before response was sent");
        }
        Ok(())
    }
}

impl<S, R: fmt::Debug> fmt::Debug for Context<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("req", &self.req)
            .field("res", &self.res)
            .field("data", &self.data)
            .field("session", &self.session)
            .field("initialized", &self.initialized)
            .finish()
    }
}
