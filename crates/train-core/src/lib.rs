//! # Train Core
//!
//! Core types, traits, and error handling for the Train web framework.
//!
//! This crate provides the per-request building blocks shared by the router and the runtime:
//! - Lifecycle phases and handler results
//! - The request facade and response state
//! - The per-request [`Context`]
//! - Cookie and session storage primitives
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod context;
pub mod cookies;
pub mod error;
pub mod phase;
pub mod request;
pub mod response;
pub mod result;
pub mod session;

pub use context::{AppHandle, Context, Transmitter};
pub use cookies::{CookieOptions, SameSite};
pub use error::{Error, Result};
pub use phase::LifecyclePhase;
pub use request::{ParsedBody, RequestFacade};
pub use response::{ResponseBody, ResponseState};
pub use result::HandlerResult;
pub use session::{CookieStorage, MemoryCookieStorage, Session, SessionData};

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{HeaderMap, Method, StatusCode, Uri};

/// Body type used for every response the framework transmits
pub type Body = http_body_util::Full<Bytes>;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::error::{Error, Result};
    pub use crate::phase::LifecyclePhase;
    pub use crate::response::ResponseBody;
    pub use crate::result::HandlerResult;
    pub use http::{Method, StatusCode};
}
