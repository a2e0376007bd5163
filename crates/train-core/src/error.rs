//! Error types for Train

use http::StatusCode;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for Train
///
/// [`Error::Client`] is the only variant the pipeline trusts to be shown to the caller.
/// Every other variant raised from an `onHandle` handler is treated as an internal fault.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Application-raised rejection carrying its own status and message
    #[error("{message}")]
    Client {
        /// HTTP status sent to the caller
        status: StatusCode,
        /// Message sent to the caller verbatim
        message: String,
    },

    /// Failure raised by application handler code
    #[error("Handler error: {0}")]
    Handler(#[from] anyhow::Error),

    /// HTTP-related errors
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// HTTP builder error
    #[error("HTTP error: {0}")]
    HttpError(#[from] http::Error),

    /// Request body exceeded the configured limit
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cookie storage error
    #[error("Cookie storage error: {0}")]
    Storage(String),

    /// Response was already transmitted
    #[error("Response already sent")]
    AlreadySent,

    /// Runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a client error with an explicit status
    pub fn client(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Client {
            status,
            message: message.into(),
        }
    }

    /// 400 client error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::client(StatusCode::BAD_REQUEST, message)
    }

    /// 401 client error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::client(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 client error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::client(StatusCode::FORBIDDEN, message)
    }

    /// 404 client error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::client(StatusCode::NOT_FOUND, message)
    }

    /// Whether this is a client error
    pub fn is_client(&self) -> bool {
        matches!(self, Error::Client { .. })
    }

    /// Convert error to HTTP status code
    pub fn to_status_code(&self) -> StatusCode {
        match self {
            Error::Client { status, .. } => *status,
            Error::Http(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
