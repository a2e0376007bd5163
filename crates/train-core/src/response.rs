//! Response state and finalization

use crate::{Body, Error, Result};
use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;

/// Body a handler can set on the response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Plain text
    Text(String),
    /// HTML markup
    Html(String),
    /// JSON document
    Json(serde_json::Value),
    /// Raw bytes
    Bytes(Bytes),
}

impl ResponseBody {
    /// Default content type for this kind of body
    pub fn content_type(&self) -> &'static str {
        match self {
            ResponseBody::Text(_) => "text/plain; charset=utf-8",
            ResponseBody::Html(_) => "text/html; charset=utf-8",
            ResponseBody::Json(_) => "application/json",
            ResponseBody::Bytes(_) => "application/octet-stream",
        }
    }

    /// Serialize into wire bytes
    pub fn to_bytes(&self) -> Result<Bytes> {
        Ok(match self {
            ResponseBody::Text(s) | ResponseBody::Html(s) => Bytes::from(s.clone()),
            ResponseBody::Json(value) => Bytes::from(serde_json::to_vec(value)?),
            ResponseBody::Bytes(b) => b.clone(),
        })
    }
}

impl From<&str> for ResponseBody {
    fn from(s: &str) -> Self {
        ResponseBody::Text(s.to_string())
    }
}

impl From<String> for ResponseBody {
    fn from(s: String) -> Self {
        ResponseBody::Text(s)
    }
}

impl From<serde_json::Value> for ResponseBody {
    fn from(value: serde_json::Value) -> Self {
        ResponseBody::Json(value)
    }
}

impl From<Bytes> for ResponseBody {
    fn from(b: Bytes) -> Self {
        ResponseBody::Bytes(b)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(b: Vec<u8>) -> Self {
        ResponseBody::Bytes(Bytes::from(b))
    }
}

/// Mutable outgoing response of one request
///
/// Starts with no status and no body. [`ResponseState::prepare`] freezes it into an
/// [`http::Response`]; the prepared response can still be edited until it is transmitted,
/// which happens at most once.
#[derive(Debug, Default)]
pub struct ResponseState {
    status: Option<StatusCode>,
    body: Option<ResponseBody>,
    headers: HeaderMap,
    prepared: Option<Response<Body>>,
    sent: bool,
}

impl ResponseState {
    /// Create an empty response
    pub fn new() -> Self {
        Self::default()
    }

    /// Status set by a handler, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Set the status code
    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    /// Current body, if any
    pub fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    /// Whether a handler set a body
    pub fn body_is_set(&self) -> bool {
        self.body.is_some()
    }

    /// Set the body, replacing any previous one
    pub fn set_body(&mut self, body: impl Into<ResponseBody>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Remove the body
    pub fn clear_body(&mut self) -> &mut Self {
        self.body = None;
        self
    }

    /// Headers set so far
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header, replacing existing values
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Build the wire response from the current state
    ///
    /// Missing status defaults to 200 and `Content-Type` is derived from the body kind
    /// unless a handler already set one.
    pub fn prepare(&mut self) -> Result<()> {
        if self.sent {
            return Err(Error::AlreadySent);
        }

        let status = self.status.unwrap_or(StatusCode::OK);
        let mut headers = self.headers.clone();

        let bytes = match &self.body {
            Some(body) => {
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(body.content_type()),
                    );
                }
                body.to_bytes()?
            }
            None => Bytes::new(),
        };

        let mut response = Response::new(Full::new(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        self.prepared = Some(response);
        Ok(())
    }

    /// Prepared response, if [`ResponseState::prepare`] ran
    pub fn prepared(&self) -> Option<&Response<Body>> {
        self.prepared.as_ref()
    }

    /// Edit the prepared response before it is sent
    pub fn prepared_mut(&mut self) -> Option<&mut Response<Body>> {
        self.prepared.as_mut()
    }

    /// Whether the response has been transmitted
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub(crate) fn take_for_transmit(&mut self) -> Result<Response<Body>> {
        if self.sent {
            return Err(Error::AlreadySent);
        }
        let response = self
            .prepared
            .take()
            .ok_or_else(|| Error::Internal("Response transmitted before preparation".to_string()))?;
        self.sent = true;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    #[test]
    fn test_new_response_is_empty() {
        let res = ResponseState::new();
        assert!(res.status().is_none());
        assert!(!res.body_is_set());
        assert!(!res.is_sent());
    }

    #[test]
    fn test_chained_setters() {
        let mut res = ResponseState::new();
        res.set_body("gone").set_status(StatusCode::GONE);
        assert_eq!(res.status(), Some(StatusCode::GONE));
        assert_eq!(res.body(), Some(&ResponseBody::Text("gone".to_string())));
    }

    #[tokio::test]
    async fn test_prepare_defaults() {
        let mut res = ResponseState::new();
        res.set_body(json!({"ok": true}));
        res.prepare().unwrap();

        let prepared = res.prepared().unwrap();
        assert_eq!(prepared.status(), StatusCode::OK);
        assert_eq!(
            prepared.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let response = res.take_for_transmit().unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], br#"{"ok":true}"#);
    }

    #[test]
    fn test_prepare_keeps_explicit_content_type() {
        let mut res = ResponseState::new();
        res.set_header(header::CONTENT_TYPE, HeaderValue::from_static("text/csv"))
            .set_body("a,b\n1,2");
        res.prepare().unwrap();
        assert_eq!(
            res.prepared().unwrap().headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv"
        );
    }

    #[test]
    fn test_transmit_exactly_once() {
        let mut res = ResponseState::new();
        assert!(res.take_for_transmit().is_err());

        res.prepare().unwrap();
        assert!(res.take_for_transmit().is_ok());
        assert!(res.is_sent());
        assert!(matches!(res.take_for_transmit(), Err(Error::AlreadySent)));
        assert!(matches!(res.prepare(), Err(Error::AlreadySent)));
    }
}
