//! Request facade

use crate::cookies::parse_cookie_header;
use crate::{Error, Result};
use bytes::Bytes;
use http::{header, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::net::SocketAddr;
use uuid::Uuid;

/// Request body after initialization
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ParsedBody {
    /// No body, or body not parsed yet
    #[default]
    Empty,
    /// `application/json`
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(HashMap<String, String>),
    /// `text/*`
    Text(String),
    /// Any other content type
    Raw(Bytes),
}

impl ParsedBody {
    /// Deserialize a JSON body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            ParsedBody::Json(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::bad_request(format!("Invalid request body: {e}"))),
            _ => Err(Error::bad_request("Request body is not JSON")),
        }
    }

    /// Look up a form field
    pub fn form_field(&self, key: &str) -> Option<&str> {
        match self {
            ParsedBody::Form(fields) => fields.get(key).map(|s| s.as_str()),
            _ => None,
        }
    }
}

/// Read-only view of the incoming request
///
/// Method, URI, headers and raw body never change after creation. Path params are
/// filled by the router, query, cookies and body by [`crate::Context::init`].
#[derive(Debug, Clone)]
pub struct RequestFacade {
    id: String,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    raw_body: Bytes,
    remote_addr: Option<SocketAddr>,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: ParsedBody,
}

impl RequestFacade {
    /// Create a request facade
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, raw_body: Bytes) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            uri,
            headers,
            raw_body,
            remote_addr: None,
            params: HashMap::new(),
            query: HashMap::new(),
            cookies: HashMap::new(),
            body: ParsedBody::Empty,
        }
    }

    /// Create a request facade from request parts and a collected body
    pub fn from_parts(parts: http::request::Parts, raw_body: Bytes) -> Self {
        Self::new(parts.method, parts.uri, parts.headers, raw_body)
    }

    /// Attach the peer address
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Unique request ID for tracing
    pub fn id(&self) -> &str {
        &self.id
    }

    /// HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URI
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request path without query
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as string, if present and valid
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Peer address, if known
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Unparsed body bytes
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Parsed body
    pub fn body(&self) -> &ParsedBody {
        &self.body
    }

    /// Get a path parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.as_str())
    }

    /// All path parameters
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Replace path parameters
    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    /// Get a query parameter
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(|s| s.as_str())
    }

    /// Get a request cookie
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    /// Parse query, cookies and body
    pub(crate) fn parse(&mut self) -> Result<()> {
        if let Some(query) = self.uri.query() {
            self.query = url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
        }

        for value in self.headers.get_all(header::COOKIE) {
            if let Ok(value) = value.to_str() {
                for (name, value) in parse_cookie_header(value) {
                    self.cookies.entry(name).or_insert(value);
                }
            }
        }

        self.body = self.parse_body()?;
        Ok(())
    }

    fn parse_body(&self) -> Result<ParsedBody> {
        if self.raw_body.is_empty() {
            return Ok(ParsedBody::Empty);
        }

        let content_type = self
            .header(header::CONTENT_TYPE.as_str())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let parsed = match content_type.as_str() {
            "application/json" => ParsedBody::Json(
                serde_json::from_slice(&self.raw_body)
                    .map_err(|e| Error::bad_request(format!("Malformed JSON body: {e}")))?,
            ),
            "application/x-www-form-urlencoded" => ParsedBody::Form(
                url::form_urlencoded::parse(&self.raw_body)
                    .into_owned()
                    .collect(),
            ),
            ct if ct.starts_with("text/") => ParsedBody::Text(
                String::from_utf8(self.raw_body.to_vec())
                    .map_err(|_| Error::bad_request("Text body is not valid UTF-8"))?,
            ),
            _ => ParsedBody::Raw(self.raw_body.clone()),
        };

        Ok(parsed)
    }
}
