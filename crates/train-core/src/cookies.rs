//! Cookie parsing and serialization

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// SameSite attribute of a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SameSite {
    /// Sent on same-site requests and top-level navigations
    #[default]
    Lax,
    /// Sent on same-site requests only
    Strict,
    /// Sent everywhere (requires `Secure`)
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lax => write!(f, "Lax"),
            Self::Strict => write!(f, "Strict"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Attributes applied to the session cookie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CookieOptions {
    /// Cookie lifetime
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,

    /// Cookie path
    pub path: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Hide the cookie from scripts
    pub http_only: bool,

    /// Only send over HTTPS
    pub secure: bool,

    /// SameSite policy
    pub same_site: SameSite,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60 * 60 * 24),
            path: "/".to_string(),
            domain: None,
            http_only: true,
            secure: false,
            same_site: SameSite::Lax,
        }
    }
}

/// Parse a `Cookie` request header into name/value pairs
///
/// Malformed pairs are skipped. The first occurrence of a name wins.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"');
        cookies
            .entry(name.to_string())
            .or_insert_with(|| value.to_string());
    }
    cookies
}

/// Whether `name` is a valid cookie name (an HTTP token)
pub fn is_valid_cookie_name(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

/// Render a `Set-Cookie` header value
pub fn serialize_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut cookie = format!("{name}={value}; Max-Age={}", options.max_age.as_secs());

    let expires = chrono::Duration::from_std(options.max_age)
        .ok()
        .and_then(|d| Utc::now().checked_add_signed(d));
    if let Some(expires) = expires {
        cookie.push_str(&expires.format("; Expires=%a, %d %b %Y %H:%M:%S GMT").to_string());
    }

    push_attributes(&mut cookie, options);
    cookie
}

/// Render a `Set-Cookie` header value that deletes the cookie
pub fn expired_cookie(name: &str, options: &CookieOptions) -> String {
    let mut cookie = format!("{name}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT");
    push_attributes(&mut cookie, options);
    cookie
}

fn push_attributes(cookie: &mut String, options: &CookieOptions) {
    cookie.push_str("; Path=");
    cookie.push_str(&options.path);
    if let Some(domain) = &options.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str(&format!("; SameSite={}", options.same_site));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("train.ticket=abc123; theme=\"dark\"; broken; =x; theme=light");
        assert_eq!(cookies.get("train.ticket"), Some(&"abc123".to_string()));
        assert_eq!(cookies.get("theme"), Some(&"dark".to_string()));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_cookie_name_validation() {
        assert!(is_valid_cookie_name("train.ticket"));
        assert!(!is_valid_cookie_name(""));
        assert!(!is_valid_cookie_name("bad name"));
        assert!(!is_valid_cookie_name("semi;colon"));
    }

    #[test]
    fn test_serialize_cookie() {
        let options = CookieOptions::default();
        let cookie = serialize_cookie("train.ticket", "abc", &options);
        assert!(cookie.starts_with("train.ticket=abc; Max-Age=86400; Expires="));
        assert!(cookie.ends_with("; Path=/; HttpOnly; SameSite=Lax"));
    }

    #[test]
    fn test_expired_cookie() {
        let options = CookieOptions {
            secure: true,
            same_site: SameSite::Strict,
            ..Default::default()
        };
        let cookie = expired_cookie("sid", &options);
        assert!(cookie.starts_with("sid=; Max-Age=0"));
        assert!(cookie.contains("; Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }
}
