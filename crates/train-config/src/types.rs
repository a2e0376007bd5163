//! Configuration types

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use train_core::{CookieOptions, Error, Result};

/// Application options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppOptions {
    /// Interface to bind
    pub hostname: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory of the application (templates, static files)
    #[serde(default)]
    pub app_root: Option<PathBuf>,

    /// Name of the session cookie
    #[serde(default = "default_cookie_key")]
    pub cookie_key: String,

    /// Session cookie attributes
    #[serde(default)]
    pub cookie_options: CookieOptions,

    /// Max request body size (bytes)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// Graceful shutdown timeout (wait for in-flight requests)
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// How often expired sessions are purged from cookie storage
    #[serde(default = "default_session_purge_interval", with = "humantime_serde")]
    pub session_purge_interval: Duration,
}

fn default_port() -> u16 {
    3000
}

fn default_cookie_key() -> String {
    "train.ticket".to_string()
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_session_purge_interval() -> Duration {
    Duration::from_secs(60)
}

impl AppOptions {
    /// Options with every default applied
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: default_port(),
            app_root: None,
            cookie_key: default_cookie_key(),
            cookie_options: CookieOptions::default(),
            max_body_size: default_max_body_size(),
            shutdown_timeout: default_shutdown_timeout(),
            session_purge_interval: default_session_purge_interval(),
        }
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the application root
    pub fn with_app_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.app_root = Some(root.into());
        self
    }

    /// Set the session cookie name
    pub fn with_cookie_key(mut self, key: impl Into<String>) -> Self {
        self.cookie_key = key.into();
        self
    }

    /// Set the session cookie attributes
    pub fn with_cookie_options(mut self, options: CookieOptions) -> Self {
        self.cookie_options = options;
        self
    }

    /// Set the max request body size
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Set how often expired sessions are purged
    pub fn with_session_purge_interval(mut self, interval: Duration) -> Self {
        self.session_purge_interval = interval;
        self
    }

    /// Resolve `hostname:port` into a socket address
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let host = if self.hostname == "localhost" {
            "127.0.0.1"
        } else {
            self.hostname.as_str()
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let ip: IpAddr = host
            .parse()
            .map_err(|e| Error::Config(format!("Invalid hostname '{}': {e}", self.hostname)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::new("0.0.0.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = AppOptions::default();
        assert_eq!(options.port, 3000);
        assert_eq!(options.cookie_key, "train.ticket");
        assert_eq!(options.cookie_options.max_age, Duration::from_secs(86400));
        assert_eq!(options.listen_addr().unwrap().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_listen_addr() {
        let options = AppOptions::new("localhost").with_port(8080);
        assert_eq!(options.listen_addr().unwrap().to_string(), "127.0.0.1:8080");

        let options = AppOptions::new("[::1]").with_port(0);
        assert_eq!(options.listen_addr().unwrap().to_string(), "[::1]:0");

        assert!(AppOptions::new("example.invalid").listen_addr().is_err());
    }
}
