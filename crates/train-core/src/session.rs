//! Sessions and cookie storage backends

use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Session payload
pub type SessionData = serde_json::Map<String, serde_json::Value>;

/// Session attached to one request
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: SessionData,
    is_new: bool,
    dirty: bool,
    destroyed: bool,
}

impl Session {
    /// Create a fresh session with a random ID
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data: SessionData::new(),
            is_new: true,
            dirty: false,
            destroyed: false,
        }
    }

    /// Restore a session loaded from storage
    pub fn from_stored(id: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: id.into(),
            data,
            is_new: false,
            dirty: false,
            destroyed: false,
        }
    }

    /// Session ID (the cookie value)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw payload
    pub fn data(&self) -> &SessionData {
        &self.data
    }

    /// Get a typed value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Store a value
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        self.data.insert(key.into(), serde_json::to_value(value)?);
        self.dirty = true;
        Ok(())
    }

    /// Remove a value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Mark the session for deletion
    pub fn destroy(&mut self) {
        self.data.clear();
        self.destroyed = true;
    }

    /// Whether the session was created during this request
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether the payload changed during this request
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the session is marked for deletion
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend holding session payloads between requests
///
/// Shared by every request of an application; implementations synchronize internally.
#[async_trait]
pub trait CookieStorage: Send + Sync + fmt::Debug {
    /// Load a session payload; expired or unknown IDs yield `None`
    async fn load(&self, id: &str) -> Result<Option<SessionData>>;

    /// Store a session payload for `max_age`
    async fn store(&self, id: &str, data: SessionData, max_age: Duration) -> Result<()>;

    /// Delete a session payload
    async fn remove(&self, id: &str) -> Result<()>;

    /// Drop expired payloads, returning how many were removed
    ///
    /// The server calls this periodically. Backends that expire entries on their own can
    /// keep the default.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    data: SessionData,
    expires_at: SystemTime,
}

/// In-process cookie storage
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieStorage {
    sessions: Arc<DashMap<String, StoredSession>>,
}

impl MemoryCookieStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are stored
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl CookieStorage for MemoryCookieStorage {
    async fn load(&self, id: &str) -> Result<Option<SessionData>> {
        let stored = match self.sessions.get(id) {
            Some(stored) => stored.clone(),
            None => return Ok(None),
        };

        if SystemTime::now() > stored.expires_at {
            self.sessions.remove(id);
            return Ok(None);
        }

        Ok(Some(stored.data))
    }

    async fn store(&self, id: &str, data: SessionData, max_age: Duration) -> Result<()> {
        let expires_at = SystemTime::now().checked_add(max_age).ok_or_else(|| {
            Error::Storage(format!("Session lifetime {max_age:?} is out of range"))
        })?;
        self.sessions
            .insert(id.to_string(), StoredSession { data, expires_at });
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = SystemTime::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, stored| stored.expires_at > now);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
