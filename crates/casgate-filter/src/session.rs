//! Framework session capabilities.
//!
//! The filter never talks to cookies or session middleware directly. The
//! framework adapter hands it a [`CasSession`] — a string-keyed JSON
//! value bag scoped to the browser session — and a [`SessionRegistry`]
//! able to destroy sessions by id for single-sign-out.

use crate::error::FilterResult;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// A browser-session-scoped key-value bag.
pub trait CasSession: Send {
    /// Stable identifier of the underlying framework session.
    fn id(&self) -> String;
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    fn remove(&mut self, key: &str);
}

/// Destroys framework sessions by id. Used by single-sign-out; a
/// deployment without server-side session storage can use
/// [`NoopSessionRegistry`].
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    async fn destroy(&self, session_id: &str) -> FilterResult<()>;
}

/// Registry that cannot destroy anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionRegistry;

#[async_trait]
impl SessionRegistry for NoopSessionRegistry {
    async fn destroy(&self, session_id: &str) -> FilterResult<()> {
        tracing::debug!(session_id, "no session registry configured; nothing destroyed");
        Ok(())
    }
}

/// In-memory session, for tests and non-persistent deployments.
#[derive(Debug, Default)]
pub struct MemorySession {
    id: String,
    values: HashMap<String, Value>,
}

impl MemorySession {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: HashMap::new(),
        }
    }
}

impl CasSession for MemorySession {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }
}

/// Read a string-typed session value.
pub(crate) fn get_string(session: &dyn CasSession, key: &str) -> Option<String> {
    session
        .get(key)
        .and_then(|v| v.as_str().map(str::to_string))
}
