//! Terminal filter decisions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Acknowledgement body for intercepted single-sign-out requests.
pub const SSO_ACK_BODY: &str = "Single sign-out request intercepted.";

/// The authenticated (or deliberately unauthenticated) identity behind an
/// allowed request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// `None` only on gateway passes, where anonymous access is allowed.
    pub username: Option<String>,
    pub extra_attributes: Map<String, Value>,
}

impl Identity {
    #[must_use]
    pub fn named(username: impl Into<String>, extra_attributes: Map<String, Value>) -> Self {
        Self {
            username: Some(username.into()),
            extra_attributes,
        }
    }
}

/// What the framework adapter should do with the request.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthDecision {
    /// Continue into the application with this identity.
    Allow(Identity),
    /// Deny and send a 3xx to the given URL (normally the CAS login page).
    Redirect(String),
    /// Deny with a 401 and this structured body — used when the client
    /// did not negotiate HTML and a login redirect would be useless.
    Unauthorized(Value),
    /// A single-sign-out push was handled; answer 200 with
    /// [`SSO_ACK_BODY`] and stop processing. Not a redirect.
    Intercepted,
}

impl AuthDecision {
    /// Whether the request may proceed into the application.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow(_))
    }
}
