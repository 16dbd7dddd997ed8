//! Filter configuration.

use casgate_core::SessionKeys;
use serde_json::{Map, Value};

/// How the filter authenticates: against a real CAS server, or with a
/// canned identity for local development and tests. Selected once at
/// configure time and dispatched through a single match — the fake path
/// never touches the network.
#[derive(Debug, Clone, Default)]
pub enum AuthMode {
    #[default]
    Real,
    Fake(FakeAuth),
}

/// The canned identity used by [`AuthMode::Fake`].
#[derive(Debug, Clone)]
pub struct FakeAuth {
    pub username: String,
    pub extra_attributes: Map<String, Value>,
}

impl FakeAuth {
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            extra_attributes: Map::new(),
        }
    }
}

/// Behavior switches for [`crate::CasFilter`]. Constructed once at
/// startup and injected; there is no process-global configuration.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Send `gateway=true` on login redirects and allow unauthenticated
    /// continuation when CAS sends the user back without a ticket.
    pub use_gatewaying: bool,
    /// Revalidate on every request instead of trusting the local session.
    /// Off by default: forcing a CAS round trip per request breaks POST
    /// and AJAX flows.
    pub authenticate_on_every_request: bool,
    /// Intercept `logoutRequest` pushes from the CAS server.
    pub enable_single_sign_out: bool,
    /// Fixed service URL; when unset the filter derives it from the
    /// request URL (minus the `ticket` parameter).
    pub service_url: Option<String>,
    /// Retrieve a fresh PGT when a validation response announces an IOU
    /// different from the cached PGT's. When disabled the first cached
    /// PGT is kept for the session's lifetime.
    pub refetch_pgt_on_iou_change: bool,
    /// Two redirects to CAS closer together than this count toward the
    /// loop breaker.
    pub redirect_loop_window_ms: i64,
    /// Consecutive fast redirects after which `renew=1` is forced to
    /// break a redirect loop between a misconfigured service and CAS.
    pub redirect_loop_threshold: u64,
    pub session_keys: SessionKeys,
    pub auth_mode: AuthMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            use_gatewaying: false,
            authenticate_on_every_request: false,
            enable_single_sign_out: false,
            service_url: None,
            refetch_pgt_on_iou_change: true,
            redirect_loop_window_ms: 1_000,
            redirect_loop_threshold: 4,
            session_keys: SessionKeys::default(),
            auth_mode: AuthMode::Real,
        }
    }
}
