//! Proxy callback route definitions.

use crate::handlers::{receive_pgt_get, receive_pgt_post};
use axum::routing::get;
use axum::Router;
use casgate_store::TicketStore;
use std::sync::Arc;

/// Shared state for the callback handlers.
#[derive(Clone)]
pub struct CallbackState {
    pub store: Arc<dyn TicketStore>,
    /// Set when this process terminates TLS itself (the transport guard
    /// then trusts every connection). Leave unset behind a reverse proxy
    /// and let `x-forwarded-proto` vouch per request.
    pub tls_terminated: bool,
}

impl CallbackState {
    #[must_use]
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self {
            store,
            tls_terminated: false,
        }
    }

    #[must_use]
    pub fn with_tls_terminated(mut self, tls_terminated: bool) -> Self {
        self.tls_terminated = tls_terminated;
        self
    }
}

/// Create the proxy callback router. The path matches the conventional
/// CAS client callback location.
pub fn callback_router(state: CallbackState) -> Router {
    Router::new()
        .route(
            "/cas_proxy_callback/receive_pgt",
            get(receive_pgt_get).post(receive_pgt_post),
        )
        .with_state(state)
}
