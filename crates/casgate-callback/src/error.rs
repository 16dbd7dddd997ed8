//! Callback error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use casgate_store::TicketStoreError;
use thiserror::Error;

/// Errors answered by the callback endpoint.
#[derive(Debug, Error)]
pub enum CallbackError {
    /// The request arrived over plaintext from a non-loopback peer. A PGT
    /// accepted over such a connection would be readable in transit, so
    /// the push is refused outright.
    #[error("proxy callback requires TLS or a loopback peer")]
    InsecureTransport,

    /// The ticket store rejected the PGT.
    #[error(transparent)]
    Store(#[from] TicketStoreError),
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        match self {
            CallbackError::InsecureTransport => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Proxy callback requires TLS or a loopback peer.",
            )
                .into_response(),
            CallbackError::Store(e) => {
                tracing::error!(error = %e, "failed to store pushed PGT");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store the PGT.",
                )
                    .into_response()
            }
        }
    }
}
