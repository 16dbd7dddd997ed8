//! Client error types.

use casgate_protocol::ProtocolError;
use casgate_store::TicketStoreError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors produced by [`crate::CasClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Required configuration is missing or unusable. Raised at
    /// construction time, never during a request.
    #[error("CAS configuration error: {0}")]
    Configuration(String),

    /// The CAS server could not be reached, timed out, or answered with a
    /// status outside the parseable set.
    #[error("CAS transport error: {0}")]
    Transport(String),

    /// The CAS server answered with a body the codec does not recognize.
    #[error(transparent)]
    Malformed(#[from] ProtocolError),

    /// The CAS server processed a proxy-ticket request and refused it.
    #[error("CAS proxy ticket request denied ({code}): {message}")]
    ProxyRequestDenied { code: String, message: String },

    /// A ticket store operation failed (including the single-use PGT
    /// lookup finding nothing).
    #[error(transparent)]
    TicketStore(#[from] TicketStoreError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
