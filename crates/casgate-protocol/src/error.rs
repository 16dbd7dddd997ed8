//! Codec error types.

use thiserror::Error;

/// Result type for codec operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors produced while decoding CAS server output.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The body is not a recognizable CAS response (bad XML, wrong root,
    /// unexpected outcome element, empty body).
    #[error("Malformed CAS response: {0}")]
    MalformedResponse(String),

    /// A single-sign-out payload that is not a usable SAML `LogoutRequest`.
    #[error("Invalid LogoutRequest: {0}")]
    InvalidLogoutRequest(String),
}
