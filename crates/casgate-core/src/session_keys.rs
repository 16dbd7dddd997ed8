//! Names of the session values maintained by the authentication filter.
//!
//! Deployments that already reserve one of these keys can rename any of
//! them; the defaults match what the filter documents in its session
//! contract.

use serde::{Deserialize, Serialize};

/// Session key names used by the filter. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeys {
    /// Authenticated username.
    pub username: String,
    /// Extra attributes delivered with the validation response.
    pub extra_attributes: String,
    /// Last successfully validated ticket string.
    pub last_valid_ticket: String,
    /// Service URL the last valid ticket was validated against.
    pub last_valid_ticket_service: String,
    /// Cached proxy-granting ticket (JSON object with `ticket` and `iou`).
    pub pgt: String,
    /// Flag set when the user was redirected to CAS in gateway mode.
    pub sent_to_gateway: String,
    /// Consecutive fast redirects to CAS (loop breaker).
    pub redirect_retry_count: String,
    /// Unix milliseconds of the previous redirect to CAS (loop breaker).
    pub last_redirect_unix_ms: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            username: "cas_user".to_string(),
            extra_attributes: "cas_extra_attributes".to_string(),
            last_valid_ticket: "cas_last_valid_ticket".to_string(),
            last_valid_ticket_service: "cas_last_valid_ticket_service".to_string(),
            pgt: "cas_pgt".to_string(),
            sent_to_gateway: "cas_sent_to_gateway".to_string(),
            redirect_retry_count: "cas_validation_retry_count".to_string(),
            last_redirect_unix_ms: "cas_last_redirect_unix_ms".to_string(),
        }
    }
}
