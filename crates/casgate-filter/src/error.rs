//! Filter error types.
//!
//! Most CAS-level problems (rejected tickets, unreachable server) are
//! *decisions*, not errors — the filter converts them into redirects.
//! Only conditions an end user cannot fix by re-authenticating surface
//! here: malformed server responses, configuration mistakes, and a PGT
//! that was announced but never delivered.

use casgate_client::ClientError;
use casgate_store::TicketStoreError;
use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors surfaced to the caller of the filter.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Client-level failure that is not survivable by redirecting
    /// (malformed response, configuration error).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A validation response announced a PGT IOU but the PGT could not be
    /// retrieved — the proxy callback never recorded it. This indicates a
    /// deployment or network defect, not a normal authentication failure.
    #[error("Failed to retrieve PGT: {0}")]
    PgtRetrieval(String),

    /// Ticket store failure outside the PGT path.
    #[error(transparent)]
    Store(#[from] TicketStoreError),

    /// The framework session capability failed.
    #[error("Session error: {0}")]
    Session(String),
}
