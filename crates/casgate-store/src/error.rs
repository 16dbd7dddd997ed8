//! Ticket store error types.

use thiserror::Error;

/// Result type for ticket store operations.
pub type TicketStoreResult<T> = Result<T, TicketStoreError>;

/// Errors produced by ticket store backends.
///
/// `PgtNotFound` is the retryable class: under the asynchronous callback
/// protocol a PGT that has not arrived *yet* is indistinguishable from one
/// that was already consumed, and callers decide how long to keep asking.
/// `InvalidArgument` is a programmer error and never retryable.
#[derive(Debug, Error)]
pub enum TicketStoreError {
    /// An empty ticket/IOU/PGT was passed in.
    #[error("Invalid argument: {0} must not be empty")]
    InvalidArgument(&'static str),

    /// No PGT is stored under the IOU — not delivered yet, or already
    /// retrieved (retrieval is single-use).
    #[error("No PGT found for IOU {0}; it may have already been retrieved")]
    PgtNotFound(String),

    /// No session is associated with the ticket.
    #[error("No session found for service ticket {0}")]
    SessionNotFound(String),

    /// The backing medium failed (I/O, database, serialization).
    #[error("Ticket storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for TicketStoreError {
    fn from(err: sqlx::Error) -> Self {
        TicketStoreError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for TicketStoreError {
    fn from(err: std::io::Error) -> Self {
        TicketStoreError::Storage(err.to_string())
    }
}
