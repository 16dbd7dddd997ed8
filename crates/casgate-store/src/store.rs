//! The ticket store capability trait.

use crate::error::{TicketStoreError, TicketStoreResult};
use async_trait::async_trait;

/// Persists the client-side ticket mappings of the CAS protocol.
///
/// Implementations must be safe for concurrent access from multiple
/// request-handling tasks. [`TicketStore::retrieve_pgt`] must be an atomic
/// read-and-delete so that concurrent retrievals of the same IOU yield at
/// most one winner — the proxy callback and the validation response can
/// race in either order.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Associate a validated service ticket with the local session id.
    async fn store_service_session(&self, ticket: &str, session_id: &str)
        -> TicketStoreResult<()>;

    /// Look up the session id for a ticket. Fails with
    /// [`TicketStoreError::SessionNotFound`] when no mapping exists.
    async fn read_service_session(&self, ticket: &str) -> TicketStoreResult<String>;

    /// Drop the ticket → session mapping. Removing an absent mapping is
    /// not an error.
    async fn cleanup_service_session(&self, ticket: &str) -> TicketStoreResult<()>;

    /// Record a PGT under its IOU, as pushed by the CAS server.
    async fn save_pgt_iou(&self, iou: &str, pgt: &str) -> TicketStoreResult<()>;

    /// Consume the PGT stored under `iou`. Single-use: the entry is
    /// deleted atomically with the read, and a second call fails with
    /// [`TicketStoreError::PgtNotFound`].
    async fn retrieve_pgt(&self, iou: &str) -> TicketStoreResult<String>;

    /// Handle a single-sign-out notification: resolve the session mapped
    /// to `session_index` (the service ticket named by the SAML
    /// `SessionIndex`), remove the mapping, and return the session id so
    /// the caller can destroy the framework session. Returns `None` when
    /// no mapping exists — the session may already be gone, and
    /// single-sign-out is best-effort.
    async fn process_single_sign_out(
        &self,
        session_index: &str,
    ) -> TicketStoreResult<Option<String>> {
        ensure_present(session_index, "session_index")?;
        match self.read_service_session(session_index).await {
            Ok(session_id) => {
                self.cleanup_service_session(session_index).await?;
                tracing::info!(
                    session_index,
                    %session_id,
                    "single-sign-out resolved session for service ticket"
                );
                Ok(Some(session_id))
            }
            Err(TicketStoreError::SessionNotFound(_)) => {
                tracing::debug!(
                    session_index,
                    "no session for single-sign-out ticket; it may already have been cleared"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Reject empty ticket/IOU/PGT arguments before touching the backend.
pub(crate) fn ensure_present(value: &str, name: &'static str) -> TicketStoreResult<()> {
    if value.is_empty() {
        return Err(TicketStoreError::InvalidArgument(name));
    }
    Ok(())
}
