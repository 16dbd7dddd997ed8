//! In-memory ticket store.

use crate::error::{TicketStoreError, TicketStoreResult};
use crate::store::{ensure_present, TicketStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local ticket store backed by hash maps.
///
/// Suitable for tests and single-process deployments; mappings do not
/// survive a restart and are invisible to other workers.
#[derive(Debug, Default, Clone)]
pub struct InMemoryTicketStore {
    sessions: Arc<RwLock<HashMap<String, String>>>,
    pgtious: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryTicketStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn store_service_session(
        &self,
        ticket: &str,
        session_id: &str,
    ) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        ensure_present(session_id, "session_id")?;
        self.sessions
            .write()
            .await
            .insert(ticket.to_string(), session_id.to_string());
        tracing::debug!(ticket, session_id, "stored service ticket session lookup");
        Ok(())
    }

    async fn read_service_session(&self, ticket: &str) -> TicketStoreResult<String> {
        ensure_present(ticket, "ticket")?;
        self.sessions
            .read()
            .await
            .get(ticket)
            .cloned()
            .ok_or_else(|| TicketStoreError::SessionNotFound(ticket.to_string()))
    }

    async fn cleanup_service_session(&self, ticket: &str) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        self.sessions.write().await.remove(ticket);
        Ok(())
    }

    async fn save_pgt_iou(&self, iou: &str, pgt: &str) -> TicketStoreResult<()> {
        ensure_present(iou, "pgt_iou")?;
        ensure_present(pgt, "pgt")?;
        self.pgtious
            .write()
            .await
            .insert(iou.to_string(), pgt.to_string());
        tracing::debug!(iou, "saved PGT for IOU");
        Ok(())
    }

    async fn retrieve_pgt(&self, iou: &str) -> TicketStoreResult<String> {
        ensure_present(iou, "pgt_iou")?;
        // remove-under-write-lock is the atomic consume
        self.pgtious
            .write()
            .await
            .remove(iou)
            .ok_or_else(|| TicketStoreError::PgtNotFound(iou.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_reads_service_session() {
        let store = InMemoryTicketStore::new();
        store
            .store_service_session("ST-1", "session-abc")
            .await
            .unwrap();
        assert_eq!(store.read_service_session("ST-1").await.unwrap(), "session-abc");
    }

    #[tokio::test]
    async fn read_of_unknown_ticket_fails_with_not_found() {
        let store = InMemoryTicketStore::new();
        assert!(matches!(
            store.read_service_session("ST-missing").await,
            Err(TicketStoreError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cleanup_removes_the_mapping() {
        let store = InMemoryTicketStore::new();
        store.store_service_session("ST-1", "sid").await.unwrap();
        store.cleanup_service_session("ST-1").await.unwrap();
        assert!(store.read_service_session("ST-1").await.is_err());
        // cleaning up again is not an error
        store.cleanup_service_session("ST-1").await.unwrap();
    }

    #[tokio::test]
    async fn retrieve_pgt_is_at_most_once() {
        let store = InMemoryTicketStore::new();
        store.save_pgt_iou("PGTIOU-1", "PGT-1").await.unwrap();

        assert_eq!(store.retrieve_pgt("PGTIOU-1").await.unwrap(), "PGT-1");
        assert!(matches!(
            store.retrieve_pgt("PGTIOU-1").await,
            Err(TicketStoreError::PgtNotFound(_))
        ));
    }

    #[tokio::test]
    async fn retrieve_pgt_for_unknown_iou_fails() {
        let store = InMemoryTicketStore::new();
        assert!(matches!(
            store.retrieve_pgt("PGTIOU-never-sent").await,
            Err(TicketStoreError::PgtNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_arguments_are_rejected() {
        let store = InMemoryTicketStore::new();
        assert!(matches!(
            store.save_pgt_iou("", "PGT-1").await,
            Err(TicketStoreError::InvalidArgument("pgt_iou"))
        ));
        assert!(matches!(
            store.save_pgt_iou("PGTIOU-1", "").await,
            Err(TicketStoreError::InvalidArgument("pgt"))
        ));
        assert!(matches!(
            store.store_service_session("", "sid").await,
            Err(TicketStoreError::InvalidArgument("ticket"))
        ));
        assert!(matches!(
            store.retrieve_pgt("").await,
            Err(TicketStoreError::InvalidArgument("pgt_iou"))
        ));
    }

    #[tokio::test]
    async fn concurrent_retrievals_have_a_single_winner() {
        let store = InMemoryTicketStore::new();
        store.save_pgt_iou("PGTIOU-race", "PGT-race").await.unwrap();

        let a = store.clone();
        let b = store.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.retrieve_pgt("PGTIOU-race").await }),
            tokio::spawn(async move { b.retrieve_pgt("PGTIOU-race").await }),
        );
        let results = [ra.unwrap(), rb.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn single_sign_out_returns_and_removes_the_session() {
        let store = InMemoryTicketStore::new();
        store.store_service_session("ST-9", "sid-9").await.unwrap();

        let sid = store.process_single_sign_out("ST-9").await.unwrap();
        assert_eq!(sid.as_deref(), Some("sid-9"));
        // mapping is gone, a second notification is a no-op
        assert_eq!(store.process_single_sign_out("ST-9").await.unwrap(), None);
    }
}
