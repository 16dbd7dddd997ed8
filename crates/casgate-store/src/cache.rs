//! TTL-evicting in-process key-value ticket store.
//!
//! Backed by `moka`. Entries expire on their own, which keeps the two
//! mappings from growing without bound: a PGT that was never retrieved
//! and a ticket whose session ended both age out.

use crate::error::{TicketStoreError, TicketStoreResult};
use crate::store::{ensure_present, TicketStore};
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

/// Time-to-live settings for [`CacheTicketStore`].
#[derive(Debug, Clone, Copy)]
pub struct CacheTicketStoreConfig {
    /// How long ticket → session mappings are kept.
    pub session_ttl: Duration,
    /// How long an unretrieved PGT is kept. The validation response that
    /// carries the IOU normally arrives within seconds of the callback.
    pub pgt_ttl: Duration,
}

impl Default for CacheTicketStoreConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(8 * 60 * 60),
            pgt_ttl: Duration::from_secs(10 * 60),
        }
    }
}

/// Key-value ticket store with TTL eviction.
#[derive(Clone)]
pub struct CacheTicketStore {
    sessions: Cache<String, String>,
    pgtious: Cache<String, String>,
}

impl CacheTicketStore {
    #[must_use]
    pub fn new(config: CacheTicketStoreConfig) -> Self {
        Self {
            sessions: Cache::builder().time_to_live(config.session_ttl).build(),
            pgtious: Cache::builder().time_to_live(config.pgt_ttl).build(),
        }
    }
}

impl Default for CacheTicketStore {
    fn default() -> Self {
        Self::new(CacheTicketStoreConfig::default())
    }
}

#[async_trait]
impl TicketStore for CacheTicketStore {
    async fn store_service_session(
        &self,
        ticket: &str,
        session_id: &str,
    ) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        ensure_present(session_id, "session_id")?;
        self.sessions
            .insert(ticket.to_string(), session_id.to_string())
            .await;
        Ok(())
    }

    async fn read_service_session(&self, ticket: &str) -> TicketStoreResult<String> {
        ensure_present(ticket, "ticket")?;
        self.sessions
            .get(ticket)
            .await
            .ok_or_else(|| TicketStoreError::SessionNotFound(ticket.to_string()))
    }

    async fn cleanup_service_session(&self, ticket: &str) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        self.sessions.remove(ticket).await;
        Ok(())
    }

    async fn save_pgt_iou(&self, iou: &str, pgt: &str) -> TicketStoreResult<()> {
        ensure_present(iou, "pgt_iou")?;
        ensure_present(pgt, "pgt")?;
        self.pgtious.insert(iou.to_string(), pgt.to_string()).await;
        Ok(())
    }

    async fn retrieve_pgt(&self, iou: &str) -> TicketStoreResult<String> {
        ensure_present(iou, "pgt_iou")?;
        // remove() returns the evicted value, making the consume atomic
        self.pgtious
            .remove(iou)
            .await
            .ok_or_else(|| TicketStoreError::PgtNotFound(iou.to_string()))
    }
}
