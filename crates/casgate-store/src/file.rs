//! Filesystem-backed ticket store.
//!
//! One file per entry: `sessions/cas_sess.<ticket>` holds the session id,
//! `pgtious/cas_pgtiou.<iou>` holds the PGT. Works for small multi-worker
//! deployments that share a filesystem; the atomic-consume guarantee for
//! PGTs comes from `rename(2)` having a single winner.

use crate::error::{TicketStoreError, TicketStoreResult};
use crate::store::{ensure_present, TicketStore};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Ticket store keeping its entries in a directory tree.
#[derive(Debug, Clone)]
pub struct LocalDirTicketStore {
    sessions_dir: PathBuf,
    pgtious_dir: PathBuf,
}

impl LocalDirTicketStore {
    /// Create a store rooted at `dir`, creating `sessions/` and
    /// `pgtious/` subdirectories as needed.
    pub fn new(dir: impl AsRef<Path>) -> TicketStoreResult<Self> {
        let root = dir.as_ref();
        let sessions_dir = root.join("sessions");
        let pgtious_dir = root.join("pgtious");
        std::fs::create_dir_all(&sessions_dir)?;
        std::fs::create_dir_all(&pgtious_dir)?;
        Ok(Self {
            sessions_dir,
            pgtious_dir,
        })
    }

    fn session_path(&self, ticket: &str) -> PathBuf {
        self.sessions_dir.join(format!("cas_sess.{}", safe_name(ticket)))
    }

    fn pgtiou_path(&self, iou: &str) -> PathBuf {
        self.pgtious_dir.join(format!("cas_pgtiou.{}", safe_name(iou)))
    }
}

/// Tickets are opaque; anything that could be path syntax is replaced.
fn safe_name(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl TicketStore for LocalDirTicketStore {
    async fn store_service_session(
        &self,
        ticket: &str,
        session_id: &str,
    ) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        ensure_present(session_id, "session_id")?;
        tokio::fs::write(self.session_path(ticket), session_id).await?;
        tracing::debug!(ticket, session_id, "stored service ticket session lookup");
        Ok(())
    }

    async fn read_service_session(&self, ticket: &str) -> TicketStoreResult<String> {
        ensure_present(ticket, "ticket")?;
        match tokio::fs::read_to_string(self.session_path(ticket)).await {
            Ok(session_id) => Ok(session_id),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TicketStoreError::SessionNotFound(ticket.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn cleanup_service_session(&self, ticket: &str) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        match tokio::fs::remove_file(self.session_path(ticket)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_pgt_iou(&self, iou: &str, pgt: &str) -> TicketStoreResult<()> {
        ensure_present(iou, "pgt_iou")?;
        ensure_present(pgt, "pgt")?;
        tokio::fs::write(self.pgtiou_path(iou), pgt).await?;
        tracing::debug!(iou, "saved PGT for IOU");
        Ok(())
    }

    async fn retrieve_pgt(&self, iou: &str) -> TicketStoreResult<String> {
        ensure_present(iou, "pgt_iou")?;
        let src = self.pgtiou_path(iou);
        // Claim the entry by renaming it to a name only this call knows;
        // concurrent retrievals race on the rename and exactly one wins.
        let claim = src.with_extension(format!("claim.{}", Uuid::new_v4()));
        match tokio::fs::rename(&src, &claim).await {
            Ok(()) => {
                let pgt = tokio::fs::read_to_string(&claim).await?;
                let _ = tokio::fs::remove_file(&claim).await;
                Ok(pgt)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(TicketStoreError::PgtNotFound(iou.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
