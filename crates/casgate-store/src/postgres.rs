//! PostgreSQL-backed ticket store.
//!
//! Expects two tables owned by the host application's migrations:
//!
//! ```sql
//! CREATE TABLE cas_pgtious (
//!     pgt_iou    TEXT PRIMARY KEY,
//!     pgt_id     TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE TABLE cas_service_sessions (
//!     service_ticket TEXT PRIMARY KEY,
//!     session_id     TEXT NOT NULL,
//!     created_at     TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! The single-use PGT consume is one `DELETE .. RETURNING` statement, so
//! concurrent retrievals of the same IOU resolve in the database without
//! client-side locking.

use crate::error::{TicketStoreError, TicketStoreResult};
use crate::store::{ensure_present, TicketStore};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// Ticket store backed by a `PgPool`.
pub struct PostgresTicketStore {
    pool: PgPool,
}

impl PostgresTicketStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PostgresTicketStore {
    async fn store_service_session(
        &self,
        ticket: &str,
        session_id: &str,
    ) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        ensure_present(session_id, "session_id")?;
        sqlx::query(
            r"
            INSERT INTO cas_service_sessions (service_ticket, session_id)
            VALUES ($1, $2)
            ON CONFLICT (service_ticket) DO UPDATE SET session_id = EXCLUDED.session_id
            ",
        )
        .bind(ticket)
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        tracing::debug!(ticket, session_id, "stored service ticket session lookup");
        Ok(())
    }

    async fn read_service_session(&self, ticket: &str) -> TicketStoreResult<String> {
        ensure_present(ticket, "ticket")?;
        let row = sqlx::query(
            r"
            SELECT session_id FROM cas_service_sessions WHERE service_ticket = $1
            ",
        )
        .bind(ticket)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.get("session_id"))
            .ok_or_else(|| TicketStoreError::SessionNotFound(ticket.to_string()))
    }

    async fn cleanup_service_session(&self, ticket: &str) -> TicketStoreResult<()> {
        ensure_present(ticket, "ticket")?;
        sqlx::query(
            r"
            DELETE FROM cas_service_sessions WHERE service_ticket = $1
            ",
        )
        .bind(ticket)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_pgt_iou(&self, iou: &str, pgt: &str) -> TicketStoreResult<()> {
        ensure_present(iou, "pgt_iou")?;
        ensure_present(pgt, "pgt")?;
        // The CAS server may redeliver a callback; last write wins.
        sqlx::query(
            r"
            INSERT INTO cas_pgtious (pgt_iou, pgt_id)
            VALUES ($1, $2)
            ON CONFLICT (pgt_iou) DO UPDATE SET pgt_id = EXCLUDED.pgt_id
            ",
        )
        .bind(iou)
        .bind(pgt)
        .execute(&self.pool)
        .await?;
        tracing::debug!(iou, "saved PGT for IOU");
        Ok(())
    }

    async fn retrieve_pgt(&self, iou: &str) -> TicketStoreResult<String> {
        ensure_present(iou, "pgt_iou")?;
        let row = sqlx::query(
            r"
            DELETE FROM cas_pgtious WHERE pgt_iou = $1 RETURNING pgt_id
            ",
        )
        .bind(iou)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.get("pgt_id"))
            .ok_or_else(|| TicketStoreError::PgtNotFound(iou.to_string()))
    }
}
