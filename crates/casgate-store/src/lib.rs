//! Pluggable ticket stores.
//!
//! A [`TicketStore`] owns the two mappings the CAS protocol needs
//! persisted on the client side: PGT-IOU → PGT (written by the proxy
//! callback, consumed exactly once during validation) and service-ticket
//! → session-id (used to invalidate local sessions on single-sign-out).
//!
//! Backends differ only in storage medium:
//!
//! - [`InMemoryTicketStore`] - process-local, for tests and single-node
//!   deployments
//! - [`LocalDirTicketStore`] - one file per entry on a (shared) filesystem
//! - [`PostgresTicketStore`] - sqlx-backed relational tables
//! - [`CacheTicketStore`] - TTL-evicting in-process key-value store

pub mod cache;
pub mod error;
pub mod file;
pub mod memory;
pub mod postgres;
pub mod store;

pub use cache::{CacheTicketStore, CacheTicketStoreConfig};
pub use error::{TicketStoreError, TicketStoreResult};
pub use file::LocalDirTicketStore;
pub use memory::InMemoryTicketStore;
pub use postgres::PostgresTicketStore;
pub use store::TicketStore;
