//! Proxy callback receiver.
//!
//! The CAS server pushes proxy-granting tickets to a client-hosted HTTPS
//! endpoint: first a parameterless probe, then `pgtIou` + `pgt` (some
//! servers send `pgtId` instead of `pgt`). This crate provides that
//! endpoint as an axum router writing into a
//! [`casgate_store::TicketStore`].

pub mod error;
pub mod handlers;
pub mod router;

pub use error::CallbackError;
pub use router::{callback_router, CallbackState};
