//! CAS protocol client.
//!
//! [`CasClient`] brokers every HTTP transaction with the CAS server:
//! service/proxy ticket validation, proxy-ticket requests, and the
//! login/logout URL construction used for browser redirects. It holds no
//! state beyond its configuration, an HTTP connection pool, and a handle
//! to the [`casgate_store::TicketStore`] used to join PGTs with their
//! IOUs.

pub mod client;
pub mod config;
pub mod error;

pub use client::CasClient;
pub use config::CasConfig;
pub use error::{ClientError, ClientResult};
