//! The ticket validation capability.
//!
//! [`CasFilter`](crate::CasFilter) depends on this trait rather than on
//! [`CasClient`] directly so tests can substitute a mock and assert on
//! invocation counts.

use async_trait::async_trait;
use casgate_client::{CasClient, ClientResult};
use casgate_core::{ProxyGrantingTicket, ServiceTicket};
use casgate_protocol::ValidationOutcome;

/// The subset of client operations the filter needs.
#[async_trait]
pub trait TicketValidator: Send + Sync {
    async fn validate_service_ticket(&self, st: &ServiceTicket) -> ClientResult<ValidationOutcome>;

    async fn retrieve_proxy_granting_ticket(
        &self,
        pgt_iou: &str,
    ) -> ClientResult<ProxyGrantingTicket>;

    /// Build the login redirect URL for a service.
    fn add_service_to_login_url(&self, service_url: &str) -> String;
}

#[async_trait]
impl TicketValidator for CasClient {
    async fn validate_service_ticket(&self, st: &ServiceTicket) -> ClientResult<ValidationOutcome> {
        CasClient::validate_service_ticket(self, st).await
    }

    async fn retrieve_proxy_granting_ticket(
        &self,
        pgt_iou: &str,
    ) -> ClientResult<ProxyGrantingTicket> {
        CasClient::retrieve_proxy_granting_ticket(self, pgt_iou).await
    }

    fn add_service_to_login_url(&self, service_url: &str) -> String {
        CasClient::add_service_to_login_url(self, service_url)
    }
}
