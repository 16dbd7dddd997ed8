//! CAS ticket types.
//!
//! Tickets are opaque strings issued by the CAS server. The client never
//! inspects them beyond the `PT-` prefix that marks a proxy ticket.

use serde::{Deserialize, Serialize};

/// A service ticket received from the CAS server via the `ticket` query
/// parameter, bound to the service URL it was issued for.
///
/// Proxy tickets (prefix `PT-`) travel through the same validation flow;
/// [`ServiceTicket::is_proxy`] only affects logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTicket {
    /// The opaque, server-issued ticket string.
    pub ticket: String,
    /// The service URL this ticket was issued for.
    pub service: String,
    /// Whether validation should demand primary (non-SSO) authentication.
    pub renew: bool,
}

impl ServiceTicket {
    #[must_use]
    pub fn new(ticket: impl Into<String>, service: impl Into<String>, renew: bool) -> Self {
        Self {
            ticket: ticket.into(),
            service: service.into(),
            renew,
        }
    }

    /// True when the ticket string carries the proxy-ticket prefix.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.ticket.starts_with("PT-")
    }
}

impl AsRef<str> for ServiceTicket {
    fn as_ref(&self) -> &str {
        &self.ticket
    }
}

/// A proxy ticket obtained from the CAS `/proxy` endpoint for a target
/// service, using a previously retrieved proxy-granting ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyTicket {
    pub ticket: String,
    pub target_service: String,
}

impl ProxyTicket {
    #[must_use]
    pub fn new(ticket: impl Into<String>, target_service: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            target_service: target_service.into(),
        }
    }
}

/// A proxy-granting ticket joined with the IOU it was announced under.
///
/// The IOU arrives synchronously inside a validation response; the ticket
/// itself is pushed asynchronously to the proxy callback endpoint and the
/// two are joined through the ticket store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyGrantingTicket {
    pub ticket: String,
    pub iou: String,
}

impl ProxyGrantingTicket {
    #[must_use]
    pub fn new(ticket: impl Into<String>, iou: impl Into<String>) -> Self {
        Self {
            ticket: ticket.into(),
            iou: iou.into(),
        }
    }
}

impl std::fmt::Display for ProxyGrantingTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.ticket)
    }
}
