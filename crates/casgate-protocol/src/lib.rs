//! CAS wire-format codec.
//!
//! Parses the two response formats a CAS server can produce — CAS 2.0 XML
//! (`cas:serviceResponse`) and the legacy two-line plaintext protocol —
//! into typed outcomes, plus the minimal SAML `LogoutRequest` parsing
//! needed for single-sign-out.

pub mod attributes;
pub mod error;
pub mod logout;
pub mod proxy;
pub mod validation;

pub use attributes::AttributeFormat;
pub use error::{ProtocolError, ProtocolResult};
pub use logout::extract_session_index;
pub use proxy::{parse_proxy_response, ProxyOutcome};
pub use validation::{parse_validation_response, CasProtocol, ValidationOutcome};
