//! Parse incoming SAML `LogoutRequest` payloads for single-sign-out.
//!
//! The CAS server posts a `logoutRequest` form field containing a SAML
//! `LogoutRequest` envelope; only the `SessionIndex` element matters to a
//! CAS client — it names the service ticket whose local session must be
//! invalidated. The field value may be URL-escaped once.

use crate::error::{ProtocolError, ProtocolResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// Maximum accepted payload size; anything larger is rejected unparsed.
const MAX_LOGOUT_REQUEST_BYTES: usize = 512 * 1024;

/// Extract the `SessionIndex` from a raw `logoutRequest` field value.
pub fn extract_session_index(raw: &str) -> ProtocolResult<String> {
    if raw.len() > MAX_LOGOUT_REQUEST_BYTES {
        return Err(ProtocolError::InvalidLogoutRequest(
            "LogoutRequest too large".to_string(),
        ));
    }

    // The envelope may arrive URL-escaped once.
    let decoded;
    let xml = if raw.trim_start().starts_with('<') {
        raw
    } else {
        decoded = urlencoding::decode(raw)
            .map_err(|e| ProtocolError::InvalidLogoutRequest(format!("bad URL escaping: {e}")))?
            .into_owned();
        &decoded
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut saw_logout_request = false;
    let mut in_session_index = false;
    let mut session_index: Option<String> = None;

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                if local == "LogoutRequest" {
                    saw_logout_request = true;
                }
                in_session_index = local == "SessionIndex";
            }
            Ok(Event::Text(ref e)) => {
                if in_session_index && session_index.is_none() {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    if !text.is_empty() {
                        session_index = Some(text);
                    }
                }
            }
            Ok(Event::End(_)) => in_session_index = false,
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ProtocolError::InvalidLogoutRequest(format!(
                    "XML parse error: {e}"
                )));
            }
        }
        buf.clear();
    }

    if !saw_logout_request {
        return Err(ProtocolError::InvalidLogoutRequest(
            "missing LogoutRequest envelope".to_string(),
        ));
    }
    session_index.ok_or_else(|| {
        ProtocolError::InvalidLogoutRequest("missing SessionIndex".to_string())
    })
}
