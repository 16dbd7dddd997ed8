//! Parse CAS proxy-ticket responses.
//!
//! The `/proxy` endpoint answers with `cas:proxySuccess` (carrying a
//! `cas:proxyTicket`) or `cas:proxyFailure` (code attribute + message).

use crate::error::{ProtocolError, ProtocolResult};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// The typed result of a proxy-ticket request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// The server granted a proxy ticket.
    Granted { proxy_ticket: String },
    /// The server refused the request.
    Denied {
        code: Option<String>,
        message: Option<String>,
    },
}

/// Parse a raw proxy response body.
pub fn parse_proxy_response(raw: &str) -> ProtocolResult<ProxyOutcome> {
    if raw.trim().is_empty() {
        return Err(ProtocolError::MalformedResponse(
            "empty response body".to_string(),
        ));
    }

    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut saw_root = false;
    let mut granted: Option<bool> = None;
    let mut code = None;
    let mut proxy_ticket = None;
    let mut message = None;
    let mut current = String::new();

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                if !saw_root {
                    if local != "serviceResponse" {
                        return Err(ProtocolError::MalformedResponse(format!(
                            "missing cas:serviceResponse root element (found <{local}>)"
                        )));
                    }
                    saw_root = true;
                } else if granted.is_none() {
                    match local.as_str() {
                        "proxySuccess" => granted = Some(true),
                        "proxyFailure" => {
                            granted = Some(false);
                            for attr in e.attributes().flatten() {
                                let key = String::from_utf8_lossy(
                                    attr.key.local_name().into_inner(),
                                )
                                .to_string();
                                if key == "code" {
                                    code =
                                        Some(String::from_utf8_lossy(&attr.value).to_string());
                                }
                            }
                        }
                        other => {
                            return Err(ProtocolError::MalformedResponse(format!(
                                "unexpected proxy response element <{other}>"
                            )));
                        }
                    }
                }
                current = local;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                match (granted, current.as_str()) {
                    (Some(true), "proxyTicket") => proxy_ticket = Some(text),
                    (Some(false), "proxyFailure") => message = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current.clear(),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ProtocolError::MalformedResponse(format!(
                    "XML parse error: {e}"
                )));
            }
        }
        buf.clear();
    }

    match granted {
        Some(true) => {
            let proxy_ticket = proxy_ticket.ok_or_else(|| {
                ProtocolError::MalformedResponse(
                    "cas:proxySuccess without cas:proxyTicket".to_string(),
                )
            })?;
            Ok(ProxyOutcome::Granted { proxy_ticket })
        }
        Some(false) => Ok(ProxyOutcome::Denied { code, message }),
        None => Err(ProtocolError::MalformedResponse(
            "cas:serviceResponse has no proxySuccess/proxyFailure child".to_string(),
        )),
    }
}
