//! Parse CAS validation responses.
//!
//! Two wire formats are accepted: the CAS 2.0 XML body
//! (`cas:serviceResponse` with an `authenticationSuccess` or
//! `authenticationFailure` child) and the legacy CAS 1.0 two-line
//! plaintext body (`yes\n<user>\n` / `no\n\n`). Plaintext is detected
//! first so that the XML parser never sees it.

use crate::attributes::{decode_value, AttributeFormat};
use crate::error::{ProtocolError, ProtocolResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Which protocol revision produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CasProtocol {
    /// Legacy two-line plaintext.
    V1,
    /// CAS 2.0 XML.
    V2,
}

impl std::fmt::Display for CasProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CasProtocol::V1 => f.write_str("1.0"),
            CasProtocol::V2 => f.write_str("2.0"),
        }
    }
}

/// The typed result of a ticket validation round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub protocol: CasProtocol,
    pub success: bool,
    /// Authenticated username; present on success.
    pub user: Option<String>,
    /// The proxy-granting-ticket IOU announced by the server. This is the
    /// IOU, never the PGT itself — the PGT arrives via the proxy callback.
    pub pgt_iou: Option<String>,
    /// Proxy chain, most recent proxy first.
    pub proxies: Vec<String>,
    /// Attributes outside the `cas:` protocol vocabulary.
    pub extra_attributes: Map<String, Value>,
    pub failure_code: Option<String>,
    pub failure_message: Option<String>,
}

impl ValidationOutcome {
    fn empty(protocol: CasProtocol, success: bool) -> Self {
        Self {
            protocol,
            success,
            user: None,
            pgt_iou: None,
            proxies: Vec::new(),
            extra_attributes: Map::new(),
            failure_code: None,
            failure_message: None,
        }
    }
}

fn plaintext_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\A(yes|no)\n(.*)\n\z").expect("static regex"))
}

/// Parse a raw validation response body.
pub fn parse_validation_response(
    raw: &str,
    format: AttributeFormat,
) -> ProtocolResult<ValidationOutcome> {
    if raw.trim().is_empty() {
        return Err(ProtocolError::MalformedResponse(
            "empty response body".to_string(),
        ));
    }

    if let Some(caps) = plaintext_re().captures(raw) {
        let success = &caps[1] == "yes";
        let user = caps[2].trim();
        tracing::debug!(success, "parsed CAS 1.0 plaintext response");
        let mut outcome = ValidationOutcome::empty(CasProtocol::V1, success);
        outcome.user = (!user.is_empty()).then(|| user.to_string());
        return Ok(outcome);
    }

    let mut parser = V2Parser::new(format);
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => parser.open(e, false)?,
            Ok(Event::Empty(ref e)) => parser.open(e, true)?,
            Ok(Event::Text(ref e)) => {
                parser.text(&e.unescape().unwrap_or_default());
            }
            Ok(Event::CData(ref e)) => {
                parser.text(&String::from_utf8_lossy(&e.clone().into_inner()));
            }
            Ok(Event::End(ref e)) => {
                let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
                parser.close(&local);
            }
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

    parser.finish()
}

/// What the text content of the current element should be stored as.
enum Capture {
    User,
    PgtIou,
    Proxy,
    Extra(String),
    FailureMessage,
}

struct V2Parser {
    format: AttributeFormat,
    stack: Vec<String>,
    saw_root: bool,
    success: Option<bool>,
    outcome: ValidationOutcome,
    capture: Option<(String, Capture)>,
    text: String,
}

impl V2Parser {
    fn new(format: AttributeFormat) -> Self {
        Self {
            format,
            stack: Vec::new(),
            saw_root: false,
            success: None,
            outcome: ValidationOutcome::empty(CasProtocol::V2, false),
            capture: None,
            text: String::new(),
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, self_closing: bool) -> ProtocolResult<()> {
        let local = String::from_utf8_lossy(e.local_name().into_inner()).to_string();
        let prefix = e
            .name()
            .prefix()
            .map(|p| String::from_utf8_lossy(p.into_inner()).to_string());
        let cas_prefixed = prefix.as_deref() == Some("cas");

        match self.stack.len() {
            0 => {
                if local != "serviceResponse" {
                    return Err(ProtocolError::MalformedResponse(format!(
                        "missing cas:serviceResponse root element (found <{local}>)"
                    )));
                }
                self.saw_root = true;
            }
            1 => match local.as_str() {
                "authenticationSuccess" => self.success = Some(true),
                "authenticationFailure" => {
                    self.success = Some(false);
                    self.outcome.failure_code = attr_value(e, "code");
                    self.start_capture(&local, Capture::FailureMessage);
                }
                other => {
                    return Err(ProtocolError::MalformedResponse(format!(
                        "unexpected response element <{other}>"
                    )));
                }
            },
            2 if self.success == Some(true) => match local.as_str() {
                "user" if cas_prefixed => self.start_capture(&local, Capture::User),
                "proxyGrantingTicket" if cas_prefixed => {
                    self.start_capture(&local, Capture::PgtIou);
                }
                "proxies" | "attributes" if cas_prefixed => {}
                "attribute" if cas_prefixed => self.insert_attribute_pair(e),
                _ if !cas_prefixed => {
                    self.start_capture(&local, Capture::Extra(local.clone()));
                }
                _ => {}
            },
            3 if self.success == Some(true) => {
                let parent = self.stack.last().map(String::as_str);
                match (parent, local.as_str()) {
                    (Some("proxies"), "proxy") => self.start_capture(&local, Capture::Proxy),
                    (Some("attributes"), _) => {
                        self.start_capture(&local, Capture::Extra(local.clone()));
                    }
                    _ => {}
                }
            }
            _ => {}
        }

        if self_closing {
            self.close(&local);
        } else {
            self.stack.push(local);
        }
        Ok(())
    }

    fn start_capture(&mut self, elem: &str, what: Capture) {
        if self.capture.is_none() {
            self.capture = Some((elem.to_string(), what));
            self.text.clear();
        }
    }

    fn insert_attribute_pair(&mut self, e: &BytesStart<'_>) {
        if let Some(name) = attr_value(e, "name") {
            let value = attr_value(e, "value").unwrap_or_default();
            self.outcome
                .extra_attributes
                .insert(name, decode_value(&value, self.format));
        }
    }

    fn text(&mut self, chunk: &str) {
        if self.capture.is_some() {
            self.text.push_str(chunk);
        }
    }

    fn close(&mut self, local: &str) {
        if self.stack.last().map(String::as_str) == Some(local) {
            self.stack.pop();
        }
        let Some((elem, what)) = self.capture.take() else {
            return;
        };
        if elem != local {
            // Still inside a nested element of the captured one.
            self.capture = Some((elem, what));
            return;
        }
        let trimmed = self.text.trim();
        match what {
            Capture::User => {
                self.outcome.user = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            Capture::PgtIou => {
                self.outcome.pgt_iou = (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            Capture::Proxy => {
                if !trimmed.is_empty() {
                    self.outcome.proxies.push(trimmed.to_string());
                }
            }
            Capture::Extra(key) => {
                let value = decode_value(&self.text, self.format);
                self.outcome.extra_attributes.insert(key, value);
            }
            Capture::FailureMessage => {
                self.outcome.failure_message =
                    (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
        }
        self.text.clear();
    }

    fn finish(mut self) -> ProtocolResult<ValidationOutcome> {
        if !self.saw_root {
            return Err(ProtocolError::MalformedResponse(
                "missing cas:serviceResponse root element".to_string(),
            ));
        }
        let Some(success) = self.success else {
            return Err(ProtocolError::MalformedResponse(
                "cas:serviceResponse has no authenticationSuccess/authenticationFailure child"
                    .to_string(),
            ));
        };
        self.outcome.success = success;
        tracing::debug!(
            success,
            user = ?self.outcome.user,
            pgt_iou = ?self.outcome.pgt_iou,
            "parsed CAS 2.0 validation response"
        );
        Ok(self.outcome)
    }
}

fn attr_value(e: &BytesStart<'_>, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().into_inner()).to_string();
        if key == name {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_success() {
        let xml = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                     <cas:authenticationSuccess>\
                       <cas:user>alice</cas:user>\
                     </cas:authenticationSuccess>\
                   </cas:serviceResponse>";
        let outcome = parse_validation_response(xml, AttributeFormat::Raw).unwrap();
        assert_eq!(outcome.protocol, CasProtocol::V2);
        assert!(outcome.success);
        assert_eq!(outcome.user.as_deref(), Some("alice"));
        assert!(outcome.pgt_iou.is_none());
        assert!(outcome.extra_attributes.is_empty());
    }

    #[test]
    fn parses_failure_with_code_and_message() {
        let xml = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                     <cas:authenticationFailure code=\"INVALID_TICKET\">\
                       Ticket ST-123 not recognized\
                     </cas:authenticationFailure>\
                   </cas:serviceResponse>";
        let outcome = parse_validation_response(xml, AttributeFormat::Raw).unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.failure_code.as_deref(), Some("INVALID_TICKET"));
        assert_eq!(
            outcome.failure_message.as_deref(),
            Some("Ticket ST-123 not recognized")
        );
    }

    #[test]
    fn failure_without_code_keeps_the_message() {
        let xml = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                     <cas:authenticationFailure>Some Error Text</cas:authenticationFailure>\
                   </cas:serviceResponse>";
        let outcome = parse_validation_response(xml, AttributeFormat::Raw).unwrap();
        assert!(!outcome.success);
        assert!(outcome.failure_code.is_none());
        assert_eq!(outcome.failure_message.as_deref(), Some("Some Error Text"));
    }

    #[test]
    fn parses_pgt_iou_and_proxy_chain() {
        let xml = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                     <cas:authenticationSuccess>\
                       <cas:user>bob</cas:user>\
                       <cas:proxyGrantingTicket>PGTIOU-84678-8a9d</cas:proxyGrantingTicket>\
                       <cas:proxies>\
                         <cas:proxy>https://proxy2/pgtUrl</cas:proxy>\
                         <cas:proxy>https://proxy1/pgtUrl</cas:proxy>\
                       </cas:proxies>\
                     </cas:authenticationSuccess>\
                   </cas:serviceResponse>";
        let outcome = parse_validation_response(xml, AttributeFormat::Raw).unwrap();
        assert_eq!(outcome.pgt_iou.as_deref(), Some("PGTIOU-84678-8a9d"));
        assert_eq!(
            outcome.proxies,
            vec!["https://proxy2/pgtUrl", "https://proxy1/pgtUrl"]
        );
    }

    #[test]
    fn parses_wrapped_extra_attributes_with_json_decoding() {
        let xml = r#"<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:attributes>
      <cas:first_name>Jack</cas:first_name>
      <cas:last_name>92.5</cas:last_name>
      <cas:mobile_phone></cas:mobile_phone>
      <cas:global_roles><![CDATA[]]></cas:global_roles>
      <cas:foo_data> <![CDATA[[{"id":10529}]]]></cas:foo_data>
      <cas:food_data> <![CDATA[{"id":10529}]]></cas:food_data>
      <cas:allegedly_yaml>- 10</cas:allegedly_yaml>
    </cas:attributes>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;
        let outcome = parse_validation_response(xml, AttributeFormat::Json).unwrap();
        let attrs = &outcome.extra_attributes;
        assert_eq!(attrs["first_name"], json!("Jack"));
        assert_eq!(attrs["last_name"], json!("92.5"));
        assert_eq!(attrs["mobile_phone"], Value::Null);
        assert_eq!(attrs["global_roles"], Value::Null);
        assert_eq!(attrs["foo_data"], json!([{"id": 10529}]));
        assert_eq!(attrs["food_data"], json!({"id": 10529}));
        assert_eq!(attrs["allegedly_yaml"], json!("- 10"));
    }

    #[test]
    fn parses_attribute_name_value_pairs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<cas:serviceResponse xmlns:cas="http://www.yale.edu/tp/cas">
  <cas:authenticationSuccess>
    <cas:user>myuser</cas:user>
    <cas:attribute name="username" value="myuser"/>
    <cas:attribute name="name" value="My User"/>
    <cas:attribute name="email" value="myuser@mail.example.com"/>
  </cas:authenticationSuccess>
</cas:serviceResponse>"#;
        let outcome = parse_validation_response(xml, AttributeFormat::Raw).unwrap();
        assert_eq!(outcome.user.as_deref(), Some("myuser"));
        assert_eq!(outcome.extra_attributes["username"], json!("myuser"));
        assert_eq!(outcome.extra_attributes["name"], json!("My User"));
        assert_eq!(
            outcome.extra_attributes["email"],
            json!("myuser@mail.example.com")
        );
    }

    #[test]
    fn parses_unwrapped_non_cas_siblings_as_extra_attributes() {
        let xml = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                     <cas:authenticationSuccess>\
                       <cas:user>carol</cas:user>\
                       <department xmlns=\"http://example.com\">Library</department>\
                     </cas:authenticationSuccess>\
                   </cas:serviceResponse>";
        let outcome = parse_validation_response(xml, AttributeFormat::Raw).unwrap();
        assert_eq!(outcome.extra_attributes["department"], json!("Library"));
    }

    #[test]
    fn parses_legacy_plaintext() {
        let outcome = parse_validation_response("yes\nbob\n", AttributeFormat::Raw).unwrap();
        assert_eq!(outcome.protocol, CasProtocol::V1);
        assert!(outcome.success);
        assert_eq!(outcome.user.as_deref(), Some("bob"));

        let outcome = parse_validation_response("no\n\n", AttributeFormat::Raw).unwrap();
        assert_eq!(outcome.protocol, CasProtocol::V1);
        assert!(!outcome.success);
        assert!(outcome.user.is_none());
    }

    #[test]
    fn rejects_empty_body() {
        let err = parse_validation_response("  \n ", AttributeFormat::Raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_wrong_root_element() {
        let err = parse_validation_response("<wrong/>", AttributeFormat::Raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_unexpected_outcome_element() {
        let xml = "<cas:serviceResponse xmlns:cas=\"http://www.yale.edu/tp/cas\">\
                     <cas:somethingElse/>\
                   </cas:serviceResponse>";
        let err = parse_validation_response(xml, AttributeFormat::Raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_non_xml_garbage() {
        let err = parse_validation_response("not a cas response", AttributeFormat::Raw).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResponse(_)));
    }
}
