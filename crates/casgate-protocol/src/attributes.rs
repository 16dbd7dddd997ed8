//! Extra-attribute value decoding.
//!
//! CAS deployments encode extra attributes either as raw strings or as
//! JSON documents embedded in element text. Empty values — whether plain
//! or CDATA-wrapped — normalize to JSON `null`: "empty but present" and
//! "absent" are deliberately indistinguishable to consumers.

use serde_json::Value;

/// How extra-attribute element text is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeFormat {
    /// Keep every value as its trimmed string form.
    #[default]
    Raw,
    /// Decode array/object-shaped values structurally; anything else
    /// (including text that merely fails JSON parsing) stays a string.
    Json,
}

/// Decode one attribute value according to `format`.
#[must_use]
pub fn decode_value(raw: &str, format: AttributeFormat) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match format {
        AttributeFormat::Raw => Value::String(trimmed.to_string()),
        AttributeFormat::Json => match serde_json::from_str::<Value>(trimmed) {
            Ok(v @ (Value::Array(_) | Value::Object(_))) => v,
            _ => Value::String(trimmed.to_string()),
        },
    }
}
