//! Helpers for interpreting model output text.
//!
//! Generative models frequently wrap JSON answers in Markdown code fences.
//! These helpers strip the fences and parse the payload, falling back to the
//! raw text when no structured shape can be recovered.

use serde_json::Value;

use crate::errors::ParseError;

/// Parses model output that may be wrapped in a ```` ```json ```` fence.
pub fn parse_fenced_json(text: &str) -> Result<Value, ParseError> {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest.trim_start();
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest.trim_start();
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest.trim_end();
    }
    serde_json::from_str(cleaned).map_err(|err| ParseError::new(err.to_string(), cleaned))
}

/// Parses model output as JSON, substituting the raw text on failure.
///
/// A parse failure is degraded, not fatal: the caller still gets a value,
/// just an unstructured one.
#[must_use]
pub fn json_or_text(text: &str) -> Value {
    match parse_fenced_json(text) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "model output was not valid JSON, keeping raw text");
            Value::String(text.trim().to_string())
        }
    }
}
