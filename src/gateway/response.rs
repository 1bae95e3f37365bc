//! Cleaning and parsing of provider completion text.

use crate::core::ProviderError;

use serde_json::{Map, Value};

/// Removes a leading ```` ```json ```` fence and a trailing ```` ``` ```` fence,
/// along with surrounding whitespace.
///
/// Text without fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```JSON") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Parses completion text into a JSON object.
///
/// # Errors
///
/// Returns `ProviderError::Unparseable` if the text is not JSON or is JSON
/// but not an object.
pub fn parse_payload(provider: &str, text: &str) -> Result<Map<String, Value>, ProviderError> {
    let body = strip_code_fences(text);
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ProviderError::unparseable(
            provider,
            format!("expected a JSON object, got {}", json_type_name(&other)),
        )),
        Err(e) => Err(ProviderError::unparseable(provider, e.to_string())),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
