//! Encoding of the document for the contents API.
//!
//! GitHub transports file bodies as standard base64 of the raw bytes and
//! wraps the encoded text at 60 columns on reads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::client::GitHubError;
use crate::sync::config::Document;

/// Pretty-printed JSON (2-space indent), base64 of its UTF-8 bytes
pub fn encode_document(document: &Document) -> Result<String, GitHubError> {
    let json = serde_json::to_string_pretty(document)?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Inverse of [`encode_document`]. An empty file is an empty document.
pub fn decode_document(encoded: &str) -> Result<Document, GitHubError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| GitHubError::Decode(format!("document is not UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<serde_json::Value>(&text)? {
        serde_json::Value::Array(records) => Ok(records),
        other => Err(GitHubError::Decode(format!(
            "expected a JSON array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
