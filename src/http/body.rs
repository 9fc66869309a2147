//! Request body parsing
//!
//! Classifies a body by its Content-Type and decodes JSON and URL-encoded
//! form bodies into a `serde_json::Value`. Multipart bodies are streamed by
//! the upload handler instead.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    UrlEncoded,
    Multipart,
    Other,
}

impl BodyKind {
    /// Classify from a Content-Type header value; parameters are ignored
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(value) = content_type else {
            return Self::Other;
        };
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Self::Json,
            "application/x-www-form-urlencoded" => Self::UrlEncoded,
            "multipart/form-data" => Self::Multipart,
            s if s.starts_with("application/") && s.ends_with("+json") => Self::Json,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),
    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("failed to read request body: {0}")]
    Read(String),
}

/// Decode a collected body.
///
/// Empty bodies decode to `Value::Null`. `Multipart` and `Other` bodies are
/// not decoded here and also yield `Null`.
pub fn parse_form(kind: BodyKind, bytes: &[u8]) -> Result<Value, BodyError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }

    match kind {
        BodyKind::Json => Ok(serde_json::from_slice(bytes)?),
        BodyKind::UrlEncoded => {
            let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)?;
            Ok(Value::Object(collect_pairs(pairs)))
        }
        BodyKind::Multipart | BodyKind::Other => Ok(Value::Null),
    }
}

/// Fold key/value pairs into an object; repeated keys become arrays
fn collect_pairs(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    map
}
