//! Parsing of JSON answers from language models
//!
//! Model output is only ever parsed as JSON, never evaluated. Answers are
//! often wrapped in Markdown code fences or put the payload under a key other
//! than the one the prompt asked for.

use crate::error::{AppError, Result};
use serde_json::Value;

/// Remove a surrounding ```json ... ``` fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse a model answer into a JSON value
pub fn parse_response(raw: &str) -> Result<Value> {
    let body = strip_code_fences(raw);
    if body.is_empty() {
        return Err(AppError::MalformedResponse("empty model response".to_string()));
    }
    serde_json::from_str(body).map_err(|e| {
        AppError::MalformedResponse(format!("model response is not valid JSON: {}", e))
    })
}

/// Look up `primary`, then each fallback key, in a JSON object.
///
/// Keys are compared case-insensitively.
pub fn find_key<'a>(value: &'a Value, primary: &str, fallbacks: &[&str]) -> Option<&'a Value> {
    let object = value.as_object()?;
    std::iter::once(primary)
        .chain(fallbacks.iter().copied())
        .find_map(|key| {
            object.get(key).or_else(|| {
                object
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| v)
            })
        })
}

/// Numeric field that may arrive as a number or a numeric string
pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
