//! Decoding of model replies.
//!
//! Models are asked for `{"1": "...", "2": "..."}` but older prompts and some
//! models produce a bare array or wrap the list in an object. All shapes are
//! normalized into one string per requested item.

use crate::error::{Result, SubtransError};
use crate::subtitle::collapse_blank_lines;
use serde_json::{Map, Value};

/// Accepted reply shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `{"1": "...", "2": "..."}`
    Keyed(Map<String, Value>),
    /// `["...", "..."]`
    List(Vec<Value>),
    /// `{"translations": ["...", "..."]}`
    Nested(Vec<Value>),
}

/// Normalized reply, one text per requested item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedReply {
    pub texts: Vec<String>,
    pub substituted: usize,
}

impl Reply {
    /// Parse raw reply text.
    ///
    /// Objects are read as keyed when any key is an item number. Otherwise a
    /// keyed object one level down is used, then a list member, preferring
    /// `"translations"` and falling back to the first list in key order.
    /// Text that is not JSON, a JSON scalar, or an object with none of these
    /// shapes is an error.
    pub fn decode(raw: &str) -> Result<Self> {
        let body = strip_code_fence(raw);
        let value: Value = serde_json::from_str(body)
            .map_err(|e| SubtransError::Reply(format!("reply is not valid JSON: {}", e)))?;

        match value {
            Value::Array(values) => Ok(Reply::List(values)),
            Value::Object(map) => {
                if has_item_keys(&map) {
                    return Ok(Reply::Keyed(map));
                }
                if let Some(inner) = preferred_member(&map, |v| match v {
                    Value::Object(inner) if has_item_keys(inner) => Some(inner.clone()),
                    _ => None,
                }) {
                    return Ok(Reply::Keyed(inner));
                }
                if let Some(values) = preferred_member(&map, |v| v.as_array().cloned()) {
                    return Ok(Reply::Nested(values));
                }
                Err(SubtransError::Reply(format!(
                    "object has no item keys or list (keys: {})",
                    map.keys().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
            other => Err(SubtransError::Reply(format!(
                "expected a JSON object or array, got {}",
                type_name(&other)
            ))),
        }
    }

    /// Line the reply up with `sources`; missing or blank entries fall back to the source.
    pub fn normalize(self, sources: &[&str]) -> DecodedReply {
        let mut substituted = 0;
        let texts = sources
            .iter()
            .enumerate()
            .map(|(i, source)| {
                let value = match &self {
                    Reply::Keyed(map) => map.get(&(i + 1).to_string()),
                    Reply::List(values) | Reply::Nested(values) => values.get(i),
                };
                match value.and_then(value_text) {
                    Some(text) => text,
                    None => {
                        substituted += 1;
                        source.to_string()
                    }
                }
            })
            .collect();

        DecodedReply { texts, substituted }
    }
}

/// Decode and normalize in one step.
///
/// A keyed reply that answers none of the requested items is an error, so the
/// batch is retried instead of silently keeping every source line.
pub fn decode_reply(raw: &str, sources: &[&str]) -> Result<DecodedReply> {
    let reply = Reply::decode(raw)?;
    if let Reply::Keyed(ref map) = reply {
        let answered = (1..=sources.len()).any(|key| map.contains_key(&key.to_string()));
        if !sources.is_empty() && !answered {
            return Err(SubtransError::Reply(format!(
                "reply has none of the keys 1..{}",
                sources.len()
            )));
        }
    }
    Ok(reply.normalize(sources))
}

fn has_item_keys(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| key.parse::<usize>().is_ok())
}

/// Apply `pick` to the `"translations"` member first, then to every member in key order.
fn preferred_member<T>(map: &Map<String, Value>, pick: impl Fn(&Value) -> Option<T>) -> Option<T> {
    map.get("translations")
        .and_then(&pick)
        .or_else(|| map.values().find_map(&pick))
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => ["text", "translation"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))?,
        _ => return None,
    };

    let text = collapse_blank_lines(&text.replace("\r\n", "\n"));
    (!text.is_empty()).then_some(text)
}

/// Remove a surrounding Markdown code fence such as ```` ```json ... ``` ````.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
