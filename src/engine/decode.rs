//! Decoding of cached values
//!
//! Counters written by older deployments may be plain numbers or numeric
//! strings, and decision records may come back as a JSON object or as a
//! string holding one. These functions spell out the accepted shapes.

use anyhow::{anyhow, Context};
use serde_json::Value;

use super::types::{DecisionRecord, Persona};

/// Whether a cached value counts as present
///
/// Null, `false`, zero, and empty strings, arrays or objects are treated
/// as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Decode a counter, in this order:
///
/// 1. integer number: as is
/// 2. fractional number: truncated toward zero
/// 3. string: trimmed, parsed as a float, truncated
/// 4. boolean: 1 or 0
/// 5. anything else, or an unparseable / non-finite value: 0
pub fn decode_count(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
            .unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// Decode daily cap usage: a counter clamped at zero
pub fn decode_cap_usage(value: Option<&Value>) -> i64 {
    decode_count(value).max(0)
}

/// Decode a stored persona; unknown or missing values mean `NEW`
pub fn decode_persona(value: Option<&Value>) -> Persona {
    value
        .and_then(Value::as_str)
        .and_then(Persona::parse)
        .unwrap_or(Persona::New)
}

/// Decode a stored decision record
///
/// Accepts an object with the record's fields, or a string containing such
/// an object. Any other shape is an error.
pub fn decode_decision(value: Value) -> anyhow::Result<DecisionRecord> {
    match value {
        Value::Object(_) => {
            serde_json::from_value(value).context("cached decision record is malformed")
        }
        Value::String(raw) => {
            serde_json::from_str(&raw).context("cached decision string is not a record")
        }
        other => Err(anyhow!(
            "unexpected cached decision type: {}",
            type_name(&other)
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
