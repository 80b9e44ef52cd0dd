//! Parse-and-validate helpers for structured model output.
//!
//! Generation backends are asked for a single JSON object but may still wrap it
//! in prose, truncate it or invent fields. Everything here is total: callers get
//! a typed outcome and decide which sentinel to fold failures into.

use serde_json::{Map, Value};

pub type Object = Map<String, Value>;

/// Why a raw response could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No `{ ... }` span in the text.
    NoObject,
    /// A span was found but is not a valid JSON object.
    Malformed(String),
}

/// Outcome of decoding a response and validating one discriminating field.
#[derive(Debug, Clone, PartialEq)]
pub enum Structured<T> {
    /// The field decoded to a member of the allowed set.
    Valid { value: T, fields: Object },
    /// The object decoded, but the field is missing or outside the set.
    Invalid { found: String, fields: Object },
    Unparseable(ParseFailure),
}

/// Locate the outermost object delimiters in `raw` and decode the span.
pub fn extract_object(raw: &str) -> Result<Object, ParseFailure> {
    let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(ParseFailure::NoObject);
    };
    if end < start {
        return Err(ParseFailure::NoObject);
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ParseFailure::Malformed(format!("expected object, got {other}"))),
        Err(e) => Err(ParseFailure::Malformed(e.to_string())),
    }
}

/// Decode `raw` and validate `obj[key]` with `parse`.
pub fn parse_validated<T, F>(raw: &str, key: &str, parse: F) -> Structured<T>
where
    F: Fn(&str) -> Option<T>,
{
    let fields = match extract_object(raw) {
        Ok(fields) => fields,
        Err(failure) => return Structured::Unparseable(failure),
    };
    let found = string_field(&fields, key);
    match parse(&found) {
        Some(value) => Structured::Valid { value, fields },
        None => Structured::Invalid { found, fields },
    }
}

/// A field rendered as trimmed text. Missing and `null` become empty;
/// non-string scalars are rendered with their JSON form.
pub fn string_field(obj: &Object, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

/// A 0–100 confidence. Accepts numbers and numeric strings (an optional
/// trailing `%` is ignored); rounds and clamps. Anything else is 0.
pub fn confidence_field(obj: &Object, key: &str) -> u8 {
    let raw = match obj.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(v) if v.is_finite() => {
            // clamped before the cast, so the truncation is exact
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let clamped = v.round().clamp(0.0, 100.0) as u8;
            clamped
        }
        _ => 0,
    }
}
