//! Decode direction of the typed codec.
//!
//! [`decode`] turns the model's free-text reply into a JSON value shaped by a
//! [`TypeDescriptor`]; [`decode_as`] goes one step further and builds a Rust
//! value with serde.
//!
//! Steps:
//!
//! 1. Strip a surrounding code fence (```` ```json ... ``` ````).
//! 2. Plain-text targets return the stripped text as-is.
//! 3. Scalar targets trim and parse the text directly.
//! 4. Structured targets parse the payload as JSON, falling back to the first
//!    fenced block of the reply, then walk the descriptor. A union that is
//!    not JSON may still match a scalar or plain-text variant.
//!
//! Every failure carries the raw reply for diagnosis.

use super::descriptor::{Described, FieldDescriptor, PrimitiveKind, RecordType, TypeDescriptor};
use crate::tool::entities::json_kind;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Value produced by [`decode`], normalized to the target's shape.
pub type DecodedValue = Value;

/// What went wrong while decoding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeErrorKind {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("missing required field '{field}' at {path}")]
    MissingField { path: String, field: String },

    #[error("expected {expected} at {path}, found {found}")]
    WrongShape {
        path: String,
        expected: String,
        found: &'static str,
    },

    #[error("cannot read {value:?} as {expected} at {path}")]
    InvalidPrimitive {
        path: String,
        expected: &'static str,
        value: String,
    },

    #[error("{value} at {path} is out of range ({bound})")]
    OutOfRange {
        path: String,
        value: f64,
        bound: String,
    },

    #[error("cannot build target value: {0}")]
    Deserialize(String),
}

/// Decode failure, with the reply that caused it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}")]
pub struct DecodeError {
    pub kind: DecodeErrorKind,
    raw: String,
}

impl DecodeError {
    pub fn new(kind: DecodeErrorKind, raw: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    /// The unmodified model reply
    pub fn raw_text(&self) -> &str {
        &self.raw
    }
}

/// Remove a code fence wrapping the whole text, if any.
///
/// ```
/// use tooloop_domain::codec::strip_code_fences;
///
/// assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
/// assert_eq!(strip_code_fences("  plain  "), "plain");
/// ```
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // The opening fence may carry a language tag on the same line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// First fenced block inside surrounding prose.
fn embedded_block(text: &str) -> Option<String> {
    let mut lines = Vec::new();
    let mut inside = false;
    for line in text.lines() {
        let marker = line.trim_start();
        if !inside {
            if marker.starts_with("```") {
                inside = true;
            }
        } else if marker.trim_end() == "```" {
            return Some(lines.join("\n"));
        } else {
            lines.push(line);
        }
    }
    None
}

/// Decode `raw` against `ty`.
pub fn decode(raw: &str, ty: &TypeDescriptor) -> Result<DecodedValue, DecodeError> {
    let text = strip_code_fences(raw);
    decode_stripped(raw, text, ty).map_err(|kind| DecodeError::new(kind, raw))
}

fn decode_stripped(raw: &str, text: &str, ty: &TypeDescriptor) -> Result<Value, DecodeErrorKind> {
    match ty {
        TypeDescriptor::Text => Ok(Value::String(text.to_string())),
        TypeDescriptor::Primitive(kind) => parse_primitive(text, *kind, "$"),
        TypeDescriptor::Optional(_) if text.is_empty() || text == "null" => Ok(Value::Null),
        TypeDescriptor::Optional(inner) => decode_stripped(raw, text, inner),
        TypeDescriptor::Union(variants) => match parse_tree(raw, text) {
            Ok(tree) => walk(&tree, ty, "$"),
            Err(e) => bare_union_variant(text, variants).ok_or(e),
        },
        _ => {
            let tree = parse_tree(raw, text)?;
            walk(&tree, ty, "$")
        }
    }
}

/// A union reply that is not JSON: the first scalar variant that parses,
/// otherwise the text itself when the union admits plain text.
fn bare_union_variant(text: &str, variants: &[TypeDescriptor]) -> Option<Value> {
    let scalar = variants.iter().find_map(|variant| match variant {
        TypeDescriptor::Primitive(kind) => parse_primitive(text, *kind, "$").ok(),
        _ => None,
    });
    scalar.or_else(|| {
        variants
            .iter()
            .any(|variant| matches!(variant, TypeDescriptor::Text))
            .then(|| Value::String(text.to_string()))
    })
}

/// Parse `text` as JSON, falling back to the first fenced block of `raw`.
fn parse_tree(raw: &str, text: &str) -> Result<Value, DecodeErrorKind> {
    match serde_json::from_str(text) {
        Ok(tree) => Ok(tree),
        Err(first) => embedded_block(raw)
            .and_then(|block| serde_json::from_str(&block).ok())
            .ok_or_else(|| DecodeErrorKind::InvalidJson(first.to_string())),
    }
}

/// Parse a scalar from text. Booleans accept true/false/yes/no/1/0.
fn parse_primitive(text: &str, kind: PrimitiveKind, path: &str) -> Result<Value, DecodeErrorKind> {
    let text = text.trim();
    let invalid = || DecodeErrorKind::InvalidPrimitive {
        path: path.to_string(),
        expected: kind.json_type(),
        value: text.to_string(),
    };
    match kind {
        PrimitiveKind::Integer => text.parse::<i64>().map(Value::from).map_err(|_| invalid()),
        PrimitiveKind::Float => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(invalid),
        PrimitiveKind::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid()),
        },
    }
}

fn wrong_shape(path: &str, expected: impl Into<String>, found: &Value) -> DecodeErrorKind {
    DecodeErrorKind::WrongShape {
        path: path.to_string(),
        expected: expected.into(),
        found: json_kind(found),
    }
}

fn walk(value: &Value, ty: &TypeDescriptor, path: &str) -> Result<Value, DecodeErrorKind> {
    match ty {
        TypeDescriptor::Any => Ok(value.clone()),
        TypeDescriptor::Text => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(_) | Value::Bool(_) => Ok(Value::String(value.to_string())),
            other => Err(wrong_shape(path, "string", other)),
        },
        TypeDescriptor::Primitive(kind) => walk_primitive(value, *kind, path),
        TypeDescriptor::Optional(inner) => match value {
            Value::Null => Ok(Value::Null),
            other => walk(other, inner, path),
        },
        TypeDescriptor::List(item) => {
            let Value::Array(items) = value else {
                return Err(wrong_shape(path, "array", value));
            };
            items
                .iter()
                .enumerate()
                .map(|(i, child)| walk(child, item, &format!("{}[{}]", path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        TypeDescriptor::Map(inner) => {
            let Value::Object(entries) = value else {
                return Err(wrong_shape(path, "object", value));
            };
            entries
                .iter()
                .map(|(key, child)| {
                    walk(child, inner, &format!("{}.{}", path, key)).map(|v| (key.clone(), v))
                })
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object)
        }
        TypeDescriptor::Record(record) => walk_record(value, record, path),
        TypeDescriptor::Union(variants) => {
            let mut last = None;
            for variant in variants {
                match walk(value, variant, path) {
                    Ok(decoded) => return Ok(decoded),
                    Err(e) => last = Some(e),
                }
            }
            Err(last.unwrap_or_else(|| wrong_shape(path, "a union variant", value)))
        }
    }
}

fn walk_primitive(value: &Value, kind: PrimitiveKind, path: &str) -> Result<Value, DecodeErrorKind> {
    match (kind, value) {
        (PrimitiveKind::Integer, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(Value::from(i));
            }
            if let Some(u) = n.as_u64() {
                return Ok(Value::from(u));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
                _ => Err(DecodeErrorKind::InvalidPrimitive {
                    path: path.to_string(),
                    expected: kind.json_type(),
                    value: n.to_string(),
                }),
            }
        }
        (PrimitiveKind::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| wrong_shape(path, "number", value)),
        (PrimitiveKind::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (_, Value::String(s)) => parse_primitive(s, kind, path),
        (PrimitiveKind::Boolean, Value::Number(n)) => parse_primitive(&n.to_string(), kind, path),
        _ => Err(wrong_shape(path, kind.json_type(), value)),
    }
}

fn walk_record(value: &Value, record: &RecordType, path: &str) -> Result<Value, DecodeErrorKind> {
    let Value::Object(payload) = value else {
        return Err(wrong_shape(path, format!("{} object", record.name()), value));
    };

    let mut out = Map::new();
    for field in record.fields() {
        let field_path = format!("{}.{}", path, field.name);
        let decoded = match payload.get(&field.name) {
            Some(Value::Null) if !field.ty.is_optional() && field.default.is_some() => {
                field.default.clone().unwrap_or(Value::Null)
            }
            Some(child) => {
                let decoded = walk(child, &field.ty, &field_path)?;
                check_range(&decoded, &field, &field_path)?;
                decoded
            }
            None if field.required => {
                return Err(DecodeErrorKind::MissingField {
                    path: path.to_string(),
                    field: field.name.clone(),
                });
            }
            None => field
                .default
                .clone()
                .unwrap_or_else(|| type_default(&field.ty)),
        };
        out.insert(field.name, decoded);
    }
    Ok(Value::Object(out))
}

fn check_range(value: &Value, field: &FieldDescriptor, path: &str) -> Result<(), DecodeErrorKind> {
    let Some(n) = value.as_f64() else {
        return Ok(());
    };
    let out_of_range = |bound: String| DecodeErrorKind::OutOfRange {
        path: path.to_string(),
        value: n,
        bound,
    };
    if let Some(minimum) = field.minimum
        && n < minimum
    {
        return Err(out_of_range(format!("minimum {}", minimum)));
    }
    if let Some(maximum) = field.maximum
        && n > maximum
    {
        return Err(out_of_range(format!("maximum {}", maximum)));
    }
    Ok(())
}

/// Value an absent optional field takes when it declares no default.
fn type_default(ty: &TypeDescriptor) -> Value {
    match ty {
        TypeDescriptor::Text => Value::String(String::new()),
        TypeDescriptor::Primitive(PrimitiveKind::Integer) => Value::from(0),
        TypeDescriptor::Primitive(PrimitiveKind::Float) => Value::from(0.0),
        TypeDescriptor::Primitive(PrimitiveKind::Boolean) => Value::Bool(false),
        TypeDescriptor::List(_) => Value::Array(Vec::new()),
        TypeDescriptor::Map(_) => Value::Object(Map::new()),
        TypeDescriptor::Optional(_)
        | TypeDescriptor::Record(_)
        | TypeDescriptor::Union(_)
        | TypeDescriptor::Any => Value::Null,
    }
}

/// Decode `raw` into `T` using `T`'s own descriptor.
pub fn decode_as<T>(raw: &str) -> Result<T, DecodeError>
where
    T: Described + DeserializeOwned,
{
    let value = decode(raw, &T::descriptor())?;
    serde_json::from_value(value)
        .map_err(|e| DecodeError::new(DecodeErrorKind::Deserialize(e.to_string()), raw))
}
