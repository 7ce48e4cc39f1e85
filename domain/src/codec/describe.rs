//! Encode direction of the typed codec: structural descriptions and examples.
//!
//! [`describe_schema`] turns a [`TypeDescriptor`] into a JSON-schema-like
//! value, [`example_for`] produces a literal that satisfies it, and
//! [`describe_type`] renders a compact human-readable summary. All three are
//! meant to be embedded in a prompt.
//!
//! Expansion stops at [`MAX_DEPTH`] levels, and a record that contains itself
//! is emitted as a stub the second time it is reached on the same path.

use super::descriptor::{FieldDescriptor, PrimitiveKind, RecordType, TypeDescriptor};
use serde_json::{Map, Value, json};

/// Deepest nesting level expanded before emitting a stub.
pub const MAX_DEPTH: usize = 5;

/// Structural (schema-like) description of `ty`.
///
/// ```
/// use tooloop_domain::codec::{TypeDescriptor, describe_schema};
///
/// let schema = describe_schema(&TypeDescriptor::list(TypeDescriptor::integer()));
/// assert_eq!(schema["type"], "array");
/// assert_eq!(schema["items"]["type"], "integer");
/// ```
pub fn describe_schema(ty: &TypeDescriptor) -> Value {
    let mut path = Vec::new();
    schema_at(ty, 0, &mut path)
}

fn schema_at(ty: &TypeDescriptor, depth: usize, path: &mut Vec<String>) -> Value {
    if depth > MAX_DEPTH {
        return json!({ "type": "object", "title": ty.title(), "note": "depth_limit" });
    }

    match ty {
        TypeDescriptor::Text => json!({ "type": "string" }),
        TypeDescriptor::Primitive(kind) => json!({ "type": kind.json_type() }),
        TypeDescriptor::Any => json!({}),
        TypeDescriptor::List(item) => json!({
            "type": "array",
            "items": schema_at(item, depth + 1, path),
        }),
        TypeDescriptor::Map(value) => json!({
            "type": "object",
            "additionalProperties": schema_at(value, depth + 1, path),
        }),
        TypeDescriptor::Optional(inner) => schema_at(inner, depth + 1, path),
        TypeDescriptor::Union(variants) => match variants.as_slice() {
            [single] => schema_at(single, depth + 1, path),
            _ => json!({
                "anyOf": variants
                    .iter()
                    .map(|v| schema_at(v, depth + 1, path))
                    .collect::<Vec<_>>(),
            }),
        },
        TypeDescriptor::Record(record) => record_schema(record, depth, path),
    }
}

fn record_schema(record: &RecordType, depth: usize, path: &mut Vec<String>) -> Value {
    if path.iter().any(|name| name == record.name()) {
        return json!({ "type": "object", "title": record.name(), "note": "circular_ref" });
    }
    path.push(record.name().to_string());

    let fields = record.fields();
    let mut properties = Map::new();
    for field in &fields {
        let mut child = schema_at(&field.ty, depth + 1, path);
        annotate(&mut child, field);
        properties.insert(field.name.clone(), child);
    }
    let required: Vec<&str> = fields
        .iter()
        .filter(|f| f.required)
        .map(|f| f.name.as_str())
        .collect();

    path.pop();

    let mut schema = json!({
        "type": "object",
        "title": record.name(),
        "required": required,
        "properties": properties,
    });
    if let Some(description) = record.description()
        && let Some(obj) = schema.as_object_mut()
    {
        obj.insert("description".to_string(), json!(description));
    }
    schema
}

/// Copy field-level description and numeric constraints onto a child schema.
fn annotate(child: &mut Value, field: &FieldDescriptor) {
    let Some(obj) = child.as_object_mut() else {
        return;
    };
    if let Some(description) = &field.description {
        obj.entry("description").or_insert_with(|| json!(description));
    }
    if let Some(minimum) = field.minimum {
        obj.entry("minimum").or_insert_with(|| json!(minimum));
    }
    if let Some(maximum) = field.maximum {
        obj.entry("maximum").or_insert_with(|| json!(maximum));
    }
    if let Some(default) = &field.default {
        obj.entry("default").or_insert_with(|| default.clone());
    }
}

/// Example literal satisfying `ty`.
///
/// Scalars use fixed placeholders (`"example"`, `123`, `1.23`, `true`),
/// collections hold a single element and record fields prefer their default.
pub fn example_for(ty: &TypeDescriptor) -> Value {
    let mut path = Vec::new();
    example_at(ty, 0, &mut path)
}

fn example_at(ty: &TypeDescriptor, depth: usize, path: &mut Vec<String>) -> Value {
    if depth > MAX_DEPTH {
        return json!({});
    }

    match ty {
        TypeDescriptor::Text | TypeDescriptor::Any => json!("example"),
        TypeDescriptor::Primitive(PrimitiveKind::Integer) => json!(123),
        TypeDescriptor::Primitive(PrimitiveKind::Float) => json!(1.23),
        TypeDescriptor::Primitive(PrimitiveKind::Boolean) => json!(true),
        TypeDescriptor::List(item) => json!([example_at(item, depth + 1, path)]),
        TypeDescriptor::Map(value) => json!({ "key": example_at(value, depth + 1, path) }),
        TypeDescriptor::Optional(inner) => example_at(inner, depth + 1, path),
        TypeDescriptor::Union(variants) => variants
            .first()
            .map(|v| example_at(v, depth + 1, path))
            .unwrap_or(Value::Null),
        TypeDescriptor::Record(record) => {
            if path.iter().any(|name| name == record.name()) {
                return json!({});
            }
            path.push(record.name().to_string());
            let example: Map<String, Value> = record
                .fields()
                .iter()
                .map(|field| {
                    let value = match &field.default {
                        Some(default) => default.clone(),
                        None => example_at(&field.ty, depth + 1, path),
                    };
                    (field.name.clone(), value)
                })
                .collect();
            path.pop();
            Value::Object(example)
        }
    }
}

/// Compact human-readable description of `ty`.
///
/// Records expand one level into field lines; nested records appear by name.
///
/// ```text
/// Weather record with fields:
///   - city (string, required): City name
///   - celsius (float, required), min: -90, max: 60
///   - note (Optional[string], optional)
/// ```
pub fn describe_type(ty: &TypeDescriptor) -> String {
    match ty {
        TypeDescriptor::Record(record) => describe_record(record),
        TypeDescriptor::List(item) => format!("List[{}]", describe_type(item)),
        TypeDescriptor::Map(value) => format!("Dict[string, {}]", describe_type(value)),
        other => other.title(),
    }
}

fn describe_record(record: &RecordType) -> String {
    let mut out = format!("{} record", record.name());
    if let Some(description) = record.description() {
        out.push_str(&format!(" ({})", description));
    }
    out.push_str(" with fields:");

    for field in record.fields() {
        let marker = if field.required { "required" } else { "optional" };
        out.push_str(&format!("\n  - {} ({}, {})", field.name, field.ty.title(), marker));
        if let Some(description) = &field.description {
            out.push_str(&format!(": {}", description));
        }
        if let Some(minimum) = field.minimum {
            out.push_str(&format!(", min: {}", minimum));
        }
        if let Some(maximum) = field.maximum {
            out.push_str(&format!(", max: {}", maximum));
        }
        if let Some(default) = &field.default {
            out.push_str(&format!(", default: {}", default));
        }
    }
    out
}
