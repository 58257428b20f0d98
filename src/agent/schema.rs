//! Argument validation against a tool's declared JSON Schema.
//!
//! Covers the subset of JSON Schema the tool catalog uses: a top-level
//! object with `properties`, `required`, per-property `type`, and
//! `additionalProperties: false`. Anything else in the schema is advertised
//! to the model but not enforced here.

use serde_json::{Map, Value};

/// Decodes raw model arguments and checks them against `schema`.
///
/// An empty or whitespace-only string is treated as `{}`.
///
/// # Errors
///
/// Returns a human-readable message describing the first violation.
pub fn parse_arguments(raw: &str, schema: &Value) -> Result<Map<String, Value>, String> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {e}"))?;
    let Value::Object(args) = value else {
        return Err(format!("expected a JSON object, got {}", type_name(&value)));
    };
    validate(&args, schema)?;
    Ok(args)
}

/// Checks decoded arguments against `schema`.
///
/// # Errors
///
/// Returns a message naming the missing, unexpected or mistyped field.
pub fn validate(args: &Map<String, Value>, schema: &Value) -> Result<(), String> {
    let properties = schema.get("properties").and_then(Value::as_object);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(field) {
                return Err(format!("missing required field '{field}'"));
            }
        }
    }

    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in args {
        let Some(declared) = properties.and_then(|p| p.get(key)) else {
            if closed {
                return Err(format!("unexpected field '{key}'"));
            }
            continue;
        };
        if let Some(expected) = declared.get("type").and_then(Value::as_str)
            && !matches_type(value, expected)
        {
            return Err(format!(
                "field '{key}' must be {expected}, got {}",
                type_name(value)
            ));
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
