//! Minimal JSON-schema shape checking and input validation.
//!
//! Supports the subset plugins actually declare: `type`, `properties`,
//! `required`, and `additionalProperties: false`. Validation reports every
//! violation it finds rather than stopping at the first.

use serde_json::Value;

/// Checks that a declared schema is a well-formed schema object. Returns the
/// first structural problem found.
pub fn validate_schema_shape(schema: &Value) -> Result<(), String> {
    let Some(map) = schema.as_object() else {
        return Err("schema must be a JSON object".to_string());
    };

    if let Some(ty) = map.get("type") {
        let Some(name) = ty.as_str() else {
            return Err("schema 'type' must be a string".to_string());
        };
        if !matches!(
            name,
            "object" | "array" | "string" | "number" | "integer" | "boolean" | "null"
        ) {
            return Err(format!("unknown schema type '{name}'"));
        }
    }

    if let Some(required) = map.get("required") {
        let Some(items) = required.as_array() else {
            return Err("schema 'required' must be an array".to_string());
        };
        if items.iter().any(|item| !item.is_string()) {
            return Err("schema 'required' entries must be strings".to_string());
        }
    }

    if let Some(properties) = map.get("properties") {
        let Some(props) = properties.as_object() else {
            return Err("schema 'properties' must be an object".to_string());
        };
        for (name, sub) in props {
            validate_schema_shape(sub).map_err(|e| format!("property '{name}': {e}"))?;
        }
    }

    Ok(())
}

/// Validates `input` against `schema`, collecting field-level violations.
/// An empty result means the input conforms.
pub fn validate_input(input: &Value, schema: &Value) -> Vec<String> {
    let mut violations = Vec::new();
    check_value(input, schema, "input", &mut violations);
    violations
}

fn check_value(value: &Value, schema: &Value, path: &str, violations: &mut Vec<String>) {
    let Some(map) = schema.as_object() else {
        return;
    };

    if let Some(expected) = map.get("type").and_then(Value::as_str) {
        if !type_matches(value, expected) {
            violations.push(format!(
                "{path}: expected {expected}, got {}",
                type_name(value)
            ));
            return;
        }
    }

    let Some(object) = value.as_object() else {
        return;
    };

    if let Some(required) = map.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(field) {
                violations.push(format!("{path}: missing required field '{field}'"));
            }
        }
    }

    let properties = map.get("properties").and_then(Value::as_object);

    if let Some(props) = properties {
        for (field, sub_schema) in props {
            if let Some(sub_value) = object.get(field) {
                check_value(sub_value, sub_schema, &format!("{path}.{field}"), violations);
            }
        }
    }

    if map.get("additionalProperties") == Some(&Value::Bool(false)) {
        for field in object.keys() {
            let declared = properties.is_some_and(|props| props.contains_key(field));
            if !declared {
                violations.push(format!("{path}: unexpected field '{field}'"));
            }
        }
    }
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
