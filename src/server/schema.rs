//! Tool input schema normalization.
//!
//! Tools may declare parameters three ways: shorthand (`{"text": "string"}`),
//! simplified (`{"text": {"type": "string", "required": true}}`), or
//! canonical JSON-Schema (`{"type": "object", "properties": .., "required": ..}`).
//! Registration normalizes all of them to the canonical form; equivalent
//! declarations normalize to identical JSON. Canonical input passes through
//! unchanged.

use crate::error::BuildError;
use serde_json::{json, Map, Value};

/// JSON-Schema primitive type names accepted in parameter declarations.
const KNOWN_TYPES: &[&str] = &[
    "string", "number", "integer", "boolean", "object", "array", "null",
];

/// Normalize a tool's input schema into canonical JSON-Schema.
pub fn normalize_schema(tool: &str, schema: &Value) -> Result<Value, BuildError> {
    let obj = schema.as_object().ok_or_else(|| BuildError::InvalidSchema {
        tool: tool.to_string(),
        reason: "schema must be a JSON object".to_string(),
    })?;

    if obj.get("type").and_then(Value::as_str) == Some("object") {
        check_canonical(tool, obj)?;
        return Ok(schema.clone());
    }

    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in obj {
        match spec {
            // Shorthand: parameter name mapped straight to a type string
            Value::String(ty) => {
                check_type(tool, name, ty)?;
                properties.insert(name.clone(), json!({ "type": ty }));
            }
            // Simplified: { type, required?, description?, ...extra }
            Value::Object(fields) => {
                let ty = fields
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| BuildError::InvalidSchema {
                        tool: tool.to_string(),
                        reason: format!("parameter '{}' is missing a type", name),
                    })?;
                check_type(tool, name, ty)?;

                if fields.get("required").and_then(Value::as_bool).unwrap_or(false) {
                    required.push(Value::String(name.clone()));
                }

                // `required` lifts into the top-level array; everything else
                // (description included) stays on the property
                let mut property = Map::new();
                for (key, value) in fields {
                    if key != "required" {
                        property.insert(key.clone(), value.clone());
                    }
                }
                properties.insert(name.clone(), Value::Object(property));
            }
            other => {
                return Err(BuildError::InvalidSchema {
                    tool: tool.to_string(),
                    reason: format!(
                        "parameter '{}' must be a type string or an object, got {}",
                        name, other
                    ),
                });
            }
        }
    }

    Ok(json!({
        "type": "object",
        "properties": Value::Object(properties),
        "required": Value::Array(required),
    }))
}

/// Structural checks on an already-canonical schema. The value itself is
/// returned unchanged by the caller.
fn check_canonical(tool: &str, obj: &Map<String, Value>) -> Result<(), BuildError> {
    match obj.get("properties") {
        None => {}
        Some(Value::Object(properties)) => {
            for (name, property) in properties {
                if let Some(ty) = property.get("type").and_then(Value::as_str) {
                    check_type(tool, name, ty)?;
                }
            }
        }
        Some(_) => {
            return Err(BuildError::InvalidSchema {
                tool: tool.to_string(),
                reason: "'properties' must be an object".to_string(),
            });
        }
    }

    if let Some(required) = obj.get("required") {
        if !required.is_array() {
            return Err(BuildError::InvalidSchema {
                tool: tool.to_string(),
                reason: "'required' must be an array".to_string(),
            });
        }
    }

    Ok(())
}

fn check_type(tool: &str, parameter: &str, ty: &str) -> Result<(), BuildError> {
    if KNOWN_TYPES.contains(&ty) {
        Ok(())
    } else {
        Err(BuildError::UnknownSchemaType {
            tool: tool.to_string(),
            parameter: parameter.to_string(),
            ty: ty.to_string(),
        })
    }
}
