use super::error::{ToolError, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What a session adapter surfaces to the model for one tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema (`type: object`) describing the accepted arguments
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Names listed under the schema's `required` array
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Check `arguments` against the declared schema: required fields present and
    /// non-null, and primitive `type`s matching for every declared property.
    /// Undeclared extra fields are let through.
    pub fn validate_arguments(&self, arguments: &Value) -> ToolResult<()> {
        let empty = Map::new();
        let args = match arguments {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "arguments for '{}' must be a JSON object, got {}",
                    self.name,
                    json_type_name(other)
                )))
            }
        };

        for field in self.required() {
            match args.get(field) {
                None | Some(Value::Null) => {
                    return Err(ToolError::InvalidArguments(format!(
                        "missing required field '{}' for '{}'",
                        field, self.name
                    )))
                }
                Some(_) => {}
            }
        }

        let Some(properties) = self.parameters.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };

        for (field, value) in args {
            if value.is_null() {
                continue;
            }
            let Some(expected) = properties
                .get(field)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !matches_type(expected, value) {
                return Err(ToolError::InvalidArguments(format!(
                    "field '{}' must be {}, got {}",
                    field,
                    expected,
                    json_type_name(value)
                )));
            }
        }

        Ok(())
    }
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        // Unions and unknown keywords are not checked
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
