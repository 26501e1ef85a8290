//! Argument validation against a tool's schema.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::types::{ToolError, ValidationError};

use super::schema::Schema;

/// Arguments that passed validation. Explicit nulls have been dropped.
#[derive(Debug, Clone, Default)]
pub struct ValidatedArguments(Map<String, Value>);

impl ValidatedArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Deserialize into a tool's typed parameter struct.
    pub fn into_params<T: DeserializeOwned>(self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.0))
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))
    }
}

/// Name of a value's runtime JSON type.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check `arguments` against `schema`, reporting the first failing field in
/// declaration order. Unknown fields are passed through.
pub fn validate(
    schema: &Schema,
    arguments: &Map<String, Value>,
) -> Result<ValidatedArguments, ValidationError> {
    for field in schema.fields() {
        match arguments.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(ValidationError::MissingField(field.name.clone()));
                }
            }
            Some(value) if !field.field_type.matches(value) => {
                return Err(ValidationError::TypeMismatch {
                    field: field.name.clone(),
                    expected: field.field_type.as_str(),
                    actual: json_type_name(value),
                });
            }
            Some(_) => {}
        }
    }

    let cleaned = arguments
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(ValidatedArguments(cleaned))
}
