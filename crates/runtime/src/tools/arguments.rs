//! Strict decoding of model-supplied tool arguments.

use mcp::{JsonObject, ToolDescriptor};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A decoded tool argument object.
///
/// The argument text comes from a model response and is untrusted. It is
/// decoded as JSON and must be an object; nothing else is accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(JsonObject);

impl ToolArguments {
    /// Check that every property the schema requires is present.
    pub fn check_required(&self, descriptor: &ToolDescriptor) -> Result<(), String> {
        match descriptor
            .required_arguments()
            .find(|name| !self.0.contains_key(*name))
        {
            Some(missing) => Err(format!("missing required argument `{missing}`")),
            None => Ok(()),
        }
    }

    pub fn into_inner(self) -> JsonObject {
        self.0
    }
}

impl FromStr for ToolArguments {
    type Err = String;

    /// Empty or whitespace-only text decodes to an empty object.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(Self(map)),
            Ok(other) => Err(format!("expected a JSON object, got {}", kind(&other))),
            Err(e) => Err(format!("malformed JSON: {e}")),
        }
    }
}

impl fmt::Display for ToolArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
