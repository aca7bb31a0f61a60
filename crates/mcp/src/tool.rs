//! Tool descriptors and the tool server trait.

use crate::Result;
use rmcp::model::Tool;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

/// A structured argument object passed to a tool.
pub type JsonObject = serde_json::Map<String, Value>;

/// A tool as advertised by its server.
///
/// Names are unique within one server's catalog but not across servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Property names the schema marks as required.
    pub fn required_arguments(&self) -> impl Iterator<Item = &str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }
}

impl From<Tool> for ToolDescriptor {
    fn from(tool: Tool) -> Self {
        Self {
            name: tool.name.into_owned(),
            description: tool.description.map(Cow::into_owned).unwrap_or_default(),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        }
    }
}

/// An initialized connection to a tool server.
///
/// This is the boundary between orchestration and subordinate processes.
pub trait ToolServer: Send + Sync {
    /// Logical server name.
    fn name(&self) -> &str;

    /// Query the server's current tool catalog.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolDescriptor>>> + Send;

    /// Invoke a tool and return its rendered output.
    ///
    /// The call gives up with [`Error::Timeout`](crate::Error::Timeout) once
    /// `timeout` has elapsed.
    fn call_tool(
        &self,
        name: &str,
        arguments: JsonObject,
        timeout: Duration,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Release the channel and any owned process. Idempotent.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}
