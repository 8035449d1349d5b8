//! Control channel wire messages.
//!
//! Outbound frames are tool-call requests serialized as JSON text. Inbound
//! frames are opaque backend JSON and stay as raw strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A remote browser-automation command.
///
/// Serialized verbatim as `{"toolName": "...", "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    /// A request with no arguments.
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    /// Add one argument.
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Build a request from a JSON value that must be an object.
    ///
    /// Returns `None` for arrays, strings, numbers and the like.
    pub fn with_arguments(tool_name: impl Into<String>, arguments: Value) -> Option<Self> {
        match arguments {
            Value::Object(arguments) => Some(Self {
                tool_name: tool_name.into(),
                arguments,
            }),
            Value::Null => Some(Self::new(tool_name)),
            _ => None,
        }
    }

    /// The JSON text of the outbound frame.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
