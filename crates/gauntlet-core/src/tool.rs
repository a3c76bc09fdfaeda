use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a tool offered to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Unique name, e.g. "file_read", "cli_lint".
    pub name: String,
    /// Human-readable description for the decision backend.
    pub description: String,
    /// JSON Schema of the parameters object.
    pub parameters: Value,
    /// Whether this tool mutates workspace state (write vs read).
    #[serde(default)]
    pub is_mutating: bool,
}

/// A request from the decision backend to call a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

/// What went wrong inside the dispatcher for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Malformed or out-of-bounds arguments.
    Validation,
    /// The tool ran but failed (non-zero exit, per-call timeout).
    Execution,
    /// Filesystem-level failure.
    Io,
}

/// A typed tool failure. Always surfaced to the agent as a result,
/// never raised past the dispatcher boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

/// The result of executing a tool call. `error: None` means success and
/// `content` carries the payload; otherwise `error` carries the kind and
/// message and `content` mirrors the message for the agent transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResult {
    pub fn ok(call_id: &str, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: call_id.to_string(),
            content: content.into(),
            error: None,
        }
    }

    pub fn err(call_id: &str, kind: ToolErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            tool_call_id: call_id.to_string(),
            content: message.clone(),
            error: Some(ToolError { kind, message }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
