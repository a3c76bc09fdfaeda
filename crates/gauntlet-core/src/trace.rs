use serde::{Deserialize, Serialize};

use crate::tool::{ToolCall, ToolResult};

/// One tool invocation and its result, in invocation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub ordinal: usize,
    pub call: ToolCall,
    pub result: ToolResult,
}

/// The ordered log of tool calls made during one test's execution.
///
/// Append-only: the dispatcher is the single writer for its workspace,
/// and the assessor only ever reads a finished trace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call/result pair. Ordinals are assigned here so the total
    /// order matches invocation order by construction.
    pub fn record(&mut self, call: ToolCall, result: ToolResult) {
        let ordinal = self.entries.len();
        self.entries.push(TraceEntry {
            ordinal,
            call,
            result,
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the named tool was called at least once.
    pub fn tool_was_called(&self, tool_name: &str) -> bool {
        self.entries.iter().any(|e| e.call.tool_name == tool_name)
    }

    /// Ordinal of the first call to the named tool, if any.
    pub fn first_call_of(&self, tool_name: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|e| e.call.tool_name == tool_name)
            .map(|e| e.ordinal)
    }

    /// Ordinal of the first call to `tool_name` at or after `from`.
    pub fn first_call_from(&self, tool_name: &str, from: usize) -> Option<usize> {
        self.entries
            .iter()
            .skip(from)
            .find(|e| e.call.tool_name == tool_name)
            .map(|e| e.ordinal)
    }

    /// All successful results of the named tool, oldest first.
    pub fn outputs_of(&self, tool_name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.call.tool_name == tool_name && !e.result.is_error())
            .map(|e| e.result.content.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolErrorKind;

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: format!("call_{name}"),
            tool_name: name.to_string(),
            arguments: serde_json::json!({}),
        }
    }

    #[test]
    fn ordinals_follow_invocation_order() {
        let mut trace = Trace::new();
        trace.record(call("lint"), ToolResult::ok("call_lint", "ok"));
        trace.record(call("generate"), ToolResult::ok("call_generate", "ok"));
        trace.record(call("verify"), ToolResult::ok("call_verify", "ok"));

        assert_eq!(trace.len(), 3);
        assert_eq!(trace.first_call_of("lint"), Some(0));
        assert_eq!(trace.first_call_of("generate"), Some(1));
        assert_eq!(trace.first_call_of("verify"), Some(2));
        assert_eq!(trace.first_call_of("missing"), None);
    }

    #[test]
    fn first_call_from_skips_earlier_entries() {
        let mut trace = Trace::new();
        trace.record(call("lint"), ToolResult::ok("a", "ok"));
        trace.record(call("lint"), ToolResult::ok("b", "ok"));
        assert_eq!(trace.first_call_from("lint", 1), Some(1));
        assert_eq!(trace.first_call_from("lint", 2), None);
    }

    #[test]
    fn outputs_of_skips_errors() {
        let mut trace = Trace::new();
        trace.record(call("lint"), ToolResult::ok("a", "clean"));
        trace.record(
            call("lint"),
            ToolResult::err("b", ToolErrorKind::Execution, "exit 1"),
        );
        assert_eq!(trace.outputs_of("lint"), vec!["clean"]);
    }
}
