//! Execution trace of tool invocations during one run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tool::{ToolCall, ToolResult};

/// Maximum characters of a tool result kept in a trace entry.
pub const RESULT_PREVIEW_CHARS: usize = 500;

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Zero-based step whose model reply requested the call.
    pub step: usize,
    /// Tool name as requested by the model.
    pub tool: String,
    /// Decoded arguments, or the raw string if they were not valid JSON.
    pub args: Value,
    /// Leading characters of the tool result.
    pub result_preview: String,
}

impl TraceEntry {
    /// Records `call` and its `result` at `step`.
    #[must_use]
    pub fn record(step: usize, call: &ToolCall, result: &ToolResult) -> Self {
        let args = if call.arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&call.arguments)
                .unwrap_or_else(|_| Value::String(call.arguments.clone()))
        };
        Self {
            step,
            tool: call.name.clone(),
            args,
            result_preview: result.content.chars().take(RESULT_PREVIEW_CHARS).collect(),
        }
    }
}

/// Append-only list of [`TraceEntry`] values in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Trace(Vec<TraceEntry>);

impl Trace {
    /// Creates an empty trace.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: TraceEntry) {
        self.0.push(entry);
    }

    /// Entries in execution order.
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.0
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no tool was executed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(arguments: &str) -> ToolCall {
        ToolCall {
            id: "c1".to_string(),
            name: "rag_search".to_string(),
            arguments: arguments.to_string(),
        }
    }

    fn result(content: &str) -> ToolResult {
        ToolResult {
            tool_call_id: "c1".to_string(),
            content: content.to_string(),
            is_error: false,
        }
    }

    #[test]
    fn test_record_decodes_arguments() {
        let entry = TraceEntry::record(2, &call(r#"{"query":"M004","k":3}"#), &result("ok"));
        assert_eq!(entry.step, 2);
        assert_eq!(entry.tool, "rag_search");
        assert_eq!(entry.args, json!({"query": "M004", "k": 3}));
        assert_eq!(entry.result_preview, "ok");
    }

    #[test]
    fn test_record_keeps_raw_invalid_arguments() {
        let entry = TraceEntry::record(0, &call("{oops"), &result("bad"));
        assert_eq!(entry.args, json!("{oops"));
        let entry = TraceEntry::record(0, &call(""), &result("bad"));
        assert_eq!(entry.args, json!({}));
    }

    #[test]
    fn test_preview_is_bounded() {
        let long = "x".repeat(RESULT_PREVIEW_CHARS * 2);
        let entry = TraceEntry::record(0, &call("{}"), &result(&long));
        assert_eq!(entry.result_preview.chars().count(), RESULT_PREVIEW_CHARS);
    }

    #[test]
    fn test_trace_serializes_as_array() {
        let mut trace = Trace::new();
        trace.push(TraceEntry::record(0, &call("{}"), &result("r")));
        let json = serde_json::to_value(&trace).unwrap_or_default();
        assert_eq!(
            json,
            json!([{"step": 0, "tool": "rag_search", "args": {}, "result_preview": "r"}])
        );
    }
}
