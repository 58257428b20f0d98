//! Tool executor that dispatches model tool calls through a [`ToolRegistry`].
//!
//! Every call produces a [`ToolResult`]. Unknown names, oversized or invalid
//! arguments and handler failures all become error results that the model
//! sees on its next turn; none of them abort the run.

use tracing::{debug, warn};

use crate::error::ToolError;

use super::schema;
use super::tool::{ToolCall, ToolRegistry, ToolResult};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;
/// Maximum characters of tool output returned to the model.
const MAX_TOOL_RESULT_CHARS: usize = 32_000;

/// Executes tool calls against a registry.
#[derive(Debug, Clone, Copy)]
pub struct ToolExecutor<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> ToolExecutor<'a> {
    /// Creates an executor over `registry`.
    #[must_use]
    pub const fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Validates and runs one tool call.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.dispatch(call).await {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content: truncate_result(content),
                is_error: false,
            },
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool call failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content: e.to_string(),
                    is_error: true,
                }
            }
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool {
                name: call.name.clone(),
                available: self.registry.names().collect::<Vec<_>>().join(", "),
            })?;

        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return Err(ToolError::InvalidArguments {
                name: call.name.clone(),
                message: format!(
                    "arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
            });
        }

        let args = schema::parse_arguments(&call.arguments, &tool.definition().parameters)
            .map_err(|message| ToolError::InvalidArguments {
                name: call.name.clone(),
                message,
            })?;

        debug!(tool = %call.name, "invoking tool");
        tool.invoke(&args).await
    }
}

fn truncate_result(content: String) -> String {
    match content.char_indices().nth(MAX_TOOL_RESULT_CHARS) {
        Some((cut, _)) => {
            let omitted = content[cut..].chars().count();
            format!("{}\n[truncated: {omitted} more characters]", &content[..cut])
        }
        None => content,
    }
}
