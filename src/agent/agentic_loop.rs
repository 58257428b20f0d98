//! Bounded agentic tool-calling loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends the transcript to the
//! model, executes any tool calls in the response, appends results, and
//! repeats until the model produces a non-empty final answer or the step
//! budget runs out. One step is one model call.

use tracing::{debug, info};

use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, ModelReply, TokenUsage, assistant_message, assistant_tool_calls_message,
    tool_message,
};
use super::provider::LlmProvider;
use super::trace::{Trace, TraceEntry};
use crate::error::AgentError;

/// Answer returned when the step budget is exhausted.
pub const EXHAUSTED_PAYLOAD: &str = r#"{"error":"Agent exceeded max steps"}"#;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model produced a non-empty final message.
    Done {
        /// Final message content.
        content: String,
        /// Model calls made, including the final one.
        steps: usize,
    },
    /// Every step was spent without a final message.
    Exhausted {
        /// Model calls made (equals the budget).
        steps: usize,
    },
}

impl LoopOutcome {
    /// The run's answer: the model's content, or [`EXHAUSTED_PAYLOAD`].
    #[must_use]
    pub fn answer(&self) -> &str {
        match self {
            Self::Done { content, .. } => content,
            Self::Exhausted { .. } => EXHAUSTED_PAYLOAD,
        }
    }

    /// Model calls made.
    #[must_use]
    pub const fn steps(&self) -> usize {
        match self {
            Self::Done { steps, .. } | Self::Exhausted { steps } => *steps,
        }
    }

    /// Returns `true` if the step budget ran out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Result of [`agentic_loop`].
#[derive(Debug, Clone)]
pub struct LoopReport {
    /// Terminal state.
    pub outcome: LoopOutcome,
    /// Tool calls executed, in order.
    pub trace: Trace,
    /// Token usage summed over all model calls.
    pub usage: TokenUsage,
}

/// Runs a bounded agentic loop: model → tool calls → tool results → model → …
///
/// # Arguments
///
/// * `provider` - LLM provider to call.
/// * `request` - Seeded chat request; its transcript is appended in place.
/// * `executor` - Dispatches tool calls through the registry.
/// * `max_steps` - Maximum number of model calls.
///
/// Tool calls within one reply run sequentially in the order listed, and
/// each tool-result message directly follows the assistant message that
/// requested it. A final reply with empty content consumes its step and
/// leaves the transcript unchanged.
///
/// # Errors
///
/// Propagates provider errors. Tool failures never abort the loop.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &ToolExecutor<'_>,
    max_steps: usize,
) -> Result<LoopReport, AgentError> {
    let mut trace = Trace::new();
    let mut usage = TokenUsage::default();

    for step in 0..max_steps {
        let response = provider.chat(request).await?;
        usage.accumulate(response.usage);

        match response.reply {
            ModelReply::Final(content) if content.trim().is_empty() => {
                debug!(step, "model returned empty content");
            }
            ModelReply::Final(content) => {
                debug!(step, "agentic loop completed with final text response");
                request.messages.push(assistant_message(&content));
                return Ok(LoopReport {
                    outcome: LoopOutcome::Done {
                        content,
                        steps: step + 1,
                    },
                    trace,
                    usage,
                });
            }
            ModelReply::ToolCalls(calls) => {
                debug!(step, tool_count = calls.len(), "executing tool calls");
                request
                    .messages
                    .push(assistant_tool_calls_message(calls.clone()));

                for call in &calls {
                    let result = executor.execute(call).await;
                    debug!(
                        step,
                        tool = %call.name,
                        call_id = %call.id,
                        is_error = result.is_error,
                        "tool execution complete"
                    );
                    trace.push(TraceEntry::record(step, call, &result));
                    request
                        .messages
                        .push(tool_message(&result.tool_call_id, &result.content));
                }
            }
        }
    }

    info!(max_steps, "step budget exhausted without a final answer");
    Ok(LoopReport {
        outcome: LoopOutcome::Exhausted { steps: max_steps },
        trace,
        usage,
    })
}
