//! Orchestrator for one replanning conversation.
//!
//! Seeds the transcript with the system policy and the incident question,
//! then hands it to the bounded [`agentic_loop`] together with the tool
//! catalog.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use super::agentic_loop::{LoopOutcome, agentic_loop};
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::message::{ChatMessage, ChatRequest, TokenUsage, system_message, user_message};
use super::prompt::{PromptSet, build_user_turn};
use super::provider::LlmProvider;
use super::tool::ToolRegistry;
use super::trace::Trace;
use crate::error::AgentError;

/// Maximum question length in bytes.
const MAX_QUESTION_LEN: usize = 10_000;

/// The disruption being replanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Incident {
    /// Machine that is down.
    pub down_machine: String,
    /// Number of jobs to replan.
    pub top_jobs: usize,
    /// Question override; the prompt set's question is used when `None`.
    pub question: Option<String>,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// Terminal state and answer.
    pub outcome: LoopOutcome,
    /// Tool calls executed, in order.
    pub trace: Trace,
    /// Full transcript, including the seed turns.
    pub transcript: Vec<ChatMessage>,
    /// Token usage over all model calls.
    pub usage: TokenUsage,
    /// Wall-clock duration of the loop.
    pub elapsed: Duration,
}

impl AgentRun {
    /// The run's answer text.
    #[must_use]
    pub fn answer(&self) -> &str {
        self.outcome.answer()
    }
}

/// Drives the replanning conversation.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
    prompts: PromptSet,
}

impl Orchestrator {
    /// Creates a new orchestrator with the given provider and configuration.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling back
    /// to compiled-in defaults.
    pub fn new(provider: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self {
            provider,
            config,
            prompts,
        }
    }

    /// Replaces the prompt templates.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptSet) -> Self {
        self.prompts = prompts;
        self
    }

    /// The prompt templates in use.
    #[must_use]
    pub const fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Builds the seeded request for `incident`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Orchestration`] for an empty or oversized
    /// question.
    pub fn seed_request(
        &self,
        registry: &ToolRegistry,
        incident: &Incident,
    ) -> Result<ChatRequest, AgentError> {
        let question = incident.question.clone().unwrap_or_else(|| {
            self.prompts
                .render_question(&incident.down_machine, incident.top_jobs)
        });

        if question.trim().is_empty() {
            return Err(AgentError::Orchestration {
                message: "Question cannot be empty".to_string(),
            });
        }
        if question.len() > MAX_QUESTION_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "Question exceeds maximum length ({} bytes, max {MAX_QUESTION_LEN})",
                    question.len()
                ),
            });
        }

        let system = self
            .prompts
            .render_system(&incident.down_machine, incident.top_jobs);

        Ok(ChatRequest {
            model: self.config.chat_model.clone(),
            messages: vec![
                system_message(&system),
                user_message(&build_user_turn(&question)),
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
            tools: registry.definitions(),
        })
    }

    /// Runs the loop for `incident` with the given tool catalog.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on invalid input or chat API failures. Step
    /// budget exhaustion is an outcome, not an error.
    pub async fn run(
        &self,
        registry: &ToolRegistry,
        incident: &Incident,
    ) -> Result<AgentRun, AgentError> {
        let mut request = self.seed_request(registry, incident)?;
        let executor = ToolExecutor::new(registry);

        let start = Instant::now();
        let report = agentic_loop(
            self.provider.as_ref(),
            &mut request,
            &executor,
            self.config.max_steps,
        )
        .await?;
        let elapsed = start.elapsed();

        info!(
            provider = self.provider.name(),
            steps = report.outcome.steps(),
            exhausted = report.outcome.is_exhausted(),
            tool_calls = report.trace.len(),
            total_tokens = report.usage.total_tokens,
            elapsed_ms = elapsed.as_millis(),
            "agent run finished"
        );

        Ok(AgentRun {
            outcome: report.outcome,
            trace: report.trace,
            transcript: request.messages,
            usage: report.usage,
            elapsed,
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("model", &self.config.chat_model)
            .field("max_steps", &self.config.max_steps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::agentic_loop::EXHAUSTED_PAYLOAD;
    use crate::agent::message::{ModelReply, Role};
    use crate::agent::tool::ToolCall;
    use crate::agent::tools::SnapshotTool;
    use crate::testing::ScriptedProvider;

    fn config(max_steps: usize) -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .chat_model("gpt-4o-mini")
            .embed_model("text-embedding-3-small")
            .max_steps(max_steps)
            .build()
            .unwrap_or_else(|e| panic!("config failed: {e}"))
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new()
            .with(Arc::new(SnapshotTool::new(
                "get_available_machines",
                "Return available machines for the next shift.",
                "machine_id\nM001\n",
            )))
            .unwrap_or_else(|_| unreachable!())
    }

    fn incident(question: Option<&str>) -> Incident {
        Incident {
            down_machine: "M004".to_string(),
            top_jobs: 8,
            question: question.map(str::to_string),
        }
    }

    fn orchestrator(provider: Arc<ScriptedProvider>, max_steps: usize) -> Orchestrator {
        Orchestrator::new(provider, config(max_steps)).with_prompts(PromptSet::defaults())
    }

    #[test]
    fn test_seed_request() {
        let orch = orchestrator(Arc::new(ScriptedProvider::new(Vec::new())), 6);
        let request = orch
            .seed_request(&registry(), &incident(None))
            .unwrap_or_else(|e| panic!("seed failed: {e}"));

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("Do not assign work to M004."));
        assert!(
            request.messages[1]
                .content
                .ends_with("Question: Machine M004 is down. Replan the next 8 jobs for the next shift using CR. Escalate if risk is high.")
        );
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.max_tokens, Some(1200));
    }

    #[test]
    fn test_empty_question_rejected() {
        let orch = orchestrator(Arc::new(ScriptedProvider::new(Vec::new())), 6);
        let result = orch.seed_request(&registry(), &incident(Some("  ")));
        assert!(matches!(result, Err(AgentError::Orchestration { .. })));

        let long = "x".repeat(MAX_QUESTION_LEN + 1);
        let result = orch.seed_request(&registry(), &incident(Some(&long)));
        assert!(matches!(result, Err(AgentError::Orchestration { .. })));
    }

    #[tokio::test]
    async fn test_run_returns_answer_and_trace() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ModelReply::ToolCalls(vec![ToolCall {
                id: "c1".to_string(),
                name: "get_available_machines".to_string(),
                arguments: "{}".to_string(),
            }]),
            ModelReply::Final(r#"{"decision":"reassign"}"#.to_string()),
        ]));
        let orch = orchestrator(Arc::clone(&provider), 6);

        let run = orch
            .run(&registry(), &incident(Some("Replan around M004.")))
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));

        assert_eq!(run.answer(), r#"{"decision":"reassign"}"#);
        assert_eq!(run.trace.len(), 1);
        assert_eq!(run.trace.entries()[0].result_preview, "machine_id\nM001\n");
        assert_eq!(run.transcript.len(), 5);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_run_respects_configured_budget() {
        let provider = Arc::new(ScriptedProvider::always(ModelReply::ToolCalls(vec![
            ToolCall {
                id: "c".to_string(),
                name: "get_available_machines".to_string(),
                arguments: String::new(),
            },
        ])));
        let orch = orchestrator(Arc::clone(&provider), 3);

        let run = orch
            .run(&registry(), &incident(None))
            .await
            .unwrap_or_else(|e| panic!("run failed: {e}"));
        assert_eq!(run.answer(), EXHAUSTED_PAYLOAD);
        assert_eq!(provider.calls(), 3);
    }
}
