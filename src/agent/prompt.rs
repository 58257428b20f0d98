//! System policy prompt, default question, and the user-turn template.
//!
//! Prompts are loaded from external template files when available, falling
//! back to compiled-in defaults. Templates may reference `{down_machine}`
//! and `{top_jobs}`, substituted at render time.

use std::path::{Path, PathBuf};

/// Compiled-in system policy prompt.
pub const SYSTEM_PROMPT: &str = "You are MAMO, a manufacturing orchestrator.
Rules:
- Use ONLY the provided CONTEXT and RAG EVIDENCE.
- Prioritize by lowest CR (CR table is authoritative).
- Do not assign work to {down_machine}.
- Return VALID JSON only with keys: decision, summary, evidence, prioritization, actions, risks, next_checks.
";

/// Compiled-in replanning question.
pub const QUESTION_PROMPT: &str = "Machine {down_machine} is down. Replan the next {top_jobs} jobs for the next shift using CR. Escalate if risk is high.";

/// Instruction prepended to the question in the first user turn.
const USER_TURN_PREAMBLE: &str =
    "You are an agent. Use tools to gather evidence, then respond with VALID JSON only.";

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/mamo-rs/prompts";

/// Filename for the system prompt template.
const SYSTEM_FILENAME: &str = "system.md";
/// Filename for the question template.
const QUESTION_FILENAME: &str = "question.md";

/// Prompt templates for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    /// System policy template.
    pub system: String,
    /// Default question template, used when no question is given.
    pub question: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl PromptSet {
    /// Loads prompts from `prompt_dir`, or from the default directory when
    /// `None`. Each file is loaded independently; a missing file uses its
    /// compiled-in default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir.map(PathBuf::from).or_else(Self::default_dir);

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            system: load_file(SYSTEM_FILENAME, SYSTEM_PROMPT),
            question: load_file(QUESTION_FILENAME, QUESTION_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            question: QUESTION_PROMPT.to_string(),
        }
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }

    /// Renders the system prompt for an outage of `down_machine`.
    #[must_use]
    pub fn render_system(&self, down_machine: &str, top_jobs: usize) -> String {
        render(&self.system, down_machine, top_jobs)
    }

    /// Renders the default question for an outage of `down_machine`.
    #[must_use]
    pub fn render_question(&self, down_machine: &str, top_jobs: usize) -> String {
        render(&self.question, down_machine, top_jobs)
    }
}

fn render(template: &str, down_machine: &str, top_jobs: usize) -> String {
    template
        .replace("{down_machine}", down_machine)
        .replace("{top_jobs}", &top_jobs.to_string())
}

/// Builds the first user turn for `question`.
#[must_use]
pub fn build_user_turn(question: &str) -> String {
    format!("{USER_TURN_PREAMBLE}\nQuestion: {question}")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_default_question_renders() {
        let prompts = PromptSet::defaults();
        assert_eq!(
            prompts.render_question("M004", 8),
            "Machine M004 is down. Replan the next 8 jobs for the next shift using CR. Escalate if risk is high."
        );
        assert!(
            prompts
                .render_system("M007", 8)
                .contains("- Do not assign work to M007.")
        );
    }

    #[test]
    fn test_user_turn() {
        assert_eq!(
            build_user_turn("Replan."),
            "You are an agent. Use tools to gather evidence, then respond with VALID JSON only.\nQuestion: Replan."
        );
    }

    #[test]
    fn test_load_overrides_per_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(SYSTEM_FILENAME), "Plan around {down_machine}.")
            .unwrap_or_else(|e| panic!("write: {e}"));

        let prompts = PromptSet::load(Some(dir.path()));
        assert_eq!(prompts.render_system("M004", 8), "Plan around M004.");
        assert_eq!(prompts.question, QUESTION_PROMPT);
    }

    #[test]
    fn test_blank_override_falls_back() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        std::fs::write(dir.path().join(QUESTION_FILENAME), "  \n")
            .unwrap_or_else(|e| panic!("write: {e}"));
        let prompts = PromptSet::load(Some(dir.path()));
        assert_eq!(prompts, PromptSet::defaults());
    }
}
