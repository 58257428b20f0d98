//! Bounded tool-using reasoning loop for machine-outage replanning.
//!
//! Uses a pluggable provider abstraction backed by `OpenAI` / Azure
//! `OpenAI` chat completions.
//!
//! # Architecture
//!
//! ```text
//! Incident → Orchestrator (system policy + question)
//!   └── agentic_loop (≤ max_steps model calls)
//!       ├── LlmProvider::chat → Final(content) | ToolCalls
//!       └── ToolExecutor → ToolRegistry
//!           ├── get_cr_table            (snapshot)
//!           ├── get_available_machines  (snapshot)
//!           └── rag_search              (RetrievalService + VectorIndex)
//! ```

pub mod agentic_loop;
pub mod client;
pub mod config;
pub mod executor;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod schema;
pub mod tool;
pub mod tools;
pub mod trace;

// Re-export key types
pub use agentic_loop::{EXHAUSTED_PAYLOAD, LoopOutcome, LoopReport, agentic_loop};
pub use client::create_provider;
pub use config::AgentConfig;
pub use executor::ToolExecutor;
pub use message::{ChatMessage, ChatRequest, ChatResponse, ModelReply, Role, TokenUsage};
pub use orchestrator::{AgentRun, Incident, Orchestrator};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use tool::{Tool, ToolCall, ToolDefinition, ToolRegistry, ToolResult};
pub use tools::planning_tools;
pub use trace::{Trace, TraceEntry};
