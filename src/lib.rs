//! # mamo-rs
//!
//! Machine-outage replanning: when a machine goes down, rank the affected
//! jobs by critical ratio, index every production-table row for semantic
//! retrieval, and let a chat model replan the next shift through a bounded
//! tool-calling loop.
//!
//! ## Layers
//!
//! - [`data`]: CSV tables and the deterministic planning snapshot
//!   (critical-ratio table, available machines).
//! - [`evidence`]: one flat text document per table row.
//! - [`embedding`]: the [`Embedder`](embedding::Embedder) seam and its
//!   `OpenAI` / Azure client.
//! - [`search`]: exact cosine [`VectorIndex`](search::VectorIndex) and the
//!   [`RetrievalService`](search::RetrievalService) that builds and queries it.
//! - [`agent`]: chat provider, tool registry, the bounded loop and the
//!   [`Orchestrator`](agent::Orchestrator).
//! - [`audit`]: per-run answer and trace artifacts.
//! - [`replan`]: the end-to-end [`Pipeline`](replan::Pipeline).
//! - [`cli`]: the `mamo-rs` command line.
//!
//! ## Example
//!
//! ```no_run
//! use mamo_rs::agent::{AgentConfig, Incident};
//! use mamo_rs::data::Dataset;
//! use mamo_rs::replan::Pipeline;
//!
//! # async fn demo() -> mamo_rs::Result<()> {
//! let dataset = Dataset::load(std::path::Path::new("data"))?;
//! let config = AgentConfig::from_env()?;
//! let pipeline = Pipeline::from_config(config)?;
//! let incident = Incident {
//!     down_machine: "M004".to_string(),
//!     top_jobs: 8,
//!     question: None,
//! };
//! let replan = pipeline
//!     .replan(&dataset, &incident, chrono::Utc::now(), None)
//!     .await?;
//! println!("{}", replan.run.answer());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod audit;
pub mod cli;
pub mod data;
pub mod embedding;
pub mod error;
pub mod evidence;
pub mod replan;
pub mod search;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use replan::{Pipeline, Replan};
