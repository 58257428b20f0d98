//! End-to-end replanning pipeline.
//!
//! ```text
//! Dataset ─┬─ PlanningSnapshot (CR table, available machines)
//!          └─ row documents → RetrievalService::build → VectorIndex
//!                                   │
//!             planning_tools ◄──────┘
//!                   │
//!             Orchestrator::run → answer + trace → AuditWriter
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::agent::{
    AgentConfig, AgentRun, Incident, LlmProvider, Orchestrator, create_provider, planning_tools,
};
use crate::audit::{AuditPaths, AuditWriter};
use crate::data::{Dataset, PlanningSnapshot};
use crate::embedding::{Embedder, create_embedder};
use crate::error::Result;
use crate::evidence::{Document, dataset_documents};
use crate::search::{RetrievalService, VectorIndex};

/// A search hit detached from the index that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDocument {
    /// Position in the index.
    pub position: usize,
    /// Cosine similarity to the query.
    pub score: f32,
    /// The matched document.
    pub document: Document,
}

/// Everything one replanning run produced.
#[derive(Debug, Clone)]
pub struct Replan {
    /// The agent run (answer, trace, transcript, usage).
    pub run: AgentRun,
    /// Context the tools served.
    pub snapshot: PlanningSnapshot,
    /// Documents indexed for `rag_search`.
    pub documents_indexed: usize,
    /// Audit artifacts, when written.
    pub audit: Option<AuditPaths>,
}

/// The chat and embedding backends plus configuration for a run.
#[derive(Clone)]
pub struct Pipeline {
    config: AgentConfig,
    provider: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider.name())
            .field("embedder", &self.embedder.name())
            .field("chat_model", &self.config.chat_model)
            .field("embed_model", &self.config.embed_model)
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline with explicit backends.
    pub fn new(
        config: AgentConfig,
        provider: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            provider,
            embedder,
        }
    }

    /// Creates the configured `OpenAI` / Azure backends.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::error::Error::Config) for unknown
    /// providers or an unusable HTTP client.
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        let provider: Arc<dyn LlmProvider> = Arc::from(create_provider(&config)?);
        let embedder: Arc<dyn Embedder> = Arc::from(create_embedder(&config)?);
        Ok(Self::new(config, provider, embedder))
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// A retrieval service using the configured batching.
    #[must_use]
    pub fn retrieval(&self) -> RetrievalService {
        RetrievalService::new(Arc::clone(&self.embedder))
            .with_batch_size(self.config.embed_batch_size)
            .with_concurrency(self.config.embed_concurrency)
    }

    /// Builds the evidence index over every table in `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Index`](crate::error::Error::Index) if embedding
    /// fails or yields unusable vectors.
    pub async fn build_index(&self, dataset: &Dataset) -> Result<VectorIndex> {
        let documents = dataset_documents(dataset);
        Ok(self.retrieval().build(documents).await?)
    }

    /// Builds the index and returns the `k` documents closest to `query`.
    ///
    /// # Errors
    ///
    /// Returns an index or retrieval error.
    pub async fn search(
        &self,
        dataset: &Dataset,
        query: &str,
        k: usize,
    ) -> Result<Vec<RankedDocument>> {
        let service = self.retrieval();
        let index = service.build(dataset_documents(dataset)).await?;
        let hits = service.query(&index, query, k).await?;
        Ok(hits
            .into_iter()
            .map(|hit| RankedDocument {
                position: hit.position,
                score: hit.score,
                document: hit.document.clone(),
            })
            .collect())
    }

    /// Runs the full replanning pipeline.
    ///
    /// The index build happens before the loop starts; its failure aborts
    /// the run. Audit artifacts are written to `audit_dir` when given.
    ///
    /// # Errors
    ///
    /// Returns data, index, agent or audit errors.
    pub async fn replan(
        &self,
        dataset: &Dataset,
        incident: &Incident,
        now: DateTime<Utc>,
        audit_dir: Option<PathBuf>,
    ) -> Result<Replan> {
        let snapshot = PlanningSnapshot::compute(dataset, now, incident.top_jobs)?;
        info!(
            jobs = snapshot.cr_table.len(),
            machines = snapshot.available_machines.len(),
            "planning snapshot computed"
        );

        let service = self.retrieval();
        let index = service.build(dataset_documents(dataset)).await?;
        let documents_indexed = index.len();

        let registry = planning_tools(&snapshot, Arc::new(service), Arc::new(index))?;
        let orchestrator = Orchestrator::new(Arc::clone(&self.provider), self.config.clone());
        let run = orchestrator.run(&registry, incident).await?;
        info!(down_machine = %incident.down_machine, "agent response received");

        let audit = audit_dir
            .map(|dir| AuditWriter::new(dir).write(run.answer(), &run.trace, Utc::now()))
            .transpose()?;

        Ok(Replan {
            run,
            snapshot,
            documents_indexed,
            audit,
        })
    }
}
