//! The planning tool catalog exposed to the model.
//!
//! Two snapshot tools return precomputed CSV text (CR table, available
//! machines); `rag_search` queries the evidence index built for the run.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use super::tool::{Tool, ToolDefinition, ToolRegistry};
use crate::data::PlanningSnapshot;
use crate::error::{self, ToolError};
use crate::search::{RetrievalService, VectorIndex};

/// Name of the CR table tool.
pub const CR_TABLE_TOOL: &str = "get_cr_table";
/// Name of the available machines tool.
pub const MACHINES_TOOL: &str = "get_available_machines";
/// Name of the evidence search tool.
pub const RAG_SEARCH_TOOL: &str = "rag_search";

/// Results returned by `rag_search` when `k` is omitted.
pub const DEFAULT_SEARCH_K: usize = 10;
/// Upper bound on `k` accepted by `rag_search`.
pub const MAX_SEARCH_K: usize = 50;

/// A tool that returns a fixed text snapshot computed before the run.
#[derive(Debug, Clone)]
pub struct SnapshotTool {
    definition: ToolDefinition,
    content: String,
}

impl SnapshotTool {
    /// Creates a no-argument tool returning `content`.
    pub fn new(name: &str, description: &str, content: impl Into<String>) -> Self {
        Self {
            definition: ToolDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            },
            content: content.into(),
        }
    }
}

#[async_trait]
impl Tool for SnapshotTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, _args: &Map<String, Value>) -> Result<String, ToolError> {
        Ok(self.content.clone())
    }
}

/// Semantic search over the run's evidence index.
#[derive(Debug, Clone)]
pub struct RagSearchTool {
    definition: ToolDefinition,
    service: Arc<RetrievalService>,
    index: Arc<VectorIndex>,
}

impl RagSearchTool {
    /// Creates the tool over a built index.
    pub fn new(service: Arc<RetrievalService>, index: Arc<VectorIndex>) -> Self {
        Self {
            definition: ToolDefinition {
                name: RAG_SEARCH_TOOL.to_string(),
                description: "Search indexed documents for evidence.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "k": {"type": "integer", "default": DEFAULT_SEARCH_K}
                    },
                    "required": ["query"]
                }),
            },
            service,
            index,
        }
    }
}

/// Reads `k` from validated arguments: default when absent, negatives as 0.
fn requested_k(args: &Map<String, Value>) -> usize {
    match args.get("k") {
        Some(Value::Number(n)) => n
            .as_u64()
            .map_or(0, |k| usize::try_from(k).unwrap_or(MAX_SEARCH_K))
            .min(MAX_SEARCH_K),
        _ => DEFAULT_SEARCH_K,
    }
}

#[async_trait]
impl Tool for RagSearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, ToolError> {
        let query = args.get("query").and_then(Value::as_str).unwrap_or_default();
        let k = requested_k(args);

        let hits = self
            .service
            .query(&self.index, query, k)
            .await
            .map_err(|e| ToolError::Execution {
                name: RAG_SEARCH_TOOL.to_string(),
                message: e.to_string(),
            })?;

        Ok(hits
            .iter()
            .map(|hit| hit.document.text())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Builds the registry for one replanning run.
///
/// # Errors
///
/// Returns [`error::Error::Data`] if a snapshot table cannot be rendered as CSV.
pub fn planning_tools(
    snapshot: &PlanningSnapshot,
    service: Arc<RetrievalService>,
    index: Arc<VectorIndex>,
) -> error::Result<ToolRegistry> {
    let registry = ToolRegistry::new()
        .with(Arc::new(SnapshotTool::new(
            CR_TABLE_TOOL,
            "Return the current CR table for next jobs.",
            snapshot.cr_table.to_csv()?,
        )))?
        .with(Arc::new(SnapshotTool::new(
            MACHINES_TOOL,
            "Return available machines for the next shift.",
            snapshot.available_machines.to_csv()?,
        )))?
        .with(Arc::new(RagSearchTool::new(service, index)))?;
    Ok(registry)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::executor::ToolExecutor;
    use crate::agent::tool::ToolCall;
    use crate::data::Table;
    use crate::evidence::Document;
    use crate::testing::{FailingEmbedder, KeywordEmbedder};
    use test_case::test_case;

    const KEYWORDS: [&str; 3] = ["M001", "M004", "M002"];

    fn snapshot() -> PlanningSnapshot {
        PlanningSnapshot {
            cr_table: Table::new(
                "cr_table",
                vec!["job_id".to_string(), "CR".to_string()],
                vec![vec!["J2".to_string(), "0.500".to_string()]],
            ),
            available_machines: Table::new(
                "available_machines",
                vec!["machine_id".to_string()],
                vec![vec!["M001".to_string()], vec!["M002".to_string()]],
            ),
        }
    }

    async fn registry() -> ToolRegistry {
        let service = Arc::new(RetrievalService::new(Arc::new(KeywordEmbedder::new(
            &KEYWORDS,
        ))));
        let docs = [
            "SOURCE=machines ROW=0 | machine_id=M001 | status=UP",
            "SOURCE=machines ROW=1 | machine_id=M004 | status=DOWN",
            "SOURCE=machines ROW=2 | machine_id=M002 | status=UP",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| Document::from_text("machines", i, *t))
        .collect();
        let index = service
            .build(docs)
            .await
            .unwrap_or_else(|e| panic!("build failed: {e}"));
        planning_tools(&snapshot(), service, Arc::new(index))
            .unwrap_or_else(|e| panic!("registry failed: {e}"))
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[tokio::test]
    async fn test_catalog_order_and_descriptions() {
        let registry = registry().await;
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![CR_TABLE_TOOL, MACHINES_TOOL, RAG_SEARCH_TOOL]
        );
        let defs = registry.definitions();
        assert_eq!(defs[0].description, "Return the current CR table for next jobs.");
        assert_eq!(defs[2].parameters["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_snapshot_tools_return_csv() {
        let registry = registry().await;
        let executor = ToolExecutor::new(&registry);

        let result = executor.execute(&call(CR_TABLE_TOOL, "{}")).await;
        assert!(!result.is_error);
        assert_eq!(result.content, "job_id,CR\nJ2,0.500\n");

        let result = executor.execute(&call(MACHINES_TOOL, "")).await;
        assert_eq!(result.content, "machine_id\nM001\nM002\n");
    }

    #[tokio::test]
    async fn test_rag_search_returns_ranked_texts() {
        let registry = registry().await;
        let result = ToolExecutor::new(&registry)
            .execute(&call(RAG_SEARCH_TOOL, r#"{"query":"M004 status","k":1}"#))
            .await;
        assert!(!result.is_error, "Expected success, got: {}", result.content);
        assert_eq!(
            result.content,
            "SOURCE=machines ROW=1 | machine_id=M004 | status=DOWN"
        );
    }

    #[tokio::test]
    async fn test_rag_search_requires_query() {
        let registry = registry().await;
        let result = ToolExecutor::new(&registry)
            .execute(&call(RAG_SEARCH_TOOL, r#"{"k":1}"#))
            .await;
        assert!(result.is_error);
        assert!(result.content.contains("missing required field 'query'"));
    }

    #[tokio::test]
    async fn test_rag_search_failure_is_error_result() {
        let service = Arc::new(RetrievalService::new(Arc::new(FailingEmbedder)));
        let index = VectorIndex::new(
            vec![Document::from_text("machines", 0, "M001")],
            vec![vec![1.0, 0.0]],
        )
        .unwrap_or_else(|e| panic!("index failed: {e}"));
        let registry = planning_tools(&snapshot(), service, Arc::new(index))
            .unwrap_or_else(|e| panic!("registry failed: {e}"));

        let result = ToolExecutor::new(&registry)
            .execute(&call(RAG_SEARCH_TOOL, r#"{"query":"M001"}"#))
            .await;
        assert!(result.is_error);
        assert!(result.content.starts_with("rag_search failed:"));
    }

    #[test_case(json!({"query": "q"}), DEFAULT_SEARCH_K ; "default")]
    #[test_case(json!({"query": "q", "k": 3}), 3 ; "explicit")]
    #[test_case(json!({"query": "q", "k": -4}), 0 ; "negative")]
    #[test_case(json!({"query": "q", "k": 10_000}), MAX_SEARCH_K ; "capped")]
    fn test_requested_k(args: Value, expected: usize) {
        let Value::Object(args) = args else {
            panic!("fixture must be an object");
        };
        assert_eq!(requested_k(&args), expected);
    }
}
