//! Embeddings over the `OpenAI` / Azure `OpenAI` embeddings endpoint.

use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use tracing::debug;

use super::Embedder;
use crate::agent::config::AgentConfig;
use crate::agent::providers::openai::OpenAiBackend;
use crate::error::{ConfigError, EmbeddingError};

/// Embedding backend using the `async-openai` client.
///
/// For Azure the embedding model name is the deployment id, so this holds
/// its own client separate from the chat provider.
pub struct OpenAiEmbedder {
    backend: OpenAiBackend,
    model: String,
}

impl OpenAiEmbedder {
    /// Creates an embedder for `config.embed_model`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unknown providers or an unusable HTTP client.
    pub fn new(config: &AgentConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: OpenAiBackend::new(config, &config.embed_model)?,
            model: config.embed_model.clone(),
        })
    }
}

impl std::fmt::Debug for OpenAiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiEmbedder")
            .field("backend", &self.backend.kind())
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        self.backend.kind()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(texts.to_vec())
            .build()
            .map_err(|e| EmbeddingError::ApiRequest {
                message: e.to_string(),
            })?;

        let response = self
            .backend
            .embed(request)
            .await
            .map_err(|e| EmbeddingError::ApiRequest {
                message: e.to_string(),
            })?;

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: data.len(),
            });
        }

        // The API reports each vector's input position; do not rely on
        // response order.
        data.sort_by_key(|e| e.index);
        debug!(inputs = texts.len(), model = %self.model, "embedding batch complete");

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }
}
