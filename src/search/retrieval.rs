//! Build-once / query-many retrieval over row documents.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use super::index::{SearchHit, VectorIndex};
use crate::embedding::{Embedder, l2_normalize};
use crate::error::{EmbeddingError, IndexError, RetrievalError};
use crate::evidence::Document;

/// Default texts per embedding request.
pub const DEFAULT_BATCH_SIZE: usize = 64;
/// Default embedding requests in flight during a build.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Embeds documents into a [`VectorIndex`] and answers similarity queries.
#[derive(Clone)]
pub struct RetrievalService {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    concurrency: usize,
}

impl std::fmt::Debug for RetrievalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalService")
            .field("embedder", &self.embedder.name())
            .field("batch_size", &self.batch_size)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl RetrievalService {
    /// Creates a service with default batching.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets the number of texts per embedding request.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the number of embedding requests in flight during a build.
    /// Values below 1 are treated as 1.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = if concurrency == 0 { 1 } else { concurrency };
        self
    }

    /// Embeds every document and builds the index.
    ///
    /// Batches may be embedded concurrently; results are reassembled in
    /// batch order, so vector `i` always belongs to `documents[i]`. Any
    /// failure aborts the build.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError`] on embedding failures, count or dimension
    /// mismatches, or degenerate vectors.
    pub async fn build(&self, documents: Vec<Document>) -> Result<VectorIndex, IndexError> {
        if self.batch_size == 0 {
            return Err(IndexError::ZeroBatchSize);
        }
        if documents.is_empty() {
            return VectorIndex::new(documents, Vec::new());
        }

        let start = Instant::now();
        let batches: Vec<Vec<String>> = documents
            .chunks(self.batch_size)
            .map(|chunk| chunk.iter().map(|d| d.text().to_string()).collect())
            .collect();
        let batch_count = batches.len();

        let embedded: Vec<Vec<Vec<f32>>> = stream::iter(batches.into_iter().enumerate())
            .map(|(batch, texts)| async move {
                let vectors = self
                    .embedder
                    .embed(&texts)
                    .await
                    .map_err(|source| IndexError::Embedding { batch, source })?;
                if vectors.len() != texts.len() {
                    return Err(IndexError::Embedding {
                        batch,
                        source: EmbeddingError::CountMismatch {
                            expected: texts.len(),
                            actual: vectors.len(),
                        },
                    });
                }
                debug!(batch, size = texts.len(), "embedded batch");
                Ok::<_, IndexError>(vectors)
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let index = VectorIndex::new(documents, embedded.into_iter().flatten().collect())?;

        info!(
            documents = index.len(),
            dims = index.dims(),
            batches = batch_count,
            elapsed_ms = start.elapsed().as_millis(),
            embedder = self.embedder.name(),
            "evidence index built"
        );

        Ok(index)
    }

    /// Returns up to `k` documents most similar to `text`.
    ///
    /// `k` is clamped to the index size; `k == 0` or an empty index returns
    /// nothing without calling the embedder.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError`] if embedding the query fails or yields an
    /// unusable vector.
    pub async fn query<'a>(
        &self,
        index: &'a VectorIndex,
        text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit<'a>>, RetrievalError> {
        if k == 0 || index.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            }
            .into());
        }
        let mut query = vectors.swap_remove(0);

        if query.len() != index.dims() {
            return Err(RetrievalError::DimensionMismatch {
                expected: index.dims(),
                actual: query.len(),
            });
        }
        l2_normalize(&mut query).ok_or(RetrievalError::DegenerateQuery)?;

        let hits = index.search(&query, k);
        debug!(k, hits = hits.len(), "retrieval query answered");
        Ok(hits)
    }
}
