//! Flat exact inner-product index over unit-normalized vectors.

use rayon::prelude::*;

use crate::embedding::{dot, l2_normalize};
use crate::error::IndexError;
use crate::evidence::Document;

/// A scored search result referencing a document in the index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    /// Position of the document in the index (and in the build input).
    pub position: usize,
    /// Cosine similarity to the query.
    pub score: f32,
    /// The matched document.
    pub document: &'a Document,
}

/// Documents and their normalized embeddings, stored together.
///
/// Position `i` of the vector storage always belongs to `documents[i]`.
/// The only constructor checks this, and there are no mutators.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    documents: Vec<Document>,
    /// Row-major `documents.len() × dims` matrix.
    vectors: Vec<f32>,
    dims: usize,
}

impl VectorIndex {
    /// Builds an index from documents and their raw embeddings.
    ///
    /// Every vector is L2-normalized. Vector `i` must be the embedding of
    /// document `i`.
    ///
    /// # Errors
    ///
    /// - [`IndexError::CountMismatch`] if the counts differ.
    /// - [`IndexError::DimensionMismatch`] if any vector's length differs
    ///   from the first one's.
    /// - [`IndexError::DegenerateVector`] if a vector has zero length.
    pub fn new(documents: Vec<Document>, embeddings: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if documents.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                documents: documents.len(),
                vectors: embeddings.len(),
            });
        }

        let dims = embeddings.first().map_or(0, Vec::len);
        let mut vectors = Vec::with_capacity(dims * embeddings.len());
        for (position, mut vector) in embeddings.into_iter().enumerate() {
            if vector.len() != dims {
                return Err(IndexError::DimensionMismatch {
                    position,
                    expected: dims,
                    actual: vector.len(),
                });
            }
            l2_normalize(&mut vector).ok_or(IndexError::DegenerateVector { position })?;
            vectors.extend_from_slice(&vector);
        }

        Ok(Self {
            documents,
            vectors,
            dims,
        })
    }

    /// Number of indexed documents.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns `true` if the index holds no documents.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Vector dimension (0 for an empty index).
    #[must_use]
    pub const fn dims(&self) -> usize {
        self.dims
    }

    /// Indexed documents in build order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Normalized vector stored for `position`, `None` past the end.
    #[must_use]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position.checked_mul(self.dims)?;
        self.vectors.get(start..start + self.dims)
    }

    /// Returns the `k` best matches for an already-normalized query vector.
    ///
    /// Scores are inner products; results are sorted by descending score
    /// with ties broken by ascending position. `k` is clamped to the index
    /// size. The caller guarantees `query.len() == self.dims()`.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit<'_>> {
        let k = k.min(self.len());
        if k == 0 || self.dims == 0 {
            return Vec::new();
        }

        let scores: Vec<f32> = self
            .vectors
            .par_chunks_exact(self.dims)
            .map(|row| dot(row, query))
            .collect();

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        ranked.truncate(k);

        ranked
            .into_iter()
            .map(|position| SearchHit {
                position,
                score: scores[position],
                document: &self.documents[position],
            })
            .collect()
    }
}
