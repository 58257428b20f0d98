//! Exact vector search over row documents.
//!
//! [`VectorIndex`] holds normalized embeddings positionally aligned with
//! their documents; [`RetrievalService`] builds it through an
//! [`Embedder`](crate::embedding::Embedder) and answers queries.

mod index;
mod retrieval;

pub use index::{SearchHit, VectorIndex};
pub use retrieval::{DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY, RetrievalService};
