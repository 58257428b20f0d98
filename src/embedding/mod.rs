//! Text embedding backends and vector helpers.
//!
//! [`Embedder`] is the seam between the retrieval layer and the network.
//! The production backend is [`OpenAiEmbedder`]; tests substitute scripted
//! implementations.

mod openai;

use async_trait::async_trait;

pub use openai::OpenAiEmbedder;

use crate::agent::config::AgentConfig;
use crate::error::{ConfigError, EmbeddingError};

/// Trait for embedding backends.
///
/// Implementations must return exactly one vector per input text, in input
/// order. All vectors from one backend share a dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Embeds a batch of texts.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] on API failures or malformed responses.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Creates the embedding backend selected by the configuration.
///
/// # Errors
///
/// Returns [`ConfigError`] for unknown providers or an unusable HTTP client.
pub fn create_embedder(config: &AgentConfig) -> Result<Box<dyn Embedder>, ConfigError> {
    Ok(Box::new(OpenAiEmbedder::new(config)?))
}

/// Scales `vector` to unit length in place.
///
/// Returns the original norm, or `None` if the norm is zero or not finite
/// (the vector is left untouched in that case).
///
/// The norm is accumulated in `f64` so large components do not overflow.
#[allow(clippy::cast_possible_truncation)]
pub fn l2_normalize(vector: &mut [f32]) -> Option<f32> {
    let norm = vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt();
    if !norm.is_finite() || norm <= 0.0 {
        return None;
    }
    for x in vector.iter_mut() {
        *x = (f64::from(*x) / norm) as f32;
    }
    Some(norm as f32)
}

/// Inner product of two equal-length vectors.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
