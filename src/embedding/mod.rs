//! Embedding generation for semantic search.

mod hash;
mod minilm;
mod openai;

pub use hash::HashEmbedder;
pub use minilm::{MiniLmEmbedder, MINILM_DIMENSIONS};
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings, Settings};
use crate::error::{Result, SvarError};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Trait for embedding generation.
///
/// Implementations must be deterministic: the same text always yields the
/// same vector for a given provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the configured embedder.
///
/// Any failure here is reported as [`SvarError::ModelUnavailable`].
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::Minilm => {
            let model_path = Settings::expand_path(&settings.model_path);
            let tokenizer_path = Settings::expand_path(&settings.tokenizer_path);
            Arc::new(MiniLmEmbedder::load(&model_path, &tokenizer_path)?)
        }
        EmbeddingProvider::Openai => {
            if !crate::openai::api_key_configured() {
                return Err(SvarError::ModelUnavailable(
                    "OPENAI_API_KEY not set; required by the openai embedding provider".to_string(),
                ));
            }
            Arc::new(
                OpenAIEmbedder::with_config(&settings.model, settings.dimensions as usize)
                    .map_err(|e| SvarError::ModelUnavailable(e.to_string()))?,
            )
        }
        EmbeddingProvider::Hash => Arc::new(HashEmbedder::new(settings.dimensions as usize)),
    };

    info!(
        "Using {} embeddings ({} dimensions)",
        settings.provider,
        embedder.dimensions()
    );
    Ok(embedder)
}
