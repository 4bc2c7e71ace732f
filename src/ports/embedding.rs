/// Embedding service port trait
///
/// Implementations: OpenAI embeddings
use crate::error::Result;
use async_trait::async_trait;

/// One embedding, tagged with its position in the submitted batch
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingItem {
    pub index: usize,
    pub vector: Vec<f32>,
}

/// Port trait for embedding services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingServicePort: Send + Sync {
    /// Embed a batch of texts with the given model
    async fn embed(&self, inputs: &[String], model: &str) -> Result<Vec<EmbeddingItem>>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
