/// Sentiment service port trait
///
/// Document-level sentiment scoring in small batches.
/// Implementations: Azure AI Language
use crate::domain::models::Sentiment;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One document submitted for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentDocument {
    /// Caller-assigned id used to re-associate results
    pub id: String,
    pub language: String,
    pub text: String,
}

/// Per-document outcome reported by the service
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    Scored(Sentiment),
    Failed(String),
}

/// Result for one document, in whatever order the service returned it
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSentiment {
    pub id: String,
    pub outcome: DocumentOutcome,
}

/// Port trait for sentiment services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SentimentServicePort: Send + Sync {
    /// Score a batch of documents. Batches larger than `max_batch_size()` are rejected.
    async fn analyze_batch(&self, documents: &[SentimentDocument]) -> Result<Vec<DocumentSentiment>>;

    /// Largest batch accepted in one call
    fn max_batch_size(&self) -> usize;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
