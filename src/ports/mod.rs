/// Port trait definitions (interfaces)
///
/// These traits define the contracts for adapters to implement.
/// Following the ports-and-adapters (hexagonal) architecture pattern.
pub mod embedding;
pub mod llm;
pub mod sentiment;
pub mod storage;
pub mod summarization;
pub mod transcription;

#[cfg(test)]
pub mod mocks;

pub use embedding::{EmbeddingItem, EmbeddingServicePort};
pub use llm::{LlmConfig, LlmServicePort};
pub use sentiment::{DocumentOutcome, DocumentSentiment, SentimentDocument, SentimentServicePort};
pub use storage::{NewConversation, StoragePort};
pub use summarization::{
    ConversationItem, JobStatus, SummarizationRequest, SummarizationServicePort, SummaryTask,
    TaskOutcome, TaskResult,
};
pub use transcription::{TranscriptionConfig, TranscriptionServicePort};
