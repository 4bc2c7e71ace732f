/// Analysis layer - conversation enrichment pipeline
///
/// Each component wraps one external capability behind its port and owns its
/// failure policy. `pipeline` sequences them over one transcript.
pub mod chunker;
pub mod context;
pub mod embeddings;
pub mod json;
pub mod pipeline;
pub mod retrieval;
pub mod roles;
pub mod sentiment;
pub mod summarizer;
pub mod tokens;
pub mod topics;

pub use chunker::TextChunker;
pub use context::{question_prompt, suggestions_prompt};
pub use embeddings::EmbeddingGenerator;
pub use pipeline::{AnalysisOutput, AnalysisPipeline, PipelineServices};
pub use retrieval::nearest_chunks;
pub use roles::SpeakerRoleClassifier;
pub use sentiment::{LlmSentimentAnnotator, SentimentAnnotator, SentimentScorer};
pub use summarizer::ConversationSummarizer;
pub use tokens::{estimator_for_model, BpeEstimator, HeuristicEstimator, TokenEstimator};
pub use topics::TopicExtractor;
