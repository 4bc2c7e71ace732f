/// Domain layer - core business models
///
/// These models are provider-agnostic and represent core business entities.
pub mod models;
pub mod prompts;

pub use models::{
    render_transcript, AnalysisResult, Chunk, Conversation, ConversationRecord, EmbeddingRecord,
    Phrase, Role, Sentiment, Summary, TranscriptionResult, Utterance,
};
pub use prompts::{ChatPrompt, PromptKind, PromptTemplates};
