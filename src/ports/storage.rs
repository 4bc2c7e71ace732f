/// Storage port trait
///
/// Defines the interface for persisting analyzed conversations.
/// Implementation: SQLite adapter
use crate::domain::models::{Conversation, EmbeddingRecord, Phrase, Summary};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Conversation row to insert; the storage layer assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewConversation {
    pub audio_id: String,
    pub company_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Port trait for storage operations
///
/// Every insert is independently callable. Inserting a conversation for an
/// audio id that is already stored returns the existing id; clearing its
/// derived rows before writing again keeps a retried store exact.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoragePort: Send + Sync {
    // Conversation operations
    /// Create a conversation (or find the one for the same audio id) and return its id
    async fn create_conversation(&self, conversation: &NewConversation) -> Result<String>;

    /// Get a conversation by ID
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// Delete the messages, chunks, topic links and participants of a conversation
    async fn clear_analysis(&self, conversation_id: &str) -> Result<()>;

    // Summary operations
    /// Save the issue/resolution summary of a conversation
    async fn create_summary(&self, conversation_id: &str, summary: &Summary) -> Result<()>;

    /// Get the summary of a conversation
    async fn get_summary(&self, conversation_id: &str) -> Result<Option<Summary>>;

    // Topic operations
    /// Return the id of an existing topic with this text, creating it if needed
    async fn find_or_create_topic(&self, topic: &str) -> Result<i64>;

    /// Link a topic to a conversation
    async fn link_topic(&self, topic_id: i64, conversation_id: &str) -> Result<()>;

    /// Get topic texts linked to a conversation
    async fn get_topics(&self, conversation_id: &str) -> Result<Vec<String>>;

    // Participant operations
    /// Add participant user ids to a conversation
    async fn add_participants(&self, conversation_id: &str, user_ids: &[String]) -> Result<usize>;

    /// Get participant user ids of a conversation
    async fn get_participants(&self, conversation_id: &str) -> Result<Vec<String>>;

    // Message operations
    /// Insert one transcript message at the given position
    async fn create_message(
        &self,
        conversation_id: &str,
        position: usize,
        phrase: &Phrase,
    ) -> Result<i64>;

    /// Get transcript messages of a conversation in position order
    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Phrase>>;

    // Embedding chunk operations
    /// Insert embedded chunks for a conversation
    async fn create_chunks(&self, conversation_id: &str, chunks: &[EmbeddingRecord]) -> Result<usize>;

    /// Get embedded chunks of a conversation ordered by chunk index
    async fn get_chunks(&self, conversation_id: &str) -> Result<Vec<EmbeddingRecord>>;

    /// Get every stored chunk, limited to one company's conversations when given
    async fn list_chunks(&self, company_id: Option<String>) -> Result<Vec<EmbeddingRecord>>;

    /// Get the chunks of the company's most recent conversation
    async fn latest_chunks(&self, company_id: &str) -> Result<Vec<EmbeddingRecord>>;
}
