//! Mock implementations for testing

use crate::domain::models::{Conversation, EmbeddingRecord, Phrase, Summary};
use crate::error::{AppError, Result};
use crate::ports::storage::{NewConversation, StoragePort};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// In-memory storage with optional failure injection
#[derive(Clone, Default)]
pub struct MockStorage {
    conversations: Arc<Mutex<HashMap<String, Conversation>>>,
    summaries: Arc<Mutex<HashMap<String, Summary>>>,
    topics: Arc<Mutex<Vec<(i64, String)>>>,
    topic_links: Arc<Mutex<Vec<(i64, String)>>>,
    participants: Arc<Mutex<Vec<(String, String)>>>,
    messages: Arc<Mutex<Vec<(String, usize, Phrase)>>>,
    chunks: Arc<Mutex<Vec<(String, EmbeddingRecord)>>>,
    next_id: Arc<Mutex<i64>>,
    failures: Arc<Mutex<Failures>>,
}

#[derive(Default)]
struct Failures {
    conversation: bool,
    summary: bool,
    topics: HashSet<String>,
    message_positions: HashSet<usize>,
    participants: bool,
    chunks: bool,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i64 {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        *id
    }

    fn injected(what: &str) -> AppError {
        AppError::Database(rusqlite::Error::InvalidParameterName(format!(
            "injected failure: {}",
            what
        )))
    }

    pub fn fail_conversation(&self) {
        self.failures.lock().unwrap().conversation = true;
    }

    pub fn fail_summary(&self) {
        self.failures.lock().unwrap().summary = true;
    }

    pub fn fail_topic(&self, topic: &str) {
        self.failures.lock().unwrap().topics.insert(topic.to_string());
    }

    pub fn fail_message_at(&self, position: usize) {
        self.failures.lock().unwrap().message_positions.insert(position);
    }

    pub fn fail_participants(&self) {
        self.failures.lock().unwrap().participants = true;
    }

    pub fn fail_chunks(&self) {
        self.failures.lock().unwrap().chunks = true;
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.lock().unwrap().len()
    }

    pub fn topic_count(&self) -> usize {
        self.topics.lock().unwrap().len()
    }
}

#[async_trait]
impl StoragePort for MockStorage {
    async fn create_conversation(&self, conversation: &NewConversation) -> Result<String> {
        if self.failures.lock().unwrap().conversation {
            return Err(Self::injected("conversation"));
        }
        let mut conversations = self.conversations.lock().unwrap();
        if let Some(existing) = conversations
            .values_mut()
            .find(|c| c.audio_id == conversation.audio_id)
        {
            existing.company_id = conversation.company_id.clone();
            existing.start_time = conversation.start_time;
            existing.end_time = conversation.end_time;
            return Ok(existing.id.clone());
        }
        let id = format!("conv-{}", self.next_id());
        conversations.insert(
            id.clone(),
            Conversation {
                id: id.clone(),
                audio_id: conversation.audio_id.clone(),
                company_id: conversation.company_id.clone(),
                start_time: conversation.start_time,
                end_time: conversation.end_time,
            },
        );
        Ok(id)
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        Ok(self.conversations.lock().unwrap().get(id).cloned())
    }

    async fn clear_analysis(&self, conversation_id: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .retain(|(c, _, _)| c != conversation_id);
        self.chunks.lock().unwrap().retain(|(c, _)| c != conversation_id);
        self.topic_links
            .lock()
            .unwrap()
            .retain(|(_, c)| c != conversation_id);
        self.participants
            .lock()
            .unwrap()
            .retain(|(c, _)| c != conversation_id);
        Ok(())
    }

    async fn create_summary(&self, conversation_id: &str, summary: &Summary) -> Result<()> {
        if self.failures.lock().unwrap().summary {
            return Err(Self::injected("summary"));
        }
        self.summaries
            .lock()
            .unwrap()
            .insert(conversation_id.to_string(), summary.clone());
        Ok(())
    }

    async fn get_summary(&self, conversation_id: &str) -> Result<Option<Summary>> {
        Ok(self.summaries.lock().unwrap().get(conversation_id).cloned())
    }

    async fn find_or_create_topic(&self, topic: &str) -> Result<i64> {
        if self.failures.lock().unwrap().topics.contains(topic) {
            return Err(Self::injected("topic"));
        }
        let mut topics = self.topics.lock().unwrap();
        if let Some((id, _)) = topics.iter().find(|(_, t)| t == topic) {
            return Ok(*id);
        }
        let id = self.next_id();
        topics.push((id, topic.to_string()));
        Ok(id)
    }

    async fn link_topic(&self, topic_id: i64, conversation_id: &str) -> Result<()> {
        let mut links = self.topic_links.lock().unwrap();
        let link = (topic_id, conversation_id.to_string());
        if !links.contains(&link) {
            links.push(link);
        }
        Ok(())
    }

    async fn get_topics(&self, conversation_id: &str) -> Result<Vec<String>> {
        let topics = self.topics.lock().unwrap();
        Ok(self
            .topic_links
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, c)| c == conversation_id)
            .filter_map(|(id, _)| {
                topics
                    .iter()
                    .find(|(topic_id, _)| topic_id == id)
                    .map(|(_, text)| text.clone())
            })
            .collect())
    }

    async fn add_participants(&self, conversation_id: &str, user_ids: &[String]) -> Result<usize> {
        if self.failures.lock().unwrap().participants {
            return Err(Self::injected("participants"));
        }
        let mut participants = self.participants.lock().unwrap();
        for user_id in user_ids {
            participants.push((conversation_id.to_string(), user_id.clone()));
        }
        Ok(user_ids.len())
    }

    async fn get_participants(&self, conversation_id: &str) -> Result<Vec<String>> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == conversation_id)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn create_message(
        &self,
        conversation_id: &str,
        position: usize,
        phrase: &Phrase,
    ) -> Result<i64> {
        if self.failures.lock().unwrap().message_positions.contains(&position) {
            return Err(Self::injected("message"));
        }
        let id = self.next_id();
        self.messages
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), position, phrase.clone()));
        Ok(id)
    }

    async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Phrase>> {
        let mut messages: Vec<_> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _, _)| c == conversation_id)
            .map(|(_, position, phrase)| (*position, phrase.clone()))
            .collect();
        messages.sort_by_key(|(position, _)| *position);
        Ok(messages.into_iter().map(|(_, phrase)| phrase).collect())
    }

    async fn create_chunks(&self, conversation_id: &str, chunks: &[EmbeddingRecord]) -> Result<usize> {
        if self.failures.lock().unwrap().chunks {
            return Err(Self::injected("chunks"));
        }
        let mut stored = self.chunks.lock().unwrap();
        for chunk in chunks {
            stored.push((conversation_id.to_string(), chunk.clone()));
        }
        Ok(chunks.len())
    }

    async fn get_chunks(&self, conversation_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let mut chunks: Vec<_> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == conversation_id)
            .map(|(_, chunk)| chunk.clone())
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn list_chunks(&self, company_id: Option<String>) -> Result<Vec<EmbeddingRecord>> {
        let conversations = self.conversations.lock().unwrap();
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| match &company_id {
                Some(company) => conversations
                    .get(c)
                    .is_some_and(|conv| conv.company_id.as_ref() == Some(company)),
                None => true,
            })
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }

    async fn latest_chunks(&self, company_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let latest = self
            .conversations
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.company_id.as_deref() == Some(company_id))
            .max_by_key(|c| c.start_time)
            .map(|c| c.id.clone());
        match latest {
            Some(id) => self.get_chunks(&id).await,
            None => Ok(Vec::new()),
        }
    }
}
