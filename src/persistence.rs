//! Storing analyzed conversations
//!
//! The conversation row and its summary must be written; a failure there is
//! returned to the caller. Topics, participants, messages and chunks are
//! written one by one, and a failed item is logged and skipped.

use crate::domain::models::ConversationRecord;
use crate::error::Result;
use crate::ports::storage::{NewConversation, StoragePort};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Counts of secondary rows actually written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreReport {
    pub conversation_id: String,
    pub topics: usize,
    pub participants: usize,
    pub messages: usize,
    pub chunks: usize,
}

/// Persist a conversation and everything derived from it.
///
/// Retrying with the same `audio_id` reuses the existing conversation row and
/// replaces what was stored for it before.
pub async fn store_conversation(
    storage: &dyn StoragePort,
    record: &ConversationRecord,
) -> Result<StoreReport> {
    let conversation_id = storage
        .create_conversation(&NewConversation {
            audio_id: record.audio_id.clone(),
            company_id: record.company_id.clone(),
            start_time: record.start_time,
            end_time: record.end_time,
        })
        .await?;
    log::info!(
        "Stored conversation {} for audio {}",
        conversation_id,
        record.audio_id
    );

    // Rows from an earlier store of the same audio are replaced, not merged
    storage.clear_analysis(&conversation_id).await?;
    storage
        .create_summary(&conversation_id, &record.analysis.summary)
        .await?;

    let mut report = StoreReport {
        conversation_id: conversation_id.clone(),
        ..StoreReport::default()
    };

    let topics: BTreeSet<String> = record
        .analysis
        .topics
        .iter()
        .map(|topic| topic.trim().to_lowercase())
        .filter(|topic| !topic.is_empty())
        .collect();
    for topic in &topics {
        let linked = match storage.find_or_create_topic(topic).await {
            Ok(topic_id) => storage.link_topic(topic_id, &conversation_id).await,
            Err(e) => Err(e),
        };
        match linked {
            Ok(()) => report.topics += 1,
            Err(e) => log::warn!("Skipping topic '{}': {}", topic, e),
        }
    }

    let participants: Vec<String> = record
        .participants
        .iter()
        .filter(|participant| match Uuid::parse_str(participant.trim()) {
            Ok(_) => true,
            Err(_) => {
                log::warn!("Skipping participant with invalid user id '{}'", participant);
                false
            }
        })
        .map(|participant| participant.trim().to_string())
        .collect();
    if !participants.is_empty() {
        match storage.add_participants(&conversation_id, &participants).await {
            Ok(count) => report.participants = count,
            Err(e) => log::warn!("Skipping {} participant(s): {}", participants.len(), e),
        }
    }

    for (position, phrase) in record.analysis.phrases.iter().enumerate() {
        match storage.create_message(&conversation_id, position, phrase).await {
            Ok(_) => report.messages += 1,
            Err(e) => log::warn!("Skipping message {}: {}", position, e),
        }
    }

    if !record.embeddings.is_empty() {
        match storage.create_chunks(&conversation_id, &record.embeddings).await {
            Ok(count) => report.chunks = count,
            Err(e) => log::warn!("Skipping {} chunk(s): {}", record.embeddings.len(), e),
        }
    }

    log::info!(
        "Conversation {}: {} topic(s), {} participant(s), {}/{} message(s), {} chunk(s) stored",
        conversation_id,
        report.topics,
        report.participants,
        report.messages,
        record.analysis.phrases.len(),
        report.chunks
    );
    Ok(report)
}
