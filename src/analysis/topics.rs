//! Topic extraction
//!
//! Asks a chat model for the three most important topics of a conversation.

use crate::analysis::json;
use crate::domain::prompts::{PromptKind, PromptTemplates};
use crate::error::{AppError, Result};
use crate::ports::llm::{LlmConfig, LlmServicePort};
use serde_json::Value;
use std::sync::Arc;

pub const MAX_TOPICS: usize = 3;

/// Keys tried when the answer does not use "topics"
const FALLBACK_KEYS: [&str; 4] = ["temas_importantes", "temas", "important_topics", "main_topics"];

pub struct TopicExtractor {
    llm: Arc<dyn LlmServicePort>,
    config: LlmConfig,
}

impl TopicExtractor {
    pub fn new(llm: Arc<dyn LlmServicePort>, config: LlmConfig) -> Self {
        Self { llm, config }
    }

    /// Extract up to three topics from a rendered transcript. Never fails.
    pub async fn extract(&self, transcript: &str) -> Vec<String> {
        if transcript.trim().is_empty() {
            return Vec::new();
        }

        match self.try_extract(transcript).await {
            Ok(topics) => {
                log::info!("Extracted {} topic(s)", topics.len());
                topics
            }
            Err(e) => {
                log::warn!("Topic extraction degraded, no topics: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_extract(&self, transcript: &str) -> Result<Vec<String>> {
        let prompt = PromptTemplates::render(PromptKind::Topics, transcript);
        let raw = self.llm.complete_json(&prompt, &self.config).await?;
        parse_topics(&json::parse_response(&raw)?)
    }
}

fn parse_topics(value: &Value) -> Result<Vec<String>> {
    let list = match value {
        Value::Array(items) => items,
        other => json::find_key(other, "topics", &FALLBACK_KEYS)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AppError::MalformedResponse("topic response has no topic list".to_string())
            })?,
    };

    Ok(list
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|topic| !topic.is_empty())
        .take(MAX_TOPICS)
        .map(str::to_string)
        .collect())
}
