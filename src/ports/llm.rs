/// LLM service port trait
///
/// Defines the interface for chat-completion models asked to answer in JSON.
/// Implementations: OpenAI
use crate::domain::prompts::ChatPrompt;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for LLM requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name (e.g., "gpt-4o", "gpt-4o-mini")
    pub model: String,

    /// Temperature for generation (0.0 to 1.0)
    pub temperature: Option<f32>,

    /// Maximum tokens in response
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn for_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..Self::default()
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: Some(0.0), // Classification tasks, keep answers stable
            max_tokens: Some(2000),
        }
    }
}

/// Port trait for LLM services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmServicePort: Send + Sync {
    /// Run a chat completion that must answer with a JSON object.
    ///
    /// Returns the raw message content; callers parse it and never execute it.
    async fn complete_json(&self, prompt: &ChatPrompt, config: &LlmConfig) -> Result<String>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Check if the service is configured (has API key)
    fn is_configured(&self) -> bool;
}
