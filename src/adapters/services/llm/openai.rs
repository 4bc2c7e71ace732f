//! OpenAI LLM service adapter
//!
//! Implements the LlmServicePort for OpenAI's chat completions API in JSON
//! mode, so the returned content is always meant to be a JSON object.

use crate::adapters::services::{check_status, http_client, read_json, request_failed, BackoffPolicy};
use crate::domain::prompts::ChatPrompt;
use crate::error::{AppError, Result};
use crate::ports::llm::{LlmConfig, LlmServicePort};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "openai";
pub(crate) const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI service implementation
pub struct OpenAIService {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

impl OpenAIService {
    /// Create a new OpenAI service with the given API key
    pub fn new(api_key: String, retry: &BackoffPolicy) -> Result<Self> {
        Ok(Self {
            client: http_client(Duration::from_secs(120), retry)?.retrying,
            api_key,
            base_url: OPENAI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn chat_completion(&self, request_body: &ChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request_body)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        let completion_response: ChatCompletionResponse =
            read_json(SERVICE, check_status(SERVICE, response).await?).await?;

        let choice = completion_response.choices.into_iter().next().ok_or_else(|| {
            AppError::MalformedResponse("no completion choices returned".to_string())
        })?;
        if choice.finish_reason.as_deref() == Some("length") {
            log::warn!(
                "OpenAI completion from {} was cut off at the token limit",
                completion_response.model
            );
        }

        let content = choice.message.content.unwrap_or_default();
        log::debug!(
            "OpenAI completion successful, generated {} characters",
            content.len()
        );
        Ok(content)
    }
}

#[async_trait]
impl LlmServicePort for OpenAIService {
    async fn complete_json(&self, prompt: &ChatPrompt, config: &LlmConfig) -> Result<String> {
        let request_body = ChatCompletionRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(prompt.system.clone()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt.user.clone()),
                },
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        log::info!(
            "Calling OpenAI chat completion with model: {}",
            config.model
        );

        self.chat_completion(&request_body).await
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
