//! OpenAI embeddings adapter
//!
//! Implements the EmbeddingServicePort for OpenAI's `/embeddings` endpoint.
//! Each returned item carries the position of its input in the request.

use crate::adapters::services::llm::openai::OPENAI_API_BASE;
use crate::adapters::services::{check_status, http_client, read_json, request_failed, BackoffPolicy};
use crate::error::Result;
use crate::ports::embedding::{EmbeddingItem, EmbeddingServicePort};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "openai-embeddings";

pub struct OpenAIEmbeddingService {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbeddingService {
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

    async fn request_embeddings(&self, request_body: &EmbeddingRequest<'_>) -> Result<Vec<EmbeddingItem>> {
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request_body)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        let embedding_response: EmbeddingResponse =
            read_json(SERVICE, check_status(SERVICE, response).await?).await?;

        Ok(embedding_response
            .data
            .into_iter()
            .map(|item| EmbeddingItem {
                index: item.index,
                vector: item.embedding,
            })
            .collect())
    }
}

#[async_trait]
impl EmbeddingServicePort for OpenAIEmbeddingService {
    async fn embed(&self, inputs: &[String], model: &str) -> Result<Vec<EmbeddingItem>> {
        log::debug!("Requesting {} embedding(s) from {}", inputs.len(), model);
        let request_body = EmbeddingRequest {
            model,
            input: inputs,
        };
        self.request_embeddings(&request_body).await
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}
