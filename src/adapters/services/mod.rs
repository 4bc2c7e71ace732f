//! External service adapters
//!
//! This module contains adapters for external APIs including:
//! - ASR (Automatic Speech Recognition) services
//! - LLM (Large Language Model) chat completions
//! - Embedding services
//! - Language analysis (document sentiment, conversation summarization)

pub mod asr;
pub mod embedding;
pub mod language;
pub mod llm;
pub mod retry;

pub use asr::AssemblyAIService;
pub use embedding::OpenAIEmbeddingService;
pub use language::AzureLanguageService;
pub use llm::OpenAIService;
pub use retry::BackoffPolicy;

use crate::error::{AppError, Result};
use reqwest::{Client, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::RetryTransientMiddleware;
use std::fmt::Display;
use std::time::Duration;

/// Clients sharing one connection pool
#[derive(Clone)]
pub(crate) struct HttpClients {
    /// Sends each request once; for job submissions
    pub once: Client,
    /// Retries network failures, 408, 429 and 5xx with backoff
    pub retrying: ClientWithMiddleware,
}

/// Build the HTTP clients with a request timeout and retry policy
pub(crate) fn http_client(timeout: Duration, retry: &BackoffPolicy) -> Result<HttpClients> {
    let client = Client::builder().timeout(timeout).build()?;
    let retrying = ClientBuilder::new(client.clone())
        .with(RetryTransientMiddleware::new_with_policy(retry.clone()))
        .build();

    Ok(HttpClients {
        once: client,
        retrying,
    })
}

/// A request that never got a response
pub(crate) fn request_failed(service: &'static str, e: impl Display) -> AppError {
    AppError::external(service, None, format!("request failed: {}", e))
}

/// Pass through successful responses, turn the rest into errors carrying the status
pub(crate) async fn check_status(service: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(AppError::external(service, Some(status.as_u16()), error_text))
}

/// Decode a JSON body, reporting shape mismatches as malformed responses
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    service: &'static str,
    response: Response,
) -> Result<T> {
    response.json().await.map_err(|e| {
        AppError::MalformedResponse(format!("failed to parse {} response: {}", service, e))
    })
}
