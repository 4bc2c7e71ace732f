//! AssemblyAI transcription service adapter
//!
//! Implements the TranscriptionServicePort for AssemblyAI's API.
//! API flow:
//! 1. Submit transcription request for a remote audio URL with diarization
//! 2. Poll for completion
//! 3. Parse utterances with speaker labels

use crate::adapters::services::{
    check_status, http_client, read_json, request_failed, BackoffPolicy, HttpClients,
};
use crate::domain::models::{TranscriptionResult, Utterance};
use crate::error::{AppError, Result};
use crate::ports::transcription::{TranscriptionConfig, TranscriptionServicePort};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "assemblyai";
const ASSEMBLYAI_API_BASE: &str = "https://api.assemblyai.com/v2";
const POLL_INTERVAL_MS: u64 = 3000; // Poll every 3 seconds
const MAX_POLL_ATTEMPTS: u32 = 200; // Max 10 minutes (200 * 3s)

/// AssemblyAI service implementation
pub struct AssemblyAIService {
    http: HttpClients,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
}

impl AssemblyAIService {
    /// Create a new AssemblyAI service with the given API key
    pub fn new(api_key: String, retry: &BackoffPolicy) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(60), retry)?,
            api_key,
            base_url: ASSEMBLYAI_API_BASE.to_string(),
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Submit transcription request with diarization enabled
    async fn submit_transcription(
        &self,
        audio_url: &str,
        config: &TranscriptionConfig,
    ) -> Result<String> {
        log::info!("Submitting transcription request to AssemblyAI");

        let request_body = TranscriptionRequest {
            audio_url: audio_url.to_string(),
            speaker_labels: config.enable_diarization,
            speakers_expected: config.num_speakers,
            language_code: config.language.clone(),
            speech_model: config.model.clone(),
        };

        let response = self
            .http
            .once
            .post(format!("{}/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        let submit_response: TranscriptResponse =
            read_json(SERVICE, check_status(SERVICE, response).await?).await?;

        log::info!("Transcription submitted with ID: {}", submit_response.id);
        Ok(submit_response.id)
    }

    async fn fetch_transcript(&self, transcript_id: &str) -> Result<TranscriptResponse> {
        let response = self
            .http
            .retrying
            .get(format!("{}/transcript/{}", self.base_url, transcript_id))
            .header("authorization", &self.api_key)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        read_json(SERVICE, check_status(SERVICE, response).await?).await
    }

    /// Poll for transcription completion
    async fn poll_transcription(&self, transcript_id: &str) -> Result<TranscriptionResult> {
        log::info!("Polling for transcription completion: {}", transcript_id);

        for attempt in 1..=MAX_POLL_ATTEMPTS {
            // Wait before polling
            tokio::time::sleep(self.poll_interval).await;

            let transcript_response = self.fetch_transcript(transcript_id).await?;

            match transcript_response.status.as_str() {
                "completed" => {
                    log::info!("Transcription completed successfully");
                    return Ok(Self::parse_transcript_response(transcript_response));
                }
                "error" => {
                    return Err(AppError::external(
                        SERVICE,
                        None,
                        format!(
                            "transcription failed: {}",
                            transcript_response.error.unwrap_or_default()
                        ),
                    ));
                }
                "queued" | "processing" => {
                    log::debug!(
                        "Transcription status: {} (attempt {}/{})",
                        transcript_response.status,
                        attempt,
                        MAX_POLL_ATTEMPTS
                    );
                    continue;
                }
                status => {
                    log::warn!("Unknown transcription status: {}", status);
                    continue;
                }
            }
        }

        Err(AppError::Timeout(
            "transcription exceeded maximum polling attempts".to_string(),
        ))
    }

    /// Parse AssemblyAI response into our TranscriptionResult format
    fn parse_transcript_response(response: TranscriptResponse) -> TranscriptionResult {
        let utterances = match response.utterances {
            Some(utterances) => utterances
                .into_iter()
                .map(|utt| Utterance {
                    speaker: utt.speaker,
                    text: utt.text,
                    start_ms: utt.start,
                    confidence: utt.confidence,
                })
                .collect(),
            // No diarization: one utterance for the whole text
            None => match response.text.filter(|text| !text.trim().is_empty()) {
                Some(text) => vec![Utterance {
                    speaker: "A".to_string(),
                    text,
                    start_ms: 0,
                    confidence: response.confidence.unwrap_or(0.0),
                }],
                None => Vec::new(),
            },
        };

        TranscriptionResult::new(response.confidence, utterances)
    }
}

#[async_trait]
impl TranscriptionServicePort for AssemblyAIService {
    async fn transcribe_url(
        &self,
        audio_url: &str,
        config: &TranscriptionConfig,
    ) -> Result<TranscriptionResult> {
        log::info!("Starting AssemblyAI transcription for: {}", audio_url);

        let transcript_id = self.submit_transcription(audio_url, config).await?;
        let result = self.poll_transcription(&transcript_id).await?;

        log::info!(
            "AssemblyAI transcription complete: {} utterances",
            result.utterances.len()
        );

        Ok(result)
    }

    fn provider_name(&self) -> &str {
        "AssemblyAI"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ===== API Request/Response Types =====

#[derive(Debug, Serialize)]
struct TranscriptionRequest {
    audio_url: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    speaker_labels: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    speakers_expected: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    text: Option<String>,
    confidence: Option<f32>,
    utterances: Option<Vec<AssemblyUtterance>>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyUtterance {
    text: String,
    start: i64,
    confidence: f32,
    speaker: String,
}
