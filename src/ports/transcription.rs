/// Transcription service port trait
///
/// Defines the interface for ASR (Automatic Speech Recognition) services.
/// Implementations: AssemblyAI
use crate::domain::models::TranscriptionResult;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for transcription request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Enable speaker diarization
    pub enable_diarization: bool,

    /// Number of speakers (if known, helps diarization accuracy)
    pub num_speakers: Option<u32>,

    /// Language code (e.g., "en", "es", "fr")
    pub language: Option<String>,

    /// Provider speech model, if not the provider default
    pub model: Option<String>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enable_diarization: true,
            num_speakers: None,
            language: Some("es".to_string()),
            model: None,
        }
    }
}

/// Port trait for transcription services (ASR)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptionServicePort: Send + Sync {
    /// Transcribe audio reachable at a public or pre-signed URL.
    ///
    /// Utterances come back in time-offset order with speaker labels.
    async fn transcribe_url(
        &self,
        audio_url: &str,
        config: &TranscriptionConfig,
    ) -> Result<TranscriptionResult>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Check if the service is configured (has API key)
    fn is_configured(&self) -> bool;
}
