//! End-to-end conversation analysis commands
//!
//! Both entry points validate the request first, run the analysis pipeline
//! and store the result. They differ only in where the transcript comes from.

use crate::analysis::{AnalysisOutput, AnalysisPipeline, LlmSentimentAnnotator};
use crate::commands::ConversationArgs;
use crate::domain::models::{ConversationRecord, Summary, TranscriptionResult};
use crate::error::{AppError, PipelineStep, Result};
use crate::input::{end_time, parse_inputs, parse_speaker_lines};
use crate::persistence::store_conversation;
use crate::ports::{LlmConfig, TranscriptionConfig};
use crate::AppState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Outcome printed after a conversation is stored
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub conversation_id: String,
    pub summary: Summary,
    pub topics: Vec<String>,
    pub messages: usize,
    pub chunks: usize,
}

/// Validated request fields
struct ParsedArgs {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    participants: Vec<String>,
}

fn parse_args(args: &ConversationArgs) -> Result<ParsedArgs> {
    if args.audio_id.trim().is_empty() {
        return Err(AppError::InvalidInput("audio id must not be empty".to_string()));
    }
    let (start_time, participants) = parse_inputs(&args.date, &args.participants)?;
    Ok(ParsedArgs {
        start_time,
        end_time: end_time(start_time, args.duration_secs)?,
        participants,
    })
}

/// Transcribe a recording, analyze it and store it
pub async fn process_audio(
    state: &AppState,
    audio_url: &str,
    args: &ConversationArgs,
) -> Result<AnalysisReport> {
    let parsed = parse_args(args)?;
    log::info!("Processing audio {} from {}", args.audio_id, audio_url);

    let config = TranscriptionConfig {
        language: Some(state.pipeline_config.language.clone()),
        ..TranscriptionConfig::default()
    };
    let transcription = state
        .transcription
        .transcribe_url(audio_url, &config)
        .await
        .map_err(|e| AppError::pipeline(PipelineStep::Transcription, e))?;

    let pipeline = AnalysisPipeline::new(state.services.clone(), &state.pipeline_config)?;
    analyze_and_store(state, &pipeline, &transcription, args, parsed).await
}

/// Analyze a plain-text transcript and store it
pub async fn process_transcript_text(
    state: &AppState,
    text: &str,
    args: &ConversationArgs,
    llm_sentiment: bool,
) -> Result<AnalysisReport> {
    let parsed = parse_args(args)?;
    let transcription = parse_speaker_lines(text);
    log::info!(
        "Processing text transcript {} ({} utterance(s))",
        args.audio_id,
        transcription.utterances.len()
    );

    let mut pipeline = AnalysisPipeline::new(state.services.clone(), &state.pipeline_config)?;
    if llm_sentiment {
        pipeline = pipeline.with_sentiment_scorer(Arc::new(LlmSentimentAnnotator::new(
            state.services.llm.clone(),
            LlmConfig::for_model(&state.pipeline_config.chat_model),
        )));
    }
    analyze_and_store(state, &pipeline, &transcription, args, parsed).await
}

async fn analyze_and_store(
    state: &AppState,
    pipeline: &AnalysisPipeline,
    transcription: &TranscriptionResult,
    args: &ConversationArgs,
    parsed: ParsedArgs,
) -> Result<AnalysisReport> {
    let AnalysisOutput {
        analysis,
        embeddings,
    } = pipeline.run(transcription).await?;

    let record = ConversationRecord::new(
        args.audio_id.clone(),
        args.company_id.clone(),
        parsed.start_time,
        parsed.end_time,
        parsed.participants,
        analysis,
        embeddings,
    );
    let stored = store_conversation(state.storage.as_ref(), &record).await?;

    Ok(AnalysisReport {
        conversation_id: stored.conversation_id,
        summary: record.analysis.summary,
        topics: record.analysis.topics,
        messages: stored.messages,
        chunks: stored.chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PipelineServices;
    use crate::config::PipelineConfig;
    use crate::domain::models::Utterance;
    use crate::domain::prompts::PromptTemplates;
    use crate::ports::embedding::{EmbeddingItem, MockEmbeddingServicePort};
    use crate::ports::llm::MockLlmServicePort;
    use crate::ports::mocks::MockStorage;
    use crate::ports::sentiment::MockSentimentServicePort;
    use crate::ports::summarization::{JobStatus, MockSummarizationServicePort};
    use crate::ports::transcription::MockTranscriptionServicePort;
    use crate::ports::StoragePort;
    use std::time::Duration;

    const PARTICIPANT: &str = "6f1c2a8e-3b7d-4e2f-9a51-2c4d8e0f1a3b";

    fn args(audio_id: &str) -> ConversationArgs {
        ConversationArgs {
            audio_id: audio_id.to_string(),
            date: "2024-05-02 14:30".to_string(),
            participants: format!("{}, not-a-uuid", PARTICIPANT),
            company_id: Some("acme".to_string()),
            duration_secs: Some(120),
        }
    }

    fn llm() -> MockLlmServicePort {
        let mut llm = MockLlmServicePort::new();
        llm.expect_complete_json().returning(|prompt, _| {
            if prompt.system == PromptTemplates::speaker_roles_system() {
                Ok(r#"{"A": "agent", "B": "client"}"#.to_string())
            } else if prompt.system == PromptTemplates::sentiment_system() {
                Ok(r#"{"messages": [{"index": 0, "positive": 0.8, "negative": 0.1, "neutral": 0.1}]}"#
                    .to_string())
            } else {
                Ok(r#"{"topics": ["Internet", "Router"]}"#.to_string())
            }
        });
        llm
    }

    fn state(transcription: MockTranscriptionServicePort, storage: MockStorage) -> AppState {
        let mut sentiment = MockSentimentServicePort::new();
        sentiment.expect_max_batch_size().return_const(10usize);
        sentiment.expect_analyze_batch().returning(|_| Ok(vec![]));

        let mut summarization = MockSummarizationServicePort::new();
        summarization.expect_submit().returning(|_| Ok("job".to_string()));
        summarization
            .expect_poll()
            .returning(|_| Ok(JobStatus::Failed("unsupported language".to_string())));

        let mut embedding = MockEmbeddingServicePort::new();
        embedding.expect_embed().returning(|inputs, _| {
            Ok(inputs
                .iter()
                .enumerate()
                .map(|(index, _)| EmbeddingItem {
                    index,
                    vector: vec![0.0, 1.0],
                })
                .collect())
        });

        let mut pipeline_config = PipelineConfig::default();
        pipeline_config.summarization.poll_interval = Duration::from_millis(1);

        AppState {
            transcription: Arc::new(transcription),
            services: PipelineServices {
                llm: Arc::new(llm()),
                sentiment: Arc::new(sentiment),
                summarization: Arc::new(summarization),
                embedding: Arc::new(embedding),
            },
            storage: Arc::new(storage),
            pipeline_config,
        }
    }

    fn transcript() -> TranscriptionResult {
        TranscriptionResult::new(
            Some(0.9),
            vec![
                Utterance {
                    speaker: "A".to_string(),
                    text: "Soporte técnico, buenas tardes".to_string(),
                    start_ms: 0,
                    confidence: 0.9,
                },
                Utterance {
                    speaker: "B".to_string(),
                    text: "No tengo internet desde ayer".to_string(),
                    start_ms: 1500,
                    confidence: 0.9,
                },
            ],
        )
    }

    #[tokio::test]
    async fn test_process_audio_stores_conversation() {
        let mut transcription = MockTranscriptionServicePort::new();
        transcription
            .expect_transcribe_url()
            .withf(|url, config| url.ends_with("call.mp3") && config.enable_diarization)
            .times(1)
            .returning(|_, _| Ok(transcript()));
        let storage = MockStorage::new();
        let state = state(transcription, storage.clone());

        let report = process_audio(&state, "https://example.com/call.mp3", &args("audio-1"))
            .await
            .unwrap();

        assert_eq!(report.messages, 2);
        assert_eq!(report.chunks, 1);
        assert_eq!(report.topics, vec!["Internet", "Router"]);
        assert!(report.summary.is_empty());

        let stored = storage.get_conversation(&report.conversation_id).await.unwrap().unwrap();
        assert_eq!((stored.end_time - stored.start_time).num_seconds(), 120);
        assert_eq!(
            storage.get_participants(&report.conversation_id).await.unwrap(),
            vec![PARTICIPANT.to_string()]
        );
        assert_eq!(
            storage.get_topics(&report.conversation_id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_transcription_failure_aborts_before_storage() {
        let mut transcription = MockTranscriptionServicePort::new();
        transcription
            .expect_transcribe_url()
            .returning(|_, _| Err(AppError::external("assemblyai", Some(400), "bad audio")));
        let storage = MockStorage::new();
        let state = state(transcription, storage.clone());

        let err = process_audio(&state, "https://example.com/x.mp3", &args("audio-2"))
            .await
            .unwrap_err();
        assert_eq!(err.step(), Some(PipelineStep::Transcription));
        assert_eq!(storage.conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_date_is_rejected_before_transcribing() {
        let mut transcription = MockTranscriptionServicePort::new();
        transcription.expect_transcribe_url().never();
        let state = state(transcription, MockStorage::new());

        let mut bad = args("audio-3");
        bad.date = "yesterday".to_string();
        assert!(matches!(
            process_audio(&state, "https://example.com/x.mp3", &bad).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_huge_duration_is_rejected_before_transcribing() {
        let mut transcription = MockTranscriptionServicePort::new();
        transcription.expect_transcribe_url().never();
        let storage = MockStorage::new();
        let state = state(transcription, storage.clone());

        let mut bad = args("audio-4");
        bad.duration_secs = Some(u64::MAX);
        assert!(matches!(
            process_audio(&state, "https://example.com/x.mp3", &bad).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(storage.conversation_count(), 0);
    }

    #[tokio::test]
    async fn test_process_text_with_chat_sentiment() {
        let storage = MockStorage::new();
        let state = state(MockTranscriptionServicePort::new(), storage.clone());
        let text = "A: Buenos días, habla Laura\nB: Hola, mi factura llegó duplicada\n";

        let report = process_transcript_text(&state, text, &args("meeting-7"), true)
            .await
            .unwrap();

        let messages = storage.get_messages(&report.conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!((messages[0].sentiment.positive - 0.8).abs() < 1e-9);
        assert!(messages[1].sentiment.is_default());
    }

    #[tokio::test]
    async fn test_rerun_reuses_conversation() {
        let storage = MockStorage::new();
        let state = state(MockTranscriptionServicePort::new(), storage.clone());
        let text = "A: Hola\nB: Buenas";

        let first = process_transcript_text(&state, text, &args("same"), false)
            .await
            .unwrap();
        let second = process_transcript_text(&state, text, &args("same"), false)
            .await
            .unwrap();
        assert_eq!(first.conversation_id, second.conversation_id);
        assert_eq!(storage.conversation_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_fails_at_transcription_step() {
        let state = state(MockTranscriptionServicePort::new(), MockStorage::new());
        let err = process_transcript_text(&state, "\n\n", &args("empty"), false)
            .await
            .unwrap_err();
        assert_eq!(err.step(), Some(PipelineStep::Transcription));
    }
}
