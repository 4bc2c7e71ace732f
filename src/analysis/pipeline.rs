//! Conversation analysis pipeline
//!
//! Runs two branches over one transcript concurrently:
//! - enrichment: role classification, then sentiment, summarization and
//!   topic extraction side by side
//! - retrieval: chunking and embedding
//!
//! Enrichment steps degrade to safe defaults. A failure in the retrieval
//! branch, or an empty transcript, fails the whole run.

use crate::analysis::chunker::TextChunker;
use crate::analysis::embeddings::EmbeddingGenerator;
use crate::analysis::roles::{apply_roles, SpeakerRoleClassifier};
use crate::analysis::sentiment::{SentimentAnnotator, SentimentScorer};
use crate::analysis::summarizer::ConversationSummarizer;
use crate::analysis::tokens::estimator_for_model;
use crate::analysis::topics::TopicExtractor;
use crate::config::PipelineConfig;
use crate::domain::models::{
    render_transcript, AnalysisResult, EmbeddingRecord, Phrase, Summary, TranscriptionResult,
};
use crate::error::{AppError, PipelineStep, Result};
use crate::ports::{
    EmbeddingServicePort, LlmConfig, LlmServicePort, SentimentServicePort,
    SummarizationServicePort,
};
use std::sync::Arc;

/// External services the pipeline calls into
#[derive(Clone)]
pub struct PipelineServices {
    pub llm: Arc<dyn LlmServicePort>,
    pub sentiment: Arc<dyn SentimentServicePort>,
    pub summarization: Arc<dyn SummarizationServicePort>,
    pub embedding: Arc<dyn EmbeddingServicePort>,
}

/// Result of one successful run
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub analysis: AnalysisResult,
    pub embeddings: Vec<EmbeddingRecord>,
}

pub struct AnalysisPipeline {
    roles: SpeakerRoleClassifier,
    sentiment: Arc<dyn SentimentScorer>,
    summarizer: ConversationSummarizer,
    topics: TopicExtractor,
    chunker: TextChunker,
    embeddings: EmbeddingGenerator,
}

impl AnalysisPipeline {
    pub fn new(services: PipelineServices, config: &PipelineConfig) -> Result<Self> {
        let llm_config = LlmConfig::for_model(&config.chat_model);
        let estimator = estimator_for_model(&config.embedding_model);

        Ok(Self {
            roles: SpeakerRoleClassifier::new(
                services.llm.clone(),
                llm_config.clone(),
                config.role_sample_size,
            ),
            sentiment: Arc::new(SentimentAnnotator::new(
                services.sentiment,
                &config.language,
                config.sentiment_batch_size,
                config.max_concurrency,
            )),
            summarizer: ConversationSummarizer::new(
                services.summarization,
                &config.language,
                config.summarization.clone(),
            ),
            topics: TopicExtractor::new(services.llm, llm_config),
            chunker: TextChunker::new(estimator, config.max_tokens)?,
            embeddings: EmbeddingGenerator::new(
                services.embedding,
                &config.embedding_model,
                config.embedding_batch_size,
                config.max_concurrency,
            ),
        })
    }

    /// Replace the sentiment strategy
    pub fn with_sentiment_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.sentiment = scorer;
        self
    }

    /// Analyze one transcript
    pub async fn run(&self, transcription: &TranscriptionResult) -> Result<AnalysisOutput> {
        if transcription.is_empty() {
            return Err(AppError::pipeline(
                PipelineStep::Transcription,
                AppError::InvalidInput("transcript has no utterances".to_string()),
            ));
        }

        let phrases: Vec<Phrase> = transcription
            .utterances
            .iter()
            .cloned()
            .map(Phrase::from)
            .collect();
        let transcript = render_transcript(&phrases);
        log::info!(
            "Analyzing transcript: {} utterance(s), {} chars",
            phrases.len(),
            transcript.len()
        );

        let ((phrases, summary, topics), embeddings) =
            tokio::try_join!(self.enrich(phrases), self.embed(&transcript))?;

        log::info!(
            "Analysis complete: {} phrase(s), {} topic(s), {} embedding(s)",
            phrases.len(),
            topics.len(),
            embeddings.len()
        );

        Ok(AnalysisOutput {
            analysis: AnalysisResult {
                phrases,
                summary,
                topics,
            },
            embeddings,
        })
    }

    async fn enrich(
        &self,
        mut phrases: Vec<Phrase>,
    ) -> Result<(Vec<Phrase>, Summary, Vec<String>)> {
        let roles = self.roles.classify(&phrases).await;
        apply_roles(&mut phrases, &roles);

        // Summary and topics read the role-annotated text; sentiment writes scores
        let labeled = phrases.clone();
        let transcript = render_transcript(&labeled);
        let (_, summary, topics) = tokio::join!(
            self.sentiment.annotate(&mut phrases),
            self.summarizer.summarize(&labeled),
            self.topics.extract(&transcript),
        );

        Ok((phrases, summary, topics))
    }

    async fn embed(&self, transcript: &str) -> Result<Vec<EmbeddingRecord>> {
        let chunks = self.chunker.split(transcript);
        if chunks.is_empty() {
            return Err(AppError::pipeline(
                PipelineStep::Chunking,
                AppError::InvalidInput("transcript rendered to empty text".to_string()),
            ));
        }
        log::info!(
            "Split transcript into {} chunk(s) of at most {} tokens",
            chunks.len(),
            self.chunker.max_tokens()
        );
        self.embeddings.generate(&chunks).await
    }
}
