//! Per-utterance sentiment
//!
//! Two interchangeable strategies fill `Phrase::sentiment`:
//! - `SentimentAnnotator` sends small document batches to a sentiment service
//!   and re-associates results by document id
//! - `LlmSentimentAnnotator` scores every message in a single chat call
//!
//! Both degrade per item to `Sentiment::DEFAULT` and never fail the batch.

use crate::analysis::json;
use crate::config::MAX_SENTIMENT_BATCH;
use crate::domain::models::{Phrase, Sentiment};
use crate::domain::prompts::{PromptKind, PromptTemplates};
use crate::error::{AppError, Result};
use crate::ports::llm::{LlmConfig, LlmServicePort};
use crate::ports::sentiment::{DocumentOutcome, SentimentDocument, SentimentServicePort};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Fills the sentiment of each phrase in place
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    /// Returns how many phrases received a real score
    async fn annotate(&self, phrases: &mut [Phrase]) -> usize;
}

/// Batched document-sentiment strategy
pub struct SentimentAnnotator {
    service: Arc<dyn SentimentServicePort>,
    language: String,
    batch_size: usize,
    max_concurrency: usize,
}

impl SentimentAnnotator {
    pub fn new(
        service: Arc<dyn SentimentServicePort>,
        language: &str,
        batch_size: usize,
        max_concurrency: usize,
    ) -> Self {
        Self {
            service,
            language: language.to_string(),
            batch_size: batch_size.clamp(1, MAX_SENTIMENT_BATCH),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Score every batch, keyed by phrase position
    async fn score(&self, documents: Vec<SentimentDocument>) -> HashMap<usize, Sentiment> {
        let batch_size = self.batch_size.min(self.service.max_batch_size().max(1));
        let batches: Vec<Vec<SentimentDocument>> = documents
            .chunks(batch_size)
            .map(|batch| batch.to_vec())
            .collect();
        let batch_count = batches.len();

        let service = &self.service;
        let results: Vec<(usize, Result<_>)> = stream::iter(batches.into_iter().enumerate())
            .map(|(number, batch)| async move {
                let outcome = service.analyze_batch(&batch).await;
                (number, outcome.map(|scores| (batch, scores)))
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut scores = HashMap::new();
        let mut failed_batches = 0;
        for (number, result) in results {
            let (batch, results) = match result {
                Ok(pair) => pair,
                Err(e) => {
                    failed_batches += 1;
                    log::warn!(
                        "Sentiment batch {} of {} failed, using default scores: {}",
                        number + 1,
                        batch_count,
                        e
                    );
                    continue;
                }
            };

            for result in results {
                // Only accept ids that were sent in this batch
                if !batch.iter().any(|doc| doc.id == result.id) {
                    log::debug!("Ignoring sentiment for unknown document id '{}'", result.id);
                    continue;
                }
                let Ok(position) = result.id.parse::<usize>() else {
                    continue;
                };
                match result.outcome {
                    DocumentOutcome::Scored(raw) => {
                        let normalized = Sentiment::normalized(raw.positive, raw.negative, raw.neutral);
                        match normalized {
                            Some(sentiment) => {
                                scores.insert(position, sentiment);
                            }
                            None => log::warn!(
                                "Invalid sentiment scores for document {}, using default",
                                position
                            ),
                        }
                    }
                    DocumentOutcome::Failed(message) => {
                        log::warn!(
                            "Sentiment failed for document {}, using default: {}",
                            position,
                            message
                        );
                    }
                }
            }
        }

        log::info!(
            "Scored sentiment for {} document(s) in {} batch(es), {} batch(es) failed",
            scores.len(),
            batch_count,
            failed_batches
        );
        scores
    }
}

#[async_trait]
impl SentimentScorer for SentimentAnnotator {
    async fn annotate(&self, phrases: &mut [Phrase]) -> usize {
        // Empty documents are rejected by the service; they keep the default
        let documents: Vec<SentimentDocument> = phrases
            .iter()
            .enumerate()
            .filter(|(_, phrase)| !phrase.text.trim().is_empty())
            .map(|(position, phrase)| SentimentDocument {
                id: position.to_string(),
                language: self.language.clone(),
                text: phrase.text.clone(),
            })
            .collect();

        let scores = if documents.is_empty() {
            HashMap::new()
        } else {
            self.score(documents).await
        };
        apply_scores(phrases, &scores)
    }
}

/// Single-call chat model strategy
pub struct LlmSentimentAnnotator {
    llm: Arc<dyn LlmServicePort>,
    config: LlmConfig,
}

impl LlmSentimentAnnotator {
    pub fn new(llm: Arc<dyn LlmServicePort>, config: LlmConfig) -> Self {
        Self { llm, config }
    }

    async fn try_score(&self, phrases: &[Phrase]) -> Result<HashMap<usize, Sentiment>> {
        let messages = phrases
            .iter()
            .enumerate()
            .map(|(index, phrase)| format!("{}: {}", index, phrase.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = PromptTemplates::render(PromptKind::Sentiment, &messages);

        let raw = self.llm.complete_json(&prompt, &self.config).await?;
        let value = json::parse_response(&raw)?;

        let entries = match &value {
            Value::Array(entries) => entries,
            other => json::find_key(other, "messages", &["results", "sentiments", "items"])
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    AppError::MalformedResponse("sentiment response has no message list".to_string())
                })?,
        };

        let mut scores = HashMap::new();
        for entry in entries {
            let Some(index) = entry
                .get("index")
                .or_else(|| entry.get("id"))
                .and_then(json::as_f64)
                .filter(|i| *i >= 0.0 && i.fract() == 0.0)
                .map(|i| i as usize)
                .filter(|i| *i < phrases.len())
            else {
                continue;
            };
            let field = |name: &str| entry.get(name).and_then(json::as_f64);
            if let (Some(positive), Some(negative), Some(neutral)) =
                (field("positive"), field("negative"), field("neutral"))
            {
                if let Some(sentiment) = Sentiment::normalized(positive, negative, neutral) {
                    scores.insert(index, sentiment);
                }
            }
        }
        Ok(scores)
    }
}

#[async_trait]
impl SentimentScorer for LlmSentimentAnnotator {
    async fn annotate(&self, phrases: &mut [Phrase]) -> usize {
        if phrases.is_empty() {
            return 0;
        }
        let scores = match self.try_score(phrases).await {
            Ok(scores) => scores,
            Err(e) => {
                log::warn!("Sentiment scoring degraded, using default scores: {}", e);
                HashMap::new()
            }
        };
        let scored = apply_scores(phrases, &scores);
        if scored < phrases.len() {
            log::warn!(
                "{} of {} message(s) got the default sentiment",
                phrases.len() - scored,
                phrases.len()
            );
        }
        scored
    }
}

/// Write scores back by position; unscored phrases get the default
fn apply_scores(phrases: &mut [Phrase], scores: &HashMap<usize, Sentiment>) -> usize {
    let mut scored = 0;
    for (position, phrase) in phrases.iter_mut().enumerate() {
        phrase.sentiment = match scores.get(&position) {
            Some(sentiment) => {
                scored += 1;
                *sentiment
            }
            None => Sentiment::DEFAULT,
        };
    }
    scored
}
