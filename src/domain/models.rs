/// Domain models for Callsight
///
/// These models represent core business entities and are provider-agnostic.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One speaker turn as recognized by the speech-to-text service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Diarization label assigned by the ASR provider ("A", "B", ...)
    pub speaker: String,
    pub text: String,
    /// Milliseconds from the start of the audio
    pub start_ms: i64,
    /// Recognition confidence (0.0 to 1.0)
    pub confidence: f32,
}

/// Inferred role of a speaker in a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Agent,
    Client,
}

impl Role {
    /// Parse a role label returned by a language model
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "agent" | "agente" => Some(Role::Agent),
            "client" | "customer" | "cliente" => Some(Role::Client),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Agent => write!(f, "agent"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Positive/negative/neutral distribution for one utterance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl Sentiment {
    /// Distribution used whenever a score could not be obtained
    pub const DEFAULT: Sentiment = Sentiment {
        positive: 0.0,
        negative: 0.0,
        neutral: 1.0,
    };

    /// Build a distribution from raw scores, normalizing so the components sum to 1.0.
    ///
    /// Returns `None` for negative, non-finite or all-zero inputs.
    pub fn normalized(positive: f64, negative: f64, neutral: f64) -> Option<Self> {
        let parts = [positive, negative, neutral];
        if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }
        let total: f64 = parts.iter().sum();
        if total <= f64::EPSILON {
            return None;
        }
        Some(Self {
            positive: positive / total,
            negative: negative / total,
            neutral: neutral / total,
        })
    }

    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// An utterance enriched with inferred role and sentiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub speaker: String,
    pub text: String,
    pub start_ms: i64,
    pub confidence: f32,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub sentiment: Sentiment,
}

impl From<Utterance> for Phrase {
    fn from(utterance: Utterance) -> Self {
        Self {
            speaker: utterance.speaker,
            text: utterance.text,
            start_ms: utterance.start_ms,
            confidence: utterance.confidence,
            role: None,
            sentiment: Sentiment::DEFAULT,
        }
    }
}

impl Phrase {
    /// Label used when rendering the transcript for models and chunking
    pub fn speaker_line(&self) -> String {
        format!("Speaker {}: {}", self.speaker, self.text)
    }
}

/// Output of the speech-to-text step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Overall confidence score (0.0 to 1.0)
    pub confidence: Option<f32>,

    /// Utterances in time-offset order
    pub utterances: Vec<Utterance>,
}

impl TranscriptionResult {
    pub fn new(confidence: Option<f32>, mut utterances: Vec<Utterance>) -> Self {
        // Stable sort: ties keep provider order
        utterances.sort_by_key(|u| u.start_ms);
        Self {
            confidence,
            utterances,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }
}

/// Render phrases as one "Speaker X: text" line each
pub fn render_transcript(phrases: &[Phrase]) -> String {
    phrases
        .iter()
        .map(Phrase::speaker_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A token-bounded piece of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub content: String,
    pub token_count: usize,
    /// True when the chunk was truncated and lost text
    pub degraded: bool,
}

/// Embedding vector for one chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk_index: usize,
    pub content: String,
    pub vector: Vec<f32>,
}

/// Issue/resolution summary of a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub issue: String,
    pub resolution: String,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.issue.is_empty() && self.resolution.is_empty()
    }
}

/// Enriched analysis of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub phrases: Vec<Phrase>,
    pub summary: Summary,
    pub topics: Vec<String>,
}

/// Everything needed to persist an analyzed conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub audio_id: String,
    pub company_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// User ids of the participants (expected to be UUIDs)
    pub participants: Vec<String>,
    pub analysis: AnalysisResult,
    pub embeddings: Vec<EmbeddingRecord>,
}

impl ConversationRecord {
    pub fn new(
        audio_id: String,
        company_id: Option<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        participants: Vec<String>,
        analysis: AnalysisResult,
        embeddings: Vec<EmbeddingRecord>,
    ) -> Self {
        Self {
            audio_id,
            company_id,
            start_time,
            end_time,
            participants,
            analysis,
            embeddings,
        }
    }
}

/// Stored conversation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub audio_id: String,
    pub company_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_normalization() {
        let s = Sentiment::normalized(2.0, 1.0, 1.0).unwrap();
        assert!((s.positive + s.negative + s.neutral - 1.0).abs() < 1e-9);
        assert!((s.positive - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sentiment_rejects_invalid_scores() {
        assert!(Sentiment::normalized(-0.1, 0.5, 0.6).is_none());
        assert!(Sentiment::normalized(0.0, 0.0, 0.0).is_none());
        assert!(Sentiment::normalized(f64::NAN, 0.5, 0.5).is_none());
    }

    #[test]
    fn test_role_labels() {
        assert_eq!(Role::from_label("Agent"), Some(Role::Agent));
        assert_eq!(Role::from_label(" customer "), Some(Role::Client));
        assert_eq!(Role::from_label("cliente"), Some(Role::Client));
        assert_eq!(Role::from_label("supervisor"), None);
    }

    #[test]
    fn test_transcription_result_orders_by_offset() {
        let u = |speaker: &str, start_ms| Utterance {
            speaker: speaker.into(),
            text: format!("at {}", start_ms),
            start_ms,
            confidence: 0.9,
        };
        let result = TranscriptionResult::new(Some(0.9), vec![u("B", 500), u("A", 0), u("A", 500)]);
        let order: Vec<_> = result
            .utterances
            .iter()
            .map(|u| (u.speaker.as_str(), u.start_ms))
            .collect();
        assert_eq!(order, vec![("A", 0), ("B", 500), ("A", 500)]);
    }

    #[test]
    fn test_render_transcript() {
        let phrases: Vec<Phrase> = vec![
            Utterance {
                speaker: "A".into(),
                text: "Hola".into(),
                start_ms: 0,
                confidence: 1.0,
            }
            .into(),
            Utterance {
                speaker: "B".into(),
                text: "Buenas".into(),
                start_ms: 10,
                confidence: 1.0,
            }
            .into(),
        ];
        assert_eq!(render_transcript(&phrases), "Speaker A: Hola\nSpeaker B: Buenas");
    }
}
