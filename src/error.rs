/// Error types for Callsight
///
/// Uses thiserror for ergonomic error handling with proper Display implementations.
use std::fmt;
use thiserror::Error;

/// Pipeline step that can fail an analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Transcription,
    Chunking,
    Embedding,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Transcription => write!(f, "transcription"),
            PipelineStep::Chunking => write!(f, "chunking"),
            PipelineStep::Embedding => write!(f, "embedding"),
        }
    }
}

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote service failed or returned a non-success status.
    /// `status` is `None` when the request never got a response.
    #[error("{service} error{}: {message}", status_suffix(.status))]
    ExternalService {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Pipeline failed at {step} step: {source}")]
    Pipeline {
        step: PipelineStep,
        #[source]
        source: Box<AppError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Build an external service error from a response status
    pub fn external(service: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::ExternalService {
            service,
            status,
            message: message.into(),
        }
    }

    /// Wrap an error as a fatal failure of the given pipeline step
    pub fn pipeline(step: PipelineStep, source: AppError) -> Self {
        match source {
            // Keep the innermost step rather than nesting wrappers
            already @ AppError::Pipeline { .. } => already,
            other => AppError::Pipeline {
                step,
                source: Box::new(other),
            },
        }
    }

    /// The failing step, when this is a fatal pipeline error
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            AppError::Pipeline { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
