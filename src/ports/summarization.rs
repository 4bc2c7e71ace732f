/// Conversational summarization port trait
///
/// Long-running jobs: submit once, then poll by job id.
/// Implementations: Azure AI Language conversation analysis
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One conversation turn sent for summarization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub text: String,
    pub participant_id: String,
}

/// A named summarization task and the aspects it asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTask {
    pub name: String,
    pub aspects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizationRequest {
    pub language: String,
    pub items: Vec<ConversationItem>,
    pub tasks: Vec<SummaryTask>,
}

/// Outcome of one task inside a finished job
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// aspect -> text
    Aspects(BTreeMap<String, String>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub task_name: String,
    pub outcome: TaskOutcome,
}

/// Status of a submitted job
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Not finished yet; carries the provider status string
    Running(String),
    Succeeded(Vec<TaskResult>),
    Failed(String),
}

/// Port trait for conversational summarization services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SummarizationServicePort: Send + Sync {
    /// Submit a job and return its id
    async fn submit(&self, request: &SummarizationRequest) -> Result<String>;

    /// Fetch the current status of a job
    async fn poll(&self, job_id: &str) -> Result<JobStatus>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}
