//! Issue/resolution summarization
//!
//! Submits the conversation to a summarization job service and polls until the
//! job reaches a terminal status, the attempt budget runs out or the deadline
//! passes. Every failure degrades to an empty summary.

use crate::config::SummarizationConfig;
use crate::domain::models::{Phrase, Role, Summary};
use crate::error::{AppError, Result};
use crate::ports::summarization::{
    ConversationItem, JobStatus, SummarizationRequest, SummarizationServicePort, SummaryTask,
    TaskOutcome, TaskResult,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};

pub const ISSUE_TASK: &str = "issue";
pub const RESOLUTION_TASK: &str = "resolution";

/// Progress of one summarization job
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Submitted { job_id: String },
    Polling { job_id: String, attempt: u32 },
    Terminal(Vec<TaskResult>),
    TimedOut { attempts: u32 },
}

pub struct ConversationSummarizer {
    service: Arc<dyn SummarizationServicePort>,
    language: String,
    config: SummarizationConfig,
}

impl ConversationSummarizer {
    pub fn new(
        service: Arc<dyn SummarizationServicePort>,
        language: &str,
        config: SummarizationConfig,
    ) -> Self {
        Self {
            service,
            language: language.to_string(),
            config,
        }
    }

    /// Summarize the conversation. Never fails; missing parts are empty.
    pub async fn summarize(&self, phrases: &[Phrase]) -> Summary {
        let request = self.build_request(phrases);
        if request.items.is_empty() {
            return Summary::default();
        }

        match self.summarize_tasks(&request).await {
            Ok(tasks) => {
                let summary = summary_from_tasks(&tasks);
                log::info!(
                    "Summarization finished (issue: {} chars, resolution: {} chars)",
                    summary.issue.len(),
                    summary.resolution.len()
                );
                summary
            }
            Err(e) => {
                log::warn!("Summarization degraded, empty summary: {}", e);
                Summary::default()
            }
        }
    }

    /// Run the job and return the outcome of every task by name
    pub async fn summarize_tasks(
        &self,
        request: &SummarizationRequest,
    ) -> Result<BTreeMap<String, TaskOutcome>> {
        let deadline = Instant::now() + self.config.deadline;

        let job_id = match timeout_at(deadline, self.service.submit(request)).await {
            Ok(submitted) => submitted?,
            Err(_) => {
                return Err(AppError::Timeout(
                    "summarization job submission exceeded the deadline".to_string(),
                ))
            }
        };
        log::debug!("Summarization job submitted: {}", job_id);

        let mut state = JobState::Submitted { job_id };
        loop {
            state = match state {
                JobState::Submitted { job_id } => JobState::Polling { job_id, attempt: 1 },
                JobState::Polling { attempt, .. } if attempt > self.config.max_poll_attempts => {
                    JobState::TimedOut {
                        attempts: attempt - 1,
                    }
                }
                JobState::Polling { job_id, attempt } => {
                    self.poll_once(job_id, attempt, deadline).await?
                }
                JobState::Terminal(tasks) => {
                    return Ok(tasks
                        .into_iter()
                        .map(|task| (task.task_name, task.outcome))
                        .collect())
                }
                JobState::TimedOut { attempts } => {
                    return Err(AppError::Timeout(format!(
                        "summarization job not finished after {} poll(s)",
                        attempts
                    )))
                }
            };
        }
    }

    async fn poll_once(&self, job_id: String, attempt: u32, deadline: Instant) -> Result<JobState> {
        let timed_out = JobState::TimedOut {
            attempts: attempt - 1,
        };

        // Wait before polling
        if timeout_at(deadline, tokio::time::sleep(self.config.poll_interval))
            .await
            .is_err()
        {
            return Ok(timed_out);
        }

        let status = match timeout_at(deadline, self.service.poll(&job_id)).await {
            Ok(status) => status?,
            Err(_) => return Ok(timed_out),
        };

        match status {
            JobStatus::Succeeded(tasks) => Ok(JobState::Terminal(tasks)),
            JobStatus::Failed(message) => Err(AppError::external(
                "summarization",
                None,
                format!("job {} failed: {}", job_id, message),
            )),
            JobStatus::Running(status) => {
                log::debug!(
                    "Summarization status: {} (attempt {}/{})",
                    status,
                    attempt,
                    self.config.max_poll_attempts
                );
                Ok(JobState::Polling {
                    job_id,
                    attempt: attempt + 1,
                })
            }
        }
    }

    fn build_request(&self, phrases: &[Phrase]) -> SummarizationRequest {
        let items = phrases
            .iter()
            .filter(|phrase| !phrase.text.trim().is_empty())
            .enumerate()
            .map(|(i, phrase)| ConversationItem {
                id: (i + 1).to_string(),
                text: phrase.text.clone(),
                participant_id: participant_id(phrase),
            })
            .collect();

        SummarizationRequest {
            language: self.language.clone(),
            items,
            tasks: vec![
                SummaryTask {
                    name: ISSUE_TASK.to_string(),
                    aspects: vec![ISSUE_TASK.to_string()],
                },
                SummaryTask {
                    name: RESOLUTION_TASK.to_string(),
                    aspects: vec![RESOLUTION_TASK.to_string()],
                },
            ],
        }
    }
}

fn participant_id(phrase: &Phrase) -> String {
    match phrase.role {
        Some(Role::Agent) => "Agent".to_string(),
        Some(Role::Client) => "Customer".to_string(),
        None => format!("Speaker {}", phrase.speaker),
    }
}

/// Pick the issue and resolution texts, empty for failed or missing tasks
pub fn summary_from_tasks(tasks: &BTreeMap<String, TaskOutcome>) -> Summary {
    let field = |task: &str| match tasks.get(task) {
        Some(TaskOutcome::Aspects(aspects)) => aspects.get(task).cloned().unwrap_or_default(),
        Some(TaskOutcome::Failed(message)) => {
            log::warn!("Summarization task '{}' failed: {}", task, message);
            String::new()
        }
        None => {
            log::warn!("Summarization task '{}' missing from job result", task);
            String::new()
        }
    };

    Summary {
        issue: field(ISSUE_TASK),
        resolution: field(RESOLUTION_TASK),
    }
}
