//! Azure AI Language adapter
//!
//! Implements two ports against the Language REST API:
//! - SentimentServicePort via `POST /language/:analyze-text` (SentimentAnalysis)
//! - SummarizationServicePort via the asynchronous
//!   `/language/analyze-conversations/jobs` endpoint. Submitting returns the
//!   job location in the `operation-location` header.

use crate::adapters::services::{
    check_status, http_client, read_json, request_failed, BackoffPolicy, HttpClients,
};
use crate::config::MAX_SENTIMENT_BATCH;
use crate::domain::models::Sentiment;
use crate::error::{AppError, Result};
use crate::ports::sentiment::{
    DocumentOutcome, DocumentSentiment, SentimentDocument, SentimentServicePort,
};
use crate::ports::summarization::{
    JobStatus, SummarizationRequest, SummarizationServicePort, TaskOutcome, TaskResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const SERVICE: &str = "azure-language";
const API_VERSION: &str = "2023-04-01";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

pub struct AzureLanguageService {
    http: HttpClients,
    endpoint: String,
    api_key: String,
}

impl AzureLanguageService {
    pub fn new(endpoint: &str, api_key: String, retry: &BackoffPolicy) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(60), retry)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }

    async fn analyze_text(&self, body: &AnalyzeTextRequest<'_>) -> Result<AnalyzeTextResponse> {
        let response = self
            .http
            .retrying
            .post(format!("{}/language/:analyze-text", self.endpoint))
            .query(&[("api-version", API_VERSION)])
            .header(KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        read_json(SERVICE, check_status(SERVICE, response).await?).await
    }

    async fn fetch_job(&self, job_id: &str) -> Result<JobResponse> {
        let response = self
            .http
            .retrying
            .get(format!(
                "{}/language/analyze-conversations/jobs/{}",
                self.endpoint, job_id
            ))
            .query(&[("api-version", API_VERSION)])
            .header(KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;

        read_json(SERVICE, check_status(SERVICE, response).await?).await
    }
}

#[async_trait]
impl SentimentServicePort for AzureLanguageService {
    async fn analyze_batch(&self, documents: &[SentimentDocument]) -> Result<Vec<DocumentSentiment>> {
        if documents.len() > MAX_SENTIMENT_BATCH {
            return Err(AppError::InvalidInput(format!(
                "sentiment batch of {} exceeds the limit of {}",
                documents.len(),
                MAX_SENTIMENT_BATCH
            )));
        }

        let body = AnalyzeTextRequest {
            kind: "SentimentAnalysis",
            parameters: AnalyzeTextParameters {
                model_version: "latest",
            },
            analysis_input: AnalysisInput { documents },
        };
        let response = self.analyze_text(&body).await?;

        let scored = response.results.documents.into_iter().map(|doc| DocumentSentiment {
            id: doc.id,
            outcome: DocumentOutcome::Scored(Sentiment {
                positive: doc.confidence_scores.positive,
                negative: doc.confidence_scores.negative,
                neutral: doc.confidence_scores.neutral,
            }),
        });
        let failed = response.results.errors.into_iter().map(|err| DocumentSentiment {
            id: err.id,
            outcome: DocumentOutcome::Failed(format!("{}: {}", err.error.code, err.error.message)),
        });
        Ok(scored.chain(failed).collect())
    }

    fn max_batch_size(&self) -> usize {
        MAX_SENTIMENT_BATCH
    }

    fn provider_name(&self) -> &str {
        "azure"
    }
}

#[async_trait]
impl SummarizationServicePort for AzureLanguageService {
    async fn submit(&self, request: &SummarizationRequest) -> Result<String> {
        let body = ConversationJobRequest::from_request(request);

        let response = self
            .http
            .once
            .post(format!("{}/language/analyze-conversations/jobs", self.endpoint))
            .query(&[("api-version", API_VERSION)])
            .header(KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| request_failed(SERVICE, e))?;
        let response = check_status(SERVICE, response).await?;

        let location = response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::MalformedResponse("summarization job has no operation-location".to_string())
            })?;
        let job_id = job_id_from_location(location).ok_or_else(|| {
            AppError::MalformedResponse(format!("unexpected operation-location '{}'", location))
        })?;

        log::info!("Conversation summarization job submitted: {}", job_id);
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobStatus> {
        let job = self.fetch_job(job_id).await?;
        Ok(job.into_status())
    }

    fn provider_name(&self) -> &str {
        "azure"
    }
}

/// `.../analyze-conversations/jobs/{id}?api-version=...` → `{id}`
fn job_id_from_location(location: &str) -> Option<String> {
    let path = location.split('?').next()?;
    let (_, id) = path.rsplit_once("/jobs/")?;
    let id = id.trim_matches('/');
    (!id.is_empty()).then(|| id.to_string())
}

// ===== API Request/Response Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeTextRequest<'a> {
    kind: &'static str,
    parameters: AnalyzeTextParameters,
    analysis_input: AnalysisInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeTextParameters {
    model_version: &'static str,
}

#[derive(Debug, Serialize)]
struct AnalysisInput<'a> {
    documents: &'a [SentimentDocument],
}

#[derive(Debug, Deserialize)]
struct AnalyzeTextResponse {
    results: SentimentResults,
}

#[derive(Debug, Deserialize)]
struct SentimentResults {
    #[serde(default)]
    documents: Vec<SentimentDocumentResult>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SentimentDocumentResult {
    id: String,
    confidence_scores: ConfidenceScores,
}

#[derive(Debug, Deserialize)]
struct ConfidenceScores {
    positive: f64,
    neutral: f64,
    negative: f64,
}

#[derive(Debug, Deserialize)]
struct DocumentError {
    id: String,
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationJobRequest {
    display_name: &'static str,
    analysis_input: ConversationInput,
    tasks: Vec<ConversationTask>,
}

#[derive(Debug, Serialize)]
struct ConversationInput {
    conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Conversation {
    id: &'static str,
    language: String,
    modality: &'static str,
    conversation_items: Vec<ConversationItemBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationItemBody {
    id: String,
    participant_id: String,
    text: String,
    modality: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationTask {
    task_name: String,
    kind: &'static str,
    parameters: SummaryParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryParameters {
    summary_aspects: Vec<String>,
}

impl ConversationJobRequest {
    fn from_request(request: &SummarizationRequest) -> Self {
        Self {
            display_name: "Analyze conversations from transcript",
            analysis_input: ConversationInput {
                conversations: vec![Conversation {
                    id: "conversation1",
                    language: request.language.clone(),
                    modality: "text",
                    conversation_items: request
                        .items
                        .iter()
                        .map(|item| ConversationItemBody {
                            id: item.id.clone(),
                            participant_id: item.participant_id.clone(),
                            text: item.text.clone(),
                            modality: "text",
                        })
                        .collect(),
                }],
            },
            tasks: request
                .tasks
                .iter()
                .map(|task| ConversationTask {
                    task_name: task.name.clone(),
                    kind: "ConversationalSummarizationTask",
                    parameters: SummaryParameters {
                        summary_aspects: task.aspects.clone(),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    status: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
    tasks: Option<JobTasks>,
}

#[derive(Debug, Deserialize)]
struct JobTasks {
    #[serde(default)]
    items: Vec<JobTaskItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobTaskItem {
    task_name: String,
    #[serde(default)]
    status: String,
    results: Option<TaskResults>,
}

#[derive(Debug, Deserialize)]
struct TaskResults {
    #[serde(default)]
    conversations: Vec<ConversationSummaries>,
    #[serde(default)]
    errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
struct ConversationSummaries {
    #[serde(default)]
    summaries: Vec<AspectSummary>,
}

#[derive(Debug, Deserialize)]
struct AspectSummary {
    aspect: String,
    text: String,
}

impl JobResponse {
    fn into_status(self) -> JobStatus {
        match self.status.as_str() {
            "succeeded" | "partiallyCompleted" | "partiallySucceeded" => JobStatus::Succeeded(
                self.tasks
                    .map(|tasks| tasks.items.into_iter().map(JobTaskItem::into_result).collect())
                    .unwrap_or_default(),
            ),
            "failed" | "cancelled" => JobStatus::Failed(
                self.errors
                    .iter()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            _ => JobStatus::Running(self.status),
        }
    }
}

impl JobTaskItem {
    fn into_result(self) -> TaskResult {
        let outcome = match self.results {
            Some(results) if results.errors.is_empty() && self.status != "failed" => {
                let aspects: BTreeMap<String, String> = results
                    .conversations
                    .into_iter()
                    .next()
                    .map(|conversation| {
                        conversation
                            .summaries
                            .into_iter()
                            .map(|summary| (summary.aspect, summary.text))
                            .collect()
                    })
                    .unwrap_or_default();
                TaskOutcome::Aspects(aspects)
            }
            Some(results) => TaskOutcome::Failed(
                results
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.error.code, e.error.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            None => TaskOutcome::Failed(format!("task finished with status '{}'", self.status)),
        };
        TaskResult {
            task_name: self.task_name,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::summarization::{ConversationItem, SummaryTask};
    use mockito::{Matcher, Server};

    fn service(endpoint: &str) -> AzureLanguageService {
        AzureLanguageService::new(endpoint, "test_key".to_string(), &BackoffPolicy::new(0)).unwrap()
    }

    fn documents(count: usize) -> Vec<SentimentDocument> {
        (0..count)
            .map(|i| SentimentDocument {
                id: i.to_string(),
                language: "es".to_string(),
                text: format!("mensaje {}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_sentiment_scores_and_errors() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/language/:analyze-text")
            .match_query(Matcher::UrlEncoded("api-version".into(), API_VERSION.into()))
            .match_header("ocp-apim-subscription-key", "test_key")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "kind": "SentimentAnalysis",
                "analysisInput": {"documents": [
                    {"id": "0", "language": "es", "text": "mensaje 0"},
                    {"id": "1", "language": "es", "text": "mensaje 1"}
                ]}
            })))
            .with_status(200)
            .with_body(
                r#"{"kind": "SentimentAnalysisResults", "results": {
                    "documents": [{"id": "1", "sentiment": "positive",
                        "confidenceScores": {"positive": 0.9, "neutral": 0.08, "negative": 0.02},
                        "sentences": [], "warnings": []}],
                    "errors": [{"id": "0", "error": {"code": "InvalidArgument", "message": "Invalid document"}}],
                    "modelVersion": "2022-11-01"}}"#,
            )
            .create_async()
            .await;

        let results = service(&server.url()).analyze_batch(&documents(2)).await.unwrap();
        mock.assert_async().await;

        assert_eq!(results.len(), 2);
        let scored = results.iter().find(|r| r.id == "1").unwrap();
        assert!(matches!(scored.outcome, DocumentOutcome::Scored(s) if (s.positive - 0.9).abs() < 1e-9));
        let failed = results.iter().find(|r| r.id == "0").unwrap();
        assert!(matches!(failed.outcome, DocumentOutcome::Failed(ref m) if m.contains("InvalidArgument")));
    }

    #[tokio::test]
    async fn test_job_submission_is_sent_once() {
        let mut server = Server::new_async().await;
        let submit = server
            .mock("POST", "/language/analyze-conversations/jobs")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let analyze = server
            .mock("POST", "/language/:analyze-text")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let service = AzureLanguageService::new(
            &server.url(),
            "test_key".to_string(),
            &BackoffPolicy::new(2).with_base_delay(std::time::Duration::from_millis(1)),
        )
        .unwrap();
        let request = SummarizationRequest {
            language: "es".to_string(),
            items: vec![],
            tasks: vec![],
        };

        assert!(matches!(
            service.submit(&request).await,
            Err(AppError::ExternalService { status: Some(503), .. })
        ));
        assert!(matches!(
            service.analyze_batch(&documents(1)).await,
            Err(AppError::ExternalService { status: Some(503), .. })
        ));
        submit.assert_async().await;
        analyze.assert_async().await;
    }

    #[tokio::test]
    async fn test_sentiment_batch_limit() {
        let service = service("http://localhost:1");
        assert!(matches!(
            service.analyze_batch(&documents(11)).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_and_poll_summarization_job() {
        let mut server = Server::new_async().await;
        let location = format!(
            "{}/language/analyze-conversations/jobs/job-42?api-version={}",
            server.url(),
            API_VERSION
        );
        let submit = server
            .mock("POST", "/language/analyze-conversations/jobs")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "analysisInput": {"conversations": [{
                    "id": "conversation1",
                    "language": "es",
                    "conversationItems": [
                        {"id": "1", "participantId": "Agent", "text": "Hola", "modality": "text"}
                    ]
                }]},
                "tasks": [
                    {"taskName": "issue", "kind": "ConversationalSummarizationTask",
                     "parameters": {"summaryAspects": ["issue"]}}
                ]
            })))
            .with_status(202)
            .with_header("operation-location", &location)
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/language/analyze-conversations/jobs/job-42")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"jobId": "job-42", "status": "succeeded", "errors": [],
                    "tasks": {"completed": 1, "failed": 0, "inProgress": 0, "total": 1, "items": [
                        {"kind": "conversationalSummarizationResults", "taskName": "issue",
                         "status": "succeeded", "results": {
                            "conversations": [{"id": "conversation1",
                                "summaries": [{"aspect": "issue", "text": "Cliente sin servicio"}],
                                "warnings": []}],
                            "errors": [], "modelVersion": "latest"}}
                    ]}}"#,
            )
            .create_async()
            .await;

        let service = service(&server.url());
        let request = SummarizationRequest {
            language: "es".to_string(),
            items: vec![ConversationItem {
                id: "1".to_string(),
                text: "Hola".to_string(),
                participant_id: "Agent".to_string(),
            }],
            tasks: vec![SummaryTask {
                name: "issue".to_string(),
                aspects: vec!["issue".to_string()],
            }],
        };

        let job_id = service.submit(&request).await.unwrap();
        assert_eq!(job_id, "job-42");
        let status = service.poll(&job_id).await.unwrap();
        submit.assert_async().await;
        poll.assert_async().await;

        let JobStatus::Succeeded(tasks) = status else {
            panic!("expected a finished job, got {:?}", status);
        };
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_name, "issue");
        assert_eq!(
            tasks[0].outcome,
            TaskOutcome::Aspects(BTreeMap::from([(
                "issue".to_string(),
                "Cliente sin servicio".to_string()
            )]))
        );
    }

    #[test]
    fn test_job_status_mapping() {
        let running: JobResponse =
            serde_json::from_str(r#"{"status": "running", "tasks": {"items": []}}"#).unwrap();
        assert_eq!(running.into_status(), JobStatus::Running("running".to_string()));

        let failed: JobResponse = serde_json::from_str(
            r#"{"status": "failed", "errors": [{"code": "InvalidRequest", "message": "bad"}]}"#,
        )
        .unwrap();
        assert_eq!(
            failed.into_status(),
            JobStatus::Failed("InvalidRequest: bad".to_string())
        );
    }

    #[test]
    fn test_task_level_errors() {
        let job: JobResponse = serde_json::from_str(
            r#"{"status": "partiallyCompleted", "tasks": {"items": [
                {"taskName": "resolution", "status": "failed", "results": {
                    "conversations": [],
                    "errors": [{"id": "conversation1", "error": {"code": "InvalidConversation", "message": "too short"}}]}}
            ]}}"#,
        )
        .unwrap();
        let JobStatus::Succeeded(tasks) = job.into_status() else {
            panic!("expected a finished job");
        };
        assert!(matches!(&tasks[0].outcome, TaskOutcome::Failed(m) if m.contains("too short")));
    }

    #[test]
    fn test_job_id_from_location() {
        assert_eq!(
            job_id_from_location(
                "https://x.cognitiveservices.azure.com/language/analyze-conversations/jobs/abc-1?api-version=2023-04-01"
            ),
            Some("abc-1".to_string())
        );
        assert_eq!(job_id_from_location("https://x/other"), None);
    }
}
