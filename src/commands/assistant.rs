//! Agent assistance over stored conversations
//!
//! Questions are answered from the stored chunks nearest to them; insights
//! are drawn from the chunks of a company's most recent call.

use crate::analysis::json;
use crate::analysis::{estimator_for_model, nearest_chunks, question_prompt, suggestions_prompt};
use crate::domain::prompts::{ChatPrompt, PromptTemplates};
use crate::error::{AppError, Result};
use crate::ports::LlmConfig;
use crate::AppState;
use serde::Serialize;
use serde_json::Value;

const MAX_INSIGHTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct AnswerReport {
    pub answer: String,
    /// Stored chunks offered to the model as context
    pub context_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsightsReport {
    pub company_id: String,
    pub insights: Vec<String>,
}

/// Answer a question using the stored chunks closest to it
pub async fn ask(state: &AppState, question: &str, company_id: Option<&str>) -> Result<AnswerReport> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AppError::InvalidInput("question must not be empty".to_string()));
    }
    let config = &state.pipeline_config;

    let query = embed_question(state, question).await?;
    let stored = state
        .storage
        .list_chunks(company_id.map(str::to_string))
        .await?;
    let nearest = nearest_chunks(&query, stored, config.context_chunks);
    if nearest.is_empty() {
        return Err(AppError::NotFound(
            "no stored conversation matches this question".to_string(),
        ));
    }

    let contents: Vec<&str> = nearest.iter().map(|chunk| chunk.content.as_str()).collect();
    let estimator = estimator_for_model(&config.chat_model);
    let prompt = ChatPrompt {
        system: PromptTemplates::question_system().to_string(),
        user: question_prompt(question, &contents, config.context_token_budget, estimator.as_ref()),
    };

    let raw = state
        .services
        .llm
        .complete_json(&prompt, &LlmConfig::for_model(&config.chat_model))
        .await?;
    let value = json::parse_response(&raw)?;
    let answer = json::find_key(&value, "answer", &["respuesta", "response"])
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedResponse("answer has no text".to_string()))?;

    log::info!("Answered question with {} context chunk(s)", nearest.len());
    Ok(AnswerReport {
        answer: answer.trim().to_string(),
        context_chunks: nearest.len(),
    })
}

/// Suggest insights for an agent from the company's most recent stored call
pub async fn suggest_insights(state: &AppState, company_id: &str) -> Result<InsightsReport> {
    let config = &state.pipeline_config;
    let chunks = state.storage.latest_chunks(company_id).await?;
    if chunks.is_empty() {
        return Err(AppError::NotFound(format!(
            "no stored chunks for company {}",
            company_id
        )));
    }

    let contents: Vec<&str> = chunks.iter().map(|chunk| chunk.content.as_str()).collect();
    let estimator = estimator_for_model(&config.chat_model);
    let prompt = ChatPrompt {
        system: PromptTemplates::insights_system().to_string(),
        user: suggestions_prompt(&contents, config.context_token_budget, estimator.as_ref()),
    };

    let raw = state
        .services
        .llm
        .complete_json(&prompt, &LlmConfig::for_model(&config.chat_model))
        .await?;
    let value = json::parse_response(&raw)?;
    let insights = json::find_key(&value, "insights", &["suggestions", "sugerencias"])
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::MalformedResponse("insights response has no list".to_string()))?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|insight| !insight.is_empty())
        .take(MAX_INSIGHTS)
        .map(str::to_string)
        .collect();

    Ok(InsightsReport {
        company_id: company_id.to_string(),
        insights,
    })
}

async fn embed_question(state: &AppState, question: &str) -> Result<Vec<f32>> {
    let items = state
        .services
        .embedding
        .embed(&[question.to_string()], &state.pipeline_config.embedding_model)
        .await?;
    items
        .into_iter()
        .find(|item| item.index == 0)
        .map(|item| item.vector)
        .ok_or_else(|| AppError::MalformedResponse("no embedding returned for the question".to_string()))
}
