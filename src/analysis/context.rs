//! Prompts over stored transcript chunks
//!
//! Chunks are appended in order while the whole prompt fits the token
//! budget; the first chunk that would overflow ends the prompt.

use crate::analysis::tokens::TokenEstimator;
use crate::domain::prompts::PromptTemplates;

/// Question prompt: introduction, the question, then as many chunks as fit
pub fn question_prompt<S: AsRef<str>>(
    question: &str,
    chunks: &[S],
    budget: usize,
    estimator: &dyn TokenEstimator,
) -> String {
    let message = format!(
        "{}\n\nQuestion: {}",
        PromptTemplates::question_context(),
        question
    );
    append_chunks(message, chunks, budget, estimator)
}

/// Suggestions prompt: introduction, then as many chunks as fit
pub fn suggestions_prompt<S: AsRef<str>>(
    chunks: &[S],
    budget: usize,
    estimator: &dyn TokenEstimator,
) -> String {
    append_chunks(
        PromptTemplates::suggestions_context().to_string(),
        chunks,
        budget,
        estimator,
    )
}

fn append_chunks<S: AsRef<str>>(
    mut message: String,
    chunks: &[S],
    budget: usize,
    estimator: &dyn TokenEstimator,
) -> String {
    let mut included = 0;
    for chunk in chunks {
        let next = format!("\n\nTranscript chunk:\n\"\"\"\n{}\n\"\"\"", chunk.as_ref());
        let candidate = format!("{}{}", message, next);
        if estimator.count(&candidate) > budget {
            break;
        }
        message = candidate;
        included += 1;
    }

    log::debug!(
        "Context prompt includes {} of {} chunk(s) within {} tokens",
        included,
        chunks.len(),
        budget
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tokens::HeuristicEstimator;

    #[test]
    fn test_question_comes_before_chunks() {
        let estimator = HeuristicEstimator::for_model("gpt-4o");
        let prompt = question_prompt(
            "What did the client want?",
            &["Speaker A: hola", "Speaker B: cancelar"],
            10_000,
            &estimator,
        );
        assert!(prompt.starts_with(PromptTemplates::question_context()));
        let question = prompt.find("\n\nQuestion: What did the client want?").unwrap();
        let first_chunk = prompt.find("\"\"\"\nSpeaker A: hola\n\"\"\"").unwrap();
        assert!(question < first_chunk);
        assert!(prompt.ends_with("Speaker B: cancelar\n\"\"\""));
    }

    #[test]
    fn test_stops_at_first_overflowing_chunk() {
        let estimator = HeuristicEstimator::for_model("gpt-4o");
        let long = "palabra ".repeat(200);
        let chunks = vec!["primero".to_string(), long, "tercero".to_string()];
        let budget = estimator.count(&question_prompt("¿Qué pasó?", &chunks[..1], 10_000, &estimator));
        let prompt = question_prompt("¿Qué pasó?", &chunks, budget, &estimator);

        assert!(prompt.contains("primero"));
        assert!(!prompt.contains("palabra"));
        assert!(!prompt.contains("tercero"));
        assert!(estimator.count(&prompt) <= budget);
    }

    #[test]
    fn test_budget_below_introduction_keeps_no_chunks() {
        let estimator = HeuristicEstimator::for_model("gpt-4o");
        let prompt = suggestions_prompt(&["Speaker A: hola"], 10, &estimator);
        assert_eq!(prompt, PromptTemplates::suggestions_context());
    }

    #[test]
    fn test_suggestions_prompt_lists_chunks_in_order() {
        let estimator = HeuristicEstimator::for_model("gpt-4o");
        let prompt = suggestions_prompt(&["uno", "dos"], 10_000, &estimator);
        assert!(prompt.starts_with(PromptTemplates::suggestions_context()));
        assert!(prompt.find("uno").unwrap() < prompt.find("dos").unwrap());
    }
}
