//! Token counting for chunk budgets
//!
//! Known OpenAI models are counted with their BPE encoding (`cl100k_base`
//! for `gpt-4` and `text-embedding-3-*`, `o200k_base` for `gpt-4o`). Other
//! models fall back to a regex estimate: text is pre-tokenized the way BPE
//! tokenizers split it and each piece costs `ceil(chars / 3)` tokens.

use regex::Regex;
use std::sync::{Arc, OnceLock};
use tiktoken_rs::CoreBPE;

/// Counts and truncates text by tokens for a given model
pub trait TokenEstimator: Send + Sync {
    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Longest prefix of `text` whose token count is at most `max_tokens`
    fn truncate(&self, text: &str, max_tokens: usize) -> String;

    /// Model id whose tokenizer this estimator approximates
    fn model(&self) -> &str;
}

/// Exact counter for the model's tokenizer, or the heuristic when the model is unknown
pub fn estimator_for_model(model: &str) -> Arc<dyn TokenEstimator> {
    match BpeEstimator::for_model(model) {
        Some(estimator) => Arc::new(estimator),
        None => {
            log::warn!(
                "No tokenizer known for model '{}', estimating token counts",
                model
            );
            Arc::new(HeuristicEstimator::for_model(model))
        }
    }
}

/// Byte-pair encoding of an OpenAI model
#[derive(Clone)]
pub struct BpeEstimator {
    model: String,
    bpe: Arc<CoreBPE>,
}

impl BpeEstimator {
    /// `None` when tiktoken has no encoding for `model`
    pub fn for_model(model: &str) -> Option<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model).ok()?;
        Some(Self {
            model: model.to_string(),
            bpe: Arc::new(bpe),
        })
    }
}

impl TokenEstimator for BpeEstimator {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return text.to_string();
        }

        // A token prefix may end inside a multi-byte character, and
        // re-encoding a prefix can merge differently at the boundary
        let mut n = max_tokens;
        while n > 0 {
            if let Ok(cut) = self.bpe.decode(tokens[..n].to_vec()) {
                if self.count(&cut) <= max_tokens {
                    return cut;
                }
            }
            n -= 1;
        }
        String::new()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn pretokenizer() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r" ?[\p{L}\p{M}]+| ?\p{N}{1,3}| ?[^\s\p{L}\p{M}\p{N}]+|\s+")
            .expect("token pattern is valid")
    })
}

/// Regex-based estimator with a per-model characters-per-token ratio
#[derive(Debug, Clone)]
pub struct HeuristicEstimator {
    model: String,
    chars_per_token: usize,
}

impl HeuristicEstimator {
    pub fn for_model(model: &str) -> Self {
        Self {
            model: model.to_string(),
            chars_per_token: Self::chars_per_token(model),
        }
    }

    /// Average characters per token for a model family
    fn chars_per_token(model: &str) -> usize {
        let known = ["gpt-4o", "gpt-4", "gpt-3.5", "text-embedding-3", "text-embedding-ada"];
        if known.iter().any(|family| model.starts_with(family)) {
            4
        } else {
            3
        }
    }

    fn piece_cost(&self, piece: &str) -> usize {
        let chars = piece.chars().count();
        (chars + self.chars_per_token - 1) / self.chars_per_token
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn count(&self, text: &str) -> usize {
        pretokenizer()
            .find_iter(text)
            .map(|m| self.piece_cost(m.as_str()))
            .sum()
    }

    fn truncate(&self, text: &str, max_tokens: usize) -> String {
        let mut used = 0;
        for m in pretokenizer().find_iter(text) {
            let cost = self.piece_cost(m.as_str());
            if used + cost <= max_tokens {
                used += cost;
                continue;
            }
            // Keep whole tokens of the overflowing piece that still fit
            let room_chars = (max_tokens - used) * self.chars_per_token;
            let cut = m
                .as_str()
                .char_indices()
                .nth(room_chars)
                .map(|(offset, _)| m.start() + offset)
                .unwrap_or(m.end());
            return text[..cut].to_string();
        }
        text.to_string()
    }

    fn model(&self) -> &str {
        &self.model
    }
}
