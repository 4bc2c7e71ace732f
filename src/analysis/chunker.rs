//! Token-budgeted text chunking
//!
//! Long text is bisected recursively on paragraph, line and sentence
//! boundaries (in that order of preference). Each cut is placed where the
//! left side holds closest to half of the tokens. When no boundary is left
//! or the recursion budget runs out, the remainder is truncated to the
//! budget and marked as degraded.

use crate::analysis::tokens::TokenEstimator;
use crate::domain::models::Chunk;
use crate::error::{AppError, Result};
use std::sync::Arc;

/// Split points, most preferred first
const DELIMITERS: [&str; 3] = ["\n\n", "\n", ". "];

/// Maximum bisection depth before falling back to truncation
pub const MAX_DEPTH: usize = 5;

pub struct TextChunker {
    estimator: Arc<dyn TokenEstimator>,
    max_tokens: usize,
    max_depth: usize,
}

impl TextChunker {
    pub fn new(estimator: Arc<dyn TokenEstimator>, max_tokens: usize) -> Result<Self> {
        if max_tokens == 0 {
            return Err(AppError::Config(
                "chunk token budget must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            estimator,
            max_tokens,
            max_depth: MAX_DEPTH,
        })
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Split `text` into ordered chunks of at most `max_tokens` tokens each.
    ///
    /// Empty input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut pieces = Vec::new();
        self.split_into(text, 0, &mut pieces);

        let degraded = pieces.iter().filter(|(_, lossy)| *lossy).count();
        if degraded > 0 {
            log::warn!(
                "Chunking truncated {} of {} chunks to fit {} tokens",
                degraded,
                pieces.len(),
                self.max_tokens
            );
        }

        pieces
            .into_iter()
            .filter(|(content, _)| !content.is_empty())
            .enumerate()
            .map(|(index, (content, degraded))| Chunk {
                index,
                token_count: self.estimator.count(&content),
                content,
                degraded,
            })
            .collect()
    }

    fn split_into(&self, text: &str, depth: usize, out: &mut Vec<(String, bool)>) {
        if self.estimator.count(text) <= self.max_tokens {
            out.push((text.to_string(), false));
            return;
        }

        if depth < self.max_depth {
            if let Some(offset) = self.best_split(text) {
                let (left, right) = text.split_at(offset);
                self.split_into(left, depth + 1, out);
                self.split_into(right, depth + 1, out);
                return;
            }
        }

        out.push((self.estimator.truncate(text, self.max_tokens), true));
    }

    /// Byte offset of the most balanced cut on the first usable delimiter
    fn best_split(&self, text: &str) -> Option<usize> {
        for delimiter in DELIMITERS {
            let parts = split_keeping_delimiter(text, delimiter);
            if parts.len() < 2 {
                continue;
            }

            let counts: Vec<usize> = parts
                .iter()
                .map(|&(start, end)| self.estimator.count(&text[start..end]))
                .collect();
            let total: usize = counts.iter().sum();
            let half = total as f64 / 2.0;

            let mut left = 0usize;
            let mut best: Option<(f64, usize)> = None;
            // Cut after part i; the last part cannot be a cut point
            for (i, count) in counts.iter().enumerate().take(parts.len() - 1) {
                left += count;
                let distance = (left as f64 - half).abs();
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, parts[i].1));
                }
            }
            return best.map(|(_, offset)| offset);
        }
        None
    }
}

/// Byte ranges of `text` split on `delimiter`, each delimiter kept at the end
/// of the part before it. Parts with no content besides delimiters are merged
/// into a neighbour, so every range holds some text.
fn split_keeping_delimiter(text: &str, delimiter: &str) -> Vec<(usize, usize)> {
    let mut parts: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    // Set when the first part has no content yet
    let mut pending_start: Option<usize> = None;

    let mut push = |begin: usize, end: usize, has_content: bool| {
        let begin = pending_start.take().unwrap_or(begin);
        match parts.last_mut() {
            Some(last) if !has_content => last.1 = end,
            None if !has_content => pending_start = Some(begin),
            _ => parts.push((begin, end)),
        }
    };

    for (index, _) in text.match_indices(delimiter) {
        let end = index + delimiter.len();
        push(start, end, index > start);
        start = end;
    }
    if start < text.len() {
        push(start, text.len(), true);
    } else if let Some(begin) = pending_start {
        // Text was nothing but delimiters
        parts.push((begin, text.len()));
    } else if let Some(last) = parts.last_mut() {
        last.1 = text.len();
    }

    parts
}
