//! Nearest-neighbour search over stored chunk embeddings

use crate::domain::models::EmbeddingRecord;

/// The `top_k` chunks closest to `query` by Euclidean distance, nearest first.
///
/// Chunks whose vector length differs from the query are skipped.
pub fn nearest_chunks(
    query: &[f32],
    chunks: Vec<EmbeddingRecord>,
    top_k: usize,
) -> Vec<EmbeddingRecord> {
    let total = chunks.len();
    let mut scored: Vec<(f32, EmbeddingRecord)> = chunks
        .into_iter()
        .filter_map(|chunk| l2_distance(query, &chunk.vector).map(|distance| (distance, chunk)))
        .collect();

    if scored.len() < total {
        log::warn!(
            "Skipped {} stored chunk(s) with a different embedding size",
            total - scored.len()
        );
    }

    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored
        .into_iter()
        .take(top_k)
        .map(|(_, chunk)| chunk)
        .collect()
}

fn l2_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let sum: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    Some(sum.sqrt())
}
