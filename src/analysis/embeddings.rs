//! Chunk embeddings
//!
//! Chunks are embedded in fixed-size batches. The service reports a local
//! index for every vector; the global chunk index is the batch start plus that
//! local index. Any batch failure fails the whole step.

use crate::domain::models::{Chunk, EmbeddingRecord};
use crate::error::{AppError, PipelineStep, Result};
use crate::ports::embedding::{EmbeddingItem, EmbeddingServicePort};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

pub struct EmbeddingGenerator {
    service: Arc<dyn EmbeddingServicePort>,
    model: String,
    batch_size: usize,
    max_concurrency: usize,
}

impl EmbeddingGenerator {
    pub fn new(
        service: Arc<dyn EmbeddingServicePort>,
        model: &str,
        batch_size: usize,
        max_concurrency: usize,
    ) -> Self {
        Self {
            service,
            model: model.to_string(),
            batch_size: batch_size.max(1),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Embed every chunk; records come back ordered by chunk index
    pub async fn generate(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingRecord>> {
        self.try_generate(chunks)
            .await
            .map_err(|e| AppError::pipeline(PipelineStep::Embedding, e))
    }

    async fn try_generate(&self, chunks: &[Chunk]) -> Result<Vec<EmbeddingRecord>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let batch_count = (chunks.len() + self.batch_size - 1) / self.batch_size;
        let batches: Vec<Vec<EmbeddingRecord>> = stream::iter(
            chunks
                .chunks(self.batch_size)
                .enumerate()
                .map(|(number, batch)| (number * self.batch_size, batch)),
        )
        .map(|(batch_start, batch)| self.embed_batch(batch_start, batch, batch_count))
        .buffer_unordered(self.max_concurrency)
        .try_collect()
        .await?;

        let mut records: Vec<EmbeddingRecord> = batches.into_iter().flatten().collect();
        records.sort_by_key(|record| record.chunk_index);

        let dense = records
            .iter()
            .enumerate()
            .all(|(expected, record)| record.chunk_index == expected);
        if records.len() != chunks.len() || !dense {
            return Err(AppError::MalformedResponse(format!(
                "embedding indexes are not contiguous over {} chunks",
                chunks.len()
            )));
        }

        log::info!(
            "Embedded {} chunk(s) in {} batch(es) with {}",
            records.len(),
            batch_count,
            self.model
        );
        Ok(records)
    }

    async fn embed_batch(
        &self,
        batch_start: usize,
        batch: &[Chunk],
        batch_count: usize,
    ) -> Result<Vec<EmbeddingRecord>> {
        let inputs: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
        let items = self.service.embed(&inputs, &self.model).await.map_err(|e| {
            log::error!(
                "Embedding batch starting at chunk {} ({} batches) failed: {}",
                batch_start,
                batch_count,
                e
            );
            e
        })?;
        validate_batch(&items, batch.len(), batch_start)?;

        Ok(items
            .into_iter()
            .map(|item| EmbeddingRecord {
                chunk_index: batch_start + item.index,
                content: batch[item.index].content.clone(),
                vector: item.vector,
            })
            .collect())
    }
}

/// Every local index in range and present exactly once
fn validate_batch(items: &[EmbeddingItem], expected: usize, batch_start: usize) -> Result<()> {
    let mut seen = vec![false; expected];
    for item in items {
        match seen.get_mut(item.index) {
            Some(slot) if !*slot => *slot = true,
            Some(_) => {
                return Err(AppError::MalformedResponse(format!(
                    "duplicate embedding index {} in batch starting at {}",
                    item.index, batch_start
                )))
            }
            None => {
                return Err(AppError::MalformedResponse(format!(
                    "embedding index {} out of range for batch of {} starting at {}",
                    item.index, expected, batch_start
                )))
            }
        }
    }
    if items.len() != expected {
        return Err(AppError::MalformedResponse(format!(
            "expected {} embeddings for batch starting at {}, got {}",
            expected,
            batch_start,
            items.len()
        )));
    }
    Ok(())
}
