//! Embedding service adapters
//!
//! - OpenAI embeddings API (text-embedding-3 family)

pub mod openai;

pub use openai::OpenAIEmbeddingService;
