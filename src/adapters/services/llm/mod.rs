//! LLM service adapters
//!
//! Implementations of the LlmServicePort trait:
//! - OpenAI (GPT-4o and compatible chat models, JSON mode)

pub mod openai;

pub use openai::OpenAIService;
