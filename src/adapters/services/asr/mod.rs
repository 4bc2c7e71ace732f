//! ASR (Automatic Speech Recognition) service adapters
//!
//! - AssemblyAI: remote audio URL submission with polling

pub mod assemblyai;

pub use assemblyai::AssemblyAIService;
