//! Callsight - call-center conversation analysis
//!
//! Turns a call recording (or a plain-text transcript) into an enriched,
//! stored conversation: speaker roles, per-utterance sentiment, an
//! issue/resolution summary, key topics and retrieval embeddings.

pub mod adapters;
pub mod analysis;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod input;
pub mod persistence;
pub mod ports;

use analysis::PipelineServices;
use config::PipelineConfig;
use ports::{StoragePort, TranscriptionServicePort};
use std::sync::Arc;

/// Services and settings shared by every command
#[derive(Clone)]
pub struct AppState {
    pub transcription: Arc<dyn TranscriptionServicePort>,
    pub services: PipelineServices,
    pub storage: Arc<dyn StoragePort>,
    pub pipeline_config: PipelineConfig,
}
