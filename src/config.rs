//! Process-wide configuration
//!
//! `Config` is parsed once from command-line flags and environment variables
//! (a `.env` file is loaded first). The analysis components never see it:
//! they receive the plain `PipelineConfig` derived from it.

use clap::builder::TypedValueParser as _;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;
use std::time::Duration;

/// Largest document batch accepted by the sentiment service
pub const MAX_SENTIMENT_BATCH: usize = 10;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// AssemblyAI API key used for speech-to-text
    #[arg(long, env, default_value = "", hide_env_values = true)]
    pub assemblyai_api_key: String,

    /// OpenAI API key used for chat completions and embeddings
    #[arg(long, env, default_value = "", hide_env_values = true)]
    pub openai_api_key: String,

    /// Azure AI Language resource key
    #[arg(long, env, default_value = "", hide_env_values = true)]
    pub azure_ai_key: String,

    /// Azure AI Language endpoint, e.g. https://my-resource.cognitiveservices.azure.com
    #[arg(long, env, default_value = "")]
    pub azure_ai_language_endpoint: String,

    /// Language of the calls (ISO 639-1)
    #[arg(long, env = "CALL_LANGUAGE", default_value = "es")]
    pub language: String,

    /// Chat model used for role classification and topic extraction
    #[arg(long, env, default_value = "gpt-4o")]
    pub chat_model: String,

    /// Embedding model; also selects the tokenizer assumptions for chunking
    #[arg(long, env, default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Maximum tokens per embedded chunk
    #[arg(long, env, default_value_t = 1000)]
    pub max_tokens: usize,

    /// Number of chunks per embedding request
    #[arg(long, env, default_value_t = 1000)]
    pub embedding_batch_size: usize,

    /// Number of documents per sentiment request (at most 10)
    #[arg(long, env, default_value_t = 10)]
    pub sentiment_batch_size: usize,

    /// Number of leading utterances shown to the role classifier
    #[arg(long, env, default_value_t = 20)]
    pub role_sample_size: usize,

    /// Upper bound on concurrent requests within one pipeline run
    #[arg(long, env, default_value_t = 4)]
    pub max_concurrency: usize,

    /// Milliseconds between summarization job polls
    #[arg(long, env, default_value_t = 5000)]
    pub poll_interval_ms: u64,

    /// Maximum summarization job polls before giving up
    #[arg(long, env, default_value_t = 60)]
    pub max_poll_attempts: u32,

    /// Overall deadline for the summarization step, in seconds
    #[arg(long, env, default_value_t = 600)]
    pub summarization_deadline_secs: u64,

    /// Token budget of a question or suggestions prompt built from stored chunks
    #[arg(long, env, default_value_t = 3596)]
    pub context_token_budget: usize,

    /// Stored chunks nearest to a question that are offered as context
    #[arg(long, env, default_value_t = 5)]
    pub context_chunks: usize,

    /// Retries for transient failures of idempotent requests
    #[arg(long, env, default_value_t = 3)]
    pub max_retries: u32,

    /// Path of the SQLite database file
    #[arg(long, env, default_value = "callsight.db")]
    pub database_path: PathBuf,

    /// Log level threshold for console output
    #[arg(
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
    )]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Option<crate::commands::Command>,
}

impl Config {
    /// Load `.env` (if present) and parse flags and environment variables
    pub fn new() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            // Missing .env is normal in production
            log::debug!("No .env file loaded: {}", e);
        }
        Config::parse()
    }

    /// Derive the configuration handed to the analysis components
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            language: self.language.clone(),
            chat_model: self.chat_model.clone(),
            embedding_model: self.embedding_model.clone(),
            max_tokens: self.max_tokens,
            embedding_batch_size: self.embedding_batch_size.max(1),
            sentiment_batch_size: self.sentiment_batch_size.clamp(1, MAX_SENTIMENT_BATCH),
            role_sample_size: self.role_sample_size.max(1),
            max_concurrency: self.max_concurrency.max(1),
            summarization: SummarizationConfig {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                max_poll_attempts: self.max_poll_attempts.max(1),
                deadline: Duration::from_secs(self.summarization_deadline_secs),
            },
            context_token_budget: self.context_token_budget,
            context_chunks: self.context_chunks.max(1),
        }
    }
}

/// Settings for the submit/poll summarization job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizationConfig {
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub deadline: Duration,
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_poll_attempts: 60,
            deadline: Duration::from_secs(600),
        }
    }
}

/// Configuration shared by every pipeline component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub language: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub max_tokens: usize,
    pub embedding_batch_size: usize,
    pub sentiment_batch_size: usize,
    pub role_sample_size: usize,
    pub max_concurrency: usize,
    pub summarization: SummarizationConfig,
    pub context_token_budget: usize,
    pub context_chunks: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            chat_model: "gpt-4o".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            max_tokens: 1000,
            embedding_batch_size: 1000,
            sentiment_batch_size: MAX_SENTIMENT_BATCH,
            role_sample_size: 20,
            max_concurrency: 4,
            summarization: SummarizationConfig::default(),
            context_token_budget: 3596,
            context_chunks: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_args() {
        let config = Config::parse_from(["callsight"]);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.embedding_batch_size, 1000);
        assert_eq!(config.language, "es");
        assert_eq!(config.log_level, LevelFilter::Info);
        assert_eq!(config.pipeline(), PipelineConfig::default());
    }

    #[test]
    fn test_log_level_flag() {
        let config = Config::parse_from(["callsight", "--log-level", "DEBUG"]);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert!(Config::try_parse_from(["callsight", "--log-level", "LOUD"]).is_err());
    }

    #[test]
    fn test_pipeline_clamps_sentiment_batch() {
        let config = Config::parse_from(["callsight", "--sentiment-batch-size", "25"]);
        assert_eq!(config.pipeline().sentiment_batch_size, MAX_SENTIMENT_BATCH);

        let config = Config::parse_from(["callsight", "--sentiment-batch-size", "0"]);
        assert_eq!(config.pipeline().sentiment_batch_size, 1);
    }

    #[test]
    fn test_pipeline_summarization_settings() {
        let config = Config::parse_from([
            "callsight",
            "--poll-interval-ms",
            "250",
            "--max-poll-attempts",
            "7",
            "--summarization-deadline-secs",
            "30",
        ]);
        let pipeline = config.pipeline();
        assert_eq!(pipeline.summarization.poll_interval, Duration::from_millis(250));
        assert_eq!(pipeline.summarization.max_poll_attempts, 7);
        assert_eq!(pipeline.summarization.deadline, Duration::from_secs(30));
    }
}
