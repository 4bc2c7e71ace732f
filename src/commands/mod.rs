/// Command modules driven by the `callsight` binary
pub mod assistant;
pub mod conversation;

use clap::Subcommand;
use std::path::PathBuf;

/// Options shared by every analysis command
#[derive(Clone, Debug, clap::Args)]
pub struct ConversationArgs {
    /// Caller-side identifier of the recording; re-running with the same id reuses the stored conversation
    #[arg(long)]
    pub audio_id: String,

    /// Conversation start, RFC 3339 or "YYYY-MM-DD HH:MM[:SS]" (UTC); empty means now
    #[arg(long, default_value = "")]
    pub date: String,

    /// Comma-separated participant user ids (UUIDs)
    #[arg(long, default_value = "")]
    pub participants: String,

    #[arg(long)]
    pub company_id: Option<String>,

    /// Call length in seconds, used for the end time
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Command {
    /// Transcribe a recording by URL, analyze it and store the result
    AnalyzeAudio {
        /// Public or pre-signed URL of the recording
        #[arg(long)]
        audio_url: String,

        #[command(flatten)]
        conversation: ConversationArgs,
    },

    /// Analyze a plain-text transcript of "Name: message" lines and store the result
    AnalyzeText {
        /// Transcript file
        #[arg(long)]
        file: PathBuf,

        /// Score sentiment with the chat model instead of the sentiment service
        #[arg(long)]
        llm_sentiment: bool,

        #[command(flatten)]
        conversation: ConversationArgs,
    },

    /// Answer a question from the stored conversation chunks closest to it
    Ask {
        #[arg(long)]
        question: String,

        /// Only search conversations of this company
        #[arg(long)]
        company_id: Option<String>,
    },

    /// Suggest insights for an agent from the company's latest stored call
    Insights {
        #[arg(long)]
        company_id: String,
    },

    /// Create or upgrade the database schema and exit
    Migrate,
}
