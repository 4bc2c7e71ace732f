use anyhow::Context;
use callsight::adapters::services::{
    AssemblyAIService, AzureLanguageService, BackoffPolicy, OpenAIEmbeddingService,
    OpenAIService,
};
use callsight::adapters::storage::SqliteStorage;
use callsight::analysis::PipelineServices;
use callsight::commands::assistant::{ask, suggest_insights};
use callsight::commands::conversation::{process_audio, process_transcript_text, AnalysisReport};
use callsight::commands::Command;
use callsight::config::Config;
use callsight::AppState;
use std::sync::Arc;

/// Open the database and connect the external services
fn initialize_app(config: &Config) -> anyhow::Result<AppState> {
    let storage = SqliteStorage::new(config.database_path.clone())
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    storage.run_migrations().context("running database migrations")?;

    let retry = BackoffPolicy::new(config.max_retries);
    let azure = Arc::new(
        AzureLanguageService::new(
            &config.azure_ai_language_endpoint,
            config.azure_ai_key.clone(),
            &retry,
        )
        .context("creating Azure Language client")?,
    );
    if !azure.is_configured() {
        log::warn!("Azure Language key or endpoint missing; sentiment and summaries will degrade");
    }

    let llm = OpenAIService::new(config.openai_api_key.clone(), &retry)
        .context("creating OpenAI client")?;
    let embedding = OpenAIEmbeddingService::new(config.openai_api_key.clone(), &retry)
        .context("creating OpenAI embeddings client")?;
    let transcription = AssemblyAIService::new(config.assemblyai_api_key.clone(), &retry)
        .context("creating AssemblyAI client")?;

    Ok(AppState {
        transcription: Arc::new(transcription),
        services: PipelineServices {
            llm: Arc::new(llm),
            sentiment: azure.clone(),
            summarization: azure,
            embedding: Arc::new(embedding),
        },
        storage: Arc::new(storage),
        pipeline_config: config.pipeline(),
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("serializing command output")?
    );
    Ok(())
}

fn print_report(report: &AnalysisReport) -> anyhow::Result<()> {
    println!("{}", report.conversation_id);
    print_json(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::new();

    env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .init();

    let Some(command) = config.command.clone() else {
        anyhow::bail!("no command given; run with --help to see the available commands");
    };

    match command {
        Command::Migrate => {
            SqliteStorage::new(config.database_path.clone())
                .and_then(|storage| storage.run_migrations())
                .context("migrating database")?;
            log::info!("Database at {} is up to date", config.database_path.display());
        }
        Command::AnalyzeAudio {
            audio_url,
            conversation,
        } => {
            let state = initialize_app(&config)?;
            let report = process_audio(&state, &audio_url, &conversation)
                .await
                .with_context(|| format!("analyzing audio {}", conversation.audio_id))?;
            print_report(&report)?;
        }
        Command::AnalyzeText {
            file,
            llm_sentiment,
            conversation,
        } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading transcript {}", file.display()))?;
            let state = initialize_app(&config)?;
            let report = process_transcript_text(&state, &text, &conversation, llm_sentiment)
                .await
                .with_context(|| format!("analyzing transcript {}", file.display()))?;
            print_report(&report)?;
        }
        Command::Ask {
            question,
            company_id,
        } => {
            let state = initialize_app(&config)?;
            let answer = ask(&state, &question, company_id.as_deref())
                .await
                .context("answering question")?;
            print_json(&answer)?;
        }
        Command::Insights { company_id } => {
            let state = initialize_app(&config)?;
            let report = suggest_insights(&state, &company_id)
                .await
                .with_context(|| format!("suggesting insights for company {}", company_id))?;
            print_json(&report)?;
        }
    }

    Ok(())
}
