//! Main Entrypoint for the GrowTalk Tutor Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing the SQLite store and ensuring the schema exists.
//! 3. Seeding the curriculum when `--curriculum` is given.
//! 4. Initializing the answer judge for the configured provider.
//! 5. Running a line-oriented chat loop on stdin for one student.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use async_trait::async_trait;
use clap::Parser;
use growtalk_core::channel::MessageChannel;
use growtalk_core::engine::{EngineConfig, SessionEngine};
use growtalk_core::evaluator::EvaluatorConfig;
use growtalk_core::judge::{CompletionClient, LenientJudge};
use growtalk_core::store::ProgressStore;
use growtalk_tutor::{
    config::{Config, JudgeProvider},
    openai::OpenAICompatibleClient,
    store::SqliteStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tutor", about = "Interactive English tutoring session")]
struct Args {
    /// Identifier of the student on this terminal.
    #[arg(long, default_value = "local")]
    student: String,

    /// JSON file of exercise items to (re)seed the curriculum from.
    #[arg(long)]
    curriculum: Option<PathBuf>,
}

/// Delivers replies by printing them to stdout.
struct StdoutChannel;

#[async_trait]
impl MessageChannel for StdoutChannel {
    async fn send(&self, _student_id: &str, text: &str) -> anyhow::Result<()> {
        println!("{text}\n");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing services...");

    // --- 3. Initialize Storage ---
    let store = SqliteStore::connect(&config.database_url)
        .await
        .context("Failed to open the progress database")?;
    info!(url = %config.database_url, "Progress store ready.");

    if let Some(path) = &args.curriculum {
        store
            .seed_from_file(path)
            .await
            .with_context(|| format!("Failed to seed curriculum from {}", path.display()))?;
    }

    // --- 4. Initialize the Judge ---
    let judge: Arc<dyn CompletionClient> = match &config.provider {
        JudgeProvider::OpenAi => {
            info!(model = %config.chat_model, "Using OpenAI-compatible judge.");
            let api_key = config
                .openai_api_key
                .as_ref()
                .context("OPENAI_API_KEY is required for the openai provider")?;
            let openai_config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(&config.openai_api_base);
            Arc::new(OpenAICompatibleClient::new(
                openai_config,
                config.chat_model.clone(),
            ))
        }
        JudgeProvider::Lenient => {
            info!("Using the lenient offline judge.");
            Arc::new(LenientJudge)
        }
    };

    // --- 5. Build the Engine and Run the Chat Loop ---
    let engine_config = EngineConfig {
        evaluator: EvaluatorConfig {
            judge_timeout: config.judge_timeout,
            ..EvaluatorConfig::default()
        },
        ..EngineConfig::default()
    };
    let engine = SessionEngine::new(Arc::new(store) as Arc<dyn ProgressStore>, judge, engine_config);
    let channel = StdoutChannel;

    info!(student = %args.student, "Session ready. Type 'start' to begin, Ctrl+D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        let replies = engine.handle_message(&args.student, text).await;
        channel.send_all(&args.student, &replies).await?;
    }

    info!("Input closed. Goodbye.");
    Ok(())
}
