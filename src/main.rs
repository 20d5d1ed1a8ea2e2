//! # ragline CLI
//!
//! The `ragline` binary runs the question-answering service and provides
//! commands for database setup and one-off pipeline runs.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragline init` | Create the SQLite database and run schema migrations |
//! | `ragline serve` | Start the HTTP API server |
//! | `ragline ingest <file> --source <name>` | Ingest a local text file |
//! | `ragline ask "<question>"` | Answer a question and print the JSON response |
//!
//! All commands accept a `--config` flag pointing to a TOML configuration
//! file. The provider API key is read from the environment variable named in
//! `[provider] api_key_env` (a `.env` file is honored).

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ragline::answer::generate_answer;
use ragline::config::load_config;
use ragline::ingest::ingest_text;
use ragline::models::AnswerRequest;
use ragline::provider::ProviderClient;
use ragline::retry::RetryPolicy;

#[derive(Parser)]
#[command(
    name = "ragline",
    about = "A retrieval-augmented question answering service",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ragline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the documents table. Idempotent;
    /// running it multiple times is safe.
    Init,

    /// Start the HTTP API server.
    Serve,

    /// Ingest a local text file through the chunk → embed → persist pipeline.
    Ingest {
        /// Path to a UTF-8 text file.
        file: PathBuf,

        /// Source label stored with every chunk row.
        #[arg(long)]
        source: String,
    },

    /// Answer a question once and print the validated response as JSON.
    Ask {
        /// The question to answer.
        question: String,

        /// Optional file whose contents are passed as grounding context.
        #[arg(long)]
        context_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = ragline::db::connect(&config.db.path).await?;
            ragline::migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("init");
            println!("  database: {}", config.db.path.display());
            println!("ok");
        }
        Commands::Serve => {
            ragline::server::run_server(&config).await?;
        }
        Commands::Ingest { file, source } => {
            let text = std::fs::read_to_string(&file)?;
            let pool = ragline::db::connect(&config.db.path).await?;
            ragline::migrate::run_migrations(&pool).await?;

            let provider = ProviderClient::new(&config.provider)?;
            let retry = RetryPolicy::new(&config.retry);
            let outcome = ingest_text(
                &pool,
                &provider,
                &retry,
                &config.chunking,
                &source,
                &text,
                None,
            )
            .await?;
            pool.close().await;

            println!("ingest {}", file.display());
            println!("  document id: {}", outcome.document_id);
            println!("  chunks created: {}", outcome.chunks_created);
            println!("ok");
        }
        Commands::Ask {
            question,
            context_file,
        } => {
            let context = match context_file {
                Some(path) => Some(std::fs::read_to_string(&path)?),
                None => None,
            };

            let provider = ProviderClient::new(&config.provider)?;
            let retry = RetryPolicy::new(&config.retry);
            let request = AnswerRequest { question, context };
            let answer = generate_answer(&provider, &retry, &request).await?;

            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
    }

    Ok(())
}
