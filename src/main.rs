//! # docqa CLI
//!
//! ## Usage
//!
//! ```bash
//! docqa [--config PATH] [--document PATH] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa ask "<question>"` | Build the index and print one answer |
//! | `docqa chat` | Answer questions read from stdin |
//! | `docqa search "<query>"` | Print the best-matching chunks with scores |
//! | `docqa chunks` | Print the document's chunks (no backends) |
//! | `docqa check` | Validate configuration (no backends) |
//!
//! Logs go to stderr; set `RUST_LOG` to change verbosity (default `docqa=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use docqa::commands;

/// docqa: ask questions about a PDF or text document.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "docqa: ask questions about a PDF or text document",
    version,
    long_about = "docqa splits a document into overlapping chunks, embeds them with an \
    Ollama or OpenAI embedding model, and answers questions with a language model that \
    is only shown the best-matching chunks."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docqa.toml` when that file exists, otherwise
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Document to load, overriding `document.path` from the config.
    #[arg(long, global = true)]
    document: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question.
    Ask {
        /// The question, in any language the models understand.
        question: String,
    },

    /// Interactive question loop on stdin.
    ///
    /// `/history` prints the conversation so far, `/quit` exits.
    Chat {
        /// Write the transcript as JSON here on exit.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Show the chunks that would be retrieved for a query.
    Search {
        query: String,

        /// Number of results (defaults to `retrieval.top_k`).
        #[arg(long)]
        k: Option<usize>,
    },

    /// Load and split the document, printing every chunk.
    Chunks,

    /// Validate configuration and print the resolved settings.
    Check,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docqa=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = commands::resolve_config(cli.config.as_deref(), cli.document.as_deref())?;

    match cli.command {
        Commands::Ask { question } => commands::run_ask(&config, &question).await?,
        Commands::Chat { transcript } => {
            commands::run_chat(&config, transcript.as_deref()).await?
        }
        Commands::Search { query, k } => commands::run_search(&config, &query, k).await?,
        Commands::Chunks => commands::run_chunks(&config).await?,
        Commands::Check => commands::run_check(&config)?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", commands::render_error(&e));
            ExitCode::FAILURE
        }
    }
}
