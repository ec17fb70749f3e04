//! CLI command implementations.
//!
//! Each `run_*` function backs one `docqa` subcommand. Results go to
//! stdout; progress and diagnostics go to stderr through `tracing`.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use docqa_core::chunk;

use crate::config::{load_config, Config};
use crate::loader::load_document;
use crate::pipeline::Pipeline;
use crate::session::Session;
use crate::transcript::{Role, Transcript};

/// Config file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "./config/docqa.toml";

/// Resolve the effective configuration.
///
/// An explicit `--config` must exist. Without one, the default path is
/// used if present and built-in defaults otherwise. `--document` replaces
/// the configured document path.
pub fn resolve_config(config_path: Option<&Path>, document: Option<&Path>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => Config::default(),
    };
    if let Some(document) = document {
        config = config.with_document(document);
    }
    config.validate()?;
    Ok(config)
}

/// Render an error for the terminal: `error[<kind>]: <detail>` for
/// pipeline errors, `error: <chain>` for everything else.
pub fn render_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<docqa_core::Error>() {
        Some(e) => format!("error[{}]: {}", e.kind(), e),
        None => format!("error: {:#}", err),
    }
}

pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let pipeline = Pipeline::initialize(config).await?;
    let answer = pipeline.answer(question).await?;
    println!("{}", answer.trim_end());
    Ok(())
}

pub async fn run_search(config: &Config, query: &str, k: Option<usize>) -> Result<()> {
    let pipeline = Pipeline::initialize(config).await?;
    let k = k.unwrap_or(config.retrieval.top_k);
    let results = pipeline.search(query, k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        let chunk = &result.chunk;
        println!(
            "{}. [{:.4}] chunk {} (pages {}-{})",
            rank + 1,
            result.score,
            chunk.chunk_index,
            chunk.page_start,
            chunk.page_end
        );
        println!("    {}", snippet(&chunk.text, 200));
        println!();
    }
    Ok(())
}

/// Load and split only. No backend is contacted.
pub async fn run_chunks(config: &Config) -> Result<()> {
    let document = load_document(config.document_path()?).await?;
    let chunks = chunk::split(&document, &config.chunking.params())?;

    println!(
        "{}: {} pages, {} chunks (document {})",
        document.source,
        document.pages.len(),
        chunks.len(),
        short_id(&document.id)
    );
    for chunk in &chunks {
        println!(
            "--- chunk {} | pages {}-{} | chars {}..{} | {}",
            chunk.chunk_index,
            chunk.page_start,
            chunk.page_end,
            chunk.start_offset,
            chunk.end_offset,
            short_id(&chunk.hash)
        );
        println!("{}", chunk.text);
    }
    Ok(())
}

/// Report the resolved settings. No backend is contacted.
pub fn run_check(config: &Config) -> Result<()> {
    let template = config.prompt.template()?;
    let document = match &config.document.path {
        Some(path) => path.display().to_string(),
        None => "(not set)".to_string(),
    };
    let credential = match config.credentials.resolve() {
        Some(_) => "set",
        None => "not set",
    };

    println!("Configuration OK");
    println!("  document:    {}", document);
    println!(
        "  chunking:    size {} / overlap {}",
        config.chunking.chunk_size, config.chunking.overlap
    );
    println!(
        "  retrieval:   top_k {} / {}",
        config.retrieval.top_k,
        config.retrieval.metric.as_str()
    );
    println!(
        "  embedding:   {} {} ({})",
        config.embedding.provider,
        config.embedding.model_name(),
        config.embedding.base_url()
    );
    println!(
        "  generation:  {} {} ({})",
        config.generation.provider,
        config.generation.model_name(),
        config.generation.base_url()
    );
    println!("  language:    {}", template.language);
    println!("  fallback:    {}", template.fallback);
    println!(
        "  credential:  {} ({})",
        credential, config.credentials.api_key_env
    );
    Ok(())
}

/// Interactive loop over stdin. The document is re-checked before every
/// question and the index rebuilt if it changed. The transcript is saved
/// however the loop ends.
pub async fn run_chat(config: &Config, transcript_path: Option<&Path>) -> Result<()> {
    let mut session = Session::new();
    let pipeline = session.initialize(config).await?;
    let info = pipeline.build_info();
    eprintln!(
        "Ready: {} ({} chunks). Type a question, /history, or /quit.",
        info.source, info.chunk_count
    );

    let mut transcript = Transcript::new();
    let input = BufReader::new(tokio::io::stdin());
    let outcome = chat_loop(
        &mut session,
        config,
        input,
        &mut std::io::stdout(),
        &mut transcript,
    )
    .await;

    if let Some(path) = transcript_path {
        transcript.save_json(path)?;
        eprintln!("Transcript saved to {} ({} turns)", path.display(), transcript.len());
    }
    outcome
}

/// Answer one question per input line until EOF or `/quit`.
///
/// A failed rebuild or answer is reported on stderr and the loop goes on:
/// a failed session is rebuilt on the next question.
pub async fn chat_loop<R, W>(
    session: &mut Session,
    config: &Config,
    input: R,
    out: &mut W,
    transcript: &mut Transcript,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let question = line.trim();
        match question {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                for turn in transcript.turns() {
                    let who = match turn.role {
                        Role::User => "you",
                        Role::Assistant => "docqa",
                    };
                    writeln!(out, "[{}] {}: {}", turn.at.format("%H:%M:%S"), who, turn.text)?;
                }
                continue;
            }
            _ => {}
        }

        transcript.push(Role::User, question);
        if let Err(e) = session.ensure_ready(config).await {
            eprintln!("error[{}]: {}", e.kind(), e);
            continue;
        }
        match session.answer(question).await {
            Ok(answer) => {
                writeln!(out, "{}", answer.trim_end())?;
                transcript.push(Role::Assistant, answer);
            }
            Err(e) => eprintln!("error[{}]: {}", e.kind(), e),
        }
    }

    Ok(())
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

fn short_id(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
