mod backend;
mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docqa_rag::{BatchResult, DEFAULT_COLLECTION, RagConfig, RagContext, SessionState};
use tracing_subscriber::EnvFilter;

use crate::backend::BackendArgs;

#[derive(Parser)]
#[command(name = "docqa", about = "Ask questions about your documents", version)]
struct Cli {
    /// JSON file with pipeline settings (missing fields use defaults)
    #[arg(long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Vector collection holding the uploaded documents
    #[arg(long, global = true, default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// Override the relevance threshold
    #[arg(long, global = true)]
    threshold: Option<f32>,

    /// Override the number of chunks retrieved per question
    #[arg(long, global = true)]
    top_k: Option<usize>,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index documents and answer a single question
    Ask {
        /// Question to answer
        #[arg(short, long)]
        question: String,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
        /// Documents to index (.txt, .md)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Index documents and start an interactive question session
    Chat {
        /// Documents to index (.txt, .md)
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let context = RagContext::builder()
        .config(config.clone())
        .embedding_provider(cli.backend.embedding_provider())
        .generation_model(cli.backend.generation_model())
        .build()
        .context("failed to build the question answering pipeline")?;
    let mut session = SessionState::with_capacity(config.history_capacity);

    match cli.command {
        Command::Ask { question, json, files } => {
            let batch = ingest(&context, &cli.collection, &files).await?;
            report_batch(&batch);
            session.set_documents(&batch);
            let answer = context.ask(&cli.collection, &question, &mut session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}\n\nSource: {}", answer.text, answer.source);
            }
        }
        Command::Chat { files } => {
            if !files.is_empty() {
                let batch = ingest(&context, &cli.collection, &files).await?;
                report_batch(&batch);
                session.set_documents(&batch);
            }
            repl::run(&context, &cli.collection, &mut session).await?;
        }
    }
    Ok(())
}

/// Read the config file if given and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<RagConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            RagConfig::from_json(&json)?
        }
        None => RagConfig::default(),
    };
    if let Some(threshold) = cli.threshold {
        config.relevance_threshold = threshold;
    }
    if let Some(top_k) = cli.top_k {
        config.top_k = top_k;
    }
    config.validate()?;
    Ok(config)
}

/// Rebuild `collection` from the files at `paths`. Unreadable files are
/// reported in the batch result.
pub(crate) async fn ingest(
    context: &RagContext,
    collection: &str,
    paths: &[PathBuf],
) -> Result<BatchResult> {
    if paths.is_empty() {
        bail!("no documents given");
    }
    Ok(context.ingest_paths(collection, paths).await?)
}

pub(crate) fn report_batch(batch: &BatchResult) {
    for warning in &batch.warnings {
        eprintln!("warning: {warning}");
    }
    for failed in &batch.failed {
        eprintln!("skipped {}: {}", failed.filename, failed.error);
    }
    eprintln!(
        "Indexed {} document(s): {} chunks, {} words",
        batch.succeeded.len(),
        batch.chunk_count(),
        batch.word_count()
    );
}
