use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docrag_core::config::{Config, Settings};
use docrag_rag::{AppContext, IngestReport};

#[derive(Parser, Debug)]
#[command(name = "docrag", version, about = "Ask questions about a folder of documents")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Directory of source documents (overrides data.source_dir)
    #[arg(long, global = true)]
    source: Option<String>,

    /// Vector store directory (overrides store.uri)
    #[arg(long, global = true)]
    store: Option<String>,

    /// Keep vectors in memory instead of on disk
    #[arg(long, global = true, default_value_t = false)]
    in_memory: bool,

    /// Number of chunks handed to the model as context
    #[arg(long, global = true)]
    top_k: Option<usize>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Ingest the source directory, then answer questions until `stop` or `exit`
    Chat,
    /// Rebuild the vector store from a directory
    Ingest {
        /// Directory to ingest (defaults to data.source_dir)
        dir: Option<String>,
    },
    /// Answer a single question from the existing store
    Ask { question: String },
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(source) = &self.source {
            settings.data.source_dir = source.clone();
        }
        if let Some(Command::Ingest { dir: Some(dir) }) = &self.command {
            settings.data.source_dir = dir.clone();
        }
        if let Some(store) = &self.store {
            settings.store.uri = store.clone();
        }
        if self.in_memory {
            settings.store.in_memory = true;
        }
        if let Some(top_k) = self.top_k {
            settings.retrieval.top_k = top_k;
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn print_report(report: &IngestReport) {
    if report.reused {
        println!("Corpus unchanged, kept {} stored chunks", report.chunks);
        return;
    }
    println!(
        "Ingested {} documents into {} chunks ({} skipped, {} unreadable)",
        report.documents,
        report.chunks,
        report.skipped,
        report.failures.len()
    );
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.path.display(), failure.error);
    }
}

fn chat(ctx: &AppContext) -> Result<()> {
    // Build the backend first so a missing API key fails before the corpus is embedded.
    let engine = ctx.configured_engine()?;
    let report = ctx.ingest(true)?;
    if report.chunks == 0 {
        tracing::warn!(dir = %ctx.settings().data.source_path().display(), "no chunks ingested; answers will have no context");
    }
    let stdin = io::stdin();
    let stdout = io::stdout();
    let answered = ctx.query_loop(&engine).run(stdin.lock(), stdout.lock())?;
    tracing::info!(answered, "session ended");
    Ok(())
}

fn ask(ctx: &AppContext, question: &str) -> Result<()> {
    let engine = ctx.configured_engine()?;
    if ctx.settings().store.in_memory {
        ctx.ingest(false)?;
    }
    let answer = engine.answer(question)?;
    for hit in &answer.hits {
        tracing::debug!(source = %hit.source, score = hit.score, "context chunk");
    }
    println!("{}", answer.text);
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load().context("loading configuration")?;
    let mut settings = config.settings()?;
    cli.apply(&mut settings);
    tracing::debug!(env = config.env_name(), "configuration loaded");

    let ctx = AppContext::from_settings(settings)?;
    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&ctx),
        Command::Ingest { .. } => {
            let report = ctx.ingest(true)?;
            print_report(&report);
            Ok(())
        }
        Command::Ask { question } => ask(&ctx, &question),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_is_chat() {
        let cli = Cli::try_parse_from(["docrag"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "docrag", "ask", "what is a mammal?", "--store", "/tmp/vectors", "--top-k", "4", "--in-memory",
        ])
        .unwrap();
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(cli.command, Some(Command::Ask { question: "what is a mammal?".into() }));
        assert_eq!(settings.store.uri, "/tmp/vectors");
        assert_eq!(settings.retrieval.top_k, 4);
        assert!(settings.store.in_memory);
        assert_eq!(settings.data.source_dir, "./data_source");
    }

    #[test]
    fn ingest_dir_wins_over_source_flag() {
        let cli = Cli::try_parse_from(["docrag", "--source", "a", "ingest", "b"]).unwrap();
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.data.source_dir, "b");
    }
}
