//! # Chapter Tutor CLI (`tutor`)
//!
//! ## Usage
//!
//! ```bash
//! tutor --config ./config/tutor.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tutor serve` | Load the corpus and start the HTTP API |
//! | `tutor chapters` | List loaded chapters with their lengths |
//! | `tutor ask <chapter> <question>` | Answer one question from the terminal |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::bail;
use chapter_tutor::{config, server, tutor::Tutor};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Chapter Tutor — answers student questions about curriculum chapters
/// using a local language model.
#[derive(Parser)]
#[command(name = "tutor", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tutor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    ///
    /// Binds to `[server].bind` once every chapter has been loaded.
    Serve,

    /// List loaded chapters.
    ///
    /// Chapters whose text could not be extracted are listed separately.
    Chapters,

    /// Ask a single question about a chapter.
    Ask {
        /// Chapter identifier (file name without extension), e.g. `Chapter1`.
        chapter: String,

        /// The student's question.
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Chapters => {
            let tutor = Tutor::from_config(&cfg)?;
            let corpus = tutor.corpus();
            println!("{} chapter(s) in {}", corpus.len(), cfg.corpus.dir.display());
            for id in corpus.ids() {
                let chars = corpus.get(id).map(|t| t.chars().count()).unwrap_or_default();
                println!("  {}  ({} chars)", id, chars);
            }
            for id in corpus.unavailable() {
                println!("  {}  (unavailable: no extractable text)", id);
            }
        }
        Commands::Ask { chapter, question } => {
            let tutor = Tutor::from_config(&cfg)?;
            let answer = tutor.answer(&chapter, &question).await;
            match answer.text {
                Some(text) => {
                    println!("{}", text);
                    eprintln!("({:.2}s)", answer.elapsed_secs);
                }
                None if !tutor.corpus().contains(&chapter) => {
                    bail!("Chapter not found: {}", chapter)
                }
                None => bail!("Failed to generate response for {}", chapter),
            }
        }
    }

    Ok(())
}
