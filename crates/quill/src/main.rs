//! Quill CLI binary.
//!
//! This binary provides command-line access to Quill's pipeline:
//! - Create and list projects
//! - Run stages individually or through a target stage
//! - Apply revisions within a spend limit
//! - Export the assembled manuscript

use clap::Parser;
use quill::{QuillConfig, init_tracing};
use std::fs::OpenOptions;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use cli::{Cli, Session, handle_command};

    // API keys may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    init_tracing(cli.log_format, log_level)?;

    let config = match &cli.config {
        Some(path) => QuillConfig::from_file(path)?,
        None => QuillConfig::load()?,
    };
    let session = Session::from_config(&config)?;

    let result = handle_command(&session, cli.command, cli.verbose).await;

    // Records are written even when the command failed part way
    if let Some(path) = &cli.records {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = session.manager().export_records_jsonl(file)?;
        tracing::debug!(written, path = %path.display(), "Exported call records");
    }

    result
}
