//! CLI command definitions.

use clap::{Parser, Subcommand, ValueEnum};
use quill::{LogFormat, Stage};
use std::path::PathBuf;
use uuid::Uuid;

/// Quill - staged fiction production over LLM providers
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "Staged fiction production over LLM providers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log line format (pretty or json)
    #[arg(long, global = true, default_value = "pretty", env = "QUILL_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Configuration file used instead of the layered defaults
    #[arg(long, global = true, env = "QUILL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Append model call records to this file as JSON lines
    #[arg(long, global = true)]
    pub records: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project
    New {
        /// Display title
        title: String,

        /// Short brief offered to the IDEA prompt
        #[arg(long, default_value = "")]
        brief: String,

        /// Model identifier used for this project's runs
        #[arg(long)]
        model: Option<String>,
    },

    /// List stored projects, most recently updated first
    List {
        /// Output format
        #[arg(long, default_value = "human")]
        format: OutputFormat,
    },

    /// Show the status of every stage of a project
    Status {
        /// Project id
        id: Uuid,
    },

    /// Run a single stage
    Run {
        /// Project id
        id: Uuid,

        /// Stage to run (idea, characters, locations, outline, breakdown, prose, revision, export)
        stage: Stage,

        /// Also run any prerequisite that is not current
        #[arg(long)]
        through: bool,
    },

    /// Print a stage's committed output as JSON
    Show {
        /// Project id
        id: Uuid,

        /// Stage whose output to print
        stage: Stage,
    },

    /// Apply the committed revision feedback to the prose
    Revise {
        /// Spend limit for this batch in USD
        #[arg(long)]
        max_cost: f64,

        /// Project id
        id: Uuid,
    },

    /// Assemble the manuscript and write it out
    Export {
        /// Project id
        id: Uuid,

        /// Write the Markdown body here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Change the model used for a project's future runs
    Model {
        /// Project id
        id: Uuid,

        /// Model identifier, e.g. "openai:gpt-4o"
        model: String,
    },

    /// Delete a project and all of its state
    Delete {
        /// Project id
        id: Uuid,
    },
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputFormat {
    /// Human-readable format
    Human,
    /// JSON format
    Json,
}
