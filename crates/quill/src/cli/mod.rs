//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the quill binary.

mod commands;
mod project;

pub use commands::{Cli, Commands, OutputFormat};
pub use project::{Session, handle_command};
