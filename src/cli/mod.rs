//! CLI module for the domain deployment tool.
//!
//! This module provides the command-line interface for deploying and
//! removing an Elasticsearch Service domain.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
