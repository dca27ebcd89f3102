//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Annalist - Research a topic and write a cited report.
#[derive(Debug, Parser)]
#[command(name = "annalist")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ollama endpoint (overrides the config file)
    #[arg(long, global = true, env = "ANNALIST_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Model for every role (overrides the config file)
    #[arg(short, long, global = true, env = "ANNALIST_MODEL")]
    pub model: Option<String>,

    /// Refinement iteration cap (overrides the config file)
    #[arg(long, global = true)]
    pub max_iterations: Option<u32>,

    /// Log pipeline progress at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Report as markdown followed by a source table (default)
    Markdown,
    /// Report, sources and metrics as JSON
    Json,
    /// Report text only
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Research a topic and print the cited report
    Research(ResearchArgs),

    /// Inspect or initialise the configuration file
    Config(ConfigArgs),
}

/// Arguments for the research command.
#[derive(Debug, Parser)]
pub struct ResearchArgs {
    /// Topic to research
    pub topic: String,

    /// File holding an approved research plan; plan generation is skipped
    #[arg(short, long)]
    pub plan: Option<PathBuf>,

    /// Write the final session state as JSON to this file
    #[arg(short, long)]
    pub save_state: Option<PathBuf>,
}

/// Arguments for configuration management.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Markdown => crate::config::OutputFormat::Markdown,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
