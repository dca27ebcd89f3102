//! Annalist CLI - Research a topic and write a cited report.

use annalist_cli::cli::{ConfigAction, ConfigArgs};
use annalist_cli::commands;
use annalist_cli::{Cli, Command, Config, Formatter};
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load config, then let flags override file values
    let path = Config::resolve_path(cli.config.as_deref())?;
    let mut config = match (&cli.command, Config::load_from(&path)) {
        (_, Ok(config)) => config,
        // A broken file must not block writing a fresh one
        (Command::Config(ConfigArgs { action: ConfigAction::Init { .. } }), Err(_)) => {
            Config::default()
        }
        (_, Err(e)) => {
            return Err(e).with_context(|| format!("Failed to load {}", path.display()));
        }
    };
    config.apply_overrides(&cli)?;

    let formatter = Formatter::new(config.settings.format, config.settings.color);

    match cli.command {
        Command::Research(args) => {
            commands::execute_research(args, &config, &formatter).await?;
        }
        Command::Config(args) => {
            commands::execute_config(args, &config, &path, &formatter).await?;
        }
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` takes precedence over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
