//! Research command implementation.

use crate::cli::ResearchArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use annalist_llm::OllamaProvider;
use annalist_research::{ResearchPipeline, SessionState};
use std::fs;
use tracing::info;

/// Execute the research command.
pub async fn execute_research(
    args: ResearchArgs,
    config: &Config,
    formatter: &Formatter,
) -> Result<()> {
    if args.topic.trim().is_empty() {
        return Err(CliError::InvalidInput("Topic must not be empty".into()));
    }

    let mut state = SessionState::new(args.topic.trim());
    if let Some(path) = &args.plan {
        let plan = fs::read_to_string(path)?;
        if plan.trim().is_empty() {
            return Err(CliError::InvalidInput(format!(
                "Plan file '{}' is empty",
                path.display()
            )));
        }
        state = state.with_plan(plan);
    }

    let research = config.research.clone();
    let provider = |model: &str| {
        OllamaProvider::new(config.ollama.endpoint.as_str(), model)
            .with_max_retries(config.ollama.max_retries)
    };
    let mut pipeline = ResearchPipeline::with_models(
        provider(research.planner_model.as_str()),
        provider(research.worker_model.as_str()),
        provider(research.critic_model.as_str()),
        research,
    )?;

    info!(endpoint = %config.ollama.endpoint, "Starting research");
    eprintln!(
        "{}",
        formatter.info(&format!("Researching '{}'...", state.topic()))
    );

    let outcome = pipeline.run_with_state(state).await;

    if let Some(path) = &args.save_state {
        fs::write(path, outcome.state.snapshot_json()?)?;
        eprintln!(
            "{}",
            formatter.success(&format!("Session state written to {}", path.display()))
        );
    }

    println!("{}", formatter.format_outcome(&outcome)?);
    Ok(())
}
