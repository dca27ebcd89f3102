//! Annalist Research Pipeline
//!
//! Turns a topic into a cited markdown report by running a fixed sequence of
//! LLM stages over an explicit [`SessionState`].
//!
//! # Architecture
//!
//! ```text
//! topic ─► plan_generator ─► section_planner ─► section_researcher
//!                                                      │
//!          ┌───────────── refinement loop ◄────────────┘
//!          │  research_evaluator ─► enhanced_search_executor
//!          ▼
//!   report_composer ─► citation rewriting ─► final report
//! ```
//!
//! Stages never touch the state directly. The [`StageRunner`] applies each
//! [`StageOutput`] to the key the stage declares, and only stages that
//! declare registry access have their grounding recorded as sources.
//!
//! # Example
//!
//! ```no_run
//! use annalist_llm::OllamaProvider;
//! use annalist_research::{ResearchConfig, ResearchPipeline};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResearchConfig::default();
//! let llm = OllamaProvider::default_endpoint(&config.worker_model);
//! let mut pipeline = ResearchPipeline::new(llm, config)?;
//!
//! let outcome = pipeline.run("tidal energy economics").await;
//! println!("{}", outcome.final_report());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod agent;
mod config;
mod error;
mod metrics;
mod parser;
mod pipeline;
mod prompt;
mod session;
mod stage;

pub use agent::{AgentStage, ModelGroup, Role};
pub use config::{ResearchConfig, DEFAULT_MODEL};
pub use error::{PipelineError, StageError};
pub use metrics::SessionMetrics;
pub use parser::parse_evaluation;
pub use pipeline::{ResearchOutcome, ResearchPipeline};
pub use prompt::{PromptBuilder, EVALUATION_SCHEMA};
pub use session::{Artifact, SessionState, StateKey};
pub use stage::{Capabilities, Stage, StageOutput, StageRunner, StageStatus};
