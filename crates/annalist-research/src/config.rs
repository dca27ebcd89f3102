//! Configuration for research sessions

use crate::PipelineError;
use annalist_refiner::RefinerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default model for every role
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Configuration for the research pipeline
///
/// Model names select which model serves each group of stages:
/// planning (plan generation, section outline), work (searching and
/// synthesising findings) and critique (evaluation, final composition).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Model for plan generation and section planning
    #[serde(default = "default_model")]
    pub planner_model: String,

    /// Model for initial and follow-up research
    #[serde(default = "default_model")]
    pub worker_model: String,

    /// Model for evaluation and report composition
    #[serde(default = "default_model")]
    pub critic_model: String,

    /// Maximum time for a single stage call (seconds)
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Refinement loop settings
    #[serde(default)]
    pub refinement: RefinerConfig,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_stage_timeout_secs() -> u64 {
    300
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            planner_model: default_model(),
            worker_model: default_model(),
            critic_model: default_model(),
            stage_timeout_secs: default_stage_timeout_secs(),
            refinement: RefinerConfig::default(),
        }
    }
}

impl ResearchConfig {
    /// Quick preset: one refinement round, shorter stage budget
    pub fn quick() -> Self {
        Self {
            stage_timeout_secs: 120,
            refinement: RefinerConfig::quick(),
            ..Self::default()
        }
    }

    /// Thorough preset: more refinement rounds, longer stage budget
    pub fn thorough() -> Self {
        Self {
            stage_timeout_secs: 600,
            refinement: RefinerConfig::thorough(),
            ..Self::default()
        }
    }

    /// Use one model for every role
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.planner_model = model.clone();
        self.worker_model = model.clone();
        self.critic_model = model;
        self
    }

    /// Get the stage timeout as a Duration
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (field, value) in [
            ("planner_model", &self.planner_model),
            ("worker_model", &self.worker_model),
            ("critic_model", &self.critic_model),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::Config(format!("{} must not be empty", field)));
            }
        }
        if self.stage_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "stage_timeout_secs must be greater than 0".to_string(),
            ));
        }
        self.refinement.validate()?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
