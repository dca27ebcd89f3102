//! Error types for the research pipeline

use annalist_refiner::RefinerError;
use thiserror::Error;

/// Errors raised by a single stage
///
/// The stage runner absorbs these: the failure is logged and counted, and the
/// stage simply contributes no output.
#[derive(Error, Debug)]
pub enum StageError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Stage exceeded its time budget
    #[error("Stage '{stage}' timed out after {secs}s")]
    Timeout {
        /// Stage name
        stage: String,
        /// Budget in seconds
        secs: u64,
    },

    /// Model output could not be interpreted
    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    /// Blocking task failed to complete
    #[error("Task join error: {0}")]
    Join(String),
}

impl From<serde_json::Error> for StageError {
    fn from(e: serde_json::Error) -> Self {
        StageError::InvalidOutput(format!("JSON parse error: {}", e))
    }
}

/// Errors surfaced to pipeline callers
///
/// Only construction and snapshot handling can fail; a running session
/// always produces a report.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Refinement configuration error
    #[error(transparent)]
    Refiner(#[from] RefinerError),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Snapshot (de)serialization error
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Snapshot failed the source registry consistency check
    #[error("Inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),
}
