//! Error types for refinement configuration

use thiserror::Error;

/// Errors that can occur while configuring the refinement loop
///
/// Running the loop never fails; exhaustion and missing evaluations are
/// reported through [`LoopReport`](crate::LoopReport) instead.
#[derive(Error, Debug)]
pub enum RefinerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}
