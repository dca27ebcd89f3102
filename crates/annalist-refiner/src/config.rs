//! Configuration for the refinement loop

use crate::RefinerError;
use serde::{Deserialize, Serialize};

/// Hard ceiling on `max_iterations`
pub const MAX_ITERATIONS_LIMIT: u32 = 10;

/// Configuration for the refinement loop
///
/// # Examples
///
/// ```
/// use annalist_refiner::RefinerConfig;
///
/// // Reference configuration: two evaluate/search rounds
/// let config = RefinerConfig::default();
/// assert_eq!(config.max_iterations, 2);
///
/// // One round only
/// let config = RefinerConfig::quick();
/// assert_eq!(config.max_iterations, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinerConfig {
    /// Maximum evaluate/follow-up rounds before the loop gives up
    /// Default: 2
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    2
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

impl RefinerConfig {
    /// Single refinement round for fast, cheap sessions
    pub fn quick() -> Self {
        Self { max_iterations: 1 }
    }

    /// More rounds for topics that need broader coverage
    pub fn thorough() -> Self {
        Self { max_iterations: 4 }
    }

    /// Validate the configuration
    ///
    /// Zero iterations is allowed and skips refinement entirely.
    pub fn validate(&self) -> Result<(), RefinerError> {
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(RefinerError::Config(format!(
                "max_iterations {} exceeds limit of {}",
                self.max_iterations, MAX_ITERATIONS_LIMIT
            )));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, RefinerError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, RefinerError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
