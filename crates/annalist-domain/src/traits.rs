//! Trait definitions for external interactions
//!
//! These traits define the boundaries between orchestration logic and
//! infrastructure. Implementations live in other crates.

use crate::GroundedResponse;

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (annalist-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured output (if supported)
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;

    /// Generate with web-search grounding
    ///
    /// Providers without a search capability return the plain completion and
    /// no grounding events.
    fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse, Self::Error> {
        self.generate(prompt).map(GroundedResponse::ungrounded)
    }
}
