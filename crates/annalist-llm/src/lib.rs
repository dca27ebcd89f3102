//! Annalist LLM Provider Layer
//!
//! Pluggable LLM provider implementations.
//!
//! # Architecture
//!
//! This crate provides implementations of the `LlmProvider` trait from `annalist-domain`.
//! It supports multiple LLM backends with a common interface.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic, scriptable mock for testing, including
//!   grounded (search-backed) responses
//! - `OllamaProvider`: Local Ollama API integration (no search grounding)
//!
//! # Examples
//!
//! ```
//! use annalist_llm::MockProvider;
//! use annalist_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod ollama;

use annalist_domain::traits::LlmProvider as LlmProviderTrait;
use annalist_domain::{GroundedResponse, GroundingEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::OllamaProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

#[derive(Debug, Clone)]
enum MockReply {
    Response(GroundedResponse),
    Error,
}

#[derive(Debug)]
struct MockRule {
    pattern: String,
    replies: VecDeque<MockReply>,
}

impl MockRule {
    /// Pop the next scripted reply; the last one repeats forever
    fn next_reply(&mut self) -> Option<MockReply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// Mock LLM provider for deterministic testing
///
/// Responses are matched by substring: the first rule whose pattern occurs in
/// the prompt answers it. A rule can hold a sequence of replies, consumed one
/// per call, with the final reply repeating once the sequence is exhausted.
/// Prompts that match no rule get the default response.
///
/// # Examples
///
/// ```
/// use annalist_llm::MockProvider;
/// use annalist_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Scripted sequence for prompts mentioning the evaluator
/// let mut provider = MockProvider::default();
/// provider.add_sequence("evaluator", ["first", "second"]);
/// assert_eq!(provider.generate("you are the evaluator").unwrap(), "first");
/// assert_eq!(provider.generate("you are the evaluator").unwrap(), "second");
/// assert_eq!(provider.generate("you are the evaluator").unwrap(), "second");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    rules: Arc<Mutex<Vec<MockRule>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            rules: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a fixed response for prompts containing `pattern`
    pub fn add_response(&mut self, pattern: impl Into<String>, response: impl Into<String>) {
        self.push_rule(
            pattern.into(),
            vec![MockReply::Response(GroundedResponse::ungrounded(response))],
        );
    }

    /// Add a sequence of responses for prompts containing `pattern`
    pub fn add_sequence<I, R>(&mut self, pattern: impl Into<String>, responses: I)
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let replies = responses
            .into_iter()
            .map(|r| MockReply::Response(GroundedResponse::ungrounded(r)))
            .collect();
        self.push_rule(pattern.into(), replies);
    }

    /// Add a search-grounded response for prompts containing `pattern`
    pub fn add_grounded_response(
        &mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
        grounding: Vec<GroundingEvent>,
    ) {
        self.add_grounded_sequence(pattern, vec![(response.into(), grounding)]);
    }

    /// Add a sequence of grounded responses for prompts containing `pattern`
    pub fn add_grounded_sequence(
        &mut self,
        pattern: impl Into<String>,
        responses: Vec<(String, Vec<GroundingEvent>)>,
    ) {
        let replies = responses
            .into_iter()
            .map(|(text, grounding)| MockReply::Response(GroundedResponse { text, grounding }))
            .collect();
        self.push_rule(pattern.into(), replies);
    }

    /// Configure to return an error for prompts containing `pattern`
    pub fn add_error(&mut self, pattern: impl Into<String>) {
        self.push_rule(pattern.into(), vec![MockReply::Error]);
    }

    /// Get the number of times the provider was called
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Number of calls whose prompt contained `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(pattern))
            .count()
    }

    /// All prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Reset the call log
    pub fn reset_call_count(&self) {
        self.prompts.lock().unwrap().clear();
    }

    fn push_rule(&mut self, pattern: String, replies: Vec<MockReply>) {
        self.rules.lock().unwrap().push(MockRule {
            pattern,
            replies: replies.into(),
        });
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        self.generate_grounded(prompt).map(|response| response.text)
    }

    fn generate_structured(&self, prompt: &str, _schema: &str) -> Result<String, Self::Error> {
        // Structured generation uses the same scripted replies
        self.generate(prompt)
    }

    fn generate_grounded(&self, prompt: &str) -> Result<GroundedResponse, Self::Error> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let mut rules = self.rules.lock().unwrap();
        let reply = rules
            .iter_mut()
            .find(|rule| prompt.contains(&rule.pattern))
            .and_then(MockRule::next_reply);

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Error) => Err(LlmError::Other("Mock error".to_string())),
            None => Ok(GroundedResponse::ungrounded(self.default_response.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annalist_domain::GroundingChunk;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        let result = provider.generate("any prompt");
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Test response");
    }

    #[test]
    fn test_mock_provider_pattern_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("say hello please").unwrap(), "world");
        assert_eq!(provider.generate("foo").unwrap(), "bar");
        assert_eq!(provider.generate("unknown").unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_sequence_repeats_last() {
        let mut provider = MockProvider::default();
        provider.add_sequence("eval", ["fail", "pass"]);

        assert_eq!(provider.generate("eval").unwrap(), "fail");
        assert_eq!(provider.generate("eval").unwrap(), "pass");
        assert_eq!(provider.generate("eval").unwrap(), "pass");
    }

    #[test]
    fn test_mock_provider_call_count() {
        let provider = MockProvider::new("test");

        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").unwrap();
        assert_eq!(provider.call_count(), 1);

        provider.generate("prompt2").unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.calls_matching("prompt2"), 1);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt");

        let result = provider.generate("a bad prompt");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), LlmError::Other(_)));
    }

    #[test]
    fn test_mock_provider_grounded() {
        let mut provider = MockProvider::default();
        let event = GroundingEvent::new(
            vec![GroundingChunk::web("https://a.org", Some("A"), Some("a.org"))],
            Vec::new(),
        );
        provider.add_grounded_response("search", "findings", vec![event.clone()]);

        let response = provider.generate_grounded("search the web").unwrap();
        assert_eq!(response.text, "findings");
        assert_eq!(response.grounding, vec![event]);

        // Plain generation drops the grounding
        assert_eq!(provider.generate("search again").unwrap(), "findings");
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }
}
