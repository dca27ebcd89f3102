//! Loop termination decision

use annalist_domain::EvaluationResult;
use tracing::info;

/// What the loop driver should do after an evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Research is not good enough yet; run follow-up searches
    Continue,
    /// Research passed; stop refining
    Stop,
}

/// Interprets the latest evaluation result
///
/// The gate never runs an evaluation itself. An absent result means nothing
/// has been evaluated yet and is treated as "continue", not as a fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationGate;

impl EvaluationGate {
    /// Create a gate
    pub fn new() -> Self {
        Self
    }

    /// True iff an evaluation is present and graded pass
    pub fn should_stop(&self, evaluation: Option<&EvaluationResult>) -> bool {
        evaluation.is_some_and(EvaluationResult::is_pass)
    }

    /// Decide the next loop transition
    pub fn decide(&self, evaluation: Option<&EvaluationResult>) -> GateDecision {
        if self.should_stop(evaluation) {
            info!("Research evaluation passed, stopping refinement");
            GateDecision::Stop
        } else {
            info!(
                grade = evaluation.map(|e| e.grade.as_str()).unwrap_or("missing"),
                "Research evaluation failed or not found, refinement continues"
            );
            GateDecision::Continue
        }
    }
}
