//! Metrics collection for refinement runs

use crate::{LoopPhase, LoopReport};
use annalist_domain::Grade;
use std::collections::HashMap;

/// Metrics accumulated across refinement loop runs
#[derive(Debug, Clone, Default)]
pub struct LoopMetrics {
    /// Loop runs started
    pub runs: usize,

    /// Runs that ended on a passing evaluation
    pub escalated: usize,

    /// Runs that hit the iteration cap
    pub exhausted: usize,

    /// Evaluation steps executed
    pub evaluation_steps: usize,

    /// Follow-up search steps executed
    pub follow_up_steps: usize,

    /// Evaluation steps that produced no usable result
    pub missing_evaluations: usize,

    /// Grades observed
    pub grades: HashMap<Grade, usize>,
}

impl LoopMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one evaluation step and its grade, if any
    pub fn record_evaluation(&mut self, grade: Option<Grade>) {
        self.evaluation_steps += 1;
        match grade {
            Some(grade) => *self.grades.entry(grade).or_insert(0) += 1,
            None => self.missing_evaluations += 1,
        }
    }

    /// Record one follow-up search step
    pub fn record_follow_up(&mut self) {
        self.follow_up_steps += 1;
    }

    /// Record a finished run
    pub fn record_run(&mut self, report: &LoopReport) {
        self.runs += 1;
        match report.state.phase {
            LoopPhase::Escalated => self.escalated += 1,
            LoopPhase::Exhausted => self.exhausted += 1,
            LoopPhase::Running => {}
        }
    }

    /// Count of a given grade
    pub fn grade_count(&self, grade: Grade) -> usize {
        self.grades.get(&grade).copied().unwrap_or(0)
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Refinement Metrics Summary".to_string(),
            "==========================".to_string(),
            format!("Runs: {}", self.runs),
            format!("  Escalated (passed): {}", self.escalated),
            format!("  Exhausted (cap reached): {}", self.exhausted),
            format!("Evaluation steps: {}", self.evaluation_steps),
            format!("  Pass: {}", self.grade_count(Grade::Pass)),
            format!("  Fail: {}", self.grade_count(Grade::Fail)),
            format!("  Missing: {}", self.missing_evaluations),
            format!("Follow-up steps: {}", self.follow_up_steps),
        ];
        lines.join("\n")
    }
}
