//! Metrics collected over one research session

use annalist_sources::{RecordStats, Rewritten};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counters for one research session
///
/// Failures are tracked per stage name so a degraded report can be traced
/// back to the stage that produced nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionMetrics {
    /// Stage invocations, including failed ones
    pub stages_run: usize,

    /// Failed stage invocations per stage name
    pub stage_failures: BTreeMap<String, usize>,

    /// Stage invocations that hit the time budget
    pub timeouts: usize,

    /// Sources added to the registry
    pub sources_added: usize,

    /// Supported claims attached to sources
    pub claims_added: usize,

    /// Citation markers resolved to links
    pub citations_resolved: usize,

    /// Citation markers stripped because their ID was unknown
    pub citations_dropped: usize,
}

impl SessionMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage invocation
    pub fn record_stage(&mut self) {
        self.stages_run += 1;
    }

    /// Record a failed stage invocation
    pub fn record_failure(&mut self, stage: &str, timed_out: bool) {
        *self.stage_failures.entry(stage.to_string()).or_insert(0) += 1;
        if timed_out {
            self.timeouts += 1;
        }
    }

    /// Record registry growth from one stage
    pub fn record_sources(&mut self, stats: RecordStats) {
        self.sources_added += stats.sources_added;
        self.claims_added += stats.claims_added;
    }

    /// Record the outcome of citation rewriting
    pub fn record_citations(&mut self, rewritten: &Rewritten) {
        self.citations_resolved += rewritten.resolved;
        self.citations_dropped += rewritten.dropped.len();
    }

    /// Total failed stage invocations
    pub fn total_failures(&self) -> usize {
        self.stage_failures.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Research Session Summary".to_string(),
            "========================".to_string(),
            format!("Stages run: {}", self.stages_run),
            format!("Stages failed: {}", self.total_failures()),
        ];

        for (stage, count) in &self.stage_failures {
            lines.push(format!("  {}: {}", stage, count));
        }
        if self.timeouts > 0 {
            lines.push(format!("  Timeouts: {}", self.timeouts));
        }

        lines.push(format!("Sources: {}", self.sources_added));
        lines.push(format!("Supported claims: {}", self.claims_added));
        lines.push(format!(
            "Citations: {} resolved, {} dropped",
            self.citations_resolved, self.citations_dropped
        ));

        lines.join("\n")
    }
}
