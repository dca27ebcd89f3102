//! Stage abstraction and the runner that applies stage outputs
//!
//! A stage reads the session state and returns a [`StageOutput`]. It never
//! writes to the state itself: the [`StageRunner`] stores the artifact under
//! the key the stage declares and routes grounding into the source registry
//! only for stages whose [`Capabilities`] allow it.

use crate::metrics::SessionMetrics;
use crate::session::{Artifact, SessionState, StateKey};
use crate::StageError;
use annalist_domain::GroundingEvent;
use annalist_sources::RecordStats;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// What a stage is allowed to change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Key the stage's artifact is stored under, if it produces one
    pub output: Option<StateKey>,

    /// Whether the stage's grounding is recorded in the source registry
    pub mutates_registry: bool,
}

impl Capabilities {
    /// Writes one key, leaves the registry alone
    pub fn writes(output: StateKey) -> Self {
        Self {
            output: Some(output),
            mutates_registry: false,
        }
    }

    /// Also record grounding in the registry
    pub fn recording_sources(mut self) -> Self {
        self.mutates_registry = true;
        self
    }
}

/// Result of one stage invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    /// Value for the stage's output key
    pub artifact: Option<Artifact>,

    /// Grounding metadata returned alongside the artifact
    pub grounding: Vec<GroundingEvent>,
}

impl StageOutput {
    /// Text output without grounding
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            artifact: Some(Artifact::Text(text.into())),
            grounding: Vec::new(),
        }
    }

    /// Attach grounding events
    pub fn with_grounding(mut self, grounding: Vec<GroundingEvent>) -> Self {
        self.grounding = grounding;
        self
    }
}

/// A single step of the research pipeline
#[allow(async_fn_in_trait)]
pub trait Stage {
    /// Stage name used in logs and metrics
    fn name(&self) -> &str;

    /// Declared output key and registry access
    fn capabilities(&self) -> Capabilities;

    /// Produce this stage's output from the current state
    async fn run(&self, state: &SessionState) -> Result<StageOutput, StageError>;
}

/// How a stage invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Output applied; carries registry growth
    Completed(RecordStats),
    /// Stage failed; state left untouched
    Failed,
}

impl StageStatus {
    /// Whether the stage completed
    pub fn is_completed(&self) -> bool {
        matches!(self, StageStatus::Completed(_))
    }
}

/// Runs stages under a time budget and applies their output
#[derive(Debug, Clone)]
pub struct StageRunner {
    stage_timeout: Duration,
}

impl StageRunner {
    /// Create a runner with a per-stage time budget
    pub fn new(stage_timeout: Duration) -> Self {
        Self { stage_timeout }
    }

    /// Run a stage and apply its output to the state
    ///
    /// Failures are logged and counted; they never propagate. A failed stage
    /// leaves every key as it was.
    pub async fn run<S: Stage>(
        &self,
        stage: &S,
        state: &mut SessionState,
        metrics: &mut SessionMetrics,
    ) -> StageStatus {
        let name = stage.name().to_string();
        metrics.record_stage();
        info!("Running stage '{}'", name);

        // A timed-out LLM call keeps running on the blocking pool until it
        // returns; its result is discarded and never reaches the state.
        let result = match timeout(self.stage_timeout, stage.run(state)).await {
            Ok(result) => result,
            Err(_) => Err(StageError::Timeout {
                stage: name.clone(),
                secs: self.stage_timeout.as_secs(),
            }),
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!("Stage '{}' failed: {}", name, e);
                metrics.record_failure(&name, matches!(e, StageError::Timeout { .. }));
                return StageStatus::Failed;
            }
        };

        match self.apply(stage.capabilities(), output, state) {
            Ok(stats) => {
                metrics.record_sources(stats);
                info!(
                    "Stage '{}' complete: {} sources added, {} claims added",
                    name, stats.sources_added, stats.claims_added
                );
                StageStatus::Completed(stats)
            }
            Err(e) => {
                warn!("Stage '{}' output rejected: {}", name, e);
                metrics.record_failure(&name, false);
                StageStatus::Failed
            }
        }
    }

    fn apply(
        &self,
        capabilities: Capabilities,
        output: StageOutput,
        state: &mut SessionState,
    ) -> Result<RecordStats, String> {
        match (capabilities.output, output.artifact) {
            (Some(key), Some(artifact)) => state.store(key, artifact)?,
            (None, Some(_)) => return Err("stage declares no output key".to_string()),
            (_, None) => {}
        }

        if capabilities.mutates_registry {
            Ok(state.record_grounding(&output.grounding))
        } else {
            if !output.grounding.is_empty() {
                debug!(
                    "Ignoring {} grounding events from a non-recording stage",
                    output.grounding.len()
                );
            }
            Ok(RecordStats::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annalist_domain::{GroundingChunk, GroundingSupport};

    struct FixedStage {
        capabilities: Capabilities,
        output: Result<StageOutput, String>,
        delay: Option<Duration>,
    }

    impl FixedStage {
        fn ok(capabilities: Capabilities, output: StageOutput) -> Self {
            Self {
                capabilities,
                output: Ok(output),
                delay: None,
            }
        }
    }

    impl Stage for FixedStage {
        fn name(&self) -> &str {
            "fixed"
        }

        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }

        async fn run(&self, _state: &SessionState) -> Result<StageOutput, StageError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.output.clone().map_err(StageError::Llm)
        }
    }

    fn grounding() -> Vec<GroundingEvent> {
        vec![GroundingEvent::new(
            vec![GroundingChunk::web("https://a.org", Some("A"), None)],
            vec![GroundingSupport::new("claim", vec![0], vec![0.8])],
        )]
    }

    fn runner() -> StageRunner {
        StageRunner::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_recording_stage_updates_registry() {
        let stage = FixedStage::ok(
            Capabilities::writes(StateKey::SectionResearchFindings).recording_sources(),
            StageOutput::text("findings").with_grounding(grounding()),
        );
        let mut state = SessionState::new("t");
        let mut metrics = SessionMetrics::new();

        let status = runner().run(&stage, &mut state, &mut metrics).await;

        assert_eq!(
            status,
            StageStatus::Completed(RecordStats {
                sources_added: 1,
                claims_added: 1
            })
        );
        assert_eq!(state.text(StateKey::SectionResearchFindings), Some("findings"));
        assert_eq!(state.registry().len(), 1);
        assert_eq!(metrics.sources_added, 1);
    }

    #[tokio::test]
    async fn test_non_recording_stage_leaves_registry() {
        let stage = FixedStage::ok(
            Capabilities::writes(StateKey::ResearchPlan),
            StageOutput::text("- Analyze").with_grounding(grounding()),
        );
        let mut state = SessionState::new("t");
        let mut metrics = SessionMetrics::new();

        let status = runner().run(&stage, &mut state, &mut metrics).await;

        assert!(status.is_completed());
        assert!(state.registry().is_empty());
        assert_eq!(state.text(StateKey::ResearchPlan), Some("- Analyze"));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_value() {
        let mut state = SessionState::new("t");
        state.set_text(StateKey::SectionResearchFindings, "old".to_string());
        let stage = FixedStage {
            capabilities: Capabilities::writes(StateKey::SectionResearchFindings)
                .recording_sources(),
            output: Err("boom".to_string()),
            delay: None,
        };
        let mut metrics = SessionMetrics::new();

        let status = runner().run(&stage, &mut state, &mut metrics).await;

        assert_eq!(status, StageStatus::Failed);
        assert_eq!(state.text(StateKey::SectionResearchFindings), Some("old"));
        assert_eq!(metrics.stage_failures["fixed"], 1);
        assert_eq!(metrics.timeouts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let stage = FixedStage {
            capabilities: Capabilities::writes(StateKey::ReportSections),
            output: Ok(StageOutput::text("late")),
            delay: Some(Duration::from_secs(60)),
        };
        let mut state = SessionState::new("t");
        let mut metrics = SessionMetrics::new();

        let status = runner().run(&stage, &mut state, &mut metrics).await;

        assert_eq!(status, StageStatus::Failed);
        assert!(state.text(StateKey::ReportSections).is_none());
        assert_eq!(metrics.timeouts, 1);
    }

    #[tokio::test]
    async fn test_mismatched_artifact_rejected() {
        let stage = FixedStage::ok(
            Capabilities::writes(StateKey::ResearchEvaluation),
            StageOutput::text("pass"),
        );
        let mut state = SessionState::new("t");
        let mut metrics = SessionMetrics::new();

        let status = runner().run(&stage, &mut state, &mut metrics).await;

        assert_eq!(status, StageStatus::Failed);
        assert!(state.evaluation().is_none());
    }
}
