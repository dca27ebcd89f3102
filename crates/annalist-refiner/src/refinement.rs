//! Bounded evaluate/follow-up loop

use crate::{EvaluationGate, GateDecision, LoopMetrics, RefinerConfig, RefinerError};
use annalist_domain::{EvaluationResult, Grade};
use tracing::{debug, info, info_span, Instrument};

/// The two external steps the loop alternates between
///
/// Implementations perform the actual model calls and any state mutation
/// (findings text, source registry). The loop awaits each step to completion
/// before starting the next, so steps never overlap.
#[allow(async_fn_in_trait)]
pub trait RefinementSteps {
    /// Run one evaluation pass and return the result, if one was produced
    async fn evaluate(&mut self) -> Option<EvaluationResult>;

    /// Run follow-up searches driven by the latest evaluation
    async fn follow_up(&mut self, evaluation: Option<&EvaluationResult>);
}

/// Phase of the loop state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    /// Still iterating
    Running,
    /// Stopped on a passing evaluation
    Escalated,
    /// Stopped at the iteration cap
    Exhausted,
}

/// Iteration state of one loop run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    /// Completed loop bodies (one per follow-up step)
    pub iteration: u32,

    /// Iteration cap
    pub max_iterations: u32,

    /// Current phase
    pub phase: LoopPhase,
}

impl LoopState {
    /// Initial state: running, no iterations done
    pub fn new(max_iterations: u32) -> Self {
        let mut state = Self {
            iteration: 0,
            max_iterations,
            phase: LoopPhase::Running,
        };
        state.check_exhausted();
        state
    }

    /// Whether the gate signalled termination
    pub fn escalated(&self) -> bool {
        self.phase == LoopPhase::Escalated
    }

    /// Whether the loop has halted
    pub fn is_terminal(&self) -> bool {
        self.phase != LoopPhase::Running
    }

    fn escalate(&mut self) {
        self.phase = LoopPhase::Escalated;
    }

    fn complete_iteration(&mut self) {
        self.iteration += 1;
        self.check_exhausted();
    }

    fn check_exhausted(&mut self) {
        if self.phase == LoopPhase::Running && self.iteration >= self.max_iterations {
            self.phase = LoopPhase::Exhausted;
        }
    }
}

/// Summary of a finished loop run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopReport {
    /// Terminal state
    pub state: LoopState,

    /// Evaluation steps executed
    pub evaluations: u32,

    /// Follow-up steps executed
    pub follow_ups: u32,

    /// Grade of the last evaluation, if it produced one
    pub last_grade: Option<Grade>,
}

impl LoopReport {
    /// Whether research passed evaluation before the cap
    pub fn passed(&self) -> bool {
        self.state.escalated()
    }
}

/// Drives evaluation and follow-up search until research passes or the
/// iteration budget runs out
///
/// Exhaustion is a soft cap: the loop simply stops and the caller proceeds
/// with whatever findings exist.
///
/// # Examples
///
/// ```
/// use annalist_domain::EvaluationResult;
/// use annalist_refiner::{LoopPhase, RefinementLoop, RefinementSteps};
///
/// struct AlwaysPass;
///
/// impl RefinementSteps for AlwaysPass {
///     async fn evaluate(&mut self) -> Option<EvaluationResult> {
///         Some(EvaluationResult::pass("fine"))
///     }
///     async fn follow_up(&mut self, _evaluation: Option<&EvaluationResult>) {}
/// }
///
/// # tokio_test_block_on(async {
/// let mut refinement = RefinementLoop::default_config();
/// let report = refinement.run(&mut AlwaysPass).await;
/// assert_eq!(report.state.phase, LoopPhase::Escalated);
/// assert_eq!(report.follow_ups, 0);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RefinementLoop {
    config: RefinerConfig,
    gate: EvaluationGate,
    metrics: LoopMetrics,
}

impl RefinementLoop {
    /// Create a loop with the given configuration
    pub fn new(config: RefinerConfig) -> Result<Self, RefinerError> {
        config.validate()?;
        Ok(Self {
            config,
            gate: EvaluationGate::new(),
            metrics: LoopMetrics::new(),
        })
    }

    /// Create a loop with the reference configuration
    pub fn default_config() -> Self {
        Self {
            config: RefinerConfig::default(),
            gate: EvaluationGate::new(),
            metrics: LoopMetrics::new(),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Run the loop to a terminal state
    pub async fn run<S: RefinementSteps>(&mut self, steps: &mut S) -> LoopReport {
        let span = info_span!("refinement", max_iterations = self.config.max_iterations);
        self.run_inner(steps).instrument(span).await
    }

    async fn run_inner<S: RefinementSteps>(&mut self, steps: &mut S) -> LoopReport {
        let mut state = LoopState::new(self.config.max_iterations);
        let mut evaluations = 0;
        let mut follow_ups = 0;
        let mut last_grade = None;

        info!("Starting refinement loop");

        while !state.is_terminal() {
            debug!(iteration = state.iteration + 1, "Evaluating research");
            let evaluation = steps.evaluate().await;
            evaluations += 1;
            last_grade = evaluation.as_ref().map(|e| e.grade);
            self.metrics.record_evaluation(last_grade);

            match self.gate.decide(evaluation.as_ref()) {
                GateDecision::Stop => state.escalate(),
                GateDecision::Continue => {
                    debug!(
                        queries = evaluation.as_ref().map_or(0, |e| e.follow_up_queries.len()),
                        "Running follow-up searches"
                    );
                    steps.follow_up(evaluation.as_ref()).await;
                    follow_ups += 1;
                    self.metrics.record_follow_up();
                    state.complete_iteration();
                }
            }
        }

        let report = LoopReport {
            state,
            evaluations,
            follow_ups,
            last_grade,
        };
        self.metrics.record_run(&report);

        info!(
            phase = ?report.state.phase,
            evaluations = report.evaluations,
            follow_ups = report.follow_ups,
            "Refinement loop finished"
        );

        report
    }

    /// Get a reference to the accumulated metrics
    pub fn metrics(&self) -> &LoopMetrics {
        &self.metrics
    }

    /// Reset the metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted steps that log the order of calls
    struct ScriptedSteps {
        evaluations: VecDeque<Option<EvaluationResult>>,
        log: Vec<String>,
        follow_up_inputs: Vec<Option<Grade>>,
    }

    impl ScriptedSteps {
        fn new(evaluations: Vec<Option<EvaluationResult>>) -> Self {
            Self {
                evaluations: evaluations.into(),
                log: Vec::new(),
                follow_up_inputs: Vec::new(),
            }
        }

        fn count(&self, entry: &str) -> usize {
            self.log.iter().filter(|e| e.as_str() == entry).count()
        }
    }

    impl RefinementSteps for ScriptedSteps {
        async fn evaluate(&mut self) -> Option<EvaluationResult> {
            self.log.push("evaluate".to_string());
            self.evaluations.pop_front().flatten()
        }

        async fn follow_up(&mut self, evaluation: Option<&EvaluationResult>) {
            self.log.push("follow_up".to_string());
            self.follow_up_inputs.push(evaluation.map(|e| e.grade));
        }
    }

    fn fail() -> Option<EvaluationResult> {
        Some(EvaluationResult::fail("gaps", ["query"]))
    }

    fn pass() -> Option<EvaluationResult> {
        Some(EvaluationResult::pass("good"))
    }

    #[tokio::test]
    async fn test_fail_then_pass_escalates() {
        let mut refinement = RefinementLoop::default_config();
        let mut steps = ScriptedSteps::new(vec![fail(), pass()]);

        let report = refinement.run(&mut steps).await;

        assert_eq!(steps.log, vec!["evaluate", "follow_up", "evaluate"]);
        assert_eq!(report.evaluations, 2);
        assert_eq!(report.follow_ups, 1);
        assert_eq!(report.state.phase, LoopPhase::Escalated);
        assert!(report.passed());
        assert_eq!(report.last_grade, Some(Grade::Pass));
    }

    #[tokio::test]
    async fn test_all_fail_exhausts() {
        let mut refinement = RefinementLoop::default_config();
        let mut steps = ScriptedSteps::new(vec![fail(), fail(), fail()]);

        let report = refinement.run(&mut steps).await;

        assert_eq!(steps.count("evaluate"), 2);
        assert_eq!(steps.count("follow_up"), 2);
        assert_eq!(report.state.phase, LoopPhase::Exhausted);
        assert_eq!(report.state.iteration, 2);
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_immediate_pass_skips_follow_up() {
        let mut refinement = RefinementLoop::default_config();
        let mut steps = ScriptedSteps::new(vec![pass()]);

        let report = refinement.run(&mut steps).await;

        assert_eq!(steps.log, vec!["evaluate"]);
        assert_eq!(report.state.iteration, 0);
        assert!(report.passed());
    }

    #[tokio::test]
    async fn test_missing_evaluation_continues() {
        let mut refinement = RefinementLoop::default_config();
        let mut steps = ScriptedSteps::new(vec![None, pass()]);

        let report = refinement.run(&mut steps).await;

        assert_eq!(steps.follow_up_inputs, vec![None]);
        assert_eq!(report.evaluations, 2);
        assert!(report.passed());
        assert_eq!(refinement.metrics().missing_evaluations, 1);
    }

    #[tokio::test]
    async fn test_zero_iterations_runs_nothing() {
        let mut refinement = RefinementLoop::new(RefinerConfig { max_iterations: 0 }).unwrap();
        let mut steps = ScriptedSteps::new(vec![pass()]);

        let report = refinement.run(&mut steps).await;

        assert!(steps.log.is_empty());
        assert_eq!(report.state.phase, LoopPhase::Exhausted);
        assert_eq!(report.evaluations, 0);
        assert_eq!(report.last_grade, None);
    }

    #[tokio::test]
    async fn test_custom_iteration_cap() {
        let mut refinement = RefinementLoop::new(RefinerConfig::thorough()).unwrap();
        let mut steps = ScriptedSteps::new(vec![fail(); 10]);

        let report = refinement.run(&mut steps).await;

        assert_eq!(report.evaluations, 4);
        assert_eq!(report.follow_ups, 4);
    }

    #[tokio::test]
    async fn test_metrics_accumulate_across_runs() {
        let mut refinement = RefinementLoop::default_config();

        refinement.run(&mut ScriptedSteps::new(vec![pass()])).await;
        refinement.run(&mut ScriptedSteps::new(vec![fail(), fail()])).await;

        let metrics = refinement.metrics();
        assert_eq!(metrics.runs, 2);
        assert_eq!(metrics.escalated, 1);
        assert_eq!(metrics.exhausted, 1);
        assert_eq!(metrics.evaluation_steps, 3);
        assert_eq!(metrics.follow_up_steps, 2);

        refinement.reset_metrics();
        assert_eq!(refinement.metrics().runs, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RefinerConfig { max_iterations: 99 };
        assert!(RefinementLoop::new(config).is_err());
    }

    #[test]
    fn test_loop_state_transitions() {
        let mut state = LoopState::new(2);
        assert_eq!(state.phase, LoopPhase::Running);

        state.complete_iteration();
        assert_eq!(state.phase, LoopPhase::Running);

        state.escalate();
        assert!(state.escalated());
        assert!(state.is_terminal());

        let state = LoopState::new(0);
        assert_eq!(state.phase, LoopPhase::Exhausted);
    }
}
