//! The research pipeline: plan, research, refine, compose, cite

use crate::agent::{AgentStage, ModelGroup, Role};
use crate::config::ResearchConfig;
use crate::metrics::SessionMetrics;
use crate::session::{SessionState, StateKey};
use crate::stage::StageRunner;
use crate::PipelineError;
use annalist_domain::traits::LlmProvider;
use annalist_domain::{EvaluationResult, SessionId};
use annalist_refiner::{LoopMetrics, LoopReport, RefinementLoop, RefinementSteps};
use annalist_sources::{CitationRewriter, SourceRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Result of one research session
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    /// Final session state, including the source registry
    pub state: SessionState,

    /// How the refinement loop ended
    pub loop_report: LoopReport,

    /// Session counters
    pub metrics: SessionMetrics,
}

impl ResearchOutcome {
    /// Session identifier
    pub fn session_id(&self) -> SessionId {
        self.state.session_id()
    }

    /// Final report with resolved citations (empty if composition failed)
    pub fn final_report(&self) -> &str {
        self.state.final_report()
    }

    /// Sources discovered during the session
    pub fn sources(&self) -> &SourceRegistry {
        self.state.registry()
    }
}

/// Runs a research session end to end
///
/// Stages run strictly in sequence:
///
/// 1. `plan_generator` (skipped when the state already carries a plan)
/// 2. `section_planner`
/// 3. `section_researcher`
/// 4. refinement loop of `research_evaluator` and `enhanced_search_executor`
/// 5. `report_composer`
/// 6. citation rewriting into `final_report_with_citations`
///
/// A failing stage is logged and skipped; later stages work with whatever
/// the state holds. Running a session therefore never fails.
pub struct ResearchPipeline<L> {
    planner: Arc<L>,
    worker: Arc<L>,
    critic: Arc<L>,
    config: ResearchConfig,
    runner: StageRunner,
    refinement: RefinementLoop,
    rewriter: CitationRewriter,
}

impl<L> ResearchPipeline<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: fmt::Display,
{
    /// Create a pipeline that uses one provider for every role
    pub fn new(llm: L, config: ResearchConfig) -> Result<Self, PipelineError> {
        let llm = Arc::new(llm);
        Self::build(Arc::clone(&llm), Arc::clone(&llm), llm, config)
    }

    /// Create a pipeline with a provider per model group
    pub fn with_models(
        planner: L,
        worker: L,
        critic: L,
        config: ResearchConfig,
    ) -> Result<Self, PipelineError> {
        Self::build(Arc::new(planner), Arc::new(worker), Arc::new(critic), config)
    }

    fn build(
        planner: Arc<L>,
        worker: Arc<L>,
        critic: Arc<L>,
        config: ResearchConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            planner,
            worker,
            critic,
            runner: StageRunner::new(config.stage_timeout()),
            refinement: RefinementLoop::new(config.refinement.clone())?,
            rewriter: CitationRewriter::new(),
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Refinement metrics accumulated across sessions
    pub fn refinement_metrics(&self) -> &LoopMetrics {
        self.refinement.metrics()
    }

    /// Research a topic from scratch
    pub async fn run(&mut self, topic: impl Into<String>) -> ResearchOutcome {
        self.run_with_state(SessionState::new(topic)).await
    }

    /// Research starting from a prepared state, such as one carrying an
    /// approved plan
    pub async fn run_with_state(&mut self, state: SessionState) -> ResearchOutcome {
        let span = info_span!(
            "research",
            session_id = %state.session_id(),
            topic = %state.topic()
        );
        self.run_inner(state).instrument(span).await
    }

    async fn run_inner(&mut self, mut state: SessionState) -> ResearchOutcome {
        let mut metrics = SessionMetrics::new();
        info!("Starting research session");

        if state.text(StateKey::ResearchPlan).is_some() {
            info!("Using supplied research plan, skipping plan generation");
        } else {
            let stage = self.stage(Role::PlanGenerator);
            self.runner.run(&stage, &mut state, &mut metrics).await;
        }

        for role in [Role::SectionPlanner, Role::SectionResearcher] {
            let stage = self.stage(role);
            self.runner.run(&stage, &mut state, &mut metrics).await;
        }

        let mut driver = RefinementDriver {
            evaluator: self.stage(Role::ResearchEvaluator),
            executor: self.stage(Role::EnhancedSearchExecutor),
            runner: &self.runner,
            state: &mut state,
            metrics: &mut metrics,
        };
        let loop_report = self.refinement.run(&mut driver).await;

        let composer = self.stage(Role::ReportComposer);
        self.runner.run(&composer, &mut state, &mut metrics).await;

        let draft = state.text_or_empty(StateKey::FinalCitedReport);
        if draft.is_empty() {
            warn!("No report draft; final report will be empty");
        }
        let rewritten = self.rewriter.rewrite_with_stats(draft, state.registry());
        metrics.record_citations(&rewritten);
        state.set_text(StateKey::FinalReportWithCitations, rewritten.text);

        info!(
            sources = state.registry().len(),
            citations = rewritten.resolved,
            dropped = rewritten.dropped.len(),
            failed_stages = metrics.total_failures(),
            "Research session complete"
        );

        ResearchOutcome {
            state,
            loop_report,
            metrics,
        }
    }

    fn stage(&self, role: Role) -> AgentStage<L> {
        let (llm, model) = match role.model_group() {
            ModelGroup::Planner => (&self.planner, &self.config.planner_model),
            ModelGroup::Worker => (&self.worker, &self.config.worker_model),
            ModelGroup::Critic => (&self.critic, &self.config.critic_model),
        };
        AgentStage::new(role, Arc::clone(llm), model.as_str())
    }
}

/// Evaluation and follow-up steps bound to one session
struct RefinementDriver<'a, L> {
    evaluator: AgentStage<L>,
    executor: AgentStage<L>,
    runner: &'a StageRunner,
    state: &'a mut SessionState,
    metrics: &'a mut SessionMetrics,
}

impl<L> RefinementSteps for RefinementDriver<'_, L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: fmt::Display,
{
    async fn evaluate(&mut self) -> Option<EvaluationResult> {
        // A failed evaluation must not leave the previous round's grade behind
        self.state.clear_evaluation();
        self.runner
            .run(&self.evaluator, self.state, self.metrics)
            .await;
        self.state.evaluation().cloned()
    }

    async fn follow_up(&mut self, _evaluation: Option<&EvaluationResult>) {
        // The executor reads the evaluation from the session state
        self.runner
            .run(&self.executor, self.state, self.metrics)
            .await;
    }
}
