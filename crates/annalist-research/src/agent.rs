//! LLM-backed pipeline stages

use crate::parser::parse_evaluation;
use crate::prompt::{PromptBuilder, EVALUATION_SCHEMA};
use crate::session::{Artifact, SessionState, StateKey};
use crate::stage::{Capabilities, Stage, StageOutput};
use crate::StageError;
use annalist_domain::traits::LlmProvider;
use annalist_domain::GroundedResponse;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which configured model serves a role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelGroup {
    /// Planning roles
    Planner,
    /// Search and synthesis roles
    Worker,
    /// Evaluation and composition roles
    Critic,
}

/// The LLM roles of the research pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Drafts a short research plan
    PlanGenerator,
    /// Turns the plan into a report outline
    SectionPlanner,
    /// Runs the initial searches
    SectionResearcher,
    /// Grades the findings
    ResearchEvaluator,
    /// Runs follow-up searches and merges findings
    EnhancedSearchExecutor,
    /// Writes the cited report draft
    ReportComposer,
}

impl Role {
    /// Every role, in pipeline order
    pub const ALL: [Role; 6] = [
        Role::PlanGenerator,
        Role::SectionPlanner,
        Role::SectionResearcher,
        Role::ResearchEvaluator,
        Role::EnhancedSearchExecutor,
        Role::ReportComposer,
    ];

    /// Role name, used as the stage name
    pub fn name(&self) -> &'static str {
        match self {
            Role::PlanGenerator => "plan_generator",
            Role::SectionPlanner => "section_planner",
            Role::SectionResearcher => "section_researcher",
            Role::ResearchEvaluator => "research_evaluator",
            Role::EnhancedSearchExecutor => "enhanced_search_executor",
            Role::ReportComposer => "report_composer",
        }
    }

    /// State key the role writes
    pub fn output_key(&self) -> StateKey {
        match self {
            Role::PlanGenerator => StateKey::ResearchPlan,
            Role::SectionPlanner => StateKey::ReportSections,
            Role::SectionResearcher | Role::EnhancedSearchExecutor => {
                StateKey::SectionResearchFindings
            }
            Role::ResearchEvaluator => StateKey::ResearchEvaluation,
            Role::ReportComposer => StateKey::FinalCitedReport,
        }
    }

    /// Whether the role calls the model with web-search grounding
    pub fn grounded(&self) -> bool {
        matches!(
            self,
            Role::PlanGenerator | Role::SectionResearcher | Role::EnhancedSearchExecutor
        )
    }

    /// Whether the role's grounding feeds the source registry
    ///
    /// The plan generator searches only to disambiguate the topic; its
    /// sources are not cited.
    pub fn records_sources(&self) -> bool {
        matches!(self, Role::SectionResearcher | Role::EnhancedSearchExecutor)
    }

    /// Model group serving the role
    pub fn model_group(&self) -> ModelGroup {
        match self {
            Role::PlanGenerator | Role::SectionPlanner => ModelGroup::Planner,
            Role::SectionResearcher | Role::EnhancedSearchExecutor => ModelGroup::Worker,
            Role::ResearchEvaluator | Role::ReportComposer => ModelGroup::Critic,
        }
    }

    /// Declared capabilities of the role's stage
    pub fn capabilities(&self) -> Capabilities {
        let capabilities = Capabilities::writes(self.output_key());
        if self.records_sources() {
            capabilities.recording_sources()
        } else {
            capabilities
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stage that prompts an LLM in a given role
///
/// The provider trait is synchronous, so calls run on the blocking pool.
pub struct AgentStage<L> {
    role: Role,
    llm: Arc<L>,
    model_name: String,
}

impl<L> AgentStage<L> {
    /// Create a stage for a role
    pub fn new(role: Role, llm: Arc<L>, model_name: impl Into<String>) -> Self {
        Self {
            role,
            llm,
            model_name: model_name.into(),
        }
    }

    /// Role served by this stage
    pub fn role(&self) -> Role {
        self.role
    }

    /// Model name, for logging
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl<L> Stage for AgentStage<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: fmt::Display,
{
    fn name(&self) -> &str {
        self.role.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.role.capabilities()
    }

    async fn run(&self, state: &SessionState) -> Result<StageOutput, StageError> {
        let prompt = PromptBuilder::new(self.role).build(state);
        debug!(
            role = self.role.name(),
            model = %self.model_name,
            "Prompt length: {} chars",
            prompt.len()
        );

        let response = self.call_llm(prompt).await?;
        debug!(
            role = self.role.name(),
            grounding_events = response.grounding.len(),
            "Response length: {} chars",
            response.text.len()
        );

        if response.text.trim().is_empty() {
            return Err(StageError::InvalidOutput("Empty response".to_string()));
        }

        let artifact = match self.role {
            Role::ResearchEvaluator => Artifact::Evaluation(parse_evaluation(&response.text)?),
            _ => Artifact::Text(response.text.trim().to_string()),
        };

        Ok(StageOutput {
            artifact: Some(artifact),
            grounding: response.grounding,
        })
    }
}

impl<L> AgentStage<L>
where
    L: LlmProvider + Send + Sync + 'static,
    L::Error: fmt::Display,
{
    async fn call_llm(&self, prompt: String) -> Result<GroundedResponse, StageError> {
        let llm = Arc::clone(&self.llm);
        let role = self.role;

        tokio::task::spawn_blocking(move || {
            let result = if role == Role::ResearchEvaluator {
                llm.generate_structured(&prompt, EVALUATION_SCHEMA)
                    .map(GroundedResponse::ungrounded)
            } else if role.grounded() {
                llm.generate_grounded(&prompt)
            } else {
                llm.generate(&prompt).map(GroundedResponse::ungrounded)
            };
            result.map_err(|e| StageError::Llm(e.to_string()))
        })
        .await
        .map_err(|e| StageError::Join(e.to_string()))?
    }
}
