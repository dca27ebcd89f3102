//! Explicit session state shared between pipeline stages
//!
//! Stages communicate only through this object. Each slot corresponds to a
//! documented key (see [`StateKey`]); snapshots use the same names.

use crate::PipelineError;
use annalist_domain::{EvaluationResult, SessionId};
use annalist_sources::{RecordStats, SourceRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Keys of the session state schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// Bullet-point research plan
    ResearchPlan,
    /// Markdown outline of the report
    ReportSections,
    /// Current synthesised findings, replaced by each research round
    SectionResearchFindings,
    /// Latest evaluation result
    ResearchEvaluation,
    /// URL to short ID map of the source registry
    UrlToShortId,
    /// Short ID to source map of the source registry
    Sources,
    /// Report draft with `<cite/>` markers
    FinalCitedReport,
    /// Final report with resolved links
    FinalReportWithCitations,
}

impl StateKey {
    /// Every key, in pipeline order
    pub const ALL: [StateKey; 8] = [
        StateKey::ResearchPlan,
        StateKey::ReportSections,
        StateKey::SectionResearchFindings,
        StateKey::ResearchEvaluation,
        StateKey::UrlToShortId,
        StateKey::Sources,
        StateKey::FinalCitedReport,
        StateKey::FinalReportWithCitations,
    ];

    /// Key name used in snapshots and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKey::ResearchPlan => "research_plan",
            StateKey::ReportSections => "report_sections",
            StateKey::SectionResearchFindings => "section_research_findings",
            StateKey::ResearchEvaluation => "research_evaluation",
            StateKey::UrlToShortId => "url_to_short_id",
            StateKey::Sources => "sources",
            StateKey::FinalCitedReport => "final_cited_report",
            StateKey::FinalReportWithCitations => "final_report_with_citations",
        }
    }

    /// Whether the slot holds plain text
    pub fn is_text(&self) -> bool {
        !matches!(
            self,
            StateKey::ResearchEvaluation | StateKey::UrlToShortId | StateKey::Sources
        )
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value a stage produces for its output key
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// Text output
    Text(String),
    /// Structured evaluation
    Evaluation(EvaluationResult),
}

impl Artifact {
    fn kind(&self) -> &'static str {
        match self {
            Artifact::Text(_) => "text",
            Artifact::Evaluation(_) => "evaluation",
        }
    }
}

/// State of one research session
///
/// Owns the session's [`SourceRegistry`]. Stages see the state read-only;
/// writes, including every registry update, go through the stage runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    session_id: SessionId,
    topic: String,
    #[serde(default)]
    research_plan: Option<String>,
    #[serde(default)]
    report_sections: Option<String>,
    #[serde(default)]
    section_research_findings: Option<String>,
    #[serde(default)]
    research_evaluation: Option<EvaluationResult>,
    #[serde(flatten)]
    registry: SourceRegistry,
    #[serde(default)]
    final_cited_report: Option<String>,
    #[serde(default)]
    final_report_with_citations: Option<String>,
}

impl SessionState {
    /// Start a fresh session for a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            session_id: SessionId::new(),
            topic: topic.into(),
            research_plan: None,
            report_sections: None,
            section_research_findings: None,
            research_evaluation: None,
            registry: SourceRegistry::new(),
            final_cited_report: None,
            final_report_with_citations: None,
        }
    }

    /// Supply an already approved research plan; plan generation is skipped
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        let plan = plan.into();
        self.research_plan = Some(plan).filter(|p| !p.trim().is_empty());
        self
    }

    /// Session identifier
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Research topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Text stored under a key, if any
    pub fn text(&self, key: StateKey) -> Option<&str> {
        let slot = match key {
            StateKey::ResearchPlan => &self.research_plan,
            StateKey::ReportSections => &self.report_sections,
            StateKey::SectionResearchFindings => &self.section_research_findings,
            StateKey::FinalCitedReport => &self.final_cited_report,
            StateKey::FinalReportWithCitations => &self.final_report_with_citations,
            StateKey::ResearchEvaluation | StateKey::UrlToShortId | StateKey::Sources => {
                return None
            }
        };
        slot.as_deref()
    }

    /// Text under a key, or empty when absent
    pub fn text_or_empty(&self, key: StateKey) -> &str {
        self.text(key).unwrap_or("")
    }

    /// Latest evaluation result
    pub fn evaluation(&self) -> Option<&EvaluationResult> {
        self.research_evaluation.as_ref()
    }

    /// The session's source registry
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Final report, empty until the pipeline finishes
    pub fn final_report(&self) -> &str {
        self.text_or_empty(StateKey::FinalReportWithCitations)
    }

    /// Serialize the state as a JSON object keyed by the schema names
    pub fn snapshot_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a state from a snapshot, checking registry consistency
    pub fn from_snapshot_json(json: &str) -> Result<Self, PipelineError> {
        let state: Self = serde_json::from_str(json)?;
        state
            .registry
            .check_consistency()
            .map_err(PipelineError::InconsistentSnapshot)?;
        Ok(state)
    }

    /// Store an artifact under a key
    ///
    /// Fails if the artifact kind does not match the slot.
    pub(crate) fn store(&mut self, key: StateKey, artifact: Artifact) -> Result<(), String> {
        match (key, artifact) {
            (StateKey::ResearchEvaluation, Artifact::Evaluation(evaluation)) => {
                self.research_evaluation = Some(evaluation);
                Ok(())
            }
            (key, Artifact::Text(text)) if key.is_text() => {
                self.set_text(key, text);
                Ok(())
            }
            (key, artifact) => Err(format!(
                "cannot store {} artifact under '{}'",
                artifact.kind(),
                key
            )),
        }
    }

    pub(crate) fn set_text(&mut self, key: StateKey, text: String) {
        let slot = match key {
            StateKey::ResearchPlan => &mut self.research_plan,
            StateKey::ReportSections => &mut self.report_sections,
            StateKey::SectionResearchFindings => &mut self.section_research_findings,
            StateKey::FinalCitedReport => &mut self.final_cited_report,
            StateKey::FinalReportWithCitations => &mut self.final_report_with_citations,
            StateKey::ResearchEvaluation | StateKey::UrlToShortId | StateKey::Sources => return,
        };
        *slot = Some(text);
    }

    pub(crate) fn clear_evaluation(&mut self) {
        self.research_evaluation = None;
    }

    pub(crate) fn record_grounding(&mut self, events: &[annalist_domain::GroundingEvent]) -> RecordStats {
        self.registry.record(events)
    }
}
