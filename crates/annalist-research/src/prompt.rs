//! Prompt construction for the research stages
//!
//! Every prompt opens with a `ROLE: <name>` line so transcripts (and test
//! doubles) can tell the stages apart.

use crate::agent::Role;
use crate::session::{SessionState, StateKey};
use std::fmt::Write;

/// JSON shape the evaluator must produce
pub const EVALUATION_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "grade": { "type": "string", "enum": ["pass", "fail"] },
    "comment": { "type": "string" },
    "follow_up_queries": {
      "type": ["array", "null"],
      "items": {
        "type": "object",
        "properties": { "search_query": { "type": "string" } },
        "required": ["search_query"]
      }
    }
  },
  "required": ["grade", "comment"]
}"#;

const PLAN_INSTRUCTIONS: &str = r#"You are a research strategist creating concise, action-oriented research plans.
- Output 4-5 bullet points.
- Start each bullet with a verb such as "Analyze", "Investigate" or "Compare".
- Do not summarise or answer the topic.
- Search only to disambiguate the topic."#;

const SECTION_INSTRUCTIONS: &str = r#"Create a markdown report outline from the research plan below.
Include 4-6 sections. Do not include references or citations."#;

const RESEARCH_INSTRUCTIONS: &str = r#"For each section in the outline, generate 4-5 search queries.
Run the searches and synthesise a detailed summary per section."#;

const EVALUATION_INSTRUCTIONS: &str = r#"Critically assess the research findings for completeness, clarity and quality.
- Set "grade" to "pass" if the findings are sufficient for a full report, otherwise "fail".
- Explain the grade in "comment".
- On "fail", list 5-7 targeted follow-up queries in "follow_up_queries".
- On "pass", set "follow_up_queries" to null.
Respond with JSON only, matching this schema:"#;

const FOLLOW_UP_INSTRUCTIONS: &str = r#"Use the evaluator's feedback to run the follow-up searches below.
Combine the new results with the previous findings into one updated body of research.
Return the complete updated findings, not only the additions."#;

const COMPOSER_INSTRUCTIONS: &str = r#"Convert the outline and research findings into a professional report in markdown.
Cite sources inline with tags of the form <cite source="src-N" />, using only the source IDs listed below.
Do not add a separate references section."#;

/// Builds the prompt for one stage from the current session state
pub struct PromptBuilder {
    role: Role,
}

impl PromptBuilder {
    /// Create a builder for a role
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    /// Build the complete prompt
    pub fn build(&self, state: &SessionState) -> String {
        let mut prompt = format!("ROLE: {}\n\n", self.role.name());

        match self.role {
            Role::PlanGenerator => {
                prompt.push_str(PLAN_INSTRUCTIONS);
                push_section(&mut prompt, "Topic", state.topic());
            }
            Role::SectionPlanner => {
                prompt.push_str(SECTION_INSTRUCTIONS);
                push_section(&mut prompt, "Topic", state.topic());
                push_section(&mut prompt, "Research plan", plan_or_topic(state));
            }
            Role::SectionResearcher => {
                prompt.push_str(RESEARCH_INSTRUCTIONS);
                push_section(&mut prompt, "Topic", state.topic());
                push_section(&mut prompt, "Research plan", plan_or_topic(state));
                push_section(
                    &mut prompt,
                    "Report outline",
                    state.text_or_empty(StateKey::ReportSections),
                );
            }
            Role::ResearchEvaluator => {
                prompt.push_str(EVALUATION_INSTRUCTIONS);
                prompt.push('\n');
                prompt.push_str(EVALUATION_SCHEMA);
                push_section(&mut prompt, "Topic", state.topic());
                push_section(
                    &mut prompt,
                    "Research findings",
                    state.text_or_empty(StateKey::SectionResearchFindings),
                );
            }
            Role::EnhancedSearchExecutor => {
                prompt.push_str(FOLLOW_UP_INSTRUCTIONS);
                push_section(&mut prompt, "Topic", state.topic());
                if let Some(evaluation) = state.evaluation() {
                    push_section(&mut prompt, "Evaluator feedback", &evaluation.comment);
                    let queries: String = evaluation
                        .follow_up_queries
                        .iter()
                        .map(|q| format!("- {}\n", q.search_query))
                        .collect();
                    push_section(&mut prompt, "Follow-up queries", queries.trim_end());
                }
                push_section(
                    &mut prompt,
                    "Previous findings",
                    state.text_or_empty(StateKey::SectionResearchFindings),
                );
            }
            Role::ReportComposer => {
                prompt.push_str(COMPOSER_INSTRUCTIONS);
                push_section(&mut prompt, "Topic", state.topic());
                push_section(
                    &mut prompt,
                    "Report outline",
                    state.text_or_empty(StateKey::ReportSections),
                );
                push_section(
                    &mut prompt,
                    "Research findings",
                    state.text_or_empty(StateKey::SectionResearchFindings),
                );
                push_section(&mut prompt, "Available sources", &source_listing(state));
            }
        }

        prompt
    }
}

fn plan_or_topic(state: &SessionState) -> &str {
    state
        .text(StateKey::ResearchPlan)
        .unwrap_or_else(|| state.topic())
}

fn push_section(prompt: &mut String, heading: &str, body: &str) {
    let body = if body.trim().is_empty() { "(none)" } else { body };
    // Writing to a String cannot fail
    let _ = write!(prompt, "\n\n{}:\n---\n{}\n---", heading, body);
}

/// One line per registered source: `src-N: title (url)`
fn source_listing(state: &SessionState) -> String {
    state
        .registry()
        .sources()
        .map(|source| format!("{}: {} ({})", source.short_id, source.display_text(), source.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Artifact;
    use annalist_domain::{EvaluationResult, GroundingChunk, GroundingEvent};

    #[test]
    fn test_every_prompt_starts_with_role() {
        let state = SessionState::new("ocean acidification");
        for role in Role::ALL {
            let prompt = PromptBuilder::new(role).build(&state);
            assert!(prompt.starts_with(&format!("ROLE: {}\n", role.name())));
            assert!(prompt.contains("ocean acidification"));
        }
    }

    #[test]
    fn test_planner_falls_back_to_topic() {
        let state = SessionState::new("solar sails");
        let prompt = PromptBuilder::new(Role::SectionPlanner).build(&state);
        assert!(prompt.contains("Research plan:\n---\nsolar sails\n---"));

        let state = SessionState::new("solar sails").with_plan("- Investigate thrust");
        let prompt = PromptBuilder::new(Role::SectionPlanner).build(&state);
        assert!(prompt.contains("- Investigate thrust"));
    }

    #[test]
    fn test_evaluator_prompt_includes_schema_and_findings() {
        let mut state = SessionState::new("t");
        state.set_text(StateKey::SectionResearchFindings, "Finding A".to_string());

        let prompt = PromptBuilder::new(Role::ResearchEvaluator).build(&state);
        assert!(prompt.contains("\"follow_up_queries\""));
        assert!(prompt.contains("Finding A"));
    }

    #[test]
    fn test_follow_up_prompt_includes_feedback() {
        let mut state = SessionState::new("t");
        state.set_text(StateKey::SectionResearchFindings, "Old findings".to_string());
        state
            .store(
                StateKey::ResearchEvaluation,
                Artifact::Evaluation(EvaluationResult::fail("Too shallow", ["cost per watt"])),
            )
            .unwrap();

        let prompt = PromptBuilder::new(Role::EnhancedSearchExecutor).build(&state);
        assert!(prompt.contains("Too shallow"));
        assert!(prompt.contains("- cost per watt"));
        assert!(prompt.contains("Old findings"));
    }

    #[test]
    fn test_composer_lists_sources() {
        let mut state = SessionState::new("t");
        state.record_grounding(&[GroundingEvent::new(
            vec![
                GroundingChunk::web("https://a.org/1", Some("Alpha"), None),
                GroundingChunk::web("https://b.org/2", None, Some("b.org")),
            ],
            vec![],
        )]);

        let prompt = PromptBuilder::new(Role::ReportComposer).build(&state);
        assert!(prompt.contains("src-1: Alpha (https://a.org/1)"));
        assert!(prompt.contains("src-2: b.org (https://b.org/2)"));
        assert!(prompt.contains("<cite source=\"src-N\" />"));
    }

    #[test]
    fn test_empty_inputs_marked() {
        let state = SessionState::new("t");
        let prompt = PromptBuilder::new(Role::ReportComposer).build(&state);
        assert!(prompt.contains("Available sources:\n---\n(none)\n---"));
    }
}
