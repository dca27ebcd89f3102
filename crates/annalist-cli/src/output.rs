//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use annalist_refiner::{LoopPhase, LoopReport};
use annalist_research::ResearchOutcome;
use annalist_sources::SourceRegistry;
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of a research session.
    pub fn format_outcome(&self, outcome: &ResearchOutcome) -> Result<String> {
        match self.format {
            OutputFormat::Markdown => Ok(self.format_outcome_markdown(outcome)),
            OutputFormat::Json => self.format_outcome_json(outcome),
            OutputFormat::Quiet => Ok(outcome.final_report().to_string()),
        }
    }

    fn format_outcome_markdown(&self, outcome: &ResearchOutcome) -> String {
        let mut sections = Vec::new();

        if outcome.final_report().is_empty() {
            sections.push(self.warning("No report was produced."));
        } else {
            sections.push(outcome.final_report().to_string());
        }

        sections.push(self.colorize("Sources", "cyan"));
        sections.push(self.format_sources_table(outcome.sources()));
        sections.push(self.info(&loop_summary(&outcome.loop_report)));

        let failures = outcome.metrics.total_failures();
        if failures > 0 {
            sections.push(self.warning(&format!(
                "{} stage(s) failed; the report may be incomplete",
                failures
            )));
        }

        sections.join("\n\n")
    }

    fn format_outcome_json(&self, outcome: &ResearchOutcome) -> Result<String> {
        let sources: Vec<&annalist_domain::Source> = outcome.sources().sources().collect();
        let report = &outcome.loop_report;

        let json = serde_json::json!({
            "session_id": outcome.session_id().to_string(),
            "topic": outcome.state.topic(),
            "report": outcome.final_report(),
            "refinement": {
                "outcome": phase_label(report.state.phase),
                "iterations": report.state.iteration,
                "evaluations": report.evaluations,
                "follow_ups": report.follow_ups,
                "last_grade": report.last_grade,
            },
            "sources": sources,
            "metrics": outcome.metrics,
        });

        Ok(serde_json::to_string_pretty(&json)?)
    }

    /// Format registered sources as a table.
    pub fn format_sources_table(&self, registry: &SourceRegistry) -> String {
        if registry.is_empty() {
            return self.colorize("No sources recorded.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Title", "Claims", "Confidence", "URL"]);

        for source in registry.sources() {
            let confidence = source
                .mean_confidence()
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string());
            builder.push_record([
                source.short_id.to_string(),
                source.display_text(),
                source.supported_claims.len().to_string(),
                confidence,
                source.url.clone(),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().bold().to_string(),
            _ => text.to_string(),
        }
    }
}

fn phase_label(phase: LoopPhase) -> &'static str {
    match phase {
        LoopPhase::Escalated => "passed",
        LoopPhase::Exhausted => "exhausted",
        LoopPhase::Running => "running",
    }
}

fn loop_summary(report: &LoopReport) -> String {
    match report.state.phase {
        LoopPhase::Escalated => format!(
            "Research passed evaluation after {} follow-up round(s)",
            report.follow_ups
        ),
        _ => format!(
            "Refinement stopped at the iteration cap ({} round(s))",
            report.state.max_iterations
        ),
    }
}
