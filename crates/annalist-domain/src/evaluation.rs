//! Research evaluation results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict on whether research is sufficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    /// Research is sufficient, stop refining
    Pass,
    /// Research has gaps, run follow-up searches
    Fail,
}

impl Grade {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Pass => "pass",
            Grade::Fail => "fail",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A targeted web search query suggested by the evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The query text
    pub search_query: String,
}

impl SearchQuery {
    /// Create a query
    pub fn new(search_query: impl Into<String>) -> Self {
        Self {
            search_query: search_query.into(),
        }
    }
}

/// Output of one evaluation pass over the current findings
///
/// Only the latest result is ever consulted; a new one replaces the old
/// each refinement iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Pass or fail
    pub grade: Grade,

    /// Rationale for the grade
    pub comment: String,

    /// Follow-up queries; expected non-empty on fail and empty on pass
    #[serde(default, deserialize_with = "null_as_empty")]
    pub follow_up_queries: Vec<SearchQuery>,
}

impl EvaluationResult {
    /// A passing evaluation
    pub fn pass(comment: impl Into<String>) -> Self {
        Self {
            grade: Grade::Pass,
            comment: comment.into(),
            follow_up_queries: Vec::new(),
        }
    }

    /// A failing evaluation with follow-up queries
    pub fn fail<I, Q>(comment: impl Into<String>, queries: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<String>,
    {
        Self {
            grade: Grade::Fail,
            comment: comment.into(),
            follow_up_queries: queries.into_iter().map(SearchQuery::new).collect(),
        }
    }

    /// Whether the grade is pass
    pub fn is_pass(&self) -> bool {
        self.grade == Grade::Pass
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SearchQuery>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<SearchQuery>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Grade::Pass).unwrap(), "\"pass\"");
        let grade: Grade = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(grade, Grade::Fail);
    }

    #[test]
    fn test_null_follow_up_queries() {
        let json = r#"{"grade": "pass", "comment": "ok", "follow_up_queries": null}"#;
        let result: EvaluationResult = serde_json::from_str(json).unwrap();
        assert!(result.is_pass());
        assert!(result.follow_up_queries.is_empty());
    }

    #[test]
    fn test_missing_follow_up_queries() {
        let json = r#"{"grade": "fail", "comment": "thin"}"#;
        let result: EvaluationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.grade, Grade::Fail);
        assert!(result.follow_up_queries.is_empty());
    }

    #[test]
    fn test_fail_constructor() {
        let result = EvaluationResult::fail("gaps", ["q1", "q2"]);
        assert!(!result.is_pass());
        assert_eq!(result.follow_up_queries[1].search_query, "q2");
    }
}
