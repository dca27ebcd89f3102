//! Parse evaluator output into an evaluation result

use crate::StageError;
use annalist_domain::{EvaluationResult, Grade, SearchQuery};
use serde_json::Value;
use tracing::warn;

/// Parse the evaluator's JSON response
///
/// Tolerates markdown code fences and surrounding prose. `follow_up_queries`
/// may be null, a list of strings or a list of `{search_query}` objects.
/// Queries attached to a passing grade are dropped.
pub fn parse_evaluation(response: &str) -> Result<EvaluationResult, StageError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(json_str)?;
    let obj = json
        .as_object()
        .ok_or_else(|| StageError::InvalidOutput("Expected JSON object".to_string()))?;

    let grade = match obj.get("grade").and_then(Value::as_str).map(str::trim) {
        Some(g) if g.eq_ignore_ascii_case("pass") => Grade::Pass,
        Some(g) if g.eq_ignore_ascii_case("fail") => Grade::Fail,
        Some(g) => {
            return Err(StageError::InvalidOutput(format!("Unknown grade '{}'", g)));
        }
        None => {
            return Err(StageError::InvalidOutput(
                "Missing or invalid 'grade'".to_string(),
            ));
        }
    };

    let comment = obj
        .get("comment")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let mut follow_up_queries = parse_queries(obj.get("follow_up_queries"));

    match grade {
        Grade::Pass if !follow_up_queries.is_empty() => {
            warn!(
                "Dropping {} follow-up queries attached to a passing grade",
                follow_up_queries.len()
            );
            follow_up_queries.clear();
        }
        Grade::Fail if follow_up_queries.is_empty() => {
            warn!("Failing evaluation carries no follow-up queries");
        }
        _ => {}
    }

    Ok(EvaluationResult {
        grade,
        comment,
        follow_up_queries,
    })
}

/// Locate the JSON object in a response
fn extract_json(response: &str) -> Result<&str, StageError> {
    let trimmed = response.trim();

    // LLMs sometimes wrap JSON in markdown code blocks or add prose
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(StageError::InvalidOutput(
            "No JSON object in evaluator response".to_string(),
        )),
    }
}

fn parse_queries(value: Option<&Value>) -> Vec<SearchQuery> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(query) => Some(query.as_str()),
            Value::Object(obj) => obj.get("search_query").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|query| !query.is_empty())
        .map(SearchQuery::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fail_with_objects() {
        let response = r#"{
            "grade": "fail",
            "comment": "Missing cost data",
            "follow_up_queries": [
                {"search_query": "tidal turbine cost 2024"},
                {"search_query": "tidal energy capacity factor"}
            ]
        }"#;

        let evaluation = parse_evaluation(response).unwrap();
        assert_eq!(evaluation.grade, Grade::Fail);
        assert_eq!(evaluation.comment, "Missing cost data");
        assert_eq!(evaluation.follow_up_queries.len(), 2);
        assert_eq!(
            evaluation.follow_up_queries[0].search_query,
            "tidal turbine cost 2024"
        );
    }

    #[test]
    fn test_parse_pass_with_null_queries() {
        let response = r#"{"grade": "pass", "comment": "Thorough", "follow_up_queries": null}"#;
        let evaluation = parse_evaluation(response).unwrap();
        assert!(evaluation.is_pass());
        assert!(evaluation.follow_up_queries.is_empty());
    }

    #[test]
    fn test_parse_code_fence() {
        let response = "```json\n{\"grade\": \"FAIL\", \"comment\": \"thin\", \"follow_up_queries\": [\"a\", \"  \", \"b\"]}\n```";
        let evaluation = parse_evaluation(response).unwrap();
        assert_eq!(evaluation.grade, Grade::Fail);
        let queries: Vec<&str> = evaluation
            .follow_up_queries
            .iter()
            .map(|q| q.search_query.as_str())
            .collect();
        assert_eq!(queries, vec!["a", "b"]);
    }

    #[test]
    fn test_pass_drops_queries() {
        let response = r#"{"grade": "pass", "comment": "ok", "follow_up_queries": ["extra"]}"#;
        let evaluation = parse_evaluation(response).unwrap();
        assert!(evaluation.follow_up_queries.is_empty());
    }

    #[test]
    fn test_missing_comment_is_empty() {
        let evaluation = parse_evaluation(r#"{"grade": "pass"}"#).unwrap();
        assert_eq!(evaluation.comment, "");
    }

    #[test]
    fn test_invalid_responses() {
        assert!(parse_evaluation("looks good to me").is_err());
        assert!(parse_evaluation(r#"{"comment": "no grade"}"#).is_err());
        assert!(parse_evaluation(r#"{"grade": "maybe"}"#).is_err());
        assert!(parse_evaluation(r#"{"grade": "pass""#).is_err());
    }
}
