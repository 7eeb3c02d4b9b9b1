//! JSON request and response shapes
//!
//! ```json
//! { "source": "...", "functionName": "add", "tests": [{ "args": [2, 3], "expected": 5 }] }
//! ```
//!
//! A successful response carries `results`, `passedCount` and
//! `totalCount`; a compile failure carries only `error`.

use crate::case::{RunReport, RunResult, Submission, TestCase};
use crate::grader::Grader;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub source: String,
    pub function_name: String,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

impl GradeRequest {
    pub fn submission(&self) -> Submission {
        Submission::new(self.source.clone(), self.function_name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeResponse {
    #[serde(rename_all = "camelCase")]
    Success {
        results: Vec<RunResult>,
        passed_count: usize,
        total_count: usize,
    },
    CompileFailure { error: String },
}

impl GradeResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, GradeResponse::Success { .. })
    }
}

impl From<RunReport> for GradeResponse {
    fn from(report: RunReport) -> Self {
        GradeResponse::Success {
            results: report.results,
            passed_count: report.passed_count,
            total_count: report.total_count,
        }
    }
}

impl Grader {
    /// Grade a wire request; failures are reported as data
    pub fn grade(&self, request: &GradeRequest) -> GradeResponse {
        match self.run(&request.submission(), &request.tests) {
            Ok(report) => report.into(),
            Err(err) => GradeResponse::CompileFailure {
                error: err.to_string(),
            },
        }
    }
}

/// Grade with the default (restrictive) limits
pub fn grade(request: &GradeRequest) -> GradeResponse {
    Grader::default().grade(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_uses_camel_case() {
        let request: GradeRequest = serde_json::from_str(
            r#"{"source": "function f(){}", "functionName": "f", "tests": [{"args": [], "expected": null}]}"#,
        )
        .unwrap();
        assert_eq!(request.function_name, "f");
        assert_eq!(request.tests.len(), 1);
    }

    #[test]
    fn test_failure_has_no_results_key() {
        let response = GradeResponse::CompileFailure {
            error: "SyntaxError: oops".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "SyntaxError: oops" }));
    }

    #[test]
    fn test_success_shape() {
        let response = GradeResponse::Success {
            results: vec![],
            passed_count: 0,
            total_count: 0,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"results":[],"passedCount":0,"totalCount":0}"#
        );
    }
}
