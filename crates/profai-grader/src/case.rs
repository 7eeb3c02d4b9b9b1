//! Test cases, submissions and run reports

use crate::value::Value;
use profai_script::LogLine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One literal input/expected-output pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Positional arguments; arity is not checked
    pub args: Vec<Value>,
    #[serde(default)]
    pub expected: Value,
}

impl TestCase {
    pub fn new(args: Vec<Value>, expected: impl Into<Value>) -> Self {
        Self {
            args,
            expected: expected.into(),
        }
    }
}

/// Source text plus the entry point to extract from it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub source: String,
    pub function_name: String,
}

impl Submission {
    pub fn new(source: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            function_name: function_name.into(),
        }
    }
}

/// Verdict for one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub pass: bool,
    /// Returned value, or the thrown error's string form
    pub got: Value,
    pub expected: Value,
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// One result per test case, in input order
    pub results: Vec<RunResult>,
    pub passed_count: usize,
    pub total_count: usize,
    /// Captured console output; never forwarded to the host
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub console: Vec<LogLine>,
}

impl RunReport {
    pub fn new(results: Vec<RunResult>, console: Vec<LogLine>) -> Self {
        let passed_count = results.iter().filter(|r| r.pass).count();
        let total_count = results.len();
        Self {
            results,
            passed_count,
            total_count,
            console,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.passed_count == self.total_count
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            passed: self.passed_count,
            total: self.total_count,
        }
    }
}

/// Aggregate pass count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub total: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} tests passed", self.passed, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(pass: bool) -> RunResult {
        RunResult {
            pass,
            got: Value::Null,
            expected: Value::Null,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = RunReport::new(vec![result(true), result(false), result(true)], vec![]);
        assert_eq!(report.passed_count, 2);
        assert_eq!(report.total_count, 3);
        assert!(!report.all_passed());
        assert_eq!(report.summary().to_string(), "2/3 tests passed");
    }

    #[test]
    fn test_case_expected_defaults_to_undefined() {
        let case: TestCase = serde_json::from_str(r#"{"args": [1]}"#).unwrap();
        assert_eq!(case.expected, Value::Undefined);
    }
}
