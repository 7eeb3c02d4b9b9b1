//! End-to-end grading scenarios through the wire API

use pretty_assertions::assert_eq;
use profai_grader::{grade, GradeRequest, GradeResponse, Grader, Submission, TestCase, Value};
use profai_script::ExecutionLimits;
use rstest::rstest;
use serde_json::json;

fn request(value: serde_json::Value) -> GradeRequest {
    serde_json::from_value(value).expect("valid request")
}

fn grade_json(value: serde_json::Value) -> serde_json::Value {
    serde_json::to_value(grade(&request(value))).unwrap()
}

#[test]
fn test_passing_case() {
    let response = grade_json(json!({
        "source": "function add(a,b){return a+b;}",
        "functionName": "add",
        "tests": [{ "args": [2, 3], "expected": 5 }]
    }));
    assert_eq!(
        response,
        json!({
            "results": [{ "pass": true, "got": 5, "expected": 5 }],
            "passedCount": 1,
            "totalCount": 1
        })
    );
}

#[test]
fn test_throwing_case_is_contained() {
    let response = grade_json(json!({
        "source": "function bad(){throw new Error(\"x\");}",
        "functionName": "bad",
        "tests": [
            { "args": [], "expected": "boom" },
            { "args": [], "expected": "Error: x" }
        ]
    }));
    assert_eq!(
        response,
        json!({
            "results": [
                { "pass": false, "got": "Error: x", "expected": "boom" },
                { "pass": true, "got": "Error: x", "expected": "Error: x" }
            ],
            "passedCount": 1,
            "totalCount": 2
        })
    );
}

#[test]
fn test_syntax_error_has_no_results() {
    let response = grade(&request(json!({
        "source": "function add(a, b) { return a + ; }",
        "functionName": "add",
        "tests": [{ "args": [1, 2], "expected": 3 }]
    })));
    match &response {
        GradeResponse::CompileFailure { error } => {
            assert!(error.starts_with("SyntaxError: "), "{}", error)
        }
        other => panic!("expected a compile failure, got {:?}", other),
    }
    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("results").is_none());
}

#[rstest]
#[case("function f() {}", "g", "ReferenceError: g is not defined")]
#[case("throw new TypeError('top level');", "f", "TypeError: top level")]
#[case("while (true) {}", "f", "RangeError: Execution step limit exceeded (1000000 steps)")]
fn test_compile_failures(#[case] source: &str, #[case] name: &str, #[case] expected: &str) {
    // No wall-clock limit so slow machines still report the step limit
    let grader = Grader::new(ExecutionLimits::restrictive().with_timeout(None));
    let response = grader.grade(&request(json!({ "source": source, "functionName": name, "tests": [] })));
    assert_eq!(
        response,
        GradeResponse::CompileFailure {
            error: expected.to_string()
        }
    );
}

#[test]
fn test_nested_structures_compare_structurally() {
    let response = grade_json(json!({
        "source": "function make(){ return { a: [1, 2] }; }",
        "functionName": "make",
        "tests": [{ "args": [], "expected": { "a": [1, 2] } }]
    }));
    assert_eq!(response["results"][0]["pass"], json!(true));
}

#[test]
fn test_sequence_never_equals_mapping() {
    let response = grade_json(json!({
        "source": "function pair(){ return [1, 2]; }",
        "functionName": "pair",
        "tests": [{ "args": [], "expected": { "0": 1, "1": 2 } }]
    }));
    assert_eq!(response["results"][0]["pass"], json!(false));
    assert_eq!(response["passedCount"], json!(0));
}

#[test]
fn test_runs_are_independent() {
    let source = r#"
        let calls = 0;
        function count(x) { calls += 1; return [x, calls]; }
    "#;
    let grader = Grader::new(ExecutionLimits::restrictive());
    let submission = Submission::new(source, "count");

    let first = grader
        .run(
            &submission,
            &[
                TestCase::new(vec![Value::from("a")], Value::sequence([Value::from("a"), Value::from(1)])),
                TestCase::new(vec![Value::from("b")], Value::sequence([Value::from("b"), Value::from(2)])),
            ],
        )
        .unwrap();
    let second = grader
        .run(
            &submission,
            &[TestCase::new(vec![Value::from("z")], Value::sequence([Value::from("z"), Value::from(1)]))],
        )
        .unwrap();

    // State persists within a run but never across runs
    assert_eq!(first.passed_count, 2);
    assert_eq!(second.passed_count, 1);
    assert_eq!(second.results[0].got.to_json(), r#"["z",1]"#);
}

#[test]
fn test_arguments_are_fresh_per_case() {
    let source = "function mutate(list) { list.push(0); return list.length; }";
    let tests = vec![TestCase::new(vec![Value::sequence([Value::from(1)])], 2); 3];
    let report = Grader::default()
        .run(&Submission::new(source, "mutate"), &tests)
        .unwrap();
    assert_eq!(report.passed_count, 3);
}

#[test]
fn test_console_is_captured_not_printed() {
    let source = "function loud(x) { console.log('got', x); return x; }";
    let report = Grader::default()
        .run(
            &Submission::new(source, "loud"),
            &[TestCase::new(vec![Value::from(7)], 7)],
        )
        .unwrap();
    assert_eq!(report.console.len(), 1);
    assert_eq!(report.console[0].text, "got 7");
}

#[test]
fn test_runaway_case_does_not_abort_run() {
    let source = "function spin(n) { if (n > 0) { while (true) {} } return n; }";
    let report = Grader::new(ExecutionLimits::restrictive().with_max_steps(Some(50_000)))
        .run(
            &Submission::new(source, "spin"),
            &[
                TestCase::new(vec![Value::from(1)], 1),
                TestCase::new(vec![Value::from(0)], 0),
            ],
        )
        .unwrap();
    assert_eq!(
        report.results[0].got,
        Value::from("RangeError: Execution step limit exceeded (50000 steps)")
    );
    assert!(report.results[1].pass);
}

#[test]
fn test_deep_recursion_is_a_case_error() {
    let source = "function down(n) { return n === 0 ? 0 : down(n - 1); }";
    let report = Grader::default()
        .run(
            &Submission::new(source, "down"),
            &[
                TestCase::new(vec![Value::from(10)], 0),
                TestCase::new(vec![Value::from(100_000)], 0),
            ],
        )
        .unwrap();
    assert!(report.results[0].pass);
    assert_eq!(
        report.results[1].got,
        Value::from("RangeError: Maximum call stack size exceeded")
    );
}

#[test]
fn test_recursion_a_thousand_frames_deep_passes() {
    let source = "function sum(a, i) { i = i || 0; return i === a.length ? 0 : a[i] + sum(a, i + 1); }";
    let ones = Value::sequence(std::iter::repeat(Value::from(1)).take(1000));
    let report = Grader::default()
        .run(&Submission::new(source, "sum"), &[TestCase::new(vec![ones], 1000)])
        .unwrap();
    assert_eq!(report.results[0].got, Value::from(1000));
    assert!(report.results[0].pass);
}

#[rstest]
#[case("3.7037037037037037e-5")]
#[case("1.0715660391465826e-75")]
#[case("-1.9233892508945396e-237")]
#[case("0.1")]
fn test_expected_float_literal_matches_returned_literal(#[case] literal: &str) {
    let text = format!(
        r#"{{ "source": "function f() {{ return {literal}; }}", "functionName": "f",
             "tests": [{{ "args": [], "expected": {literal} }}] }}"#
    );
    let request: GradeRequest = serde_json::from_str(&text).unwrap();
    let GradeResponse::Success { results, .. } = grade(&request) else {
        panic!("expected a graded response for {}", literal);
    };
    assert!(
        results[0].pass,
        "got {} expected {}",
        results[0].got,
        results[0].expected
    );
}

#[test]
fn test_missing_and_extra_arguments() {
    let source = "function pick(a, b) { return b === undefined ? 'missing' : b; }";
    let report = Grader::default()
        .run(
            &Submission::new(source, "pick"),
            &[
                TestCase::new(vec![Value::from(1)], "missing"),
                TestCase::new(vec![Value::from(1), Value::from(2), Value::from(3)], 2),
            ],
        )
        .unwrap();
    assert_eq!(report.passed_count, 2);
}
