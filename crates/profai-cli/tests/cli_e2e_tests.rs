//! End-to-end tests for the `profai` binary
//!
//! Every command runs inside a temp directory with `HOME` pointed at it so
//! no user or project config leaks in.

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn profai(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("profai");
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("NO_COLOR", "1")
        .env_remove("PROFAI_LOG")
        .env_remove("PROFAI_MAX_STEPS")
        .env_remove("PROFAI_TIMEOUT_MS")
        .env_remove("PROFAI_JSON");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn solutions_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../profai-grader/tests/solutions")
}

const ADD_REQUEST: &str = r#"{
    "source": "function add(a, b) { return a + b; }",
    "functionName": "add",
    "tests": [
        { "args": [2, 3], "expected": 5 },
        { "args": [1, 1], "expected": 3 }
    ]
}"#;

// ============================================================================
// profai grade
// ============================================================================

#[test]
fn test_grade_json_response() {
    let dir = TempDir::new().unwrap();
    let request = write(&dir, "req.json", ADD_REQUEST);

    let output = profai(&dir)
        .args(["grade", "--request", &request, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["passedCount"], 1);
    assert_eq!(response["totalCount"], 2);
    assert_eq!(response["results"][0]["got"], 5);
    assert_eq!(response["results"][1]["pass"], false);
}

#[test]
fn test_grade_human_report() {
    let dir = TempDir::new().unwrap();
    let request = write(&dir, "req.json", ADD_REQUEST);

    profai(&dir)
        .args(["grade", "--request", &request])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS #1 got 5"))
        .stdout(predicate::str::contains("FAIL #2 got 2, expected 3"))
        .stdout(predicate::str::contains("1/2 tests passed"));
}

#[test]
fn test_grade_from_stdin() {
    let dir = TempDir::new().unwrap();
    profai(&dir)
        .args(["grade", "-r", "-", "--json"])
        .write_stdin(ADD_REQUEST)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"passedCount\": 1"));
}

#[test]
fn test_grade_compile_failure_exits_one() {
    let dir = TempDir::new().unwrap();
    let request = write(
        &dir,
        "req.json",
        r#"{ "source": "function add(a, b) { return a + ; }", "functionName": "add", "tests": [] }"#,
    );

    let output = profai(&dir)
        .args(["grade", "--request", &request, "--json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(response["error"].as_str().unwrap().starts_with("SyntaxError"));
    assert!(response.get("results").is_none());
}

#[test]
fn test_grade_respects_step_flag() {
    let dir = TempDir::new().unwrap();
    let request = write(
        &dir,
        "req.json",
        r#"{ "source": "function spin() { while (true) {} }", "functionName": "spin",
             "tests": [{ "args": [], "expected": 1 }] }"#,
    );

    profai(&dir)
        .args(["grade", "--request", &request, "--json", "--max-steps", "5000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pass\": false"));
}

#[test]
fn test_grade_missing_file() {
    let dir = TempDir::new().unwrap();
    profai(&dir)
        .args(["grade", "--request", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read request file"));
}

#[test]
fn test_grade_reads_project_config() {
    let dir = TempDir::new().unwrap();
    write(&dir, "profai.toml", "[limits]\nmax_steps = 1000\ntimeout_ms = 0\n");
    let request = write(
        &dir,
        "req.json",
        r#"{ "source": "function count() { let n = 0; for (let i = 0; i < 100000; i++) n++; return n; }",
             "functionName": "count", "tests": [{ "args": [], "expected": 100000 }] }"#,
    );

    profai(&dir)
        .args(["grade", "--request", &request, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"passedCount\": 0"));
}

#[test]
fn test_invalid_project_config_is_reported() {
    let dir = TempDir::new().unwrap();
    write(&dir, "profai.toml", "[limits]\nbogus = 1\n");
    let request = write(&dir, "req.json", ADD_REQUEST);

    profai(&dir)
        .args(["grade", "--request", &request])
        .assert()
        .failure()
        .stderr(predicate::str::contains("profai.toml"));
}

// ============================================================================
// profai run
// ============================================================================

#[test]
fn test_run_prints_console_and_value() {
    let dir = TempDir::new().unwrap();
    let script = write(
        &dir,
        "sample.js",
        "console.log('hello', 42);\nconst xs = [1, 2, 3];\nxs.map(x => x * 2);",
    );

    profai(&dir)
        .args(["run", &script])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello 42"))
        .stdout(predicate::str::contains("[2,4,6]"));
}

#[test]
fn test_run_uncaught_error() {
    let dir = TempDir::new().unwrap();
    let script = write(&dir, "boom.js", "throw new TypeError('nope');");

    profai(&dir)
        .args(["run", &script])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("TypeError: nope"));
}

// ============================================================================
// profai lessons
// ============================================================================

#[test]
fn test_lessons_list() {
    let dir = TempDir::new().unwrap();
    profai(&dir)
        .args(["lessons", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/"));
}

#[test]
fn test_lessons_show_unknown() {
    let dir = TempDir::new().unwrap();
    profai(&dir)
        .args(["lessons", "show", "no-such-course/lesson"])
        .assert()
        .failure();
}

#[test]
fn test_lessons_grade_solution_passes() {
    let dir = TempDir::new().unwrap();
    let output = profai(&dir)
        .args(["lessons", "list", "--json"])
        .output()
        .unwrap();
    let lessons: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let first = &lessons[0];
    let path = first["path"].as_str().unwrap();
    let name = first["functionName"].as_str().unwrap();

    let solution = solutions_dir().join(format!("{}.js", name));
    profai(&dir)
        .args(["lessons", "grade", path, "--source", solution.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL").not());
}

#[test]
fn test_lessons_verify_reference_solutions() {
    let dir = TempDir::new().unwrap();
    profai(&dir)
        .args(["lessons", "verify", solutions_dir().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL").not());
}

#[test]
fn test_lessons_verify_empty_dir_fails() {
    let dir = TempDir::new().unwrap();
    profai(&dir)
        .args(["lessons", "verify", dir.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("cannot read"));
}
