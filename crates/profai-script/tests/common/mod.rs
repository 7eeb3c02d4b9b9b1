//! Shared helpers for script engine tests

#![allow(dead_code)]

use profai_script::stdlib::json;
use profai_script::{EvalError, ExecutionLimits, Runtime, Value};

pub use pretty_assertions::assert_eq;

/// Limits small enough that runaway tests fail fast
pub fn test_limits() -> ExecutionLimits {
    ExecutionLimits::default()
        .with_max_steps(Some(200_000))
        .with_max_call_depth(64)
}

pub fn runtime() -> Runtime {
    Runtime::new(test_limits())
}

/// Evaluate and return the completion value
pub fn eval(source: &str) -> Value {
    runtime()
        .eval(source)
        .unwrap_or_else(|err| panic!("evaluation failed: {}\n{}", err, source))
}

/// Evaluate and render the completion value with ToString
pub fn eval_display(source: &str) -> String {
    eval(source).to_display_string()
}

/// Evaluate and render the completion value as JSON
pub fn eval_json(source: &str) -> String {
    let mut runtime = runtime();
    let value = runtime
        .eval(source)
        .unwrap_or_else(|err| panic!("evaluation failed: {}\n{}", err, source));
    json::stringify(runtime.interpreter_mut(), &value, &Value::Undefined)
        .expect("stringify failed")
        .unwrap_or_else(|| "undefined".to_string())
}

/// Evaluate expecting failure
pub fn eval_err(source: &str) -> EvalError {
    match runtime().eval(source) {
        Ok(value) => panic!("expected an error, got {:?}", value),
        Err(err) => err,
    }
}

/// Assert that an uncaught throw renders as `expected`
pub fn assert_throws(source: &str, expected: &str) {
    match eval_err(source) {
        EvalError::Thrown(message) => assert_eq!(message, expected),
        other => panic!("expected a thrown error, got {:?}", other),
    }
}
