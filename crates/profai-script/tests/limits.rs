//! Execution budgets and call depth

mod common;

use common::assert_eq;
use profai_script::{EvalError, ExecutionLimits, Runtime, Value};
use std::time::Duration;

#[test]
fn test_infinite_loop_hits_step_limit() {
    let mut runtime = Runtime::new(ExecutionLimits::default().with_max_steps(Some(10_000)));
    let err = runtime.eval("let i = 0; for (;;) { i++; }").unwrap_err();
    assert!(matches!(err, EvalError::Limit(_)), "{:?}", err);
}

#[test]
fn test_limit_errors_are_not_catchable() {
    let mut runtime = Runtime::new(ExecutionLimits::default().with_max_steps(Some(10_000)));
    let err = runtime
        .eval("let caught = false; try { while (true) {} } catch (e) { caught = true; } caught")
        .unwrap_err();
    assert_eq!(
        err,
        EvalError::Limit("RangeError: Execution step limit exceeded (10000 steps)".to_string())
    );
}

#[test]
fn test_time_limit() {
    let limits = ExecutionLimits::default()
        .with_max_steps(None)
        .with_timeout(Some(Duration::from_millis(50)));
    let mut runtime = Runtime::new(limits);
    let err = runtime.eval("while (true) {}").unwrap_err();
    assert_eq!(
        err,
        EvalError::Limit("RangeError: Execution time limit exceeded (50 ms)".to_string())
    );
}

#[test]
fn test_call_depth_is_catchable() {
    let mut runtime = Runtime::new(ExecutionLimits::default().with_max_call_depth(16));
    let value = runtime
        .eval(
            r#"
            function down(n) { return down(n + 1); }
            let message;
            try { down(0); } catch (e) { message = `${e.name}: ${e.message}`; }
            message
            "#,
        )
        .unwrap();
    assert_eq!(
        value.to_display_string(),
        "RangeError: Maximum call stack size exceeded"
    );
}

#[test]
fn test_budget_resets_between_calls() {
    let mut runtime = Runtime::new(ExecutionLimits::default().with_max_steps(Some(5_000)));
    runtime
        .eval("function spin(n) { let s = 0; for (let i = 0; i < n; i++) s += i; return s; }")
        .unwrap();
    let spin = runtime.get_global("spin").unwrap();
    for _ in 0..5 {
        runtime.reset_budget();
        let result = runtime.call(&spin, &[Value::Number(1_000.0)]).unwrap();
        assert_eq!(result.to_display_string(), "499500");
    }
}

#[test]
fn test_console_is_bounded() {
    let limits = ExecutionLimits::default().with_max_log_lines(3);
    let mut runtime = Runtime::new(limits);
    runtime
        .eval("for (let i = 0; i < 10; i++) console.log(i);")
        .unwrap();
    assert_eq!(runtime.console_lines().len(), 3);
    assert_eq!(runtime.console().dropped(), 7);
}
