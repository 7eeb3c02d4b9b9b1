//! Compile a submission and run it against test cases
//!
//! Every run gets a fresh [`Runtime`] on a dedicated worker thread. The
//! thread has a large stack so deeply recursive submissions hit the
//! interpreter's call-depth limit long before the native stack runs out.

use crate::case::{RunReport, RunResult, Submission, TestCase};
use crate::convert::{from_script, to_script};
use crate::value::{deep_equal, Value};
use profai_script::{is_valid_identifier, EvalError, ExecutionLimits, Runtime, Value as ScriptValue};
use std::any::Any;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

/// Default worker stack size (256 MiB; reserved lazily by the OS)
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Failure reported once for a whole run; no results are produced
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("SyntaxError: '{0}' is not a valid function name")]
    InvalidFunctionName(String),

    /// Source failed to parse, threw at top level, or ran out of budget
    #[error(transparent)]
    Evaluation(#[from] EvalError),

    #[error("ReferenceError: {0} is not defined")]
    MissingFunction(String),

    #[error("Grader worker failed: {0}")]
    Worker(String),
}

/// Progress notifications from a run in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Source evaluated and the entry point was found
    Compiled,
    CaseFinished { index: usize, pass: bool },
}

enum WorkerEvent {
    Progress(Progress),
    Done(Result<RunReport, CompileError>),
}

/// Grading sandbox
#[derive(Debug, Clone)]
pub struct Grader {
    limits: ExecutionLimits,
    stack_size: usize,
}

impl Default for Grader {
    fn default() -> Self {
        Self::new(ExecutionLimits::restrictive())
    }
}

impl Grader {
    pub fn new(limits: ExecutionLimits) -> Self {
        Self {
            limits,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Compile `submission` and grade it against `tests`
    pub fn run(&self, submission: &Submission, tests: &[TestCase]) -> Result<RunReport, CompileError> {
        self.run_observed(submission, tests, |_| {})
    }

    /// Like [`Grader::run`], reporting progress as the worker advances
    pub fn run_observed(
        &self,
        submission: &Submission,
        tests: &[TestCase],
        mut observer: impl FnMut(Progress),
    ) -> Result<RunReport, CompileError> {
        let (tx, rx) = mpsc::channel();
        let limits = self.limits.clone();
        let submission = submission.clone();
        let tests = tests.to_vec();

        let handle = thread::Builder::new()
            .name("profai-grader".to_string())
            .stack_size(self.stack_size)
            .spawn(move || {
                let progress = tx.clone();
                let outcome = run_in_place(&limits, &submission, &tests, |p| {
                    // The receiver outlives the worker unless the host is unwinding
                    let _ = progress.send(WorkerEvent::Progress(p));
                });
                let _ = tx.send(WorkerEvent::Done(outcome));
            })
            .map_err(|e| CompileError::Worker(e.to_string()))?;

        let mut outcome = None;
        for event in rx {
            match event {
                WorkerEvent::Progress(progress) => observer(progress),
                WorkerEvent::Done(result) => outcome = Some(result),
            }
        }

        match handle.join() {
            Ok(()) => outcome.unwrap_or_else(|| {
                Err(CompileError::Worker("worker exited without a report".to_string()))
            }),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(%message, "grader worker panicked");
                Err(CompileError::Worker(message))
            }
        }
    }
}

/// Grade on the calling thread
///
/// Deep recursion in the submission uses the caller's stack; prefer
/// [`Grader::run`] unless the caller already runs on a large stack.
pub fn run_in_place(
    limits: &ExecutionLimits,
    submission: &Submission,
    tests: &[TestCase],
    mut observer: impl FnMut(Progress),
) -> Result<RunReport, CompileError> {
    let name = submission.function_name.as_str();
    if !is_valid_identifier(name) {
        warn!(function = %name, "invalid function name");
        return Err(CompileError::InvalidFunctionName(name.to_string()));
    }

    let mut runtime = Runtime::new(limits.clone());
    if let Err(err) = runtime.eval(&submission.source) {
        warn!(function = %name, error = %err, "submission failed to compile");
        return Err(err.into());
    }
    let Some(function) = runtime.get_global(name) else {
        warn!(function = %name, "entry point not defined");
        return Err(CompileError::MissingFunction(name.to_string()));
    };
    debug!(function = %name, steps = runtime.steps_used(), "compiled submission");
    observer(Progress::Compiled);

    let mut results = Vec::with_capacity(tests.len());
    for (index, case) in tests.iter().enumerate() {
        runtime.reset_budget();
        let got = invoke(&mut runtime, &function, name, case);
        let pass = deep_equal(&got, &case.expected);
        debug!(index, pass, got = %got, expected = %case.expected, "graded case");
        observer(Progress::CaseFinished { index, pass });
        results.push(RunResult {
            pass,
            got,
            expected: case.expected.clone(),
        });
    }

    let report = RunReport::new(results, runtime.console_lines());
    info!(
        function = %name,
        passed = report.passed_count,
        total = report.total_count,
        "run complete"
    );
    Ok(report)
}

/// Call the entry point once; a throw becomes the error's string form
fn invoke(runtime: &mut Runtime, function: &ScriptValue, name: &str, case: &TestCase) -> Value {
    if !function.is_callable() {
        return Value::String(format!("TypeError: {} is not a function", name));
    }
    let args: Vec<ScriptValue> = case.args.iter().map(to_script).collect();
    match runtime.call(function, &args) {
        Ok(value) => from_script(&value),
        Err(err) => Value::String(err.to_string()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn case(args: Vec<Value>, expected: impl Into<Value>) -> TestCase {
        TestCase::new(args, expected)
    }

    #[test]
    fn test_progress_events_in_order() {
        let grader = Grader::new(ExecutionLimits::restrictive());
        let submission = Submission::new("function id(x) { return x; }", "id");
        let tests = vec![case(vec![Value::from(1)], 1), case(vec![Value::from(2)], 3)];

        let mut events = Vec::new();
        let report = grader
            .run_observed(&submission, &tests, |p| events.push(p))
            .unwrap();

        assert_eq!(report.passed_count, 1);
        assert_eq!(
            events,
            vec![
                Progress::Compiled,
                Progress::CaseFinished { index: 0, pass: true },
                Progress::CaseFinished { index: 1, pass: false },
            ]
        );
    }

    #[test]
    fn test_invalid_function_name() {
        let err = Grader::default()
            .run(&Submission::new("", "not a name"), &[])
            .unwrap_err();
        assert_eq!(err, CompileError::InvalidFunctionName("not a name".to_string()));
    }

    #[test]
    fn test_non_callable_entry_point() {
        let report = Grader::default()
            .run(&Submission::new("const answer = 42;", "answer"), &[case(vec![], 42)])
            .unwrap();
        assert_eq!(
            report.results[0].got,
            Value::from("TypeError: answer is not a function")
        );
        assert!(!report.results[0].pass);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
    }
}
