//! Editor session: one assignment, one editable source, repeated runs
//!
//! `Idle → Compiling → (CompileFailed | Ready) → Running → Complete`;
//! [`Session::reset`] restores the starter source and returns to `Idle`.

use crate::case::{RunReport, Submission, TestCase};
use crate::grader::{CompileError, Grader, Progress};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Compiling,
    CompileFailed,
    Ready,
    Running,
    Complete,
}

impl SessionState {
    /// Whether a run is in flight
    ///
    /// `run` and `reset` take `&mut self`, so a second run can never start
    /// while one is in flight; this is for observers of the state.
    pub fn is_busy(self) -> bool {
        matches!(self, SessionState::Compiling | SessionState::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Compiling => "compiling",
            SessionState::CompileFailed => "compile-failed",
            SessionState::Ready => "ready",
            SessionState::Running => "running",
            SessionState::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Editable submission bound to a fixed set of test cases
#[derive(Debug)]
pub struct Session {
    grader: Grader,
    function_name: String,
    tests: Vec<TestCase>,
    starter: String,
    source: String,
    state: SessionState,
    last_report: Option<RunReport>,
    last_error: Option<CompileError>,
}

impl Session {
    pub fn new(
        grader: Grader,
        starter: impl Into<String>,
        function_name: impl Into<String>,
        tests: Vec<TestCase>,
    ) -> Self {
        let starter = starter.into();
        Self {
            grader,
            function_name: function_name.into(),
            tests,
            source: starter.clone(),
            starter,
            state: SessionState::Idle,
            last_report: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    pub fn last_error(&self) -> Option<&CompileError> {
        self.last_error.as_ref()
    }

    /// Replace the editor contents; earlier results stay until the next run
    pub fn edit(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Compile the current source and grade it
    pub fn run(&mut self) -> Result<&RunReport, SessionError> {
        // Later edits cannot affect this run
        let submission = Submission::new(self.source.clone(), self.function_name.clone());
        self.transition(SessionState::Compiling);

        let mut state = self.state;
        let outcome = self.grader.run_observed(&submission, &self.tests, |progress| {
            if progress == Progress::Compiled {
                for next in [SessionState::Ready, SessionState::Running] {
                    debug!(from = %state, to = %next, "session transition");
                    state = next;
                }
            }
        });
        self.state = state;

        match outcome {
            Ok(report) => {
                self.transition(SessionState::Complete);
                self.last_error = None;
                Ok(self.last_report.insert(report))
            }
            Err(err) => {
                self.transition(SessionState::CompileFailed);
                self.last_report = None;
                self.last_error = Some(err.clone());
                Err(err.into())
            }
        }
    }

    /// Restore the starter source and return to `Idle`
    pub fn reset(&mut self) {
        self.source = self.starter.clone();
        self.last_report = None;
        self.last_error = None;
        self.transition(SessionState::Idle);
    }

    fn transition(&mut self, to: SessionState) {
        debug!(from = %self.state, %to, "session transition");
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use profai_script::ExecutionLimits;
    use rstest::rstest;

    fn session() -> Session {
        Session::new(
            Grader::new(ExecutionLimits::restrictive()),
            "function double(n) {\n  // TODO\n}\n",
            "double",
            vec![
                TestCase::new(vec![Value::from(2)], 4),
                TestCase::new(vec![Value::from(-1)], -2),
            ],
        )
    }

    #[test]
    fn test_run_edit_reset() {
        let mut session = session();
        assert_eq!(session.state(), SessionState::Idle);

        let report = session.run().unwrap();
        assert_eq!(report.passed_count, 0);
        assert_eq!(session.state(), SessionState::Complete);

        session.edit("function double(n) { return n * 2; }");
        assert_eq!(session.run().unwrap().passed_count, 2);

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.source().contains("TODO"));
        assert!(session.last_report().is_none());
    }

    #[test]
    fn test_compile_failure() {
        let mut session = session();
        session.edit("function double(n) { return n * ; }");
        let err = session.run().unwrap_err();
        assert!(matches!(err, SessionError::Compile(CompileError::Evaluation(_))));
        assert_eq!(session.state(), SessionState::CompileFailed);
        assert!(session.last_error().is_some());
        assert!(session.last_report().is_none());
    }

    #[rstest]
    #[case("function double(n) { return n * 2; }", SessionState::Complete)]
    #[case("function double(n) { return n * ; }", SessionState::CompileFailed)]
    fn test_run_never_leaves_session_busy(#[case] source: &str, #[case] settled: SessionState) {
        let mut session = session();
        session.edit(source);
        let _ = session.run();
        assert_eq!(session.state(), settled);
        assert!(!session.state().is_busy());
    }

    #[test]
    fn test_busy_states() {
        let busy: Vec<_> = [
            SessionState::Idle,
            SessionState::Compiling,
            SessionState::CompileFailed,
            SessionState::Ready,
            SessionState::Running,
            SessionState::Complete,
        ]
        .into_iter()
        .filter(|state| state.is_busy())
        .collect();
        assert_eq!(busy, vec![SessionState::Compiling, SessionState::Running]);
    }
}
