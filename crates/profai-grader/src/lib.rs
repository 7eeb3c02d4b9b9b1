//! ProfAI grading sandbox
//!
//! Compiles a learner's source with the embedded script engine, extracts
//! the named entry point, calls it once per literal test case and scores
//! each result with structural equality:
//!
//! ```
//! use profai_grader::{Grader, Submission, TestCase, Value};
//!
//! let submission = Submission::new("function add(a, b) { return a + b; }", "add");
//! let tests = [TestCase::new(vec![Value::from(2), Value::from(3)], 5)];
//! let report = Grader::default().run(&submission, &tests).unwrap();
//! assert_eq!(report.summary().to_string(), "1/1 tests passed");
//! ```

pub mod case;
pub mod catalog;
pub mod convert;
pub mod grader;
pub mod session;
pub mod value;
pub mod wire;

pub use case::{RunReport, RunResult, RunSummary, Submission, TestCase};
pub use catalog::{Assignment, Catalog, CatalogError, Course, Lesson, Topic};
pub use grader::{run_in_place, CompileError, Grader, Progress, DEFAULT_STACK_SIZE};
pub use session::{Session, SessionError, SessionState};
pub use value::{deep_equal, Value};
pub use wire::{grade, GradeRequest, GradeResponse};

pub use profai_script::ExecutionLimits;
