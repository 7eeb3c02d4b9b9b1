//! ProfAI script engine
//!
//! A restricted JavaScript-subset interpreter used to run learner code:
//! - Lexing and Pratt parsing into an AST
//! - Tree-walking interpretation with cooperative step and time budgets
//! - A standard library covering what lesson exercises use
//! - A `console` that writes into an isolated [`LogSink`]

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod ast;
pub mod diagnostic;
pub mod interpreter;
pub mod lexer;
pub mod limits;
pub mod parser;
pub mod runtime;
pub mod span;
pub mod stdlib;
pub mod token;
pub mod value;

pub use diagnostic::{error_codes, Diagnostic, DiagnosticLevel};
pub use interpreter::Interpreter;
pub use lexer::{is_valid_identifier, Lexer};
pub use limits::ExecutionLimits;
pub use parser::Parser;
pub use runtime::{EvalError, Runtime};
pub use span::Span;
pub use stdlib::console::{LogLevel, LogLine, LogSink};
pub use token::{Token, TokenKind};
pub use value::{ErrorKind, Function, MapKey, RuntimeError, Value};
