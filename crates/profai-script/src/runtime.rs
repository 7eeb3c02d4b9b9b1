//! Embedding API
//!
//! [`Runtime`] bundles the lexer, parser and interpreter behind a small
//! surface: evaluate source, look up globals, call functions.

use crate::diagnostic::Diagnostic;
use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::limits::ExecutionLimits;
use crate::parser::Parser;
use crate::stdlib::console::{self, LogLine, LogSink};
use crate::value::{RuntimeError, Value};
use std::rc::Rc;

/// Why an evaluation or call failed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Source failed to lex or parse
    #[error("SyntaxError: {}", first_message(.0))]
    Syntax(Vec<Diagnostic>),
    /// Uncaught exception, rendered with ToString
    #[error("{0}")]
    Thrown(String),
    /// Step or time budget exhausted
    #[error("{0}")]
    Limit(String),
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    match diagnostics.first() {
        Some(d) if d.line > 0 => format!("{} (line {}, column {})", d.message, d.line, d.column),
        Some(d) => d.message.clone(),
        None => "Invalid or unexpected token".to_string(),
    }
}

impl From<RuntimeError> for EvalError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Thrown(value) => EvalError::Thrown(value.to_display_string()),
            limit => EvalError::Limit(limit.to_string()),
        }
    }
}

/// Script runtime instance
///
/// # Examples
///
/// ```
/// use profai_script::{ExecutionLimits, Runtime, Value};
///
/// let mut runtime = Runtime::new(ExecutionLimits::default());
/// runtime.eval("function add(a, b) { return a + b; }").unwrap();
/// let add = runtime.get_global("add").unwrap();
/// let sum = runtime.call(&add, &[Value::Number(2.0), Value::Number(3.0)]).unwrap();
/// assert_eq!(sum.to_display_string(), "5");
/// ```
pub struct Runtime {
    interpreter: Interpreter,
    console: LogSink,
}

impl Runtime {
    /// Runtime with a private console sink
    pub fn new(limits: ExecutionLimits) -> Self {
        let sink = LogSink::new(limits.max_log_lines);
        Self::with_console(limits, sink)
    }

    /// Runtime whose `console` writes into `sink`
    pub fn with_console(limits: ExecutionLimits, sink: LogSink) -> Self {
        let mut interpreter = Interpreter::new(limits);
        console::install(&mut interpreter, sink.clone());
        Self {
            interpreter,
            console: sink,
        }
    }

    /// Evaluate a program with a fresh budget
    ///
    /// Returns the value of the last top-level expression statement.
    pub fn eval(&mut self, source: &str) -> Result<Value, EvalError> {
        let mut lexer = Lexer::new(source);
        let (tokens, lex_diagnostics) = lexer.tokenize();
        if !lex_diagnostics.is_empty() {
            return Err(EvalError::Syntax(located(lex_diagnostics, source)));
        }

        let mut parser = Parser::new(tokens);
        let (program, parse_diagnostics) = parser.parse();
        if !parse_diagnostics.is_empty() {
            return Err(EvalError::Syntax(located(parse_diagnostics, source)));
        }

        self.interpreter.reset_budget();
        Ok(self.interpreter.eval(&program, Rc::from(source))?)
    }

    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.interpreter.get_global(name)
    }

    /// Call `function` with `this = undefined`
    ///
    /// Uses whatever budget remains; call [`Runtime::reset_budget`] first
    /// to give each call its own.
    pub fn call(&mut self, function: &Value, args: &[Value]) -> Result<Value, EvalError> {
        Ok(self
            .interpreter
            .call_function(function, Value::Undefined, args)?)
    }

    pub fn reset_budget(&mut self) {
        self.interpreter.reset_budget();
    }

    pub fn console(&self) -> &LogSink {
        &self.console
    }

    pub fn console_lines(&self) -> Vec<LogLine> {
        self.console.lines()
    }

    pub fn limits(&self) -> &ExecutionLimits {
        self.interpreter.limits()
    }

    /// Steps charged since the last budget reset
    pub fn steps_used(&self) -> u64 {
        self.interpreter.steps_used()
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}

fn located(diagnostics: Vec<Diagnostic>, source: &str) -> Vec<Diagnostic> {
    diagnostics.into_iter().map(|d| d.locate(source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_eval_returns_last_expression() {
        let mut runtime = Runtime::new(ExecutionLimits::default());
        let value = runtime.eval("let x = 20; x + 22").unwrap();
        assert_eq!(value.to_display_string(), "42");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let mut runtime = Runtime::new(ExecutionLimits::default());
        let err = runtime.eval("function (").unwrap_err();
        assert!(matches!(err, EvalError::Syntax(_)));
        assert!(err.to_string().starts_with("SyntaxError: "));
    }

    #[test]
    fn test_uncaught_throw() {
        let mut runtime = Runtime::new(ExecutionLimits::default());
        let err = runtime.eval("throw new TypeError('nope')").unwrap_err();
        assert_eq!(err, EvalError::Thrown("TypeError: nope".to_string()));
    }

    #[test]
    fn test_step_limit() {
        let limits = ExecutionLimits::default().with_max_steps(Some(1_000));
        let mut runtime = Runtime::new(limits);
        let err = runtime.eval("while (true) {}").unwrap_err();
        assert_eq!(
            err,
            EvalError::Limit("RangeError: Execution step limit exceeded (1000 steps)".to_string())
        );
    }

    #[test]
    fn test_console_is_captured() {
        let mut runtime = Runtime::new(ExecutionLimits::default());
        runtime
            .eval("console.log('a', 1, [1, 2], {x: 'y'}); console.warn('w')")
            .unwrap();
        let lines = runtime.console_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, r#"a 1 [1,2] {"x":"y"}"#);
        assert_eq!(lines[1].text, "w");
    }
}
