//! Diagnostics for lexical and syntax errors
//!
//! Lexer and parser failures are collected as `Diagnostic`s rather than
//! returned eagerly, so one compile reports every problem it found.

use crate::span::{locate, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic codes
pub mod error_codes {
    /// Unexpected character in source
    pub const UNEXPECTED_CHAR: &str = "PS1001";
    /// String literal without closing quote
    pub const UNTERMINATED_STRING: &str = "PS1002";
    /// Template literal or block comment without terminator
    pub const UNTERMINATED_TEMPLATE: &str = "PS1003";
    /// Malformed number literal or escape sequence
    pub const INVALID_LITERAL: &str = "PS1004";
    /// Generic syntax error
    pub const SYNTAX: &str = "PS2000";
    /// Expression or statement nested too deeply
    pub const NESTING: &str = "PS2001";
    /// Syntax this engine does not implement
    pub const UNSUPPORTED: &str = "PS2002";
}

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message anchored to a source span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    /// Error code (e.g., "PS2000")
    pub code: String,
    pub message: String,
    pub span: Span,
    /// Line number (1-based), filled in by [`Diagnostic::locate`]
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Source line string
    pub snippet: String,
    /// Short label for the caret range
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            span,
            line: 1,
            column: span.start + 1,
            snippet: String::new(),
            label: String::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    /// Create a new error diagnostic (uses the generic syntax code)
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::error_with_code(error_codes::SYNTAX, message, span)
    }

    /// Set the label (caret description)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Resolve line, column and snippet against the source the span points into
    pub fn locate(mut self, source: &str) -> Self {
        let (line, column, snippet) = locate(source, self.span.start);
        self.line = line;
        self.column = column;
        self.snippet = snippet;
        self
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}[{}]: {}\n", self.level, self.code, self.message));
        output.push_str(&format!("  --> {}:{}\n", self.line, self.column));

        if !self.snippet.is_empty() {
            output.push_str("   |\n");
            output.push_str(&format!("{:>2} | {}\n", self.line, self.snippet));

            let length = self.span.len().max(1);
            let padding = " ".repeat(self.column.saturating_sub(1));
            output.push_str(&format!("   | {}{}", padding, "^".repeat(length)));
            if !self.label.is_empty() {
                output.push_str(&format!(" {}", self.label));
            }
            output.push('\n');
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }
        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }
}

/// One-line form used in compile error messages: `message (line:column)`
impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.message, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_string_has_caret_under_span() {
        let diag = Diagnostic::error("Unexpected token ';'", Span::new(8, 9))
            .with_label("syntax error")
            .locate("let x = ;");
        let text = diag.to_human_string();
        assert!(text.starts_with("error[PS2000]: Unexpected token ';'"));
        assert!(text.contains(" 1 | let x = ;"));
        assert!(text.contains("   |         ^ syntax error"));
    }

    #[test]
    fn test_display_includes_position() {
        let diag = Diagnostic::error("Unexpected end of input", Span::new(4, 4)).locate("f(\n  ");
        assert_eq!(diag.to_string(), "Unexpected end of input (2:2)");
    }
}
