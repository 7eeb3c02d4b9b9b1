//! Parsing (tokens to AST)
//!
//! Uses Pratt parsing for expressions and recursive descent for statements.
//! Errors are pushed as diagnostics; parse functions return `Err(())` and the
//! top level resynchronizes at the next statement boundary.

mod expr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Maximum nesting of statements and expressions
pub const MAX_NESTING: usize = 256;

/// Parser state for building AST from tokens
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
    /// Current statement/expression nesting
    pub(super) depth: usize,
    /// `in` is not a binary operator here (for-loop heads)
    pub(super) no_in: bool,
    pub(super) context: FunctionContext,
}

/// Per-function state that decides whether `return`, `break`, `continue`
/// and `super` are legal
#[derive(Debug, Clone, Default)]
pub(super) struct FunctionContext {
    pub in_function: bool,
    pub in_method: bool,
    pub in_derived_constructor: bool,
    pub loop_depth: usize,
    pub breakable_depth: usize,
    pub labels: Vec<String>,
}

/// Operator precedence levels for Pratt parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Or,         // || ??
    And,        // &&
    BitOr,      // |
    BitXor,     // ^
    BitAnd,     // &
    Equality,   // == != === !==
    Relational, // < <= > >= in instanceof
    Shift,      // << >> >>>
    Term,       // + -
    Factor,     // * / %
    Exponent,   // **
}

impl Precedence {
    /// The next tighter level, used for left-associative operands
    pub(super) fn tighter(self) -> Precedence {
        match self {
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::BitOr,
            Precedence::BitOr => Precedence::BitXor,
            Precedence::BitXor => Precedence::BitAnd,
            Precedence::BitAnd => Precedence::Equality,
            Precedence::Equality => Precedence::Relational,
            Precedence::Relational => Precedence::Shift,
            Precedence::Shift => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor | Precedence::Exponent => Precedence::Exponent,
        }
    }
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            depth: 0,
            no_in: false,
            context: FunctionContext::default(),
        }
    }

    /// Parse tokens into an AST
    pub fn parse(&mut self) -> (Program, Vec<Diagnostic>) {
        let mut body = Vec::new();
        let start = self.peek().span;

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(_) => self.synchronize(),
            }
        }

        let span = start.merge(self.peek().span);
        (Program { body, span }, std::mem::take(&mut self.diagnostics))
    }

    // === Token navigation ===

    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek_at(&self, offset: usize) -> &Token {
        &self.tokens[(self.current + offset).min(self.tokens.len() - 1)]
    }

    pub(super) fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    pub(super) fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Check for a contextual keyword such as `of` or `static`
    pub(super) fn check_word(&self, word: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Identifier && token.lexeme == word
    }

    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn consume(&mut self, kind: TokenKind, expected: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error_unexpected(Some(expected));
            Err(())
        }
    }

    pub(super) fn consume_identifier(&mut self, what: &str) -> Result<Identifier, ()> {
        if self.check(TokenKind::Identifier) {
            let token = self.advance();
            Ok(Identifier {
                name: token.lexeme.clone(),
                span: token.span,
            })
        } else {
            self.error_unexpected(Some(&format!("expected {}", what)));
            Err(())
        }
    }

    /// Consume a statement terminator, applying automatic semicolon insertion
    pub(super) fn consume_semicolon(&mut self) -> Result<(), ()> {
        if self.match_token(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
            || self.peek().newline_before
        {
            Ok(())
        } else {
            self.error_unexpected(None);
            Err(())
        }
    }

    // === Nesting guards ===

    pub(super) fn enter(&mut self) -> Result<(), ()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let span = self.peek().span;
            self.diagnostics.push(
                Diagnostic::error_with_code(
                    error_codes::NESTING,
                    "Maximum nesting depth exceeded",
                    span,
                )
                .with_help("split deeply nested code into smaller functions"),
            );
            self.depth -= 1;
            return Err(());
        }
        Ok(())
    }

    pub(super) fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Run `f` with `in` allowed as an operator again
    pub(super) fn allow_in<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ()>) -> Result<T, ()> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    // === Errors ===

    /// Report the current token as unexpected
    pub(super) fn error_unexpected(&mut self, expected: Option<&str>) {
        let token = self.peek().clone();
        // The lexer already reported this token
        if token.kind == TokenKind::Error {
            return;
        }
        let found = match token.kind {
            TokenKind::Eof => "Unexpected end of input".to_string(),
            TokenKind::Number => "Unexpected number".to_string(),
            TokenKind::String => "Unexpected string".to_string(),
            TokenKind::Template
            | TokenKind::TemplateHead
            | TokenKind::TemplateMiddle
            | TokenKind::TemplateTail => "Unexpected template string".to_string(),
            TokenKind::Identifier => format!("Unexpected identifier '{}'", token.lexeme),
            _ => format!("Unexpected token '{}'", token.lexeme),
        };
        let message = match expected {
            Some(expected) => format!("{}, {}", found, expected),
            None => found,
        };
        self.diagnostics.push(
            Diagnostic::error(message, token.span)
                .with_label("syntax error")
                .with_help("check for typos or missing punctuation"),
        );
    }

    pub(super) fn error_at(&mut self, span: Span, message: &str) {
        self.diagnostics
            .push(Diagnostic::error(message, span).with_label("syntax error"));
    }

    pub(super) fn error_unsupported(&mut self, span: Span, what: &str) {
        self.diagnostics.push(
            Diagnostic::error_with_code(
                error_codes::UNSUPPORTED,
                format!("{} are not supported in this sandbox", what),
                span,
            )
            .with_label("unsupported"),
        );
    }

    /// Skip tokens until a likely statement boundary
    pub(super) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Function
                | TokenKind::Class
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    pub(super) fn parse_source(source: &str) -> (Program, Vec<Diagnostic>) {
        let (tokens, lex_diags) = Lexer::new(source).tokenize();
        assert!(lex_diags.is_empty(), "lex errors: {:?}", lex_diags);
        Parser::new(tokens).parse()
    }

    pub(super) fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse_source(source);
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics: {:?}",
            diagnostics
        );
        program
    }

    pub(super) fn first_message(source: &str) -> String {
        let (_, diagnostics) = parse_source(source);
        assert!(!diagnostics.is_empty(), "expected an error for {:?}", source);
        diagnostics[0].message.clone()
    }

    #[test]
    fn test_parse_function_declaration() {
        let program = parse_ok("function add(a, b) { return a + b; }");
        assert_eq!(program.body.len(), 1);
        match &program.body[0] {
            Stmt::Function(f) => {
                assert_eq!(f.name.as_ref().map(|n| n.name.as_str()), Some("add"));
                assert_eq!(f.params.len(), 2);
                assert!(!f.is_arrow);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_asi_between_lines() {
        let program = parse_ok("let a = 1\nlet b = a\nb++\n");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_return_on_its_own_line_returns_undefined() {
        let program = parse_ok("function f() {\n return\n 42\n}");
        let Stmt::Function(f) = &program.body[0] else {
            panic!("expected function");
        };
        let FunctionBody::Block(body) = &f.body else {
            panic!("expected block body");
        };
        assert!(matches!(body[0], Stmt::Return(None, _)));
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn test_missing_semicolon_on_same_line_is_error() {
        assert_eq!(first_message("let a = 1 let b = 2"), "Unexpected token 'let'");
    }

    #[test]
    fn test_unexpected_end_of_input() {
        assert_eq!(
            first_message("function f() {"),
            "Unexpected end of input, expected '}' after block"
        );
    }

    #[test]
    fn test_recovery_reports_multiple_errors() {
        let (program, diagnostics) = parse_source("let = 1;\nlet ok = 2;\nconst;\nlet also = 3;");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("x = {}1{};", "(".repeat(300), ")".repeat(300));
        let (_, diagnostics) = parse_source(&source);
        assert!(diagnostics
            .iter()
            .any(|d| d.code == error_codes::NESTING));
    }

    #[test]
    fn test_top_level_return_is_rejected() {
        assert_eq!(first_message("return 1;"), "Illegal return statement");
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        assert_eq!(first_message("break;"), "Illegal break statement");
        assert_eq!(
            first_message("while (true) { function f() { continue; } }"),
            "Illegal continue statement: no surrounding iteration statement"
        );
    }

    #[test]
    fn test_unsupported_syntax_is_named() {
        assert_eq!(
            first_message("async function f() {}"),
            "async functions are not supported in this sandbox"
        );
        assert_eq!(
            first_message("const r = /ab+c/;"),
            "Regular expression literals are not supported in this sandbox"
        );
    }
}
