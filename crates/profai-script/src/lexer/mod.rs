//! Lexical analysis (tokenization)
//!
//! Converts submitted source into tokens with char-offset spans. Each token
//! records whether a line terminator preceded it so the parser can apply
//! automatic semicolon insertion.

use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

mod literals;

/// Lexer state for tokenizing source code
pub struct Lexer {
    /// Original source code
    pub(super) source: String,
    /// Characters of source code
    pub(super) chars: Vec<char>,
    /// Current position in chars
    pub(super) current: usize,
    /// Start position of current token
    pub(super) start_pos: usize,
    /// A newline was skipped since the last token
    saw_newline: bool,
    /// Brace depth at each open `${` substitution
    pub(super) template_braces: Vec<usize>,
    /// Collected diagnostics
    pub(super) diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars: Vec<char> = source.chars().collect();
        Self {
            source,
            chars,
            current: 0,
            start_pos: 0,
            saw_newline: false,
            template_braces: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the source code, returning tokens and any diagnostics
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        let diagnostics = std::mem::take(&mut self.diagnostics)
            .into_iter()
            .map(|d| d.locate(&self.source))
            .collect();
        (tokens, diagnostics)
    }

    /// Scan the next token
    fn next_token(&mut self) -> Token {
        self.saw_newline = false;
        self.skip_whitespace_and_comments();

        self.start_pos = self.current;

        if self.is_at_end() {
            if !self.template_braces.is_empty() {
                self.template_braces.clear();
                return self.error_token_with_code(
                    error_codes::UNTERMINATED_TEMPLATE,
                    "Unterminated template literal",
                );
            }
            return self.make_token(TokenKind::Eof, "");
        }

        let c = self.advance();

        match c {
            '(' => self.make_token(TokenKind::LeftParen, "("),
            ')' => self.make_token(TokenKind::RightParen, ")"),
            '[' => self.make_token(TokenKind::LeftBracket, "["),
            ']' => self.make_token(TokenKind::RightBracket, "]"),
            ';' => self.make_token(TokenKind::Semicolon, ";"),
            ',' => self.make_token(TokenKind::Comma, ","),
            ':' => self.make_token(TokenKind::Colon, ":"),
            '~' => self.make_token(TokenKind::Tilde, "~"),
            '{' => {
                if let Some(depth) = self.template_braces.last_mut() {
                    *depth += 1;
                }
                self.make_token(TokenKind::LeftBrace, "{")
            }
            '}' => match self.template_braces.last_mut() {
                Some(0) => {
                    self.template_braces.pop();
                    self.template_continuation()
                }
                Some(depth) => {
                    *depth -= 1;
                    self.make_token(TokenKind::RightBrace, "}")
                }
                None => self.make_token(TokenKind::RightBrace, "}"),
            },
            '.' => {
                if self.peek().is_ascii_digit() {
                    self.number(c)
                } else if self.peek() == '.' && self.peek_next() == Some('.') {
                    self.advance();
                    self.advance();
                    self.make_token(TokenKind::Ellipsis, "...")
                } else {
                    self.make_token(TokenKind::Dot, ".")
                }
            }
            '?' => {
                if self.match_char('?') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::QuestionQuestionEqual, "??=")
                    } else {
                        self.make_token(TokenKind::QuestionQuestion, "??")
                    }
                } else if self.peek() == '.'
                    && !self.peek_next().is_some_and(|n| n.is_ascii_digit())
                {
                    self.advance();
                    self.make_token(TokenKind::QuestionDot, "?.")
                } else {
                    self.make_token(TokenKind::Question, "?")
                }
            }
            '+' => {
                if self.match_char('+') {
                    self.make_token(TokenKind::PlusPlus, "++")
                } else if self.match_char('=') {
                    self.make_token(TokenKind::PlusEqual, "+=")
                } else {
                    self.make_token(TokenKind::Plus, "+")
                }
            }
            '-' => {
                if self.match_char('-') {
                    self.make_token(TokenKind::MinusMinus, "--")
                } else if self.match_char('=') {
                    self.make_token(TokenKind::MinusEqual, "-=")
                } else {
                    self.make_token(TokenKind::Minus, "-")
                }
            }
            '*' => {
                if self.match_char('*') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::StarStarEqual, "**=")
                    } else {
                        self.make_token(TokenKind::StarStar, "**")
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::StarEqual, "*=")
                } else {
                    self.make_token(TokenKind::Star, "*")
                }
            }
            '/' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::SlashEqual, "/=")
                } else {
                    self.make_token(TokenKind::Slash, "/")
                }
            }
            '%' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::PercentEqual, "%=")
                } else {
                    self.make_token(TokenKind::Percent, "%")
                }
            }
            '^' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::CaretEqual, "^=")
                } else {
                    self.make_token(TokenKind::Caret, "^")
                }
            }
            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::EqualEqualEqual, "===")
                    } else {
                        self.make_token(TokenKind::EqualEqual, "==")
                    }
                } else if self.match_char('>') {
                    self.make_token(TokenKind::Arrow, "=>")
                } else {
                    self.make_token(TokenKind::Equal, "=")
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::BangEqualEqual, "!==")
                    } else {
                        self.make_token(TokenKind::BangEqual, "!=")
                    }
                } else {
                    self.make_token(TokenKind::Bang, "!")
                }
            }
            '<' => {
                if self.match_char('<') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::LessLessEqual, "<<=")
                    } else {
                        self.make_token(TokenKind::LessLess, "<<")
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::LessEqual, "<=")
                } else {
                    self.make_token(TokenKind::Less, "<")
                }
            }
            '>' => {
                if self.match_char('>') {
                    if self.match_char('>') {
                        if self.match_char('=') {
                            self.make_token(TokenKind::GreaterGreaterGreaterEqual, ">>>=")
                        } else {
                            self.make_token(TokenKind::GreaterGreaterGreater, ">>>")
                        }
                    } else if self.match_char('=') {
                        self.make_token(TokenKind::GreaterGreaterEqual, ">>=")
                    } else {
                        self.make_token(TokenKind::GreaterGreater, ">>")
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::GreaterEqual, ">=")
                } else {
                    self.make_token(TokenKind::Greater, ">")
                }
            }
            '&' => {
                if self.match_char('&') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::AmpAmpEqual, "&&=")
                    } else {
                        self.make_token(TokenKind::AmpAmp, "&&")
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::AmpEqual, "&=")
                } else {
                    self.make_token(TokenKind::Amp, "&")
                }
            }
            '|' => {
                if self.match_char('|') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::PipePipeEqual, "||=")
                    } else {
                        self.make_token(TokenKind::PipePipe, "||")
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::PipeEqual, "|=")
                } else {
                    self.make_token(TokenKind::Pipe, "|")
                }
            }

            '"' | '\'' => self.string(c),
            '`' => self.template(),

            c if c.is_ascii_digit() => self.number(c),

            c if is_identifier_start(c) => self.identifier(),

            _ => self.error_token_with_code(
                error_codes::UNEXPECTED_CHAR,
                &format!("Invalid or unexpected token '{}'", c),
            ),
        }
    }

    /// Skip whitespace and comments, noting line terminators
    fn skip_whitespace_and_comments(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    self.saw_newline = true;
                    self.advance();
                }
                c if c.is_whitespace() || c == '\u{feff}' => {
                    self.advance();
                }
                '/' if self.peek_next() == Some('/') => {
                    while !self.is_at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                }
                '/' if self.peek_next() == Some('*') => {
                    let comment_start = self.current;
                    self.advance();
                    self.advance();

                    let mut terminated = false;
                    while !self.is_at_end() {
                        if self.peek() == '*' && self.peek_next() == Some('/') {
                            self.advance();
                            self.advance();
                            terminated = true;
                            break;
                        }
                        if self.peek() == '\n' {
                            self.saw_newline = true;
                        }
                        self.advance();
                    }

                    if !terminated {
                        self.diagnostics.push(
                            Diagnostic::error_with_code(
                                error_codes::UNTERMINATED_TEMPLATE,
                                "Unterminated comment",
                                Span::new(comment_start, comment_start + 2),
                            )
                            .with_label("comment starts here")
                            .with_help("add '*/' to close the comment"),
                        );
                    }
                }
                _ => return,
            }
        }
    }

    /// Scan an identifier or keyword
    fn identifier(&mut self) -> Token {
        while !self.is_at_end() && is_identifier_part(self.peek()) {
            self.advance();
        }

        let text: String = self.chars[self.start_pos..self.current].iter().collect();
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, &text)
    }

    // === Character navigation ===

    /// Advance to next character and return it
    pub(super) fn advance(&mut self) -> char {
        let c = self.chars[self.current];
        self.current += 1;
        c
    }

    /// Peek at current character without advancing
    pub(super) fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.current]
        }
    }

    /// Peek at next character (current + 1)
    pub(super) fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }

    /// Check if current character matches expected, and advance if so
    pub(super) fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.chars[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    /// Check if we've reached the end of source
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    // === Token creation ===

    /// Create a token with the given kind and lexeme
    pub(super) fn make_token(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token {
            kind,
            lexeme: lexeme.to_string(),
            span: Span::new(self.start_pos, self.current),
            newline_before: self.saw_newline,
        }
    }

    /// Create an error token and record a diagnostic with a specific code
    pub(super) fn error_token_with_code(&mut self, code: &str, message: &str) -> Token {
        let span = Span::new(self.start_pos, self.current.max(self.start_pos + 1));
        self.diagnostics.push(
            Diagnostic::error_with_code(code, message, span).with_label("invalid token"),
        );
        Token {
            kind: TokenKind::Error,
            lexeme: message.to_string(),
            span,
            newline_before: self.saw_newline,
        }
    }
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\u{200c}' || c == '\u{200d}'
}

/// Whether `name` is a plain identifier that could name a binding
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return false,
    }
    chars.all(is_identifier_part) && TokenKind::keyword(name).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuators_longest_match() {
        assert_eq!(
            kinds("a >>>= b ?? c?.d === e ... =>"),
            vec![
                TokenKind::Identifier,
                TokenKind::GreaterGreaterGreaterEqual,
                TokenKind::Identifier,
                TokenKind::QuestionQuestion,
                TokenKind::Identifier,
                TokenKind::QuestionDot,
                TokenKind::Identifier,
                TokenKind::EqualEqualEqual,
                TokenKind::Identifier,
                TokenKind::Ellipsis,
                TokenKind::Arrow,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_conditional_before_decimal_is_not_optional_chain() {
        assert_eq!(
            kinds("a?.5:1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::Number,
                TokenKind::Colon,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("function $x _y of let"),
            vec![
                TokenKind::Function,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Let,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newline_before_is_tracked() {
        let (tokens, _) = Lexer::new("a\n/* x\n */ b c").tokenize();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert!(!tokens[2].newline_before);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("// line\nx /* block */ y"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_comment_reports() {
        let (_, diagnostics) = Lexer::new("x /* never closed").tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, error_codes::UNTERMINATED_TEMPLATE);
    }

    #[test]
    fn test_unexpected_character() {
        let (tokens, diagnostics) = Lexer::new("a # b").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(diagnostics[0].code, error_codes::UNEXPECTED_CHAR);
        assert_eq!(diagnostics[0].column, 3);
    }

    #[rstest]
    #[case("add", true)]
    #[case("_private", true)]
    #[case("$", true)]
    #[case("twoSum2", true)]
    #[case("2fast", false)]
    #[case("return", false)]
    #[case("a-b", false)]
    #[case("", false)]
    fn test_is_valid_identifier(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_valid_identifier(name), expected);
    }
}
