//! Literal scanning for the lexer: numbers, strings and template chunks

use crate::diagnostic::error_codes;
use crate::lexer::{is_identifier_start, Lexer};
use crate::token::{Token, TokenKind};

impl Lexer {
    /// Scan a string literal delimited by `quote`
    pub(super) fn string(&mut self, quote: char) -> Token {
        let mut value = String::new();
        let mut bad_escape: Option<String> = None;

        loop {
            if self.is_at_end() || matches!(self.peek(), '\n' | '\r') {
                return self.error_token_with_code(
                    error_codes::UNTERMINATED_STRING,
                    "Invalid or unexpected token: unterminated string literal",
                );
            }
            let c = self.advance();
            if c == quote {
                break;
            }
            if c == '\\' {
                if let Err(message) = self.escape(&mut value) {
                    bad_escape.get_or_insert(message);
                }
            } else {
                value.push(c);
            }
        }

        match bad_escape {
            Some(message) => self.error_token_with_code(error_codes::INVALID_LITERAL, &message),
            None => self.make_token(TokenKind::String, &value),
        }
    }

    /// Scan a template chunk after the opening backtick
    pub(super) fn template(&mut self) -> Token {
        self.template_chunk(TokenKind::Template, TokenKind::TemplateHead)
    }

    /// Resume a template after the `}` closing a substitution
    pub(super) fn template_continuation(&mut self) -> Token {
        self.template_chunk(TokenKind::TemplateTail, TokenKind::TemplateMiddle)
    }

    fn template_chunk(&mut self, closed: TokenKind, open: TokenKind) -> Token {
        let mut value = String::new();
        let mut bad_escape: Option<String> = None;

        loop {
            if self.is_at_end() {
                return self.error_token_with_code(
                    error_codes::UNTERMINATED_TEMPLATE,
                    "Unterminated template literal",
                );
            }
            let c = self.advance();
            match c {
                '`' => {
                    return match bad_escape {
                        Some(message) => {
                            self.error_token_with_code(error_codes::INVALID_LITERAL, &message)
                        }
                        None => self.make_token(closed, &value),
                    };
                }
                '$' if self.peek() == '{' => {
                    self.advance();
                    self.template_braces.push(0);
                    return match bad_escape {
                        Some(message) => {
                            self.error_token_with_code(error_codes::INVALID_LITERAL, &message)
                        }
                        None => self.make_token(open, &value),
                    };
                }
                '\\' => {
                    if let Err(message) = self.escape(&mut value) {
                        bad_escape.get_or_insert(message);
                    }
                }
                '\r' => {
                    self.match_char('\n');
                    value.push('\n');
                }
                _ => value.push(c),
            }
        }
    }

    /// Decode one escape sequence (the backslash is already consumed)
    fn escape(&mut self, out: &mut String) -> Result<(), String> {
        if self.is_at_end() {
            return Err("Invalid or unexpected token: unterminated escape".to_string());
        }
        let c = self.advance();
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_ascii_digit() => out.push('\0'),
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                self.match_char('\n');
            }
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            'u' => {
                let code = if self.match_char('{') {
                    let mut code: u32 = 0;
                    let mut digits = 0;
                    while !self.is_at_end() && self.peek() != '}' {
                        let d = self
                            .advance()
                            .to_digit(16)
                            .ok_or_else(|| "Invalid Unicode escape sequence".to_string())?;
                        code = code.saturating_mul(16).saturating_add(d);
                        digits += 1;
                    }
                    if !self.match_char('}') || digits == 0 || code > 0x10FFFF {
                        return Err("Invalid Unicode escape sequence".to_string());
                    }
                    code
                } else {
                    let high = self.hex_digits(4)?;
                    if (0xD800..0xDC00).contains(&high)
                        && self.peek() == '\\'
                        && self.peek_next() == Some('u')
                    {
                        let save = self.current;
                        self.current += 2;
                        match self.hex_digits(4) {
                            Ok(low) if (0xDC00..0xE000).contains(&low) => {
                                0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                            }
                            _ => {
                                self.current = save;
                                high
                            }
                        }
                    } else {
                        high
                    }
                };
                out.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            c if c.is_ascii_digit() => {
                return Err("Octal escape sequences are not allowed".to_string());
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32, String> {
        let mut code = 0;
        for _ in 0..count {
            let d = self
                .peek()
                .to_digit(16)
                .filter(|_| !self.is_at_end())
                .ok_or_else(|| "Invalid hexadecimal escape sequence".to_string())?;
            self.advance();
            code = code * 16 + d;
        }
        Ok(code)
    }

    /// Scan a number literal; `first` is already consumed
    pub(super) fn number(&mut self, first: char) -> Token {
        let radix = if first == '0' {
            match self.peek() {
                'x' | 'X' => Some(16),
                'o' | 'O' => Some(8),
                'b' | 'B' => Some(2),
                _ => None,
            }
        } else {
            None
        };

        let value = match radix {
            Some(radix) => {
                self.advance();
                let mut value = 0.0f64;
                let mut digits = 0;
                while !self.is_at_end() {
                    let c = self.peek();
                    if c == '_' {
                        self.advance();
                        continue;
                    }
                    match c.to_digit(radix) {
                        Some(d) => {
                            value = value * radix as f64 + d as f64;
                            digits += 1;
                            self.advance();
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return self.error_token_with_code(
                        error_codes::INVALID_LITERAL,
                        "Invalid or unexpected token: missing digits after radix prefix",
                    );
                }
                value
            }
            None => {
                let mut text = String::from(first);
                if first != '.' {
                    self.decimal_digits(&mut text);
                    if self.peek() == '.' {
                        self.advance();
                        text.push('.');
                    }
                }
                if text.ends_with('.') {
                    self.decimal_digits(&mut text);
                }
                if matches!(self.peek(), 'e' | 'E') {
                    let sign = self.peek_next();
                    let has_digits = match sign {
                        Some('+') | Some('-') => self
                            .chars
                            .get(self.current + 2)
                            .is_some_and(|c| c.is_ascii_digit()),
                        Some(c) => c.is_ascii_digit(),
                        None => false,
                    };
                    if has_digits {
                        text.push(self.advance());
                        if matches!(self.peek(), '+' | '-') {
                            text.push(self.advance());
                        }
                        self.decimal_digits(&mut text);
                    }
                }
                match text.parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        return self.error_token_with_code(
                            error_codes::INVALID_LITERAL,
                            &format!("Invalid number literal '{}'", text),
                        )
                    }
                }
            }
        };

        if self.peek() == 'n' {
            self.advance();
            return self.error_token_with_code(
                error_codes::UNSUPPORTED,
                "BigInt literals are not supported",
            );
        }
        if !self.is_at_end() && (is_identifier_start(self.peek()) || self.peek().is_ascii_digit())
        {
            self.advance();
            return self.error_token_with_code(
                error_codes::INVALID_LITERAL,
                "Invalid or unexpected token: identifier directly after number",
            );
        }

        self.make_token(TokenKind::Number, &value.to_string())
    }

    fn decimal_digits(&mut self, text: &mut String) {
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else if c == '_' && self.peek_next().is_some_and(|n| n.is_ascii_digit()) {
                self.advance();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn single(source: &str) -> (TokenKind, String) {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        (tokens[0].kind, tokens[0].lexeme.clone())
    }

    #[rstest]
    #[case("42", 42.0)]
    #[case("3.25", 3.25)]
    #[case(".5", 0.5)]
    #[case("1e3", 1000.0)]
    #[case("2.5E-2", 0.025)]
    #[case("0xff", 255.0)]
    #[case("0b1010", 10.0)]
    #[case("0o17", 15.0)]
    #[case("1_000_000", 1_000_000.0)]
    #[case("99999", 99999.0)]
    fn test_number_literals(#[case] source: &str, #[case] expected: f64) {
        let (kind, lexeme) = single(source);
        assert_eq!(kind, TokenKind::Number);
        assert_eq!(lexeme.parse::<f64>().unwrap(), expected);
    }

    #[test]
    fn test_member_access_on_integer_literal_needs_dot_digit() {
        let (tokens, _) = Lexer::new("1.toString").tokenize();
        // `1.` is a complete number; the identifier follows directly, which is an error
        assert_eq!(tokens[0].kind, TokenKind::Error);
    }

    #[rstest]
    #[case(r#""hello""#, "hello")]
    #[case("'single'", "single")]
    #[case(r#""a\nb\tc""#, "a\nb\tc")]
    #[case(r#""quote \" inside""#, "quote \" inside")]
    #[case(r"'\x41B\u{43}'", "ABC")]
    #[case(r"'😀'", "\u{1F600}")]
    #[case("'line\\\ncontinued'", "linecontinued")]
    #[case(r"'\q'", "q")]
    fn test_string_literals(#[case] source: &str, #[case] expected: &str) {
        let (kind, lexeme) = single(source);
        assert_eq!(kind, TokenKind::String);
        assert_eq!(lexeme, expected);
    }

    #[test]
    fn test_unterminated_string() {
        let (tokens, diagnostics) = Lexer::new("'abc\n'").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics[0].code, "PS1002");
    }

    #[test]
    fn test_template_with_substitutions() {
        let (tokens, diagnostics) = Lexer::new("`a${x}b${ {y:1}.y }c`").tokenize();
        assert!(diagnostics.is_empty());
        let summary: Vec<(TokenKind, &str)> = tokens
            .iter()
            .map(|t| (t.kind, t.lexeme.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::TemplateHead, "a"),
                (TokenKind::Identifier, "x"),
                (TokenKind::TemplateMiddle, "b"),
                (TokenKind::LeftBrace, "{"),
                (TokenKind::Identifier, "y"),
                (TokenKind::Colon, ":"),
                (TokenKind::Number, "1"),
                (TokenKind::RightBrace, "}"),
                (TokenKind::Dot, "."),
                (TokenKind::Identifier, "y"),
                (TokenKind::TemplateTail, "c"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn test_plain_template_spans_lines() {
        let (kind, lexeme) = single("`one\ntwo`");
        assert_eq!(kind, TokenKind::Template);
        assert_eq!(lexeme, "one\ntwo");
    }

    #[rstest]
    #[case(r"`a\xZZb`")]
    #[case(r"`\u{110000}${x}`")]
    #[case(r"`ok ${x} \u12 tail`")]
    fn test_template_bad_escape_reports_first_message(#[case] source: &str) {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
        assert_eq!(diagnostics[0].code, "PS1004");
        assert!(
            diagnostics[0].message.contains("escape"),
            "{}",
            diagnostics[0].message
        );
    }

    #[test]
    fn test_unterminated_template() {
        let (_, diagnostics) = Lexer::new("`abc ${x").tokenize();
        assert!(diagnostics.iter().any(|d| d.code == "PS1003"));
    }
}
