//! Statement parsing

use super::{FunctionContext, Parser};
use crate::ast::*;
use crate::token::TokenKind;
use std::rc::Rc;

impl Parser {
    /// Parse a statement
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ()> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, ()> {
        match self.peek().kind {
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::Function => {
                let start = self.advance().span;
                self.reject_generator()?;
                let name = self.consume_identifier("a function name")?;
                let function = self.parse_function_rest(Some(name), start, false)?;
                Ok(Stmt::Function(Rc::new(function)))
            }
            TokenKind::Class => Ok(Stmt::Class(Rc::new(self.parse_class(true)?))),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break | TokenKind::Continue => self.parse_jump(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Semicolon => Ok(Stmt::Empty(self.advance().span)),
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::Colon => {
                self.parse_labeled()
            }
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Parse a `{ ... }` block
    pub(super) fn parse_block(&mut self) -> Result<Block, ()> {
        let start = self.consume(TokenKind::LeftBrace, "expected '{'")?.span;
        let statements = self.parse_statements_until_brace()?;
        let end = self.consume(TokenKind::RightBrace, "expected '}' after block")?.span;
        Ok(Block {
            statements,
            span: start.merge(end),
        })
    }

    fn parse_statements_until_brace(&mut self) -> Result<Vec<Stmt>, ()> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    /// Parse `var|let|const` declarators (without the terminator)
    pub(super) fn parse_var_decl(&mut self) -> Result<VarDecl, ()> {
        let keyword = self.advance().clone();
        let kind = match keyword.kind {
            TokenKind::Var => VarKind::Var,
            TokenKind::Let => VarKind::Let,
            _ => VarKind::Const,
        };

        let mut declarations = Vec::new();
        loop {
            let target = self.parse_binding_target()?;
            declarations.push(self.parse_declarator_rest(kind, target)?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end = declarations
            .last()
            .map(|d| d.span)
            .unwrap_or(keyword.span);
        Ok(VarDecl {
            kind,
            declarations,
            span: keyword.span.merge(end),
        })
    }

    fn parse_declarator_rest(&mut self, kind: VarKind, target: Pattern) -> Result<VarDeclarator, ()> {
        let init = if self.match_token(TokenKind::Equal) {
            Some(self.parse_assignment()?)
        } else {
            None
        };

        if init.is_none() {
            if kind == VarKind::Const {
                self.error_at(target.span(), "Missing initializer in const declaration");
                return Err(());
            }
            if !matches!(target, Pattern::Identifier(_)) {
                self.error_at(target.span(), "Missing initializer in destructuring declaration");
                return Err(());
            }
        }

        let span = match &init {
            Some(expr) => target.span().merge(expr.span()),
            None => target.span(),
        };
        Ok(VarDeclarator { target, init, span })
    }

    fn parse_if(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let test = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after condition")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        let end = alternate
            .as_ref()
            .map(|s| s.span())
            .unwrap_or_else(|| consequent.span());
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
            span: start.merge(end),
        })
    }

    /// Parse a loop body, tracking that `break`/`continue` are legal inside
    fn parse_loop_body(&mut self) -> Result<Stmt, ()> {
        self.context.loop_depth += 1;
        self.context.breakable_depth += 1;
        let body = self.parse_statement();
        self.context.loop_depth -= 1;
        self.context.breakable_depth -= 1;
        body
    }

    fn parse_while(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        self.consume(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let test = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after condition")?;
        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(body.span());
        Ok(Stmt::While { test, body, span })
    }

    fn parse_do_while(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        let body = Box::new(self.parse_loop_body()?);
        self.consume(TokenKind::While, "expected 'while' after do body")?;
        self.consume(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let test = self.parse_expression()?;
        let end = self
            .consume(TokenKind::RightParen, "expected ')' after condition")?
            .span;
        // `do ... while (x)` never needs a terminator
        self.match_token(TokenKind::Semicolon);
        Ok(Stmt::DoWhile {
            body,
            test,
            span: start.merge(end),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        self.consume(TokenKind::LeftParen, "expected '(' after 'for'")?;

        let mut init = None;
        if self.match_token(TokenKind::Semicolon) {
            // empty init
        } else if matches!(
            self.peek().kind,
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            let keyword = self.advance().clone();
            let kind = match keyword.kind {
                TokenKind::Var => VarKind::Var,
                TokenKind::Let => VarKind::Let,
                _ => VarKind::Const,
            };
            let target = self.parse_binding_target()?;
            if self.check_word("of") || self.check(TokenKind::In) {
                return self.parse_for_each(start, ForHead::Declaration(kind, target));
            }

            let saved = std::mem::replace(&mut self.no_in, true);
            let mut declarations = Vec::new();
            let first = self.parse_declarator_rest(kind, target);
            let rest = first.and_then(|first| {
                declarations.push(first);
                while self.match_token(TokenKind::Comma) {
                    let target = self.parse_binding_target()?;
                    declarations.push(self.parse_declarator_rest(kind, target)?);
                }
                Ok(())
            });
            self.no_in = saved;
            rest?;

            let end = declarations.last().map(|d| d.span).unwrap_or(keyword.span);
            init = Some(ForInit::VarDecl(VarDecl {
                kind,
                declarations,
                span: keyword.span.merge(end),
            }));
            self.consume(TokenKind::Semicolon, "expected ';' after loop initializer")?;
        } else {
            let saved = std::mem::replace(&mut self.no_in, true);
            let expr = self.parse_expression();
            self.no_in = saved;
            let expr = expr?;

            if self.check_word("of") || self.check(TokenKind::In) {
                let target = self.expr_to_pattern(expr)?;
                return self.parse_for_each(start, ForHead::Pattern(target));
            }
            init = Some(ForInit::Expr(expr));
            self.consume(TokenKind::Semicolon, "expected ';' after loop initializer")?;
        }

        let test = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon, "expected ';' after loop condition")?;

        let update = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::RightParen, "expected ')' after for clauses")?;

        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(body.span());
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
            span,
        })
    }

    /// Finish `for (head of expr)` or `for (head in expr)`
    fn parse_for_each(&mut self, start: crate::span::Span, left: ForHead) -> Result<Stmt, ()> {
        let is_of = self.check_word("of");
        self.advance();
        let right = if is_of {
            self.parse_assignment()?
        } else {
            self.parse_expression()?
        };
        self.consume(TokenKind::RightParen, "expected ')' after loop head")?;
        let body = Box::new(self.parse_loop_body()?);
        let span = start.merge(body.span());
        Ok(if is_of {
            Stmt::ForOf {
                left,
                right,
                body,
                span,
            }
        } else {
            Stmt::ForIn {
                left,
                right,
                body,
                span,
            }
        })
    }

    fn parse_return(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        if !self.context.in_function {
            self.error_at(start, "Illegal return statement");
            return Err(());
        }
        let value = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
            || self.peek().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        let span = value.as_ref().map(|v| start.merge(v.span())).unwrap_or(start);
        Ok(Stmt::Return(value, span))
    }

    fn parse_jump(&mut self) -> Result<Stmt, ()> {
        let keyword = self.advance().clone();
        let is_break = keyword.kind == TokenKind::Break;

        let label = if self.check(TokenKind::Identifier) && !self.peek().newline_before {
            let label = self.advance().clone();
            if !self.context.labels.contains(&label.lexeme) {
                self.error_at(
                    label.span,
                    &format!("Undefined label '{}'", label.lexeme),
                );
                return Err(());
            }
            Some(label.lexeme)
        } else {
            None
        };

        if label.is_none() {
            if is_break && self.context.breakable_depth == 0 {
                self.error_at(keyword.span, "Illegal break statement");
                return Err(());
            }
            if !is_break && self.context.loop_depth == 0 {
                self.error_at(
                    keyword.span,
                    "Illegal continue statement: no surrounding iteration statement",
                );
                return Err(());
            }
        }

        self.consume_semicolon()?;
        Ok(if is_break {
            Stmt::Break(label, keyword.span)
        } else {
            Stmt::Continue(label, keyword.span)
        })
    }

    fn parse_throw(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        if self.peek().newline_before {
            self.error_at(start, "Illegal newline after throw");
            return Err(());
        }
        let value = self.parse_expression()?;
        self.consume_semicolon()?;
        let span = start.merge(value.span());
        Ok(Stmt::Throw(value, span))
    }

    fn parse_try(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        let block = self.parse_block()?;

        let handler = if self.check(TokenKind::Catch) {
            let catch_start = self.advance().span;
            let param = if self.match_token(TokenKind::LeftParen) {
                let param = self.parse_binding_target()?;
                self.consume(TokenKind::RightParen, "expected ')' after catch parameter")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            let span = catch_start.merge(body.span);
            Some(CatchClause { param, body, span })
        } else {
            None
        };

        let finalizer = if self.match_token(TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            self.error_unexpected(Some("expected 'catch' or 'finally' after try block"));
            return Err(());
        }

        let end = finalizer
            .as_ref()
            .map(|f| f.span)
            .or_else(|| handler.as_ref().map(|h| h.span))
            .unwrap_or(block.span);
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
            span: start.merge(end),
        })
    }

    fn parse_switch(&mut self) -> Result<Stmt, ()> {
        let start = self.advance().span;
        self.consume(TokenKind::LeftParen, "expected '(' after 'switch'")?;
        let discriminant = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after switch value")?;
        self.consume(TokenKind::LeftBrace, "expected '{' before switch cases")?;

        self.context.breakable_depth += 1;
        let cases = self.parse_switch_cases();
        self.context.breakable_depth -= 1;
        let cases = cases?;

        let end = self
            .consume(TokenKind::RightBrace, "expected '}' after switch cases")?
            .span;
        Ok(Stmt::Switch {
            discriminant,
            cases,
            span: start.merge(end),
        })
    }

    fn parse_switch_cases(&mut self) -> Result<Vec<SwitchCase>, ()> {
        let mut cases = Vec::new();
        let mut seen_default = false;

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            let case_start = self.peek().span;
            let test = if self.match_token(TokenKind::Case) {
                Some(self.parse_expression()?)
            } else if self.match_token(TokenKind::Default) {
                if seen_default {
                    self.error_at(case_start, "More than one default clause in switch statement");
                    return Err(());
                }
                seen_default = true;
                None
            } else {
                self.error_unexpected(Some("expected 'case' or 'default'"));
                return Err(());
            };
            self.consume(TokenKind::Colon, "expected ':' after case")?;

            let mut body = Vec::new();
            while !matches!(
                self.peek().kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RightBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }
            let span = body
                .last()
                .map(|s| case_start.merge(s.span()))
                .unwrap_or(case_start);
            cases.push(SwitchCase { test, body, span });
        }
        Ok(cases)
    }

    fn parse_labeled(&mut self) -> Result<Stmt, ()> {
        let label = self.advance().clone();
        self.advance(); // ':'

        if self.context.labels.contains(&label.lexeme) {
            self.error_at(
                label.span,
                &format!("Label '{}' has already been declared", label.lexeme),
            );
            return Err(());
        }

        self.context.labels.push(label.lexeme.clone());
        let body = self.parse_statement();
        self.context.labels.pop();
        let body = Box::new(body?);

        let span = label.span.merge(body.span());
        Ok(Stmt::Labeled {
            label: label.lexeme,
            body,
            span,
        })
    }

    /// Parse a function body with a fresh jump context
    pub(super) fn parse_function_body(&mut self, context: FunctionContext) -> Result<Block, ()> {
        let saved = std::mem::replace(&mut self.context, context);
        let saved_no_in = std::mem::replace(&mut self.no_in, false);
        let block = self.parse_block();
        self.context = saved;
        self.no_in = saved_no_in;
        block
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{first_message, parse_ok};
    use crate::ast::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("for (let i = 0; i < 3; i++) {}")]
    #[case("for (;;) { break; }")]
    #[case("for (const x of [1, 2]) {}")]
    #[case("for (const [k, v] of map) {}")]
    #[case("for (key in obj) {}")]
    #[case("for (let i = 0, j = 10; i < j; i++, j--) {}")]
    #[case("do { x++ } while (x < 3)")]
    #[case("outer: for (const a of xs) { for (const b of ys) { continue outer; } }")]
    #[case("switch (x) { case 1: case 2: y = 1; break; default: y = 2 }")]
    #[case("try { f() } catch { g() } finally { h() }")]
    #[case("try { f() } catch ({ message }) { g(message) }")]
    #[case("class A { static make() { return new A(); } x = 1; constructor() { this.y = 2; } }")]
    #[case("let { a, b: [c, d = 4], ...rest } = obj;")]
    fn test_statements_parse(#[case] source: &str) {
        parse_ok(source);
    }

    #[test]
    fn test_for_of_head_is_declaration() {
        let program = parse_ok("for (const [node, d] of queue) {}");
        match &program.body[0] {
            Stmt::ForOf {
                left: ForHead::Declaration(VarKind::Const, Pattern::Array { elements, .. }),
                ..
            } => assert_eq!(elements.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_in_inside_for_init_parentheses_is_allowed() {
        let program = parse_ok("for (let ok = ('a' in obj); ok; ok = false) {}");
        assert!(matches!(program.body[0], Stmt::For { .. }));
    }

    #[test]
    fn test_declaration_errors() {
        assert_eq!(
            first_message("const x;"),
            "Missing initializer in const declaration"
        );
        assert_eq!(
            first_message("let [a, b];"),
            "Missing initializer in destructuring declaration"
        );
        assert_eq!(
            first_message("try { }"),
            "Unexpected end of input, expected 'catch' or 'finally' after try block"
        );
        assert_eq!(
            first_message("x: while (1) { break y; }"),
            "Undefined label 'y'"
        );
    }
}
