//! Expression parsing (Pratt parsing)

use super::{FunctionContext, Parser, Precedence};
use crate::ast::*;
use crate::span::Span;
use crate::token::TokenKind;
use crate::value::number_to_string;
use std::rc::Rc;

impl Parser {
    /// Parse a comma-separated expression
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ()> {
        let first = self.parse_assignment()?;
        if !self.check(TokenKind::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.match_token(TokenKind::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        let span = expressions[0]
            .span()
            .merge(expressions[expressions.len() - 1].span());
        Ok(Expr::Sequence(expressions, span))
    }

    /// Parse an assignment expression (including arrow functions)
    pub(super) fn parse_assignment(&mut self) -> Result<Expr, ()> {
        self.enter()?;
        let result = self.parse_assignment_inner();
        self.leave();
        result
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, ()> {
        if self.is_arrow_ahead() {
            return self.parse_arrow();
        }

        let left = self.parse_conditional()?;

        let op = match self.peek().kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::Compound(BinaryOp::Add),
            TokenKind::MinusEqual => AssignOp::Compound(BinaryOp::Sub),
            TokenKind::StarEqual => AssignOp::Compound(BinaryOp::Mul),
            TokenKind::StarStarEqual => AssignOp::Compound(BinaryOp::Exp),
            TokenKind::SlashEqual => AssignOp::Compound(BinaryOp::Div),
            TokenKind::PercentEqual => AssignOp::Compound(BinaryOp::Mod),
            TokenKind::LessLessEqual => AssignOp::Compound(BinaryOp::Shl),
            TokenKind::GreaterGreaterEqual => AssignOp::Compound(BinaryOp::Shr),
            TokenKind::GreaterGreaterGreaterEqual => AssignOp::Compound(BinaryOp::UShr),
            TokenKind::AmpEqual => AssignOp::Compound(BinaryOp::BitAnd),
            TokenKind::PipeEqual => AssignOp::Compound(BinaryOp::BitOr),
            TokenKind::CaretEqual => AssignOp::Compound(BinaryOp::BitXor),
            TokenKind::AmpAmpEqual => AssignOp::Logical(LogicalOp::And),
            TokenKind::PipePipeEqual => AssignOp::Logical(LogicalOp::Or),
            TokenKind::QuestionQuestionEqual => AssignOp::Logical(LogicalOp::Nullish),
            _ => return Ok(left),
        };
        self.advance();

        let target = if op == AssignOp::Assign {
            self.expr_to_pattern(left)?
        } else {
            match left {
                Expr::Identifier(id) => Pattern::Identifier(id),
                Expr::Member {
                    optional: false, ..
                } => Pattern::Member(Box::new(left)),
                other => {
                    self.error_at(other.span(), "Invalid left-hand side in assignment");
                    return Err(());
                }
            }
        };

        let value = self.parse_assignment()?;
        let span = target.span().merge(value.span());
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
            span,
        })
    }

    /// Whether the upcoming tokens start an arrow function
    fn is_arrow_ahead(&self) -> bool {
        match self.peek().kind {
            TokenKind::Identifier => {
                let next = self.peek_at(1);
                next.kind == TokenKind::Arrow && !next.newline_before
            }
            TokenKind::LeftParen => {
                let mut depth = 0usize;
                let mut offset = 0;
                loop {
                    let token = self.peek_at(offset);
                    match token.kind {
                        TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                            depth += 1
                        }
                        TokenKind::RightParen | TokenKind::RightBracket | TokenKind::RightBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                let next = self.peek_at(offset + 1);
                                return token.kind == TokenKind::RightParen
                                    && next.kind == TokenKind::Arrow
                                    && !next.newline_before;
                            }
                        }
                        TokenKind::Eof => return false,
                        _ => {}
                    }
                    offset += 1;
                }
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<Expr, ()> {
        let start = self.peek().span;
        let (params, rest) = if self.check(TokenKind::Identifier) {
            let id = self.consume_identifier("a parameter name")?;
            (vec![Pattern::Identifier(id)], None)
        } else {
            self.parse_params()?
        };
        self.consume(TokenKind::Arrow, "expected '=>'")?;

        let context = FunctionContext {
            in_function: true,
            in_method: self.context.in_method,
            in_derived_constructor: self.context.in_derived_constructor,
            ..FunctionContext::default()
        };
        let body = if self.check(TokenKind::LeftBrace) {
            FunctionBody::Block(self.parse_function_body(context)?.statements)
        } else {
            let saved = std::mem::replace(&mut self.context, context);
            let expr = self.parse_assignment();
            self.context = saved;
            FunctionBody::Expression(Box::new(expr?))
        };

        let span = start.merge(self.previous().span);
        Ok(Expr::Function(Rc::new(FunctionNode {
            name: None,
            params,
            rest,
            body,
            is_arrow: true,
            span,
        })))
    }

    /// Parse `( params )` including defaults and a trailing rest parameter
    fn parse_params(&mut self) -> Result<(Vec<Pattern>, Option<Pattern>), ()> {
        self.consume(TokenKind::LeftParen, "expected '(' before parameters")?;
        let mut params = Vec::new();
        let mut rest = None;

        while !self.check(TokenKind::RightParen) {
            if self.match_token(TokenKind::Ellipsis) {
                rest = Some(self.parse_binding_target()?);
                if self.check(TokenKind::Comma) {
                    self.error_at(self.peek().span, "Rest parameter must be last formal parameter");
                    return Err(());
                }
                break;
            }
            params.push(self.parse_binding_element()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;
        Ok((params, rest))
    }

    /// Parse parameters and body after `function name`
    pub(super) fn parse_function_rest(
        &mut self,
        name: Option<Identifier>,
        start: Span,
        is_method: bool,
    ) -> Result<FunctionNode, ()> {
        let (params, rest) = self.parse_params()?;
        let context = FunctionContext {
            in_function: true,
            in_method: is_method,
            ..FunctionContext::default()
        };
        let body = self.parse_function_body(context)?;
        Ok(FunctionNode {
            name,
            params,
            rest,
            span: start.merge(body.span),
            body: FunctionBody::Block(body.statements),
            is_arrow: false,
        })
    }

    /// `function*` is rejected with a clear message
    pub(super) fn reject_generator(&mut self) -> Result<(), ()> {
        if self.check(TokenKind::Star) {
            self.error_unsupported(self.peek().span, "Generator functions");
            return Err(());
        }
        Ok(())
    }

    // === Patterns ===

    /// Parse an identifier, array pattern or object pattern
    pub(super) fn parse_binding_target(&mut self) -> Result<Pattern, ()> {
        match self.peek().kind {
            TokenKind::Identifier => Ok(Pattern::Identifier(self.consume_identifier("a name")?)),
            TokenKind::LeftBracket => self.parse_array_pattern(),
            TokenKind::LeftBrace => self.parse_object_pattern(),
            _ => {
                self.error_unexpected(Some("expected a variable name"));
                Err(())
            }
        }
    }

    /// A binding target with an optional `= default`
    fn parse_binding_element(&mut self) -> Result<Pattern, ()> {
        let target = self.parse_binding_target()?;
        if self.match_token(TokenKind::Equal) {
            let default = self.allow_in(|p| p.parse_assignment())?;
            let span = target.span().merge(default.span());
            Ok(Pattern::Default {
                target: Box::new(target),
                default: Box::new(default),
                span,
            })
        } else {
            Ok(target)
        }
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ()> {
        let start = self.advance().span;
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.check(TokenKind::RightBracket) {
            if self.match_token(TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            if self.match_token(TokenKind::Ellipsis) {
                rest = Some(Box::new(self.parse_binding_target()?));
                break;
            }
            elements.push(Some(self.parse_binding_element()?));
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end = self
            .consume(TokenKind::RightBracket, "expected ']' after array pattern")?
            .span;
        Ok(Pattern::Array {
            elements,
            rest,
            span: start.merge(end),
        })
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, ()> {
        let start = self.advance().span;
        let mut properties = Vec::new();
        let mut rest = None;

        while !self.check(TokenKind::RightBrace) {
            if self.match_token(TokenKind::Ellipsis) {
                rest = Some(Box::new(Pattern::Identifier(
                    self.consume_identifier("a rest binding name")?,
                )));
                break;
            }

            let key_token = self.peek().clone();
            let key = self.parse_property_key()?;
            let value = if self.match_token(TokenKind::Colon) {
                self.parse_binding_element()?
            } else {
                if key_token.kind != TokenKind::Identifier {
                    self.error_unexpected(Some("expected ':' in object pattern"));
                    return Err(());
                }
                let target = Pattern::Identifier(Identifier {
                    name: key_token.lexeme.clone(),
                    span: key_token.span,
                });
                if self.match_token(TokenKind::Equal) {
                    let default = self.allow_in(|p| p.parse_assignment())?;
                    let span = key_token.span.merge(default.span());
                    Pattern::Default {
                        target: Box::new(target),
                        default: Box::new(default),
                        span,
                    }
                } else {
                    target
                }
            };
            let span = key_token.span.merge(value.span());
            properties.push(PatternProperty { key, value, span });

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end = self
            .consume(TokenKind::RightBrace, "expected '}' after object pattern")?
            .span;
        Ok(Pattern::Object {
            properties,
            rest,
            span: start.merge(end),
        })
    }

    /// Reinterpret an already-parsed expression as an assignment target
    pub(super) fn expr_to_pattern(&mut self, expr: Expr) -> Result<Pattern, ()> {
        match expr {
            Expr::Identifier(id) => Ok(Pattern::Identifier(id)),
            Expr::Member {
                optional: false, ..
            } => Ok(Pattern::Member(Box::new(expr))),
            Expr::Array { elements, span } => {
                let mut patterns = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, element) in elements.into_iter().enumerate() {
                    match element {
                        ArrayElement::Hole => patterns.push(None),
                        ArrayElement::Expr(e) => patterns.push(Some(self.expr_to_pattern(e)?)),
                        ArrayElement::Spread(e) if i + 1 == count => {
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                        ArrayElement::Spread(e) => {
                            self.error_at(e.span(), "Rest element must be last element");
                            return Err(());
                        }
                    }
                }
                Ok(Pattern::Array {
                    elements: patterns,
                    rest,
                    span,
                })
            }
            Expr::Object { properties, span } => {
                let mut patterns = Vec::new();
                let mut rest = None;
                for property in properties {
                    match property {
                        ObjectProperty::KeyValue { key, value, span } => {
                            let value = self.expr_to_pattern(value)?;
                            patterns.push(PatternProperty { key, value, span });
                        }
                        ObjectProperty::Spread(e) => {
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                    }
                }
                Ok(Pattern::Object {
                    properties: patterns,
                    rest,
                    span,
                })
            }
            Expr::Assign {
                op: AssignOp::Assign,
                target,
                value,
                span,
            } => Ok(Pattern::Default {
                target,
                default: value,
                span,
            }),
            other => {
                self.error_at(other.span(), "Invalid left-hand side in assignment");
                Err(())
            }
        }
    }

    // === Operators ===

    fn parse_conditional(&mut self) -> Result<Expr, ()> {
        let test = self.parse_binary(Precedence::Or)?;
        if !self.match_token(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.allow_in(|p| p.parse_assignment())?;
        self.consume(TokenKind::Colon, "expected ':' in conditional expression")?;
        let alternate = self.parse_assignment()?;
        let span = test.span().merge(alternate.span());
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span,
        })
    }

    fn binary_operator(&self) -> Option<(Precedence, Result<BinaryOp, LogicalOp>)> {
        let op = match self.peek().kind {
            TokenKind::PipePipe => (Precedence::Or, Err(LogicalOp::Or)),
            TokenKind::QuestionQuestion => (Precedence::Or, Err(LogicalOp::Nullish)),
            TokenKind::AmpAmp => (Precedence::And, Err(LogicalOp::And)),
            TokenKind::Pipe => (Precedence::BitOr, Ok(BinaryOp::BitOr)),
            TokenKind::Caret => (Precedence::BitXor, Ok(BinaryOp::BitXor)),
            TokenKind::Amp => (Precedence::BitAnd, Ok(BinaryOp::BitAnd)),
            TokenKind::EqualEqual => (Precedence::Equality, Ok(BinaryOp::Eq)),
            TokenKind::BangEqual => (Precedence::Equality, Ok(BinaryOp::NotEq)),
            TokenKind::EqualEqualEqual => (Precedence::Equality, Ok(BinaryOp::StrictEq)),
            TokenKind::BangEqualEqual => (Precedence::Equality, Ok(BinaryOp::StrictNotEq)),
            TokenKind::Less => (Precedence::Relational, Ok(BinaryOp::Lt)),
            TokenKind::LessEqual => (Precedence::Relational, Ok(BinaryOp::Le)),
            TokenKind::Greater => (Precedence::Relational, Ok(BinaryOp::Gt)),
            TokenKind::GreaterEqual => (Precedence::Relational, Ok(BinaryOp::Ge)),
            TokenKind::Instanceof => (Precedence::Relational, Ok(BinaryOp::Instanceof)),
            TokenKind::In if !self.no_in => (Precedence::Relational, Ok(BinaryOp::In)),
            TokenKind::LessLess => (Precedence::Shift, Ok(BinaryOp::Shl)),
            TokenKind::GreaterGreater => (Precedence::Shift, Ok(BinaryOp::Shr)),
            TokenKind::GreaterGreaterGreater => (Precedence::Shift, Ok(BinaryOp::UShr)),
            TokenKind::Plus => (Precedence::Term, Ok(BinaryOp::Add)),
            TokenKind::Minus => (Precedence::Term, Ok(BinaryOp::Sub)),
            TokenKind::Star => (Precedence::Factor, Ok(BinaryOp::Mul)),
            TokenKind::Slash => (Precedence::Factor, Ok(BinaryOp::Div)),
            TokenKind::Percent => (Precedence::Factor, Ok(BinaryOp::Mod)),
            TokenKind::StarStar => (Precedence::Exponent, Ok(BinaryOp::Exp)),
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over binary and logical operators
    fn parse_binary(&mut self, min: Precedence) -> Result<Expr, ()> {
        let mut left = self.parse_unary()?;

        while let Some((precedence, op)) = self.binary_operator() {
            if precedence < min {
                break;
            }
            self.advance();
            // `**` is right-associative
            let next = if precedence == Precedence::Exponent {
                precedence
            } else {
                precedence.tighter()
            };
            let right = self.parse_binary(next)?;
            let span = left.span().merge(right.span());
            left = match op {
                Ok(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                },
                Err(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                },
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ()> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Typeof => Some(UnaryOp::Typeof),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };

        if let Some(op) = op {
            let start = self.advance().span;
            self.enter()?;
            let operand = self.parse_unary();
            self.leave();
            let operand = operand?;
            let span = start.merge(operand.span());
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }

        if matches!(self.peek().kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let token = self.advance().clone();
            let op = if token.kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.enter()?;
            let target = self.parse_unary();
            self.leave();
            let target = self.check_update_target(target?)?;
            let span = token.span.merge(target.span());
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(target),
                span,
            });
        }

        self.parse_postfix()
    }

    fn check_update_target(&mut self, target: Expr) -> Result<Expr, ()> {
        match target {
            Expr::Identifier(_)
            | Expr::Member {
                optional: false, ..
            } => Ok(target),
            other => {
                self.error_at(
                    other.span(),
                    "Invalid left-hand side expression in update operation",
                );
                Err(())
            }
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ()> {
        let expr = self.parse_call_member()?;
        let token = self.peek().clone();
        if matches!(token.kind, TokenKind::PlusPlus | TokenKind::MinusMinus) && !token.newline_before
        {
            self.advance();
            let target = self.check_update_target(expr)?;
            let span = target.span().merge(token.span);
            let op = if token.kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            return Ok(Expr::Update {
                op,
                prefix: false,
                target: Box::new(target),
                span,
            });
        }
        Ok(expr)
    }

    /// Parse member accesses, calls and optional chains
    fn parse_call_member(&mut self) -> Result<Expr, ()> {
        let mut expr = match self.peek().kind {
            TokenKind::New => self.parse_new()?,
            TokenKind::Super => self.parse_super()?,
            _ => self.parse_primary()?,
        };
        let mut in_chain = false;

        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.parse_member_name()?;
                    expr = Self::member(expr, property, false, self.previous().span);
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    in_chain = true;
                    if self.check(TokenKind::LeftParen) {
                        let args = self.parse_arguments()?;
                        let span = expr.span().merge(self.previous().span);
                        expr = Expr::Call {
                            callee: Box::new(expr),
                            args,
                            optional: true,
                            span,
                        };
                    } else if self.match_token(TokenKind::LeftBracket) {
                        let property = self.allow_in(|p| p.parse_expression())?;
                        let end = self
                            .consume(TokenKind::RightBracket, "expected ']' after index")?
                            .span;
                        expr = Self::member(
                            expr,
                            MemberProperty::Computed(Box::new(property)),
                            true,
                            end,
                        );
                    } else {
                        let property = self.parse_member_name()?;
                        expr = Self::member(expr, property, true, self.previous().span);
                    }
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let property = self.allow_in(|p| p.parse_expression())?;
                    let end = self
                        .consume(TokenKind::RightBracket, "expected ']' after index")?
                        .span;
                    expr = Self::member(
                        expr,
                        MemberProperty::Computed(Box::new(property)),
                        false,
                        end,
                    );
                }
                TokenKind::LeftParen => {
                    let args = self.parse_arguments()?;
                    let span = expr.span().merge(self.previous().span);
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                        span,
                    };
                }
                TokenKind::Template | TokenKind::TemplateHead => {
                    self.error_unsupported(self.peek().span, "Tagged templates");
                    return Err(());
                }
                _ => break,
            }
        }

        if in_chain {
            let span = expr.span();
            expr = Expr::OptionalChain(Box::new(expr), span);
        }
        Ok(expr)
    }

    fn member(object: Expr, property: MemberProperty, optional: bool, end: Span) -> Expr {
        let span = object.span().merge(end);
        Expr::Member {
            object: Box::new(object),
            property,
            optional,
            span,
        }
    }

    /// Property name after `.`; keywords are allowed
    fn parse_member_name(&mut self) -> Result<MemberProperty, ()> {
        if self.peek().kind.is_word() {
            Ok(MemberProperty::Named(self.advance().lexeme.clone()))
        } else {
            self.error_unexpected(Some("expected a property name after '.'"));
            Err(())
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Argument>, ()> {
        self.consume(TokenKind::LeftParen, "expected '('")?;
        let args = self.allow_in(|p| {
            let mut args = Vec::new();
            while !p.check(TokenKind::RightParen) {
                if p.match_token(TokenKind::Ellipsis) {
                    args.push(Argument::Spread(p.parse_assignment()?));
                } else {
                    args.push(Argument::Expr(p.parse_assignment()?));
                }
                if !p.match_token(TokenKind::Comma) {
                    break;
                }
            }
            Ok(args)
        })?;
        self.consume(TokenKind::RightParen, "expected ')' after arguments")?;
        Ok(args)
    }

    fn parse_new(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span;
        if self.check(TokenKind::Dot) {
            self.error_unsupported(self.peek().span, "new.target expressions");
            return Err(());
        }

        let mut callee = if self.check(TokenKind::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.match_token(TokenKind::Dot) {
                let property = self.parse_member_name()?;
                callee = Self::member(callee, property, false, self.previous().span);
            } else if self.match_token(TokenKind::LeftBracket) {
                let property = self.allow_in(|p| p.parse_expression())?;
                let end = self
                    .consume(TokenKind::RightBracket, "expected ']' after index")?
                    .span;
                callee = Self::member(
                    callee,
                    MemberProperty::Computed(Box::new(property)),
                    false,
                    end,
                );
            } else {
                break;
            }
        }

        let args = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let span = start.merge(self.previous().span);
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn parse_super(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span;
        if self.check(TokenKind::LeftParen) {
            if !self.context.in_derived_constructor {
                self.error_at(start, "'super' keyword unexpected here");
                return Err(());
            }
            let args = self.parse_arguments()?;
            let span = start.merge(self.previous().span);
            return Ok(Expr::SuperCall { args, span });
        }

        if !self.context.in_method {
            self.error_at(start, "'super' keyword unexpected here");
            return Err(());
        }
        let property = if self.match_token(TokenKind::Dot) {
            self.parse_member_name()?
        } else if self.match_token(TokenKind::LeftBracket) {
            let property = self.allow_in(|p| p.parse_expression())?;
            self.consume(TokenKind::RightBracket, "expected ']' after index")?;
            MemberProperty::Computed(Box::new(property))
        } else {
            self.error_at(start, "'super' keyword unexpected here");
            return Err(());
        };
        let span = start.merge(self.previous().span);
        Ok(Expr::SuperMember { property, span })
    }

    // === Primary expressions ===

    fn parse_primary(&mut self) -> Result<Expr, ()> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value = token.lexeme.parse::<f64>().unwrap_or(f64::NAN);
                Ok(Expr::Number(value, token.span))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::String(Rc::from(token.lexeme.as_str()), token.span))
            }
            TokenKind::Template => {
                self.advance();
                Ok(Expr::Template {
                    quasis: vec![Rc::from(token.lexeme.as_str())],
                    expressions: Vec::new(),
                    span: token.span,
                })
            }
            TokenKind::TemplateHead => self.parse_template(),
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(token.kind == TokenKind::True, token.span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null(token.span))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This(token.span))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Identifier(Identifier {
                    name: token.lexeme,
                    span: token.span,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.allow_in(|p| p.parse_expression())?;
                self.consume(TokenKind::RightParen, "expected ')' after expression")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Function => {
                let start = self.advance().span;
                self.reject_generator()?;
                let name = if self.check(TokenKind::Identifier) {
                    Some(self.consume_identifier("a function name")?)
                } else {
                    None
                };
                let function = self.parse_function_rest(name, start, false)?;
                Ok(Expr::Function(Rc::new(function)))
            }
            TokenKind::Class => Ok(Expr::Class(Rc::new(self.parse_class(false)?))),
            TokenKind::Slash | TokenKind::SlashEqual => {
                self.diagnostics.push(
                    crate::diagnostic::Diagnostic::error_with_code(
                        crate::diagnostic::error_codes::UNSUPPORTED,
                        "Regular expression literals are not supported in this sandbox",
                        token.span,
                    )
                    .with_help("use string methods such as split, indexOf or replaceAll"),
                );
                Err(())
            }
            TokenKind::Reserved => {
                let what = match token.lexeme.as_str() {
                    "async" => "async functions",
                    "await" => "await expressions",
                    "yield" => "Generators",
                    "import" | "export" => "Modules",
                    "with" => "with statements",
                    _ => "Reserved words",
                };
                self.error_unsupported(token.span, what);
                Err(())
            }
            _ => {
                self.error_unexpected(None);
                Err(())
            }
        }
    }

    fn parse_template(&mut self) -> Result<Expr, ()> {
        let head = self.advance().clone();
        let mut quasis = vec![Rc::from(head.lexeme.as_str())];
        let mut expressions = Vec::new();

        loop {
            expressions.push(self.allow_in(|p| p.parse_expression())?);
            let token = self.peek().clone();
            match token.kind {
                TokenKind::TemplateMiddle => {
                    self.advance();
                    quasis.push(Rc::from(token.lexeme.as_str()));
                }
                TokenKind::TemplateTail => {
                    self.advance();
                    quasis.push(Rc::from(token.lexeme.as_str()));
                    return Ok(Expr::Template {
                        quasis,
                        expressions,
                        span: head.span.merge(token.span),
                    });
                }
                _ => {
                    self.error_unexpected(Some("expected '}' in template literal"));
                    return Err(());
                }
            }
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span;
        let elements = self.allow_in(|p| {
            let mut elements = Vec::new();
            while !p.check(TokenKind::RightBracket) {
                if p.match_token(TokenKind::Comma) {
                    elements.push(ArrayElement::Hole);
                    continue;
                }
                if p.match_token(TokenKind::Ellipsis) {
                    elements.push(ArrayElement::Spread(p.parse_assignment()?));
                } else {
                    elements.push(ArrayElement::Expr(p.parse_assignment()?));
                }
                if !p.match_token(TokenKind::Comma) {
                    break;
                }
            }
            Ok(elements)
        })?;
        let end = self
            .consume(TokenKind::RightBracket, "expected ']' after array elements")?
            .span;
        Ok(Expr::Array {
            elements,
            span: start.merge(end),
        })
    }

    /// Property key in object literals, object patterns and class bodies
    fn parse_property_key(&mut self) -> Result<PropertyKey, ()> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::String => {
                self.advance();
                Ok(PropertyKey::Named(token.lexeme))
            }
            TokenKind::Number => {
                self.advance();
                let value = token.lexeme.parse::<f64>().unwrap_or(f64::NAN);
                Ok(PropertyKey::Named(number_to_string(value)))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let key = self.allow_in(|p| p.parse_assignment())?;
                self.consume(TokenKind::RightBracket, "expected ']' after computed key")?;
                Ok(PropertyKey::Computed(Box::new(key)))
            }
            kind if kind.is_word() => {
                self.advance();
                Ok(PropertyKey::Named(token.lexeme))
            }
            _ => {
                self.error_unexpected(Some("expected a property name"));
                Err(())
            }
        }
    }

    /// `get`/`set` followed by another key starts an accessor
    fn at_accessor(&self) -> bool {
        (self.check_word("get") || self.check_word("set"))
            && !matches!(
                self.peek_at(1).kind,
                TokenKind::Colon
                    | TokenKind::LeftParen
                    | TokenKind::Comma
                    | TokenKind::RightBrace
                    | TokenKind::Equal
                    | TokenKind::Semicolon
            )
    }

    fn parse_object_literal(&mut self) -> Result<Expr, ()> {
        let start = self.advance().span;
        let properties = self.allow_in(|p| {
            let mut properties = Vec::new();
            while !p.check(TokenKind::RightBrace) {
                properties.push(p.parse_object_property()?);
                if !p.match_token(TokenKind::Comma) {
                    break;
                }
            }
            Ok(properties)
        })?;
        let end = self
            .consume(TokenKind::RightBrace, "expected '}' after object properties")?
            .span;
        Ok(Expr::Object {
            properties,
            span: start.merge(end),
        })
    }

    fn parse_object_property(&mut self) -> Result<ObjectProperty, ()> {
        if self.match_token(TokenKind::Ellipsis) {
            return Ok(ObjectProperty::Spread(self.parse_assignment()?));
        }
        if self.at_accessor() {
            self.error_unsupported(self.peek().span, "Getters and setters");
            return Err(());
        }
        if self.check(TokenKind::Star)
            || (self.check(TokenKind::Reserved)
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::Colon | TokenKind::LeftParen | TokenKind::Comma | TokenKind::RightBrace
                ))
        {
            self.error_unsupported(self.peek().span, "Generator and async methods");
            return Err(());
        }

        let key_token = self.peek().clone();
        let key = self.parse_property_key()?;

        if self.match_token(TokenKind::Colon) {
            let value = self.parse_assignment()?;
            let span = key_token.span.merge(value.span());
            return Ok(ObjectProperty::KeyValue { key, value, span });
        }

        if self.check(TokenKind::LeftParen) {
            let name = match &key {
                PropertyKey::Named(name) => Some(Identifier {
                    name: name.clone(),
                    span: key_token.span,
                }),
                PropertyKey::Computed(_) => None,
            };
            let function = self.parse_function_rest(name, key_token.span, false)?;
            let span = function.span;
            return Ok(ObjectProperty::KeyValue {
                key,
                value: Expr::Function(Rc::new(function)),
                span,
            });
        }

        if key_token.kind != TokenKind::Identifier {
            self.error_unexpected(Some("expected ':' after property name"));
            return Err(());
        }
        let id = Identifier {
            name: key_token.lexeme.clone(),
            span: key_token.span,
        };

        // `{ a = 1 }` is only meaningful as a destructuring target
        if self.match_token(TokenKind::Equal) {
            let default = self.parse_assignment()?;
            let span = key_token.span.merge(default.span());
            return Ok(ObjectProperty::KeyValue {
                key,
                value: Expr::Assign {
                    op: AssignOp::Assign,
                    target: Box::new(Pattern::Identifier(id)),
                    value: Box::new(default),
                    span,
                },
                span,
            });
        }

        Ok(ObjectProperty::KeyValue {
            key,
            value: Expr::Identifier(id),
            span: key_token.span,
        })
    }

    // === Classes ===

    /// Parse a class declaration (`require_name`) or class expression
    pub(super) fn parse_class(&mut self, require_name: bool) -> Result<ClassNode, ()> {
        let start = self.advance().span;
        let name = if self.check(TokenKind::Identifier) {
            Some(self.consume_identifier("a class name")?)
        } else if require_name {
            self.error_unexpected(Some("expected a class name"));
            return Err(());
        } else {
            None
        };

        let superclass = if self.match_token(TokenKind::Extends) {
            Some(Box::new(self.parse_call_member()?))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "expected '{' before class body")?;
        let mut constructor = None;
        let mut members = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if self.match_token(TokenKind::Semicolon) {
                continue;
            }
            let member_start = self.peek().span;
            let is_static = self.check_word("static")
                && !matches!(
                    self.peek_at(1).kind,
                    TokenKind::LeftParen | TokenKind::Equal | TokenKind::Semicolon
                );
            if is_static {
                self.advance();
            }
            if self.at_accessor() {
                self.error_unsupported(self.peek().span, "Getters and setters");
                return Err(());
            }
            if self.check(TokenKind::Star) || self.check(TokenKind::Reserved) {
                self.error_unsupported(self.peek().span, "Generator and async methods");
                return Err(());
            }

            let key_token = self.peek().clone();
            let key = self.parse_property_key()?;

            if self.check(TokenKind::LeftParen) {
                let is_constructor = !is_static
                    && matches!(&key, PropertyKey::Named(n) if n == "constructor")
                    && key_token.kind != TokenKind::String;
                let name = match &key {
                    PropertyKey::Named(name) => Some(Identifier {
                        name: name.clone(),
                        span: key_token.span,
                    }),
                    PropertyKey::Computed(_) => None,
                };

                let (params, rest) = self.parse_params()?;
                let context = FunctionContext {
                    in_function: true,
                    in_method: true,
                    in_derived_constructor: is_constructor && superclass.is_some(),
                    ..FunctionContext::default()
                };
                let body = self.parse_function_body(context)?;
                let function = Rc::new(FunctionNode {
                    name,
                    params,
                    rest,
                    span: key_token.span.merge(body.span),
                    body: FunctionBody::Block(body.statements),
                    is_arrow: false,
                });

                if is_constructor {
                    if constructor.is_some() {
                        self.error_at(key_token.span, "A class may only have one constructor");
                        return Err(());
                    }
                    constructor = Some(function);
                } else {
                    members.push(ClassMember {
                        key,
                        is_static,
                        span: member_start.merge(self.previous().span),
                        kind: ClassMemberKind::Method(function),
                    });
                }
                continue;
            }

            let value = if self.match_token(TokenKind::Equal) {
                let context = FunctionContext {
                    in_function: true,
                    in_method: true,
                    ..FunctionContext::default()
                };
                let saved = std::mem::replace(&mut self.context, context);
                let value = self.allow_in(|p| p.parse_assignment());
                self.context = saved;
                Some(value?)
            } else {
                None
            };
            self.consume_semicolon()?;
            members.push(ClassMember {
                key,
                is_static,
                span: member_start.merge(self.previous().span),
                kind: ClassMemberKind::Field(value),
            });
        }

        let end = self
            .consume(TokenKind::RightBrace, "expected '}' after class body")?
            .span;
        Ok(ClassNode {
            name,
            superclass,
            constructor,
            members,
            span: start.merge(end),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{first_message, parse_ok};
    use crate::ast::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn expr(source: &str) -> Expr {
        let program = parse_ok(source);
        match program.body.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_of_multiplication() {
        match expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_logical_or_binds_loosest() {
        match expr("a || b && c | d") {
            Expr::Logical {
                op: LogicalOp::Or,
                right,
                ..
            } => match *right {
                Expr::Logical {
                    op: LogicalOp::And,
                    right,
                    ..
                } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::BitOr, .. })),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_exponent_is_right_associative() {
        match expr("2 ** 3 ** 2") {
            Expr::Binary {
                op: BinaryOp::Exp,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Number(n, _) if n == 2.0));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Exp, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_swap_destructuring_assignment() {
        match expr("[a[j], a[j + 1]] = [a[j + 1], a[j]]") {
            Expr::Assign { target, .. } => match *target {
                Pattern::Array { elements, rest, .. } => {
                    assert_eq!(elements.len(), 2);
                    assert!(rest.is_none());
                    assert!(matches!(elements[0], Some(Pattern::Member(_))));
                }
                other => panic!("unexpected target {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_arrow_functions() {
        assert!(matches!(expr("x => x * 2"), Expr::Function(f) if f.is_arrow));
        assert!(matches!(expr("(a, b = 1, ...r) => { return a }"), Expr::Function(f) if f.params.len() == 2 && f.rest.is_some()));
        assert!(matches!(expr("({ a }) => a"), Expr::Function(f) if f.is_arrow));
        assert!(matches!(expr("(a + b) * c"), Expr::Binary { .. }));
    }

    #[test]
    fn test_optional_chain_wraps_whole_chain() {
        match expr("a?.b.c()") {
            Expr::OptionalChain(inner, _) => assert!(matches!(*inner, Expr::Call { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_forms() {
        match expr("({ a, 'b': 1, 2: 3, [k]: 4, m() { return 1 }, ...rest })") {
            Expr::Object { properties, .. } => {
                assert_eq!(properties.len(), 6);
                assert!(matches!(
                    &properties[2],
                    ObjectProperty::KeyValue { key: PropertyKey::Named(k), .. } if k == "2"
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_template_literal_parts() {
        match expr("`sum: ${a + b}!`") {
            Expr::Template {
                quasis,
                expressions,
                ..
            } => {
                assert_eq!(quasis.len(), 2);
                assert_eq!(&*quasis[0], "sum: ");
                assert_eq!(&*quasis[1], "!");
                assert_eq!(expressions.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_with_member_callee() {
        match expr("new Foo.Bar(1).baz") {
            Expr::Member { object, .. } => match *object {
                Expr::New { callee, args, .. } => {
                    assert!(matches!(*callee, Expr::Member { .. }));
                    assert_eq!(args.len(), 1);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[rstest]
    #[case("1 = 2", "Invalid left-hand side in assignment")]
    #[case("a + 1 += 2", "Invalid left-hand side in assignment")]
    #[case("f()++", "Invalid left-hand side expression in update operation")]
    #[case("({ get x() { return 1 } })", "Getters and setters are not supported in this sandbox")]
    #[case("function* g() {}", "Generator functions are not supported in this sandbox")]
    #[case("tag`x`", "Tagged templates are not supported in this sandbox")]
    #[case("super.x", "'super' keyword unexpected here")]
    #[case("(1, 2", "Unexpected end of input, expected ')' after expression")]
    fn test_expression_errors(#[case] source: &str, #[case] message: &str) {
        assert_eq!(first_message(source), message);
    }
}
