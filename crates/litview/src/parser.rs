/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! Splits template text into literal segments and placeholders, then parses
//! each placeholder with a recursive-descent expression parser. Operator
//! precedence follows JavaScript, lowest first:
//!
//! ```text
//! arrow / conditional   a ? b : c, x => e
//! nullish               ??
//! logical or            ||
//! logical and           &&
//! equality              == != === !==
//! relational            < <= > >=
//! additive              + -
//! multiplicative        * / %
//! unary                 ! - + typeof
//! postfix               .name ?.name [i] (args)
//! primary               literals, names, (expr), [array]
//! ```

use crate::ast::{BinaryOp, Expr, LogicalOp, Placeholder, TemplateNode, UnaryOp};
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{
    EscapeMode, MAX_NESTING_DEPTH, Segment, Token, TokenKind, error_at, split_segments, tokenize,
};
use crate::value::Value;

/// Parse template source into AST nodes.
pub fn parse_template(source: &str) -> TemplateResult<Vec<TemplateNode>> {
    let segments = split_segments(source, 0, source.len(), EscapeMode::Template)?;
    build_nodes(source, segments, 0)
}

/// Parse a standalone expression, e.g. for tests or tooling.
pub fn parse_expression(source: &str) -> TemplateResult<Expr> {
    parse_range(source, 0, source.len(), 0)
}

/// `depth` is the nesting level of the enclosing expression, if any.
fn build_nodes(
    source: &str,
    segments: Vec<Segment>,
    depth: usize,
) -> TemplateResult<Vec<TemplateNode>> {
    segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(text) => Ok(TemplateNode::Literal(text)),
            Segment::Expr { start, end } => Ok(TemplateNode::Placeholder(Placeholder {
                expr: parse_range(source, start, end, depth)?,
                offset: start,
            })),
        })
        .collect()
}

fn parse_range(source: &str, start: usize, end: usize, depth: usize) -> TemplateResult<Expr> {
    let tokens = tokenize(source, start, end)?;
    let mut parser = ExprParser {
        source,
        tokens,
        pos: 0,
        depth,
    };
    let expr = parser.parse_expression()?;
    let token = parser.peek();
    if token.kind != TokenKind::Eof {
        return Err(parser.unexpected(token));
    }
    if depth + expr.depth() > MAX_NESTING_DEPTH {
        return Err(error_at(source, start, "Expression nested too deeply"));
    }
    Ok(expr)
}

/// Expression parser over a pre-tokenized placeholder.
struct ExprParser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Current recursion depth, bounded by [`MAX_NESTING_DEPTH`].
    depth: usize,
}

impl<'a> ExprParser<'a> {
    /// Peek at the current token
    fn peek(&self) -> &Token {
        // The token list always ends with Eof, and `advance` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, pos: usize) -> &TokenKind {
        &self.tokens[pos.min(self.tokens.len() - 1)].kind
    }

    /// Advance to the next token, returning the current one
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    /// Consume token if it matches
    fn consume(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token
    fn expect(&mut self, kind: &TokenKind) -> TemplateResult<Token> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(error_at(
                self.source,
                token.offset,
                format!(
                    "Expected '{}' but found '{}'",
                    kind.describe(),
                    token.kind.describe()
                ),
            ))
        }
    }

    fn unexpected(&self, token: &Token) -> TemplateError {
        error_at(
            self.source,
            token.offset,
            format!("Unexpected '{}'", token.kind.describe()),
        )
    }

    fn too_deep(&self) -> TemplateError {
        error_at(self.source, self.peek().offset, "Expression nested too deeply")
    }

    /// Descend one level, failing past the nesting limit.
    fn enter(&mut self) -> TemplateResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    /// Check a node built by a left-associative loop, where the tree grows
    /// without any recursion.
    fn nested(&self, expr: Expr) -> TemplateResult<Expr> {
        if self.depth + expr.depth() > MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> TemplateResult<Expr> {
        self.enter()?;
        let expr = match self.arrow_params()? {
            Some(params) => Expr::Arrow {
                params,
                body: Box::new(self.parse_expression()?),
            },
            None => self.parse_conditional()?,
        };
        self.depth -= 1;
        Ok(expr)
    }

    /// If an arrow function starts here, consume its parameter list and `=>`.
    fn arrow_params(&mut self) -> TemplateResult<Option<Vec<String>>> {
        match &self.peek().kind {
            TokenKind::Ident(name) if *self.peek_kind_at(self.pos + 1) == TokenKind::Arrow => {
                let name = name.clone();
                self.pos += 2;
                Ok(Some(vec![name]))
            }
            TokenKind::LParen => {
                // Look for `( ident, ... ) =>`
                let mut i = self.pos + 1;
                let mut params = Vec::new();
                loop {
                    match self.peek_kind_at(i) {
                        TokenKind::RParen => break,
                        TokenKind::Ident(name) => {
                            params.push(name.clone());
                            i += 1;
                            match self.peek_kind_at(i) {
                                TokenKind::Comma => i += 1,
                                TokenKind::RParen => break,
                                _ => return Ok(None),
                            }
                        }
                        _ => return Ok(None),
                    }
                }
                if *self.peek_kind_at(i + 1) != TokenKind::Arrow {
                    return Ok(None);
                }
                self.pos = i + 2;
                Ok(Some(params))
            }
            _ => Ok(None),
        }
    }

    /// Parse conditional expression (ternary: test ? a : b)
    fn parse_conditional(&mut self) -> TemplateResult<Expr> {
        let test = self.parse_nullish()?;
        if !self.consume(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn parse_nullish(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_or()?;
        while self.consume(&TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            left = self.nested(logical(LogicalOp::Nullish, left, right))?;
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_and()?;
        while self.consume(&TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = self.nested(logical(LogicalOp::Or, left, right))?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.consume(&TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = self.nested(logical(LogicalOp::And, left, right))?;
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Equal,
                TokenKind::NotEq => BinaryOp::NotEqual,
                TokenKind::EqEqEq => BinaryOp::StrictEqual,
                TokenKind::NotEqEq => BinaryOp::StrictNotEqual,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.nested(binary(op, left, right))?;
        }
    }

    fn parse_relational(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.nested(binary(op, left, right))?;
        }
    }

    fn parse_additive(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.nested(binary(op, left, right))?;
        }
    }

    fn parse_multiplicative(&mut self) -> TemplateResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Multiply,
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Percent => BinaryOp::Remainder,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.nested(binary(op, left, right))?;
        }
    }

    fn parse_unary(&mut self) -> TemplateResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            _ => return self.parse_postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> TemplateResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                    };
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    expr = match self.peek().kind {
                        TokenKind::LBracket => {
                            self.advance();
                            self.finish_index(expr, true)?
                        }
                        TokenKind::LParen => {
                            self.advance();
                            self.finish_call(expr, true)?
                        }
                        _ => Expr::Member {
                            object: Box::new(expr),
                            property: self.property_name()?,
                            optional: true,
                        },
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.finish_index(expr, false)?;
                }
                TokenKind::LParen => {
                    self.advance();
                    expr = self.finish_call(expr, false)?;
                }
                _ => return Ok(expr),
            }
            expr = self.nested(expr)?;
        }
    }

    fn property_name(&mut self) -> TemplateResult<String> {
        let token = self.advance();
        match token.kind.property_name() {
            Some(name) => Ok(name.to_string()),
            None => Err(error_at(
                self.source,
                token.offset,
                format!(
                    "Expected property name but found '{}'",
                    token.kind.describe()
                ),
            )),
        }
    }

    fn finish_index(&mut self, object: Expr, optional: bool) -> TemplateResult<Expr> {
        let index = self.parse_expression()?;
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
            optional,
        })
    }

    fn finish_call(&mut self, callee: Expr, optional: bool) -> TemplateResult<Expr> {
        let args = self.parse_list(&TokenKind::RParen)?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            args,
            optional,
        })
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn parse_list(&mut self, close: &TokenKind) -> TemplateResult<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.consume(close) {
            items.push(self.parse_expression()?);
            if !self.consume(&TokenKind::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn parse_primary(&mut self) -> TemplateResult<Expr> {
        let token = self.advance();
        let expr = match token.kind {
            TokenKind::Number(n) => Expr::Literal(Value::Number(n)),
            TokenKind::String(s) => Expr::Literal(Value::String(s)),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::Null => Expr::Literal(Value::Null),
            TokenKind::Undefined => Expr::Literal(Value::Undefined),
            TokenKind::Ident(name) => Expr::Identifier(name),
            TokenKind::Template(segments) => {
                Expr::Template(build_nodes(self.source, segments, self.depth)?)
            }
            TokenKind::LParen => {
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                inner
            }
            TokenKind::LBracket => Expr::Array(self.parse_list(&TokenKind::RBracket)?),
            _ => return Err(self.unexpected(&token)),
        };
        Ok(expr)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
