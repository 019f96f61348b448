use std::ops::Range;

use crate::ast::*;
use crate::error::{ParseError, Result};
use crate::lexer::{self, Lexed};
use crate::token::{Spanned, Token};

/// Parse a block of sketch source into a [`Program`].
pub fn parse(source: &str) -> Result<Program> {
    let lexed = lexer::lex(source)?;
    parse_lexed(&lexed, source.len())
}

/// Parse an already-lexed block. `source_len` is the length of the text the
/// tokens came from.
pub fn parse_lexed(lexed: &Lexed, source_len: usize) -> Result<Program> {
    let mut parser = Parser::new(lexed.tokens.clone());
    let statements = parser.parse_statements(None)?;
    Ok(Program {
        statements,
        comments: lexed.comments.clone(),
        source_len,
    })
}

/// Recursive descent parser for the sketch subset of JavaScript.
///
/// Statements are LL(1); expressions use precedence climbing. Arrow functions
/// are detected by scanning to the matching `)` and checking for `=>`.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self { tokens, pos: 0 }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<Range<usize>> {
        match self.peek_spanned() {
            Some(s) if &s.token == expected => {
                let span = s.span.clone();
                self.pos += 1;
                Ok(span)
            }
            Some(s) => Err(ParseError::unexpected_token(
                expected.describe(),
                s.token.describe(),
                s.span.clone(),
            )),
            None => Err(ParseError::unexpected_eof(expected.describe())),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek_spanned() {
            Some(Spanned {
                token: Token::Ident(name),
                ..
            }) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(s) => Err(ParseError::unexpected_token(
                "identifier",
                s.token.describe(),
                s.span.clone(),
            )),
            None => Err(ParseError::unexpected_eof("identifier")),
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn start(&self) -> usize {
        self.peek_spanned()
            .map(|s| s.span.start)
            .unwrap_or_else(|| self.last_span().end)
    }

    fn last_span(&self) -> Range<usize> {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span.clone()
        } else {
            0..0
        }
    }

    fn finish(&self, start: usize, kind: ExprKind) -> Expr {
        Expr {
            kind,
            span: start..self.last_span().end,
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek_spanned() {
            Some(s) => ParseError::unexpected_token(expected, s.token.describe(), s.span.clone()),
            None => ParseError::unexpected_eof(expected),
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// Parse statements until end of input, or until `terminator` (left
    /// unconsumed) when parsing an arrow block body.
    fn parse_statements(&mut self, terminator: Option<&Token>) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            match (self.peek(), terminator) {
                (None, None) => break,
                (None, Some(t)) => return Err(ParseError::unexpected_eof(t.describe())),
                (Some(tok), Some(t)) if tok == t => break,
                _ => {}
            }
            if self.eat(&Token::Semicolon) {
                continue;
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.start();
        let stmt = match self.peek() {
            Some(Token::Let | Token::Const | Token::Var) => {
                let kind = match self.advance().map(|s| &s.token) {
                    Some(Token::Let) => DeclKind::Let,
                    Some(Token::Const) => DeclKind::Const,
                    _ => DeclKind::Var,
                };
                let name = self.expect_ident()?;
                let init = if self.eat(&Token::Assign) {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                Stmt::Decl {
                    kind,
                    name,
                    init,
                    span: start..self.last_span().end,
                }
            }
            Some(Token::Return) => {
                self.advance();
                let value = match self.peek() {
                    None | Some(Token::Semicolon | Token::RBrace) => None,
                    Some(_) => Some(self.parse_assignment()?),
                };
                Stmt::Return {
                    value,
                    span: start..self.last_span().end,
                }
            }
            _ => Stmt::Expr(self.parse_assignment()?),
        };
        self.eat(&Token::Semicolon);
        Ok(stmt)
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn parse_assignment(&mut self) -> Result<Expr> {
        if self.at_arrow() {
            return self.parse_arrow();
        }

        let start = self.start();
        let target = self.parse_conditional()?;

        let op = match self.peek() {
            Some(Token::Assign) => AssignOp::Assign,
            Some(Token::PlusAssign) => AssignOp::Add,
            Some(Token::MinusAssign) => AssignOp::Sub,
            Some(Token::StarAssign) => AssignOp::Mul,
            Some(Token::SlashAssign) => AssignOp::Div,
            _ => return Ok(target),
        };

        if !matches!(
            target.kind,
            ExprKind::Ident(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        ) {
            return Err(ParseError::message(
                "invalid assignment target",
                Some(target.span.clone()),
            ));
        }

        self.advance(); // consume operator
        let value = self.parse_assignment()?;
        Ok(self.finish(
            start,
            ExprKind::Assign {
                target: Box::new(target),
                op,
                value: Box::new(value),
            },
        ))
    }

    /// Is the parser looking at `x =>` or `( ... ) =>`?
    fn at_arrow(&self) -> bool {
        match self.peek() {
            Some(Token::Ident(_)) => self.peek_at(1) == Some(&Token::Arrow),
            Some(Token::LParen) => {
                let mut depth = 0usize;
                for (i, s) in self.tokens[self.pos..].iter().enumerate() {
                    match s.token {
                        Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                        Token::RParen | Token::RBracket | Token::RBrace => {
                            depth = depth.saturating_sub(1);
                            if depth == 0 {
                                return self.peek_at(i + 1) == Some(&Token::Arrow);
                            }
                        }
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<Expr> {
        let start = self.start();
        let mut params = Vec::new();

        if self.eat(&Token::LParen) {
            while !self.at(&Token::RParen) {
                self.eat(&Token::Spread);
                params.push(self.expect_ident()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen)?;
        } else {
            params.push(self.expect_ident()?);
        }
        self.expect(&Token::Arrow)?;

        let body = if self.eat(&Token::LBrace) {
            let stmts = self.parse_statements(Some(&Token::RBrace))?;
            self.expect(&Token::RBrace)?;
            ArrowBody::Block(stmts)
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment()?))
        };

        Ok(self.finish(start, ExprKind::Arrow { params, body }))
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let start = self.start();
        let test = self.parse_binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.parse_assignment()?;
        self.expect(&Token::Colon)?;
        let alternate = self.parse_assignment()?;
        Ok(self.finish(
            start,
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
        ))
    }

    fn binary_op(&self) -> Option<BinOp> {
        let op = match self.peek()? {
            Token::Nullish => BinOp::Nullish,
            Token::OrOr => BinOp::Or,
            Token::AndAnd => BinOp::And,
            Token::EqEq | Token::EqEqEq => BinOp::Eq,
            Token::NotEq | Token::NotEqEq => BinOp::NotEq,
            Token::Less => BinOp::Lt,
            Token::LessEq => BinOp::LtEq,
            Token::Greater => BinOp::Gt,
            Token::GreaterEq => BinOp::GtEq,
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Sub,
            Token::Star => BinOp::Mul,
            Token::Slash => BinOp::Div,
            Token::Percent => BinOp::Rem,
            Token::StarStar => BinOp::Pow,
            _ => return None,
        };
        Some(op)
    }

    /// Precedence climbing over binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let start = self.start();
        let mut left = self.parse_unary()?;

        while let Some(op) = self.binary_op() {
            if op.precedence() <= min_prec {
                break;
            }
            self.advance(); // consume operator
            let next_min = if op.is_right_assoc() {
                op.precedence() - 1
            } else {
                op.precedence()
            };
            let right = self.parse_binary(next_min)?;
            left = self.finish(
                start,
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Typeof) => UnaryOp::Typeof,
            Some(Token::PlusPlus) => UnaryOp::Increment,
            Some(Token::MinusMinus) => UnaryOp::Decrement,
            _ => return self.parse_postfix(),
        };

        let op_span = self.expect_any()?;
        let bare_number = matches!(self.peek(), Some(Token::Number(_)));
        let operand = self.parse_unary()?;

        // `-0.5` written without a gap is a single signed literal.
        if let (UnaryOp::Neg, ExprKind::Number(v)) = (op, &operand.kind) {
            if bare_number && operand.span.start == op_span.end {
                return Ok(Expr {
                    kind: ExprKind::Number(-v),
                    span: op_span.start..operand.span.end,
                });
            }
        }

        Ok(self.finish(
            op_span.start,
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
        ))
    }

    fn expect_any(&mut self) -> Result<Range<usize>> {
        match self.advance() {
            Some(s) => Ok(s.span.clone()),
            None => Err(ParseError::unexpected_eof("expression")),
        }
    }

    /// Member access, indexing, calls and postfix updates.
    fn parse_postfix(&mut self) -> Result<Expr> {
        let start = self.start();
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let property = self.expect_ident()?;
                    expr = self.finish(
                        start,
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                            optional: false,
                        },
                    );
                }
                Some(Token::OptionalDot) => {
                    self.advance();
                    if self.at(&Token::LParen) || self.at(&Token::LBracket) {
                        // `a?.(x)` / `a?.[i]` continue as a call or index
                        continue;
                    }
                    let property = self.expect_ident()?;
                    expr = self.finish(
                        start,
                        ExprKind::Member {
                            object: Box::new(expr),
                            property,
                            optional: true,
                        },
                    );
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    expr = self.finish(
                        start,
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                    );
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_assignment()?;
                    self.expect(&Token::RBracket)?;
                    expr = self.finish(
                        start,
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                    );
                }
                Some(Token::PlusPlus | Token::MinusMinus) => {
                    let op = if self.at(&Token::PlusPlus) {
                        UnaryOp::Increment
                    } else {
                        UnaryOp::Decrement
                    };
                    self.advance();
                    expr = self.finish(
                        start,
                        ExprKind::Postfix {
                            op,
                            operand: Box::new(expr),
                        },
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.at(&Token::RParen) {
            if self.peek().is_none() {
                return Err(ParseError::unexpected_eof("')'"));
            }
            args.push(self.parse_element()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    /// An argument or array element, which may be a spread.
    fn parse_element(&mut self) -> Result<Expr> {
        let start = self.start();
        if self.eat(&Token::Spread) {
            let inner = self.parse_assignment()?;
            return Ok(self.finish(start, ExprKind::Spread(Box::new(inner))));
        }
        self.parse_assignment()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let start = self.start();
        let kind = match self.peek() {
            Some(Token::Number(v)) => {
                let v = *v;
                self.advance();
                ExprKind::Number(v)
            }
            Some(Token::Str | Token::Template) => {
                self.advance();
                ExprKind::Str
            }
            Some(Token::Ident(_)) => ExprKind::Ident(self.expect_ident()?),
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_assignment()?;
                self.expect(&Token::RParen)?;
                // Parentheses add no node; literal spans must stay exact.
                return Ok(inner);
            }
            Some(Token::LBracket) => {
                self.advance();
                let mut items = Vec::new();
                while !self.at(&Token::RBracket) {
                    if self.peek().is_none() {
                        return Err(ParseError::unexpected_eof("']'"));
                    }
                    items.push(self.parse_element()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
                self.expect(&Token::RBracket)?;
                ExprKind::Array(items)
            }
            Some(Token::LBrace) => {
                self.advance();
                ExprKind::Object(self.parse_object_entries()?)
            }
            _ => return Err(self.unexpected("expression")),
        };
        Ok(self.finish(start, kind))
    }

    fn parse_object_entries(&mut self) -> Result<Vec<(String, Expr)>> {
        let mut entries = Vec::new();
        while !self.at(&Token::RBrace) {
            let key_start = self.start();
            let key = match self.peek() {
                Some(Token::Ident(_)) => self.expect_ident()?,
                Some(Token::Str) => {
                    self.advance();
                    "<string>".to_string()
                }
                _ => return Err(self.unexpected("property name")),
            };
            let value = if self.eat(&Token::Colon) {
                self.parse_assignment()?
            } else {
                // shorthand `{ time }`
                self.finish(key_start, ExprKind::Ident(key.clone()))
            };
            entries.push((key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(entries)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
