//! Token cursor: a thin read-only view over the token stream with
//! single-token lookahead, the shape every recursive-descent level
//! in this parser drives through.

use crate::error::{ParseError, ParseResult};
use cc_ast::{Keyword, Operator, Span, Token, TokenKind};

#[derive(Clone)]
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub fn peek_span(&self) -> Span {
        self.peek().span
    }

    pub fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn check_punct(&self, c: char) -> bool {
        matches!(self.peek_kind(), TokenKind::Punct(p) if *p == c)
    }

    pub fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    pub fn check_operator(&self, op: Operator) -> bool {
        matches!(self.peek_kind(), TokenKind::Operator(o) if *o == op)
    }

    pub fn eat_punct(&mut self, c: char) -> bool {
        if self.check_punct(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn eat_operator(&mut self, op: Operator) -> bool {
        if self.check_operator(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_punct(&mut self, c: char) -> ParseResult<Span> {
        let span = self.peek_span();
        if self.eat_punct(c) {
            Ok(span)
        } else {
            Err(ParseError::expected(span, self.peek_kind().clone(), &format!("'{c}'")))
        }
    }

    pub fn expect_keyword(&mut self, kw: Keyword) -> ParseResult<Span> {
        let span = self.peek_span();
        if self.eat_keyword(kw) {
            Ok(span)
        } else {
            Err(ParseError::expected(span, self.peek_kind().clone(), &format!("'{kw}'")))
        }
    }

    pub fn expect_ident(&mut self) -> ParseResult<(String, Span)> {
        let span = self.peek_span();
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, span))
            }
            other => Err(ParseError::expected(span, other, "an identifier")),
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }
}
