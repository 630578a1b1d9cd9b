//! Parse error type (spec §4.1: "fail-fast... first error aborts the whole parse").

use cc_ast::{Span, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
    pub line: u32,
    pub offending: TokenKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(span: Span, offending: TokenKind, message: impl Into<String>) -> Self {
        Self { line: span.line, offending, message: message.into(), span }
    }

    pub fn expected(span: Span, offending: TokenKind, expected: &str) -> Self {
        Self::new(span, offending.clone(), format!("expected {expected}, found {offending}"))
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
