//! Lexer for the ccvm C-subset front end.
//!
//! Converts a source string into a flat token stream using `logos` for the
//! raw scanning, then folds the generated token enum down into `cc_ast`'s
//! public [`Token`] type — the same two-stage shape as a Logos-backed
//! lexer elsewhere in this codebase: a private `#[derive(Logos)]` enum the
//! lexer never leaks, and a stable public token type everything else
//! depends on.

use cc_ast::{Keyword, Operator, Span, Token, TokenKind};
use logos::Logos;
use thiserror::Error;

#[derive(Logos, Debug, Clone, PartialEq)]
enum Raw {
    #[regex(r"[ \t\r]+", logos::skip)]
    Whitespace,

    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*", lex_block_comment)]
    BlockComment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| i64::from_str_radix(&lex.slice()[2..], 16).ok())]
    #[regex(r"0[0-7]*", |lex| i64::from_str_radix(lex.slice(), 8).ok())]
    #[regex(r"[1-9][0-9]*", |lex| lex.slice().parse().ok())]
    Integer(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse().ok())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse().ok())]
    Number(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(&lex.slice()[1..lex.slice().len()-1]))]
    Str(String),

    #[token("<<=")]
    ShlEq,
    #[token(">>=")]
    ShrEq,
    #[token("...")]
    Ellipsis,
    #[token("->")]
    Arrow,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Equal,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("#")]
    Hash,
    #[token("\\")]
    Backslash,
}

fn lex_block_comment(lex: &mut logos::Lexer<Raw>) -> logos::Skip {
    let remainder = lex.remainder();
    if let Some(end) = remainder.find("*/") {
        lex.bump(end + 2);
    } else {
        lex.bump(remainder.len());
    }
    logos::Skip
}

fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            other => out.push(other),
        }
    }
    Some(out)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character {char:?} at line {line}")]
    UnexpectedCharacter { char: char, line: u32 },
    #[error("invalid number literal {text:?} at line {line}")]
    InvalidNumber { text: String, line: u32 },
}

/// Controls whether layout tokens the parser never wants are preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexFlags {
    /// Keep `Newline` tokens instead of treating them as whitespace.
    /// The preprocessor's directive scanner needs these to find the end of
    /// a `#define`/`#include` line; the parser proper never asks for them.
    pub preserve_newlines: bool,
}

pub fn lex(source: &str, flags: LexFlags) -> Result<Vec<Token>, Vec<LexError>> {
    let mut raw = Raw::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut line: u32 = 1;
    let mut last_end = 0usize;

    while let Some(result) = raw.next() {
        let range = raw.span();
        for c in source[last_end..range.start].chars() {
            if c == '\n' {
                line += 1;
            }
        }
        let column = (range.start - source[..range.start].rfind('\n').map(|i| i + 1).unwrap_or(0)) as u32 + 1;
        let span = Span::new(range.start as u32, range.end as u32, line, column);

        match result {
            Ok(raw_tok) => {
                if matches!(raw_tok, Raw::Newline) {
                    line += 1;
                    if flags.preserve_newlines {
                        tokens.push(Token::new(TokenKind::Newline, span));
                    }
                } else if let Some(kind) = convert(raw_tok) {
                    tokens.push(Token::new(kind, span));
                }
            }
            Err(_) => {
                let ch = source[range.start..].chars().next().unwrap_or('\0');
                errors.push(LexError::UnexpectedCharacter { char: ch, line });
            }
        }
        last_end = range.end;
    }

    let eof_span = Span::new(source.len() as u32, source.len() as u32, line, 1);
    tokens.push(Token::new(TokenKind::Eof, eof_span));

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

fn convert(raw: Raw) -> Option<TokenKind> {
    use Raw::*;
    Some(match raw {
        Ident(s) => match Keyword::from_str(&s) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(s),
        },
        Integer(i) => TokenKind::Integer(i),
        Number(n) => TokenKind::Number(n),
        Str(s) => TokenKind::Str(s),
        ShlEq => TokenKind::Operator(Operator::ShlEq),
        ShrEq => TokenKind::Operator(Operator::ShrEq),
        Ellipsis => TokenKind::Operator(Operator::Ellipsis),
        Arrow => TokenKind::Operator(Operator::Arrow),
        Shl => TokenKind::Operator(Operator::Shl),
        Shr => TokenKind::Operator(Operator::Shr),
        EqEq => TokenKind::Operator(Operator::EqEq),
        NotEq => TokenKind::Operator(Operator::NotEq),
        Le => TokenKind::Operator(Operator::Le),
        Ge => TokenKind::Operator(Operator::Ge),
        PlusEq => TokenKind::Operator(Operator::PlusEq),
        MinusEq => TokenKind::Operator(Operator::MinusEq),
        StarEq => TokenKind::Operator(Operator::StarEq),
        SlashEq => TokenKind::Operator(Operator::SlashEq),
        PercentEq => TokenKind::Operator(Operator::PercentEq),
        AmpEq => TokenKind::Operator(Operator::AmpEq),
        PipeEq => TokenKind::Operator(Operator::PipeEq),
        CaretEq => TokenKind::Operator(Operator::CaretEq),
        PlusPlus => TokenKind::Operator(Operator::PlusPlus),
        MinusMinus => TokenKind::Operator(Operator::MinusMinus),
        Plus => TokenKind::Punct('+'),
        Minus => TokenKind::Punct('-'),
        Star => TokenKind::Punct('*'),
        Slash => TokenKind::Punct('/'),
        Percent => TokenKind::Punct('%'),
        Equal => TokenKind::Punct('='),
        Lt => TokenKind::Punct('<'),
        Gt => TokenKind::Punct('>'),
        Bang => TokenKind::Punct('!'),
        Tilde => TokenKind::Punct('~'),
        Amp => TokenKind::Punct('&'),
        Pipe => TokenKind::Punct('|'),
        Caret => TokenKind::Punct('^'),
        Question => TokenKind::Punct('?'),
        Colon => TokenKind::Punct(':'),
        Semi => TokenKind::Punct(';'),
        Comma => TokenKind::Punct(','),
        Dot => TokenKind::Punct('.'),
        LParen => TokenKind::Punct('('),
        RParen => TokenKind::Punct(')'),
        LBrace => TokenKind::Punct('{'),
        RBrace => TokenKind::Punct('}'),
        LBracket => TokenKind::Punct('['),
        RBracket => TokenKind::Punct(']'),
        Hash => TokenKind::Punct('#'),
        Backslash => TokenKind::Punct('\\'),
        Whitespace | LineComment | BlockComment | Newline => unreachable!("skipped above"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, LexFlags::default()).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_punct() {
        let k = kinds("if (x) { return 1; }");
        assert_eq!(
            k,
            vec![
                TokenKind::Keyword(Keyword::If),
                TokenKind::Punct('('),
                TokenKind::Ident("x".into()),
                TokenKind::Punct(')'),
                TokenKind::Punct('{'),
                TokenKind::Keyword(Keyword::Return),
                TokenKind::Integer(1),
                TokenKind::Punct(';'),
                TokenKind::Punct('}'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_multi_char_operators_longest_match() {
        let k = kinds("a <<= b >= c == d");
        assert!(k.contains(&TokenKind::Operator(Operator::Ge)));
        assert!(k.contains(&TokenKind::Operator(Operator::EqEq)));
    }

    #[test]
    fn lexes_hex_octal_decimal() {
        assert_eq!(kinds("0x1F")[0], TokenKind::Integer(31));
        assert_eq!(kinds("017")[0], TokenKind::Integer(15));
        assert_eq!(kinds("42")[0], TokenKind::Integer(42));
    }

    #[test]
    fn string_literal_unescapes() {
        let k = kinds(r#""hi\n""#);
        assert_eq!(k[0], TokenKind::Str("hi\n".to_string()));
    }

    #[test]
    fn reports_unexpected_character() {
        let err = lex("@", LexFlags::default()).unwrap_err();
        assert_eq!(err[0], LexError::UnexpectedCharacter { char: '@', line: 1 });
    }

    #[test]
    fn preserves_newlines_when_requested() {
        let toks = lex("a\nb", LexFlags { preserve_newlines: true }).unwrap();
        assert!(toks.iter().any(|t| matches!(t.kind, TokenKind::Newline)));
    }
}
