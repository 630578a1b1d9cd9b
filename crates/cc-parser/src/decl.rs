//! Top-level function declarators and in-body variable declarations
//! (spec §4.1 "Top level" / "Variable declaration inside statements").

use crate::error::{ParseError, ParseResult};
use crate::expr;
use crate::parser::Parser;
use crate::types;
use cc_ast::{NodeId, NodeKind, Operator, Param, Span, TokenKind};

/// A program is a sequence of function declarations, consumed until `EOF`.
pub fn parse_program(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    let mut functions = Vec::new();
    while !p.cur.is_eof() {
        functions.push(parse_function(p)?);
    }
    let root = p.arena.alloc(NodeKind::Program { functions: functions.clone() }, span);
    for f in functions {
        p.arena.set_parent(f, root);
    }
    Ok(root)
}

/// `type-declarator identifier '(' params ')' block`.
fn parse_function(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    let return_type = types::parse_type_specifier(p)?;
    let (name, _) = p.cur.expect_ident()?;
    p.cur.expect_punct('(')?;
    let params = parse_param_list(p)?;
    p.cur.expect_punct(')')?;

    let func = p.arena.alloc(
        NodeKind::FunctionDecl {
            name,
            return_type,
            params: params.clone(),
            body: None,
            declarations: Vec::new(),
        },
        span,
    );
    p.arena.set_parent(return_type, func);
    for param in &params {
        if let Param::Named { ty, .. } = param {
            p.arena.set_parent(*ty, func);
        }
    }

    let outer_function = p.current_function.replace(func);
    let body = crate::stmt::parse_block(p)?;
    p.current_function = outer_function;
    p.arena.set_parent(body, func);

    if let NodeKind::FunctionDecl { body: slot, .. } = &mut p.arena.get_mut(func).kind {
        *slot = Some(body);
    }

    Ok(func)
}

/// Each parameter is a type-declarator followed by an identifier; the
/// variadic marker `...` ends the list (spec §4.1).
fn parse_param_list(p: &mut Parser) -> ParseResult<Vec<Param>> {
    let mut params = Vec::new();
    if p.cur.check_punct(')') {
        return Ok(params);
    }
    loop {
        if p.cur.eat_operator(Operator::Ellipsis) {
            params.push(Param::Variadic);
            break;
        }
        let span = p.cur.peek_span();
        let ty = types::parse_type_specifier(p)?;
        let (name, _) = p.cur.expect_ident()?;
        params.push(Param::Named { ty, name, span });
        if !p.cur.eat_punct(',') {
            break;
        }
    }
    Ok(params)
}

/// `type-declarator declarator ( ',' declarator )*` where each declarator is
/// `identifier array-suffix? ( '=' assignment-expr )?`. A single declarator
/// yields its `VariableDecl` directly; more than one is folded into a
/// `SeqExpr` the same way a `for`-init comma list is (spec §4.1's state
/// machine note: "the init slot may itself be a comma-separated sequence").
pub fn parse_declaration(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    let base_ty = types::parse_type_specifier(p)?;

    let mut decls = Vec::new();
    loop {
        let (name, name_span) = p.cur.expect_ident()?;
        let data_type = parse_array_suffix(p, base_ty)?;
        let initializer = if p.cur.eat_punct('=') { Some(expr::parse_assignment(p)?) } else { None };

        let decl = p.arena.alloc(NodeKind::VariableDecl { name, data_type, initializer }, name_span);
        p.arena.set_parent(data_type, decl);
        if let Some(init) = initializer {
            p.arena.set_parent(init, decl);
        }
        p.record_declaration(decl);
        decls.push(decl);

        if !p.cur.eat_punct(',') {
            break;
        }
    }

    if decls.len() == 1 {
        Ok(decls[0])
    } else {
        let seq = p.arena.alloc(NodeKind::SeqExpr { exprs: decls.clone() }, span);
        for d in decls {
            p.arena.set_parent(d, seq);
        }
        Ok(seq)
    }
}

/// Zero or more trailing `[N]` suffixes wrapping `base`, innermost first
/// (spec §4.1: "only constant integer sizes are accepted; `N > 0` is
/// enforced").
pub(crate) fn parse_array_suffix(p: &mut Parser, base: NodeId) -> ParseResult<NodeId> {
    let mut dims = Vec::new();
    while p.cur.eat_punct('[') {
        let span = p.cur.peek_span();
        let size = expect_positive_const(p, span)?;
        p.cur.expect_punct(']')?;
        dims.push((size, span));
    }
    Ok(types::wrap_array_dims(p, base, &dims))
}

fn expect_positive_const(p: &mut Parser, span: Span) -> ParseResult<u32> {
    match p.cur.peek_kind().clone() {
        TokenKind::Integer(v) if v > 0 => {
            p.cur.advance();
            Ok(v as u32)
        }
        other => Err(ParseError::new(span, other, "array size must be a constant integer greater than zero")),
    }
}
