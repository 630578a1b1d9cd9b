//! Statement dispatch (spec §4.1 "Statements").

use crate::decl;
use crate::error::ParseResult;
use crate::expr;
use crate::parser::Parser;
use crate::types;
use cc_ast::{Keyword, NodeId, NodeKind};

/// `{ statement* }`.
pub fn parse_block(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.expect_punct('{')?;
    let mut statements = Vec::new();
    while !p.cur.check_punct('}') {
        statements.push(parse_statement(p)?);
    }
    p.cur.expect_punct('}')?;
    let node = p.arena.alloc(NodeKind::BlockStmt { statements: statements.clone() }, span);
    for s in statements {
        p.arena.set_parent(s, node);
    }
    Ok(node)
}

/// Dispatches on the leading token, per spec §4.1's statement table.
pub fn parse_statement(p: &mut Parser) -> ParseResult<NodeId> {
    if p.cur.check_punct('{') {
        return parse_block(p);
    }
    if p.cur.check_keyword(Keyword::If) {
        return parse_if(p);
    }
    if p.cur.check_keyword(Keyword::While) {
        return parse_while(p);
    }
    if p.cur.check_keyword(Keyword::Do) {
        return parse_do_while(p);
    }
    if p.cur.check_keyword(Keyword::For) {
        return parse_for(p);
    }
    if p.cur.check_keyword(Keyword::Return) {
        return parse_return(p);
    }
    if p.cur.check_keyword(Keyword::Break) {
        let span = p.cur.peek_span();
        p.cur.advance();
        p.cur.expect_punct(';')?;
        return Ok(p.arena.alloc(NodeKind::BreakStmt, span));
    }
    if p.cur.check_punct(';') {
        let span = p.cur.peek_span();
        p.cur.advance();
        return Ok(p.arena.alloc(NodeKind::Empty, span));
    }

    // Otherwise: a declaration or an expression statement, each terminated
    // by `;` (spec §4.1: "demand a trailing `;`... otherwise treat the
    // token as the start of an init-statement").
    let span = p.cur.peek_span();
    let node = if types::at_type_start(p) {
        decl::parse_declaration(p)?
    } else {
        let e = expr::parse_expression(p)?;
        let stmt = p.arena.alloc(NodeKind::ExprStmt { expr: e }, span);
        p.arena.set_parent(e, stmt);
        stmt
    };
    p.cur.expect_punct(';')?;
    Ok(node)
}

fn parse_if(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    p.cur.advance(); // `if`
    p.cur.expect_punct('(')?;
    let cond = expr::parse_expression(p)?;
    p.cur.expect_punct(')')?;
    let then_branch = parse_statement(p)?;
    let else_branch = if p.cur.eat_keyword(Keyword::Else) { Some(parse_statement(p)?) } else { None };

    let node = p.arena.alloc(NodeKind::IfStmt { cond, then_branch, else_branch }, span);
    p.arena.set_parent(cond, node);
    p.arena.set_parent(then_branch, node);
    if let Some(e) = else_branch {
        p.arena.set_parent(e, node);
    }
    Ok(node)
}

fn parse_while(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    p.cur.advance(); // `while`
    p.cur.expect_punct('(')?;
    let cond = expr::parse_expression(p)?;
    p.cur.expect_punct(')')?;
    let body = parse_statement(p)?;
    let node = p.arena.alloc(NodeKind::WhileStmt { cond, body }, span);
    p.arena.set_parent(cond, node);
    p.arena.set_parent(body, node);
    Ok(node)
}

fn parse_do_while(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    p.cur.advance(); // `do`
    let body = parse_statement(p)?;
    p.cur.expect_keyword(Keyword::While)?;
    p.cur.expect_punct('(')?;
    let cond = expr::parse_expression(p)?;
    p.cur.expect_punct(')')?;
    p.cur.expect_punct(';')?;
    let node = p.arena.alloc(NodeKind::DoWhileStmt { body, cond }, span);
    p.arena.set_parent(body, node);
    p.arena.set_parent(cond, node);
    Ok(node)
}

fn parse_for(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    p.cur.advance(); // `for`
    p.cur.expect_punct('(')?;

    let init = if p.cur.check_punct(';') {
        None
    } else if types::at_type_start(p) {
        Some(decl::parse_declaration(p)?)
    } else {
        Some(expr::parse_expression(p)?)
    };
    p.cur.expect_punct(';')?;

    let test = if p.cur.check_punct(';') { None } else { Some(expr::parse_expression(p)?) };
    p.cur.expect_punct(';')?;

    let update = if p.cur.check_punct(')') { None } else { Some(expr::parse_expression(p)?) };
    p.cur.expect_punct(')')?;

    let body = parse_statement(p)?;

    let node = p.arena.alloc(NodeKind::ForStmt { init, test, update, body }, span);
    if let Some(i) = init {
        p.arena.set_parent(i, node);
    }
    if let Some(t) = test {
        p.arena.set_parent(t, node);
    }
    if let Some(u) = update {
        p.arena.set_parent(u, node);
    }
    p.arena.set_parent(body, node);
    Ok(node)
}

fn parse_return(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    p.cur.advance(); // `return`
    let value = if p.cur.check_punct(';') { None } else { Some(expr::parse_expression(p)?) };
    p.cur.expect_punct(';')?;
    let node = p.arena.alloc(NodeKind::ReturnStmt { value }, span);
    if let Some(v) = value {
        p.arena.set_parent(v, node);
    }
    Ok(node)
}
