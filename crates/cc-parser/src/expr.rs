//! Expression grammar: the fixed 14-level precedence ladder of spec §4.1,
//! lowest binding first. Each level is one function calling the next
//! tighter one; levels 10/11 (postfix subscript, postfix `++`/`--`) and
//! field access live together in [`parse_postfix`] since they all attach
//! directly to a primary expression rather than recursing through a
//! binary-operator level.

use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;
use crate::types;
use cc_ast::{AssignOp, BinOp, NodeId, NodeKind, Operator, SizeofTarget, TokenKind, UnaryOp};

/// Level 0: comma sequence. Its value is the last sub-expression's
/// (spec §4.2 lvalue/rvalue table: `e1, e2, ..., en` → "evaluate all; value
/// is `en`'s").
pub fn parse_expression(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    let first = parse_assignment(p)?;
    if !p.cur.check_punct(',') {
        return Ok(first);
    }
    let mut exprs = vec![first];
    while p.cur.eat_punct(',') {
        exprs.push(parse_assignment(p)?);
    }
    let seq = p.arena.alloc(NodeKind::SeqExpr { exprs: exprs.clone() }, span);
    for e in exprs {
        p.arena.set_parent(e, seq);
    }
    Ok(seq)
}

/// Level 1: `=` and the compound-assignment operators, right-associative.
pub fn parse_assignment(p: &mut Parser) -> ParseResult<NodeId> {
    let target = parse_ternary(p)?;
    let span = p.cur.peek_span();

    let op = if p.cur.check_punct('=') {
        Some(AssignOp::Assign)
    } else if let TokenKind::Operator(op) = p.cur.peek_kind() {
        match op {
            Operator::PlusEq => Some(AssignOp::AddAssign),
            Operator::MinusEq => Some(AssignOp::SubAssign),
            Operator::StarEq => Some(AssignOp::MulAssign),
            Operator::SlashEq => Some(AssignOp::DivAssign),
            Operator::PercentEq => Some(AssignOp::ModAssign),
            Operator::AmpEq => Some(AssignOp::AndAssign),
            Operator::PipeEq => Some(AssignOp::OrAssign),
            Operator::CaretEq => Some(AssignOp::XorAssign),
            _ => None,
        }
    } else {
        None
    };

    let Some(op) = op else {
        return Ok(target);
    };
    p.cur.advance();
    let value = parse_assignment(p)?;
    let node = p.arena.alloc(NodeKind::AssignmentExpr { op, target, value }, span);
    p.arena.set_parent(target, node);
    p.arena.set_parent(value, node);
    Ok(node)
}

/// Level 2: `c ? t : e`, right-associative in the alternative branch.
fn parse_ternary(p: &mut Parser) -> ParseResult<NodeId> {
    let condition = parse_bitor(p)?;
    if !p.cur.eat_punct('?') {
        return Ok(condition);
    }
    let span = p.cur.peek_span();
    let consequent = parse_expression(p)?;
    p.cur.expect_punct(':')?;
    let alternative = parse_ternary(p)?;
    let node = p.arena.alloc(NodeKind::TernaryExpr { condition, consequent, alternative }, span);
    p.arena.set_parent(condition, node);
    p.arena.set_parent(consequent, node);
    p.arena.set_parent(alternative, node);
    Ok(node)
}

macro_rules! left_assoc_binop {
    ($name:ident, $next:ident, $( $punct:literal => $op:expr ),+ $(,)?) => {
        fn $name(p: &mut Parser) -> ParseResult<NodeId> {
            let mut lhs = $next(p)?;
            loop {
                let span = p.cur.peek_span();
                let op = match () {
                    $( _ if p.cur.check_punct($punct) => Some($op), )+
                    _ => None,
                };
                let Some(op) = op else { break };
                p.cur.advance();
                let rhs = $next(p)?;
                let node = p.arena.alloc(NodeKind::BinExpr { op, lhs, rhs }, span);
                p.arena.set_parent(lhs, node);
                p.arena.set_parent(rhs, node);
                lhs = node;
            }
            Ok(lhs)
        }
    };
}

left_assoc_binop!(parse_bitor, parse_bitxor, '|' => BinOp::BitOr);
left_assoc_binop!(parse_bitxor, parse_bitand, '^' => BinOp::BitXor);
left_assoc_binop!(parse_bitand, parse_equality, '&' => BinOp::BitAnd);

/// Level 6: equality and relational operators share a level in this
/// grammar (spec §4.1 table row 6).
fn parse_equality(p: &mut Parser) -> ParseResult<NodeId> {
    let mut lhs = parse_shift(p)?;
    loop {
        let span = p.cur.peek_span();
        let op = match p.cur.peek_kind() {
            TokenKind::Operator(Operator::EqEq) => Some(BinOp::Eq),
            TokenKind::Operator(Operator::NotEq) => Some(BinOp::Ne),
            TokenKind::Operator(Operator::Le) => Some(BinOp::Le),
            TokenKind::Operator(Operator::Ge) => Some(BinOp::Ge),
            TokenKind::Punct('<') => Some(BinOp::Lt),
            TokenKind::Punct('>') => Some(BinOp::Gt),
            _ => None,
        };
        let Some(op) = op else { break };
        p.cur.advance();
        let rhs = parse_shift(p)?;
        let node = p.arena.alloc(NodeKind::BinExpr { op, lhs, rhs }, span);
        p.arena.set_parent(lhs, node);
        p.arena.set_parent(rhs, node);
        lhs = node;
    }
    Ok(lhs)
}

/// Level 7: `<<` `>>`.
fn parse_shift(p: &mut Parser) -> ParseResult<NodeId> {
    let mut lhs = parse_additive(p)?;
    loop {
        let span = p.cur.peek_span();
        let op = match p.cur.peek_kind() {
            TokenKind::Operator(Operator::Shl) => Some(BinOp::Shl),
            TokenKind::Operator(Operator::Shr) => Some(BinOp::Shr),
            _ => None,
        };
        let Some(op) = op else { break };
        p.cur.advance();
        let rhs = parse_additive(p)?;
        let node = p.arena.alloc(NodeKind::BinExpr { op, lhs, rhs }, span);
        p.arena.set_parent(lhs, node);
        p.arena.set_parent(rhs, node);
        lhs = node;
    }
    Ok(lhs)
}

left_assoc_binop!(parse_additive, parse_multiplicative, '+' => BinOp::Add, '-' => BinOp::Sub);
left_assoc_binop!(parse_multiplicative, parse_unary, '*' => BinOp::Mul, '/' => BinOp::Div, '%' => BinOp::Mod);

/// Level 12: prefix unary operators, right-associative (applies to its
/// own result for chained `!!x`, `--x`, etc).
fn parse_unary(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();

    if p.cur.check_keyword(cc_ast::Keyword::Sizeof) {
        return parse_sizeof(p);
    }

    if let Some(cast) = try_parse_cast(p, span)? {
        return Ok(cast);
    }

    let op = if p.cur.check_punct('-') {
        Some(UnaryOp::Neg)
    } else if p.cur.check_punct('+') {
        Some(UnaryOp::Plus)
    } else if p.cur.check_punct('!') {
        Some(UnaryOp::Not)
    } else if p.cur.check_punct('~') {
        Some(UnaryOp::BitNot)
    } else {
        None
    };
    if let Some(op) = op {
        p.cur.advance();
        let operand = parse_unary(p)?;
        let node = p.arena.alloc(NodeKind::UnaryExpr { op, operand }, span);
        p.arena.set_parent(operand, node);
        return Ok(node);
    }

    if p.cur.eat_operator(Operator::PlusPlus) {
        let operand = parse_unary(p)?;
        let node = p.arena.alloc(NodeKind::UnaryExpr { op: UnaryOp::PreInc, operand }, span);
        p.arena.set_parent(operand, node);
        return Ok(node);
    }
    if p.cur.eat_operator(Operator::MinusMinus) {
        let operand = parse_unary(p)?;
        let node = p.arena.alloc(NodeKind::UnaryExpr { op: UnaryOp::PreDec, operand }, span);
        p.arena.set_parent(operand, node);
        return Ok(node);
    }

    if p.cur.eat_punct('*') {
        let operand = parse_unary(p)?;
        let node = p.arena.alloc(NodeKind::Dereference { operand }, span);
        p.arena.set_parent(operand, node);
        return Ok(node);
    }
    if p.cur.eat_punct('&') {
        let operand = parse_unary(p)?;
        let node = p.arena.alloc(NodeKind::AddressOf { operand }, span);
        p.arena.set_parent(operand, node);
        return Ok(node);
    }

    parse_postfix(p)
}

/// `(type-specifier) cast-expr` — only recognizable by speculatively
/// entering the parens and checking for a type specifier; a plain
/// parenthesized expression (`(x)`) backs out and falls through to
/// [`parse_postfix`]'s primary-expression handling.
fn try_parse_cast(p: &mut Parser, span: cc_ast::Span) -> ParseResult<Option<NodeId>> {
    if !p.cur.check_punct('(') {
        return Ok(None);
    }
    let save = p.cur.clone();
    p.cur.advance();
    if !types::at_type_start(p) {
        p.cur = save;
        return Ok(None);
    }
    let ty = types::parse_type_specifier(p)?;
    let ty = crate::decl::parse_array_suffix(p, ty)?;
    if !p.cur.eat_punct(')') {
        // Not actually a cast (e.g. a struct-tag expression form this
        // grammar doesn't support) — let the caller's normal path fail
        // with a clearer message than this speculative attempt would.
        p.cur = save;
        return Ok(None);
    }
    let operand = parse_unary(p)?;
    let node = p.arena.alloc(NodeKind::Cast { target_type: ty, operand }, span);
    p.arena.set_parent(ty, node);
    p.arena.set_parent(operand, node);
    Ok(Some(node))
}

/// `sizeof` accepts either a parenthesized type (only recognizable when a
/// type specifier can start at that position) or an expression.
fn parse_sizeof(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    p.cur.advance(); // `sizeof`

    if p.cur.check_punct('(') {
        let save = p.cur.clone();
        p.cur.advance();
        if types::at_type_start(p) {
            let ty = types::parse_type_specifier(p)?;
            let ty = crate::decl::parse_array_suffix(p, ty)?;
            p.cur.expect_punct(')')?;
            let node = p.arena.alloc(NodeKind::Sizeof { target: SizeofTarget::Type(ty) }, span);
            p.arena.set_parent(ty, node);
            return Ok(node);
        }
        p.cur = save;
    }

    let operand = parse_unary(p)?;
    let node = p.arena.alloc(NodeKind::Sizeof { target: SizeofTarget::Expr(operand) }, span);
    p.arena.set_parent(operand, node);
    Ok(node)
}

/// Levels 10/11 plus field access: a primary expression followed by any
/// number of `[index]`, `.field`, `->field`, postfix `++`/`--` suffixes.
fn parse_postfix(p: &mut Parser) -> ParseResult<NodeId> {
    let mut node = parse_primary(p)?;
    loop {
        let span = p.cur.peek_span();
        if p.cur.eat_punct('[') {
            let index = parse_expression(p)?;
            p.cur.expect_punct(']')?;
            let wrapped = p.arena.alloc(NodeKind::IndexExpr { base: node, index }, span);
            p.arena.set_parent(node, wrapped);
            p.arena.set_parent(index, wrapped);
            node = wrapped;
        } else if p.cur.eat_punct('.') {
            let (field, _) = p.cur.expect_ident()?;
            let wrapped = p.arena.alloc(NodeKind::FieldExpr { base: node, field, arrow: false }, span);
            p.arena.set_parent(node, wrapped);
            node = wrapped;
        } else if p.cur.eat_operator(Operator::Arrow) {
            let (field, _) = p.cur.expect_ident()?;
            let wrapped = p.arena.alloc(NodeKind::FieldExpr { base: node, field, arrow: true }, span);
            p.arena.set_parent(node, wrapped);
            node = wrapped;
        } else if p.cur.eat_operator(Operator::PlusPlus) {
            let wrapped = p.arena.alloc(NodeKind::UnaryExpr { op: UnaryOp::PostInc, operand: node }, span);
            p.arena.set_parent(node, wrapped);
            node = wrapped;
        } else if p.cur.eat_operator(Operator::MinusMinus) {
            let wrapped = p.arena.alloc(NodeKind::UnaryExpr { op: UnaryOp::PostDec, operand: node }, span);
            p.arena.set_parent(node, wrapped);
            node = wrapped;
        } else {
            break;
        }
    }
    Ok(node)
}

/// Level 13: identifier (optionally a call), parenthesized expression,
/// integer literal, string literal.
fn parse_primary(p: &mut Parser) -> ParseResult<NodeId> {
    let span = p.cur.peek_span();
    match p.cur.peek_kind().clone() {
        TokenKind::Integer(value) => {
            p.cur.advance();
            Ok(p.arena.alloc(NodeKind::IntLiteral { value }, span))
        }
        TokenKind::Str(value) => {
            p.cur.advance();
            Ok(p.arena.alloc(NodeKind::StringLiteral { value }, span))
        }
        TokenKind::Ident(name) => {
            p.cur.advance();
            if p.cur.eat_punct('(') {
                let mut args = Vec::new();
                if !p.cur.check_punct(')') {
                    loop {
                        args.push(parse_assignment(p)?);
                        if !p.cur.eat_punct(',') {
                            break;
                        }
                    }
                }
                p.cur.expect_punct(')')?;
                let node = p.arena.alloc(NodeKind::FunctionCallExpr { callee: name, args: args.clone() }, span);
                for a in args {
                    p.arena.set_parent(a, node);
                }
                Ok(node)
            } else {
                Ok(p.arena.alloc(NodeKind::Identifier { name }, span))
            }
        }
        TokenKind::Punct('(') => {
            p.cur.advance();
            let inner = parse_expression(p)?;
            p.cur.expect_punct(')')?;
            Ok(inner)
        }
        other => Err(ParseError::expected(span, other, "an expression")),
    }
}
