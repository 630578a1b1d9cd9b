//! Type declarator parsing (spec §4.1 "Type declarators").

use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;
use cc_ast::{Keyword, NodeId, NodeKind, Primitive, TokenKind};

fn primitive_of(kw: Keyword) -> Option<Primitive> {
    Some(match kw {
        Keyword::Char => Primitive::Char,
        Keyword::Short => Primitive::Short,
        Keyword::Int => Primitive::Int,
        Keyword::Long => Primitive::Long,
        Keyword::Float => Primitive::Float,
        Keyword::Double => Primitive::Double,
        Keyword::Void => Primitive::Void,
        _ => return None,
    })
}

/// True when the cursor sits on something that can start a type specifier.
/// Used by statement dispatch to distinguish a declaration from an
/// expression statement.
pub fn at_type_start(p: &Parser) -> bool {
    if p.cur.check_keyword(Keyword::Const) || p.cur.check_keyword(Keyword::Unsigned) {
        return true;
    }
    matches!(p.cur.peek_kind(), TokenKind::Keyword(kw) if primitive_of(*kw).is_some())
        || p.cur.check_keyword(Keyword::Struct)
        || p.cur.check_keyword(Keyword::Union)
}

/// Parses `const? (unsigned)? primitive-keyword const? '*'*`, producing a
/// chain of `PointerDataType` nodes wrapping one `PrimitiveDataType`/
/// `StructDataType` leaf (spec §4.1: "each `*` token... wraps the running
/// type in a pointer").
pub fn parse_type_specifier(p: &mut Parser) -> ParseResult<NodeId> {
    let mut is_const = p.cur.eat_keyword(Keyword::Const);
    let _unsigned = p.cur.eat_keyword(Keyword::Unsigned);
    let span = p.cur.peek_span();

    let mut ty = if p.cur.check_keyword(Keyword::Struct) || p.cur.check_keyword(Keyword::Union) {
        parse_struct_or_union(p, is_const)?
    } else {
        let kw = match p.cur.peek_kind().clone() {
            TokenKind::Keyword(kw) if primitive_of(kw).is_some() => kw,
            other => return Err(ParseError::expected(span, other, "a type specifier")),
        };
        p.cur.advance();
        let primitive = primitive_of(kw).unwrap();
        p.arena.alloc(NodeKind::PrimitiveDataType { primitive, is_const }, span)
    };

    is_const = is_const || p.cur.eat_keyword(Keyword::Const);
    while p.cur.eat_punct('*') {
        let star_span = p.cur.peek_span();
        let wrapped = p.arena.alloc(NodeKind::PointerDataType { pointee: ty, is_const }, star_span);
        p.arena.set_parent(ty, wrapped);
        ty = wrapped;
        is_const = p.cur.eat_keyword(Keyword::Const);
    }

    Ok(ty)
}

/// Parses `struct|union [tag] [{ field-list }]`, producing a
/// `StructDataType` wrapping the tag's `StructDecl` node.
///
/// A bare `struct Tag` with no body looks the tag up in the parser's
/// registry (it must have been declared with a body earlier in the
/// translation unit). A `struct Tag { ... }` or anonymous `struct { ... }`
/// declares (or redeclares) the tag and registers it.
fn parse_struct_or_union(p: &mut Parser, is_const: bool) -> ParseResult<NodeId> {
    let is_union = p.cur.check_keyword(Keyword::Union);
    let kw_span = p.cur.peek_span();
    p.cur.advance(); // consume `struct` or `union`

    let tag = if let TokenKind::Ident(_) = p.cur.peek_kind() {
        let (name, _) = p.cur.expect_ident()?;
        Some(name)
    } else {
        None
    };

    let decl = if p.cur.check_punct('{') {
        let decl = parse_struct_body(p, tag.clone(), is_union, kw_span)?;
        if let Some(name) = &tag {
            p.structs.insert(name.clone(), decl);
        }
        decl
    } else {
        match &tag {
            Some(name) => *p
                .structs
                .get(name)
                .ok_or_else(|| {
                    ParseError::new(
                        kw_span,
                        p.cur.peek_kind().clone(),
                        format!("undeclared struct/union tag '{name}'"),
                    )
                })?,
            None => {
                return Err(ParseError::expected(kw_span, p.cur.peek_kind().clone(), "a struct/union tag or body"))
            }
        }
    };

    // StructDataType carries no const flag of its own; const-ness applies
    // at the use site (pointer/variable), matching how PrimitiveDataType's
    // `is_const` field is consumed only when building the variable.
    let _ = is_const;
    Ok(p.arena.alloc(NodeKind::StructDataType { decl }, kw_span))
}

/// Parses `{ (type-specifier declarator ';')* }`, one `VariableDecl` per
/// field (fields reuse the same node shape as locals; codegen distinguishes
/// them by their containing `StructDecl` rather than a separate field type).
fn parse_struct_body(p: &mut Parser, name: Option<String>, is_union: bool, span: cc_ast::Span) -> ParseResult<NodeId> {
    p.cur.expect_punct('{')?;
    let mut fields = Vec::new();
    while !p.cur.check_punct('}') {
        let base_ty = parse_type_specifier(p)?;
        let (field_name, field_span) = p.cur.expect_ident()?;
        let field_ty = crate::decl::parse_array_suffix(p, base_ty)?;
        let field = p.arena.alloc(
            NodeKind::VariableDecl { name: field_name, data_type: field_ty, initializer: None },
            field_span,
        );
        p.arena.set_parent(field_ty, field);
        fields.push(field);
        p.cur.expect_punct(';')?;
    }
    p.cur.expect_punct('}')?;

    let decl = p.arena.alloc(NodeKind::StructDecl { name, fields: fields.clone(), is_union }, span);
    for field in fields {
        p.arena.set_parent(field, decl);
    }
    Ok(decl)
}

/// Wraps `base` in `count` `ArrayDataType` layers, innermost first, one per
/// trailing `[N]` suffix (spec §4.1: "each `[N]` wraps the type in an
/// array-of-N layer").
pub fn wrap_array_dims(p: &mut Parser, base: NodeId, dims: &[(u32, cc_ast::Span)]) -> NodeId {
    let mut ty = base;
    for &(size, span) in dims.iter().rev() {
        let wrapped = p.arena.alloc(NodeKind::ArrayDataType { element: ty, size }, span);
        p.arena.set_parent(ty, wrapped);
        ty = wrapped;
    }
    ty
}
