//! Expression type inference (spec §4.2): every rvalue/lvalue compilation
//! step needs to know an expression's `CType` before it can pick an operand
//! size or validate a binary operator's operands, so this runs ahead of
//! (and is called throughout) `expr.rs`.

use crate::error::{CodegenError, CodegenResult};
use crate::layout::{ctype_of, CType};
use cc_ast::{BinOp, FunctionRecord, NodeArena, NodeId, NodeKind, Primitive};
use rustc_hash::FxHashMap;

/// Read-only context type inference needs: the current function's locals
/// (for `Identifier`) and the whole-program function table (for a call
/// expression's return type — this compiler has no declared return-type
/// annotation on the call site, so it has to look the callee up).
pub struct TypeCtx<'a> {
    pub arena: &'a NodeArena,
    pub function: &'a FunctionRecord,
    pub functions: &'a FxHashMap<String, NodeId>,
    pub word_size: u32,
}

/// Infers the [`CType`] of an expression node without compiling it.
/// Mirrors the lvalue/rvalue table's own type bookkeeping (spec §4.2): a
/// `FieldExpr`/`IndexExpr`/`Dereference` peels one layer off its base's
/// type, a `BinExpr` takes its left operand's type, `Sizeof` and the
/// relational/logical results are always `int`.
pub fn infer_ctype(ctx: &TypeCtx, node: NodeId) -> CodegenResult<CType> {
    match ctx.arena.kind(node) {
        NodeKind::IntLiteral { .. } => Ok(CType::Primitive(Primitive::Int)),
        NodeKind::StringLiteral { .. } => Ok(CType::Primitive(Primitive::Char).pointer_to()),

        NodeKind::Identifier { name } => ctx
            .function
            .variables
            .get(name)
            .map(|v| ctype_of(ctx.arena, v.data_type))
            .ok_or_else(|| CodegenError::UnknownIdentifier { name: name.clone(), node }),

        NodeKind::IndexExpr { base, .. } => {
            let base_ty = infer_ctype(ctx, *base)?;
            base_ty.inner().cloned().ok_or_else(|| CodegenError::TypeMismatch {
                node,
                message: "indexed expression is not a pointer or array".into(),
            })
        }

        NodeKind::Dereference { operand } => {
            let base_ty = infer_ctype(ctx, *operand)?;
            base_ty.inner().cloned().ok_or_else(|| CodegenError::TypeMismatch {
                node,
                message: "dereferenced expression is not a pointer".into(),
            })
        }

        NodeKind::AddressOf { operand } => Ok(infer_ctype(ctx, *operand)?.pointer_to()),

        NodeKind::FieldExpr { base, field, arrow } => {
            let base_ty = infer_ctype(ctx, *base)?;
            let struct_ty = if *arrow {
                base_ty.inner().cloned().ok_or_else(|| CodegenError::TypeMismatch {
                    node,
                    message: "'->' applied to a non-pointer".into(),
                })?
            } else {
                base_ty
            };
            let CType::Struct(decl) = struct_ty else {
                return Err(CodegenError::TypeMismatch { node, message: "'.'/'->' applied to a non-struct".into() });
            };
            let (_, field_ty) = crate::layout::field_offset(ctx.arena, node, decl, field, ctx.word_size)?;
            Ok(ctype_of(ctx.arena, field_ty))
        }

        NodeKind::Cast { target_type, .. } => Ok(ctype_of(ctx.arena, *target_type)),

        NodeKind::UnaryExpr { operand, .. } => infer_ctype(ctx, *operand),

        NodeKind::AssignmentExpr { target, .. } => infer_ctype(ctx, *target),

        NodeKind::SeqExpr { exprs } => {
            let last = exprs.last().ok_or_else(|| CodegenError::TypeMismatch {
                node,
                message: "empty comma expression".into(),
            })?;
            infer_ctype(ctx, *last)
        }

        NodeKind::TernaryExpr { consequent, .. } => infer_ctype(ctx, *consequent),

        NodeKind::BinExpr { op, lhs, .. } => match op {
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                Ok(CType::Primitive(Primitive::Int))
            }
            _ => infer_ctype(ctx, *lhs),
        },

        NodeKind::FunctionCallExpr { callee, .. } => {
            if let Some(&decl) = ctx.functions.get(callee) {
                let NodeKind::FunctionDecl { return_type, .. } = ctx.arena.kind(decl) else { unreachable!() };
                Ok(ctype_of(ctx.arena, *return_type))
            } else {
                // Unresolved symbol (syscall/import/int3): spec's dynamic
                // call targets carry no declared type, so the driver treats
                // their result as a plain `int` for the caller's purposes.
                Ok(CType::Primitive(Primitive::Int))
            }
        }

        NodeKind::Sizeof { .. } => Ok(CType::Primitive(Primitive::Long)),

        other => Err(CodegenError::TypeMismatch { node, message: format!("not an expression: {other:?}") }),
    }
}
