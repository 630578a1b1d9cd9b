//! The lvalue/rvalue expression compiler (spec §4.2's central dispatch
//! table), grounded on `original_source/compiler.c`'s `lvalue`/`rvalue`
//! pair — same two-mode split, same per-kind technique, rewritten without
//! the hard-coded `EAX`/`EBX` register choices (a [`crate::regs::RegPool`]
//! ticket stands in for whichever physical register the backend picks).

use crate::ctx::CompileCtx;
use crate::error::{CodegenError, CodegenResult};
use crate::layout::{self, is_floating_ctype, CType};
use crate::regs::RegTicket;
use crate::typeinfer::infer_ctype;
use cc_ast::{AssignOp, BinOp, NodeId, NodeKind, UnaryOp};
use cc_target::{CmpKind, VReg};

/// Rejects a floating-point *value* use outside `sizeof` (SPEC_FULL §5,
/// the resolved Open Question: `float`/`double` parse everywhere a type is
/// legal, but codegen never lowers an operation over one).
fn reject_floating(ctx: &CompileCtx, node: NodeId, ty: &CType) -> CodegenResult<()> {
    if is_floating_ctype(ty) {
        return Err(CodegenError::UnsupportedConstruct {
            node,
            message: "floating-point values are only supported inside sizeof".into(),
        });
    }
    let _ = ctx;
    Ok(())
}

/// Computes the address a value of kind `node` lives at, into a freshly
/// acquired register.
pub fn compile_lvalue(ctx: &mut CompileCtx, node: NodeId) -> CodegenResult<RegTicket> {
    match ctx.arena.kind(node).clone() {
        NodeKind::Identifier { name } => {
            let var = ctx
                .function
                .variables
                .get(&name)
                .cloned()
                .ok_or_else(|| CodegenError::UnknownIdentifier { name: name.clone(), node })?;
            Ok(frame_address(ctx, var.offset))
        }

        NodeKind::Dereference { operand } => {
            // lvalue(*e) == rvalue(e): the address *e* refers to is e's value.
            compile_rvalue(ctx, operand)
        }

        NodeKind::IndexExpr { base, index } => {
            let base_ty = infer_ctype(&ctx.type_ctx(), base)?;
            let elem_ty = base_ty
                .inner()
                .cloned()
                .ok_or_else(|| CodegenError::TypeMismatch { node, message: "subscript of a non-pointer, non-array".into() })?;
            let elem_size = layout::operand_size(ctx.arena, node, &elem_ty, ctx.word_size())?;

            // array base: address is the array's own storage (lvalue(base));
            // pointer base: address is the stored pointer value (rvalue(base)).
            let base_reg = if matches!(base_ty, CType::Array(..)) {
                compile_lvalue(ctx, base)?
            } else {
                compile_rvalue(ctx, base)?
            };

            protect(ctx, &[base_reg]);
            let idx_reg = compile_rvalue(ctx, index)?;
            let base_reg = restore_protected(ctx, 1).remove(0);
            scale_and_add(ctx, base_reg.0, idx_reg.0, elem_size);
            ctx.regs.release(ctx.backend, &mut ctx.code, idx_reg);
            Ok(base_reg)
        }

        NodeKind::FieldExpr { base, field, arrow } => {
            let base_ty = infer_ctype(&ctx.type_ctx(), base)?;
            let struct_ty = if arrow {
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
            let (offset, _) = layout::field_offset(ctx.arena, node, decl, &field, ctx.word_size())?;

            let addr = if arrow { compile_rvalue(ctx, base)? } else { compile_lvalue(ctx, base)? };
            add_offset(ctx, addr.0, offset as i32);
            Ok(addr)
        }

        NodeKind::Cast { operand, .. } => compile_lvalue(ctx, operand),

        other => Err(CodegenError::TypeMismatch { node, message: format!("not an lvalue: {other:?}") }),
    }
}

/// `dst_reg += idx_reg * scale`, the "rvalue(b)·sizeof(elem)" step of the
/// `a[b]` lvalue rule. No dedicated scaled-add op on the codegen interface,
/// so this is built from `imul`/`add` like the original's `EBX += ESI*os`
/// sequence (`compiler.c`'s `AST_MEMBER_EXPR` case).
fn scale_and_add(ctx: &mut CompileCtx, dst_reg: VReg, idx_reg: VReg, scale: u32) {
    if scale != 1 {
        let scale_reg = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
        ctx.backend.mov_r_imm32(&mut ctx.code, scale_reg.0, scale as i32);
        ctx.backend.imul(&mut ctx.code, idx_reg, scale_reg.0);
        ctx.regs.release(ctx.backend, &mut ctx.code, scale_reg);
    }
    ctx.backend.add(&mut ctx.code, dst_reg, idx_reg);
}

/// A local variable's address: `Bp + offset` (spec §4.2's identifier lvalue
/// technique). Shared with `stmt.rs`'s declaration-initializer store, which
/// needs the same address without going through a full `Identifier` AST
/// node lookup.
pub(crate) fn frame_address(ctx: &mut CompileCtx, offset: i32) -> RegTicket {
    let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
    ctx.backend.mov(&mut ctx.code, t.0, VReg::Bp);
    add_offset(ctx, t.0, offset);
    t
}

/// Adds a constant offset to a register, picking the narrower 8-bit
/// immediate form when it fits (mirrors `add_imm8_to_r32`/`add_imm32_to_r32`
/// both existing on the interface for exactly this reason).
fn add_offset(ctx: &mut CompileCtx, reg: VReg, offset: i32) {
    if offset == 0 {
        return;
    }
    if let Ok(small) = i8::try_from(offset) {
        ctx.backend.add_imm8_to_r32(&mut ctx.code, reg, small);
    } else {
        ctx.backend.add_imm32_to_r32(&mut ctx.code, reg, offset);
    }
}

/// Computes the *value* of `node` into a freshly acquired register.
pub fn compile_rvalue(ctx: &mut CompileCtx, node: NodeId) -> CodegenResult<RegTicket> {
    let ty = infer_ctype(&ctx.type_ctx(), node)?;
    reject_floating(ctx, node, &ty)?;

    match ctx.arena.kind(node).clone() {
        NodeKind::IntLiteral { value } => {
            let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.mov_r_imm32(&mut ctx.code, t.0, value as i32);
            Ok(t)
        }

        NodeKind::StringLiteral { value } => {
            let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            let placeholder = ctx.backend.mov_r_string(&mut ctx.code, t.0);
            let mut bytes = value.into_bytes();
            bytes.push(0);
            let data_offset = ctx.backend.add_indexed_data(&mut ctx.data, &bytes);
            ctx.relocations.push(cc_ast::Relocation {
                kind: cc_ast::RelocKind::Data,
                from: placeholder,
                target: cc_ast::RelocTarget::DataOffset(data_offset),
                width: 4,
            });
            Ok(t)
        }

        NodeKind::Identifier { name } => {
            let var = ctx
                .function
                .variables
                .get(&name)
                .cloned()
                .ok_or_else(|| CodegenError::UnknownIdentifier { name, node })?;
            let size = layout::operand_size(ctx.arena, node, &ty, ctx.word_size())?;
            let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.load_base_offset(&mut ctx.code, t.0, VReg::Bp, var.offset, size);
            Ok(t)
        }

        NodeKind::Dereference { operand } => {
            let elem_ty = ty;
            let size = layout::operand_size(ctx.arena, node, &elem_ty, ctx.word_size())?;
            let addr = compile_rvalue(ctx, operand)?;
            ctx.backend.load_reg(&mut ctx.code, addr.0, addr.0, size);
            Ok(addr)
        }

        NodeKind::AddressOf { operand } => compile_lvalue(ctx, operand),

        NodeKind::IndexExpr { .. } | NodeKind::FieldExpr { .. } => {
            let size = layout::operand_size(ctx.arena, node, &ty, ctx.word_size())?;
            let addr = compile_lvalue(ctx, node)?;
            ctx.backend.load_reg(&mut ctx.code, addr.0, addr.0, size);
            Ok(addr)
        }

        NodeKind::Cast { operand, .. } => compile_rvalue(ctx, operand),

        NodeKind::UnaryExpr { op, operand } => compile_unary(ctx, node, op, operand),

        NodeKind::BinExpr { op, lhs, rhs } => compile_binary(ctx, op, lhs, rhs),

        NodeKind::TernaryExpr { condition, consequent, alternative } => {
            compile_ternary(ctx, condition, consequent, alternative)
        }

        NodeKind::AssignmentExpr { op, target, value } => compile_assignment(ctx, op, target, value),

        NodeKind::Sizeof { target } => {
            let sz = match target {
                cc_ast::SizeofTarget::Type(ty_node) => {
                    layout::data_type_size(ctx.arena, ty_node, &crate::layout::ctype_of(ctx.arena, ty_node), ctx.word_size())?
                }
                cc_ast::SizeofTarget::Expr(expr_node) => {
                    let t = infer_ctype(&ctx.type_ctx(), expr_node)?;
                    layout::data_type_size(ctx.arena, expr_node, &t, ctx.word_size())?
                }
            };
            let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.mov_r_imm32(&mut ctx.code, t.0, sz as i32);
            Ok(t)
        }

        NodeKind::FunctionCallExpr { callee, args } => crate::call::compile_call(ctx, node, &callee, &args),

        NodeKind::SeqExpr { exprs } => {
            let mut last = None;
            for (i, e) in exprs.iter().enumerate() {
                let t = compile_rvalue(ctx, *e)?;
                if i + 1 == exprs.len() {
                    last = Some(t);
                } else {
                    ctx.regs.release(ctx.backend, &mut ctx.code, t);
                }
            }
            last.ok_or_else(|| CodegenError::TypeMismatch { node, message: "empty comma expression".into() })
        }

        other => Err(CodegenError::TypeMismatch { node, message: format!("not an rvalue: {other:?}") }),
    }
}

fn compile_unary(ctx: &mut CompileCtx, node: NodeId, op: UnaryOp, operand: NodeId) -> CodegenResult<RegTicket> {
    match op {
        UnaryOp::Neg => {
            let t = compile_rvalue(ctx, operand)?;
            ctx.backend.neg(&mut ctx.code, t.0);
            Ok(t)
        }
        UnaryOp::Plus => compile_rvalue(ctx, operand),
        UnaryOp::BitNot => {
            let t = compile_rvalue(ctx, operand)?;
            // `~x` == `x ^ -1`; the interface has no dedicated NOT op.
            let mask = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.mov_r_imm32(&mut ctx.code, mask.0, -1);
            ctx.backend.xor(&mut ctx.code, t.0, mask.0);
            ctx.regs.release(ctx.backend, &mut ctx.code, mask);
            Ok(t)
        }
        UnaryOp::Not => {
            let t = compile_rvalue(ctx, operand)?;
            let zero = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.mov_r_imm32(&mut ctx.code, zero.0, 0);
            ctx.backend.cmp(&mut ctx.code, t.0, CmpKind::Eq, t.0, zero.0);
            ctx.regs.release(ctx.backend, &mut ctx.code, zero);
            Ok(t)
        }
        UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
            let addr = compile_lvalue(ctx, operand)?;
            let size = layout::operand_size(ctx.arena, operand, &infer_ctype(&ctx.type_ctx(), operand)?, ctx.word_size())?;
            let old = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.load_reg(&mut ctx.code, old.0, addr.0, size);
            let updated = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
            ctx.backend.mov(&mut ctx.code, updated.0, old.0);
            match op {
                UnaryOp::PreInc | UnaryOp::PostInc => ctx.backend.inc(&mut ctx.code, updated.0),
                _ => {
                    let one = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
                    ctx.backend.mov_r_imm32(&mut ctx.code, one.0, 1);
                    ctx.backend.sub(&mut ctx.code, updated.0, one.0);
                    ctx.regs.release(ctx.backend, &mut ctx.code, one);
                }
            }
            ctx.backend.store_reg(&mut ctx.code, addr.0, updated.0, size);
            ctx.regs.release(ctx.backend, &mut ctx.code, addr);
            let _ = node;
            // postfix yields the pre-update value; prefix yields the update.
            match op {
                UnaryOp::PreInc | UnaryOp::PreDec => {
                    ctx.regs.release(ctx.backend, &mut ctx.code, old);
                    Ok(updated)
                }
                _ => {
                    ctx.regs.release(ctx.backend, &mut ctx.code, updated);
                    Ok(old)
                }
            }
        }
    }
}

/// Saves `tickets` across code that may itself exhaust or, via a function
/// call, unconditionally clobber any physical register (`call_imm32` leaves
/// the result in `ReturnValue`'s register with no regard for whatever a
/// live ticket was already holding there) — releases each ticket back to
/// the pool and pushes its value, in the order given. Pair with
/// `restore_protected` once the intervening code has been compiled.
fn protect(ctx: &mut CompileCtx, tickets: &[RegTicket]) {
    for &t in tickets {
        ctx.regs.release(ctx.backend, &mut ctx.code, t);
        ctx.backend.push(&mut ctx.code, t.0);
    }
}

/// Restores `count` tickets saved by `protect`, popping the stack in
/// reverse (LIFO) order and binding each to a freshly acquired register.
/// Returned in the same order they were passed to `protect`.
fn restore_protected(ctx: &mut CompileCtx, count: usize) -> Vec<RegTicket> {
    let mut restored = Vec::with_capacity(count);
    for _ in 0..count {
        let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
        ctx.backend.pop(&mut ctx.code, t.0);
        restored.push(t);
    }
    restored.reverse();
    restored
}

fn compile_binary(ctx: &mut CompileCtx, op: BinOp, lhs: NodeId, rhs: NodeId) -> CodegenResult<RegTicket> {
    let l = compile_rvalue(ctx, lhs)?;
    protect(ctx, &[l]);
    let r = compile_rvalue(ctx, rhs)?;
    let l = restore_protected(ctx, 1).remove(0);
    apply_binop(ctx, op, l.0, r.0);
    ctx.regs.release(ctx.backend, &mut ctx.code, r);
    Ok(l)
}

fn apply_binop(ctx: &mut CompileCtx, op: BinOp, dst: VReg, src: VReg) {
    match op {
        BinOp::Add => ctx.backend.add(&mut ctx.code, dst, src),
        BinOp::Sub => ctx.backend.sub(&mut ctx.code, dst, src),
        BinOp::Mul => ctx.backend.imul(&mut ctx.code, dst, src),
        BinOp::Div => ctx.backend.idiv(&mut ctx.code, dst, src),
        BinOp::Mod => ctx.backend.mod_(&mut ctx.code, dst, src),
        BinOp::BitAnd => ctx.backend.and(&mut ctx.code, dst, src),
        BinOp::BitOr => ctx.backend.or(&mut ctx.code, dst, src),
        BinOp::BitXor => ctx.backend.xor(&mut ctx.code, dst, src),
        BinOp::Shl => ctx.backend.shl(&mut ctx.code, dst, src),
        BinOp::Shr => ctx.backend.shr(&mut ctx.code, dst, src),
        BinOp::Eq => ctx.backend.cmp(&mut ctx.code, dst, CmpKind::Eq, dst, src),
        BinOp::Ne => ctx.backend.cmp(&mut ctx.code, dst, CmpKind::Ne, dst, src),
        BinOp::Lt => ctx.backend.cmp(&mut ctx.code, dst, CmpKind::Lt, dst, src),
        BinOp::Gt => ctx.backend.cmp(&mut ctx.code, dst, CmpKind::Gt, dst, src),
        BinOp::Le => ctx.backend.cmp(&mut ctx.code, dst, CmpKind::Le, dst, src),
        BinOp::Ge => ctx.backend.cmp(&mut ctx.code, dst, CmpKind::Ge, dst, src),
    }
}

fn compile_ternary(ctx: &mut CompileCtx, cond: NodeId, then_e: NodeId, else_e: NodeId) -> CodegenResult<RegTicket> {
    let c = compile_rvalue(ctx, cond)?;
    ctx.backend.test(&mut ctx.code, c.0);
    ctx.regs.release(ctx.backend, &mut ctx.code, c);

    let to_else = ctx.backend.jmp_begin(&mut ctx.code, cc_target::JumpKind::IfZero);
    let result = compile_rvalue(ctx, then_e)?;
    let to_end = ctx.backend.jmp_begin(&mut ctx.code, cc_target::JumpKind::Always);
    ctx.backend.jmp_end(&mut ctx.code, to_else);
    let else_val = compile_rvalue(ctx, else_e)?;
    ctx.backend.mov(&mut ctx.code, result.0, else_val.0);
    ctx.regs.release(ctx.backend, &mut ctx.code, else_val);
    ctx.backend.jmp_end(&mut ctx.code, to_end);
    Ok(result)
}

fn compile_assignment(ctx: &mut CompileCtx, op: AssignOp, target: NodeId, value: NodeId) -> CodegenResult<RegTicket> {
    let size = layout::operand_size(ctx.arena, target, &infer_ctype(&ctx.type_ctx(), target)?, ctx.word_size())?;
    let addr = compile_lvalue(ctx, target)?;

    if op == AssignOp::Assign {
        protect(ctx, &[addr]);
        let v = compile_rvalue(ctx, value)?;
        let addr = restore_protected(ctx, 1).remove(0);
        ctx.backend.store_reg(&mut ctx.code, addr.0, v.0, size);
        ctx.regs.release(ctx.backend, &mut ctx.code, addr);
        return Ok(v);
    }

    // compound assignment: single address evaluation (spec §4.2).
    let cur = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
    ctx.backend.load_reg(&mut ctx.code, cur.0, addr.0, size);
    protect(ctx, &[addr, cur]);
    let v = compile_rvalue(ctx, value)?;
    let restored = restore_protected(ctx, 2);
    let addr = restored[0];
    let cur = restored[1];
    let binop = match op {
        AssignOp::AddAssign => BinOp::Add,
        AssignOp::SubAssign => BinOp::Sub,
        AssignOp::MulAssign => BinOp::Mul,
        AssignOp::DivAssign => BinOp::Div,
        AssignOp::ModAssign => BinOp::Mod,
        AssignOp::AndAssign => BinOp::BitAnd,
        AssignOp::OrAssign => BinOp::BitOr,
        AssignOp::XorAssign => BinOp::BitXor,
        AssignOp::Assign => unreachable!("handled above"),
    };
    apply_binop(ctx, binop, cur.0, v.0);
    ctx.regs.release(ctx.backend, &mut ctx.code, v);
    ctx.backend.store_reg(&mut ctx.code, addr.0, cur.0, size);
    ctx.regs.release(ctx.backend, &mut ctx.code, addr);
    Ok(cur)
}
