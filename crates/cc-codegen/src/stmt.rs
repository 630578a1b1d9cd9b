//! Statement and control-flow lowering (spec §4.2's control-flow table),
//! grounded on `original_source/compiler.c`'s statement-walk switch and the
//! `RJ_REVERSE` jump protocol `cc-target`'s `jmp_begin_reverse`/
//! `jmp_end_reverse` implement.

use crate::ctx::{CompileCtx, LoopScope};
use crate::error::{CodegenError, CodegenResult};
use crate::expr::compile_rvalue;
use crate::layout;
use cc_ast::{NodeId, NodeKind};
use cc_target::JumpKind;

pub fn compile_block(ctx: &mut CompileCtx, statements: &[NodeId]) -> CodegenResult<()> {
    for &stmt in statements {
        compile_stmt(ctx, stmt)?;
    }
    Ok(())
}

pub fn compile_stmt(ctx: &mut CompileCtx, node: NodeId) -> CodegenResult<()> {
    match ctx.arena.kind(node).clone() {
        NodeKind::BlockStmt { statements } => compile_block(ctx, &statements),

        NodeKind::ExprStmt { expr } => {
            let t = compile_rvalue(ctx, expr)?;
            ctx.regs.release(ctx.backend, &mut ctx.code, t);
            Ok(())
        }

        NodeKind::VariableDecl { name, data_type, initializer } => {
            if let Some(init) = initializer {
                if !ctx.function.variables.contains_key(&name) {
                    return Err(CodegenError::UnknownIdentifier { name: name.clone(), node });
                }
                let size = layout::data_type_size(ctx.arena, data_type, &layout::ctype_of(ctx.arena, data_type), ctx.word_size())?;
                let v = compile_rvalue(ctx, init)?;
                let var = ctx.function.variables.get(&name).cloned().expect("checked above");
                let addr = crate::expr::frame_address(ctx, var.offset);
                ctx.backend.store_reg(&mut ctx.code, addr.0, v.0, size);
                ctx.regs.release(ctx.backend, &mut ctx.code, addr);
                ctx.regs.release(ctx.backend, &mut ctx.code, v);
            }
            Ok(())
        }

        NodeKind::IfStmt { cond, then_branch, else_branch } => {
            let c = compile_rvalue(ctx, cond)?;
            ctx.backend.test(&mut ctx.code, c.0);
            ctx.regs.release(ctx.backend, &mut ctx.code, c);

            let past_then = ctx.backend.jmp_begin(&mut ctx.code, JumpKind::IfZero);
            compile_stmt(ctx, then_branch)?;
            if let Some(else_b) = else_branch {
                let past_else = ctx.backend.jmp_begin(&mut ctx.code, JumpKind::Always);
                ctx.backend.jmp_end(&mut ctx.code, past_then);
                compile_stmt(ctx, else_b)?;
                ctx.backend.jmp_end(&mut ctx.code, past_else);
            } else {
                ctx.backend.jmp_end(&mut ctx.code, past_then);
            }
            Ok(())
        }

        NodeKind::WhileStmt { cond, body } => {
            ctx.loops.push(LoopScope::default());
            let head = ctx.backend.jmp_begin_reverse(&mut ctx.code);
            let c = compile_rvalue(ctx, cond)?;
            ctx.backend.test(&mut ctx.code, c.0);
            ctx.regs.release(ctx.backend, &mut ctx.code, c);
            let past_body = ctx.backend.jmp_begin(&mut ctx.code, JumpKind::IfZero);
            compile_stmt(ctx, body)?;
            ctx.backend.jmp_end_reverse(&mut ctx.code, JumpKind::Always, head);
            ctx.backend.jmp_end(&mut ctx.code, past_body);
            finish_loop(ctx);
            Ok(())
        }

        NodeKind::DoWhileStmt { body, cond } => {
            ctx.loops.push(LoopScope::default());
            let head = ctx.backend.jmp_begin_reverse(&mut ctx.code);
            compile_stmt(ctx, body)?;
            let c = compile_rvalue(ctx, cond)?;
            ctx.backend.test(&mut ctx.code, c.0);
            ctx.regs.release(ctx.backend, &mut ctx.code, c);
            ctx.backend.jmp_end_reverse(&mut ctx.code, JumpKind::IfNotZero, head);
            finish_loop(ctx);
            Ok(())
        }

        NodeKind::ForStmt { init, test, update, body } => {
            if let Some(init) = init {
                compile_for_clause(ctx, init)?;
            }
            ctx.loops.push(LoopScope::default());
            let head = ctx.backend.jmp_begin_reverse(&mut ctx.code);
            let past_body = if let Some(test) = test {
                let c = compile_rvalue(ctx, test)?;
                ctx.backend.test(&mut ctx.code, c.0);
                ctx.regs.release(ctx.backend, &mut ctx.code, c);
                Some(ctx.backend.jmp_begin(&mut ctx.code, JumpKind::IfZero))
            } else {
                None
            };
            compile_stmt(ctx, body)?;
            if let Some(update) = update {
                let t = compile_rvalue(ctx, update)?;
                ctx.regs.release(ctx.backend, &mut ctx.code, t);
            }
            ctx.backend.jmp_end_reverse(&mut ctx.code, JumpKind::Always, head);
            if let Some(slot) = past_body {
                ctx.backend.jmp_end(&mut ctx.code, slot);
            }
            finish_loop(ctx);
            Ok(())
        }

        NodeKind::BreakStmt => {
            let slot = ctx.backend.jmp_begin(&mut ctx.code, JumpKind::Always);
            let scope = ctx
                .loops
                .last_mut()
                .ok_or_else(|| CodegenError::UnsupportedConstruct { node, message: "'break' outside a loop".into() })?;
            scope.break_jumps.push(slot);
            Ok(())
        }

        NodeKind::ReturnStmt { value } => {
            if let Some(v) = value {
                let t = compile_rvalue(ctx, v)?;
                if t.0 != cc_target::VReg::ReturnValue {
                    ctx.backend.mov(&mut ctx.code, cc_target::VReg::ReturnValue, t.0);
                }
                ctx.regs.release(ctx.backend, &mut ctx.code, t);
            }
            ctx.backend.epilogue(&mut ctx.code);
            ctx.backend.ret(&mut ctx.code);
            Ok(())
        }

        NodeKind::Empty => Ok(()),

        other => Err(CodegenError::UnsupportedConstruct { node, message: format!("not a statement: {other:?}") }),
    }
}

/// A `for`-init clause may itself be a `SEQ_EXPR` whose first child is a
/// declaration (spec §4.1's `for` state machine) or a plain expression/decl.
fn compile_for_clause(ctx: &mut CompileCtx, node: NodeId) -> CodegenResult<()> {
    match ctx.arena.kind(node).clone() {
        NodeKind::VariableDecl { .. } => compile_stmt(ctx, node),
        NodeKind::SeqExpr { exprs } => {
            for e in exprs {
                compile_for_clause(ctx, e)?;
            }
            Ok(())
        }
        _ => {
            let t = compile_rvalue(ctx, node)?;
            ctx.regs.release(ctx.backend, &mut ctx.code, t);
            Ok(())
        }
    }
}

fn finish_loop(ctx: &mut CompileCtx) {
    let scope = ctx.loops.pop().expect("finish_loop called without a matching push");
    for slot in scope.break_jumps {
        ctx.backend.jmp_end(&mut ctx.code, slot);
    }
}
