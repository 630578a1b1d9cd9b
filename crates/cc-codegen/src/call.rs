//! Function-call compilation (spec §4.2 "Function calls"): the four
//! identifiable call targets, grounded on `original_source/compiler.c`'s
//! `function_call_ident` dispatch (`FUNCTION_CALL_{SYSCALL,INT3,NORMAL}`
//! plus the import case that file stubs out under `#if 0` and this crate
//! actually implements via `cc_ast::SymbolResolver`).

use crate::ctx::{CompileCtx, PendingCall};
use crate::error::{CodegenError, CodegenResult};
use crate::expr::compile_rvalue;
use crate::regs::RegTicket;
use cc_ast::{NodeId, Param, RelocKind, RelocTarget, Relocation};
use cc_target::VReg;

pub fn compile_call(ctx: &mut CompileCtx, node: NodeId, callee: &str, args: &[NodeId]) -> CodegenResult<RegTicket> {
    if callee == "syscall" && ctx.options.target.allows_raw_syscall() {
        return compile_syscall(ctx, node, args);
    }

    if callee == "int3" {
        return compile_int3(ctx);
    }

    if let Some(&decl) = ctx.functions.get(callee) {
        return compile_user_call(ctx, decl, callee, args);
    }

    if let Some(symbol) = ctx.resolver.resolve(callee) {
        return compile_import_call(ctx, callee, args, symbol);
    }

    Err(CodegenError::UnknownFunction { name: callee.to_string() })
}

fn compile_syscall(ctx: &mut CompileCtx, node: NodeId, args: &[NodeId]) -> CodegenResult<RegTicket> {
    if args.is_empty() {
        return Err(CodegenError::TypeMismatch { node, message: "syscall() requires a syscall number argument".into() });
    }
    let numargs = (args.len() - 1) as u32;

    // pushed argN..arg1, then the number last so it lands on top — matches
    // `TargetBackend::invoke_syscall`'s documented pop order (number first).
    for &arg in args[1..].iter().rev() {
        push_arg(ctx, arg)?;
    }
    push_arg(ctx, args[0])?;

    ctx.backend.invoke_syscall(&mut ctx.code, numargs);
    Ok(ctx.regs.acquire(ctx.backend, &mut ctx.code, Some(VReg::ReturnValue)))
}

fn compile_int3(ctx: &mut CompileCtx) -> CodegenResult<RegTicket> {
    if ctx.options.debug_breakpoints {
        ctx.backend.int3(&mut ctx.code);
    } else {
        // SPEC_FULL §4: absent `-d`, `int3()` still type-checks but lowers
        // to a no-op rather than a breakpoint trap.
        ctx.backend.nop(&mut ctx.code);
    }
    let t = ctx.regs.acquire(ctx.backend, &mut ctx.code, None);
    ctx.backend.mov_r_imm32(&mut ctx.code, t.0, 0);
    Ok(t)
}

fn compile_user_call(ctx: &mut CompileCtx, decl: NodeId, callee: &str, args: &[NodeId]) -> CodegenResult<RegTicket> {
    check_arity(ctx, decl, callee, args.len())?;

    for &arg in args.iter().rev() {
        push_arg(ctx, arg)?;
    }

    let placeholder = ctx.backend.call_imm32(&mut ctx.code);
    ctx.pending_calls.push(PendingCall { from: placeholder, callee: callee.to_string() });

    pop_args(ctx, args.len());
    Ok(ctx.regs.acquire(ctx.backend, &mut ctx.code, Some(VReg::ReturnValue)))
}

fn compile_import_call(
    ctx: &mut CompileCtx,
    callee: &str,
    args: &[NodeId],
    symbol: cc_ast::DynamicSymbol,
) -> CodegenResult<RegTicket> {
    for &arg in args.iter().rev() {
        push_arg(ctx, arg)?;
    }

    let placeholder = ctx.backend.indirect_call_imm32(&mut ctx.code);
    let word_size = ctx.word_size();
    if word_size == 4 {
        // x86's `FF 15 [disp32]` reads its call target through an absolute
        // memory cell rather than an immediate, so `indirect_call_imm32`
        // appends a storage cell 6 bytes past `placeholder` (see its doc
        // comment in cc-target). Two patches are needed: the disp32 operand
        // itself gets the storage cell's own absolute address (a `Code`
        // relocation — the one legitimate use of `RelocKind::Code` left in
        // this driver, since it patches an absolute pointer value rather
        // than an instruction's relative displacement), and the cell gets
        // the resolved import's address (an `Import` relocation).
        let storage = placeholder + 6;
        ctx.relocations.push(Relocation {
            kind: RelocKind::Code,
            from: placeholder,
            target: RelocTarget::CodeOffset(storage),
            width: 4,
        });
        ctx.relocations.push(Relocation {
            kind: RelocKind::Import,
            from: storage,
            target: RelocTarget::ImportSymbol(callee.to_string()),
            width: 4,
        });
    } else {
        ctx.relocations.push(Relocation {
            kind: RelocKind::Import,
            from: placeholder,
            target: RelocTarget::ImportSymbol(callee.to_string()),
            width: word_size as u8,
        });
    }
    ctx.dynamic_symbols.push(symbol);

    pop_args(ctx, args.len());
    Ok(ctx.regs.acquire(ctx.backend, &mut ctx.code, Some(VReg::ReturnValue)))
}

fn push_arg(ctx: &mut CompileCtx, arg: NodeId) -> CodegenResult<()> {
    let v = compile_rvalue(ctx, arg)?;
    ctx.backend.push(&mut ctx.code, v.0);
    ctx.regs.release(ctx.backend, &mut ctx.code, v);
    Ok(())
}

/// Cleans up the stack after a call (spec: "adjust the stack by `numargs
/// x word-size`").
fn pop_args(ctx: &mut CompileCtx, numargs: usize) {
    if numargs == 0 {
        return;
    }
    let bytes = numargs as i64 * ctx.word_size() as i64;
    if let Ok(small) = i8::try_from(bytes) {
        ctx.backend.add_imm8_to_r32(&mut ctx.code, VReg::Sp, small);
    } else {
        ctx.backend.add_imm32_to_r32(&mut ctx.code, VReg::Sp, bytes as i32);
    }
}

fn check_arity(ctx: &CompileCtx, decl: NodeId, callee: &str, argc: usize) -> CodegenResult<()> {
    let cc_ast::NodeKind::FunctionDecl { params, .. } = ctx.arena.kind(decl) else {
        unreachable!("cc-codegen's function table only maps to FunctionDecl nodes")
    };
    let variadic = matches!(params.last(), Some(Param::Variadic));
    let named = params.iter().filter(|p| matches!(p, Param::Named { .. })).count();
    if (variadic && argc < named) || (!variadic && argc != named) {
        return Err(CodegenError::TypeMismatch {
            node: decl,
            message: format!("'{callee}' expects {named}{} arguments, got {argc}", if variadic { "+" } else { "" }),
        });
    }
    Ok(())
}
