//! Top-level `codegen()` entry point (spec §4.2 "Public contract"):
//! collects the function table, compiles each function into its own
//! buffer, concatenates them, and resolves the cross-function relocations
//! that couldn't be resolved while a single function's code was still
//! growing.

use crate::ctx::CompileCtx;
use crate::error::{CodegenError, CodegenResult};
use crate::layout::{build_frame, new_function_record};
use crate::options::CodegenOptions;
use crate::regs::RegPool;
use cc_ast::{DynamicSymbol, NodeArena, NodeId, NodeKind, Relocation, SymbolResolver};
use cc_target::TargetBackend;
use rustc_hash::FxHashMap;

/// Everything the image emitter (`cc-image`) needs (spec §4.2's public
/// contract: "`CompiledModule` = { code bytes, data bytes, entry offset,
/// list of relocations, list of functions }").
pub struct CompiledModule {
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    /// Code offset of the process-entry trampoline (not necessarily
    /// `main`'s own offset — see `build_trampoline`).
    pub entry_offset: u32,
    pub relocations: Vec<Relocation>,
    /// Function name -> code offset. Imports resolved purely through the
    /// dynamic resolver never occupy a code offset of their own, so they
    /// are absent from this map rather than carrying a sentinel `-1`.
    pub functions: FxHashMap<String, u32>,
    pub dynamic_symbols: Vec<DynamicSymbol>,
}

/// `codegen(ast_root, target_backend, resolver) -> Result<CompiledModule, CodegenError>`.
pub fn codegen(
    arena: &NodeArena,
    ast_root: NodeId,
    backend: &mut dyn TargetBackend,
    resolver: &mut dyn SymbolResolver,
    options: CodegenOptions,
) -> CodegenResult<CompiledModule> {
    let NodeKind::Program { functions: decls } = arena.kind(ast_root) else {
        return Err(CodegenError::UnsupportedConstruct { node: ast_root, message: "root node is not a Program".into() });
    };

    let mut function_table = FxHashMap::default();
    for &decl in decls {
        let NodeKind::FunctionDecl { name, .. } = arena.kind(decl) else {
            return Err(CodegenError::UnsupportedConstruct { node: decl, message: "top-level node is not a FunctionDecl".into() });
        };
        if function_table.insert(name.clone(), decl).is_some() {
            return Err(CodegenError::DuplicateFunction { name: name.clone() });
        }
    }

    let word_size = backend.word_size();
    let mut data = Vec::new();
    let mut compiled: Vec<(String, Vec<u8>, Vec<Relocation>, Vec<crate::ctx::PendingCall>)> = Vec::new();
    let mut dynamic_symbols = Vec::new();

    for &decl in decls {
        let NodeKind::FunctionDecl { name, params, body, declarations, .. } = arena.kind(decl) else {
            unreachable!("checked above")
        };
        let Some(body) = body else {
            // A prototype with no body never contributes code; calls to it
            // are resolved at link time in systems with real linking, which
            // this driver doesn't have (spec's Non-goals exclude
            // cross-module linking) — so a bodiless declaration simply
            // contributes nothing to `functions`.
            continue;
        };

        let frame = build_frame(arena, name, params, declarations, word_size)?;
        let function = new_function_record(name, frame);

        let mut fn_ctx = CompileCtx {
            arena,
            backend,
            resolver,
            options,
            code: Vec::new(),
            data,
            regs: RegPool::new(),
            function,
            functions: &function_table,
            loops: Vec::new(),
            pending_calls: Vec::new(),
            relocations: Vec::new(),
            dynamic_symbols: Vec::new(),
        };

        fn_ctx.backend.prologue(&mut fn_ctx.code, fn_ctx.function.local_variable_size);
        crate::stmt::compile_stmt(&mut fn_ctx, *body)?;
        // every path through a well-formed function body ends in `return`,
        // but the driver still closes the frame in case control falls off
        // the end (e.g. a `void`-like function with no explicit `return`).
        fn_ctx.backend.epilogue(&mut fn_ctx.code);
        fn_ctx.backend.ret(&mut fn_ctx.code);

        data = fn_ctx.data;
        dynamic_symbols.extend(fn_ctx.dynamic_symbols);
        compiled.push((name.clone(), fn_ctx.code, fn_ctx.relocations, fn_ctx.pending_calls));
    }

    // second phase: concatenate every function's buffer, rebasing each
    // function-local relocation by its start offset in the final stream,
    // then resolve pending calls now that every callee's start offset is
    // known (spec §4.2: "relocations... applied once by the image
    // emitter" presupposes the driver itself already knows every code
    // offset by the time it hands relocations off).
    let mut code = Vec::new();
    let mut start_offsets = FxHashMap::default();
    let mut relocations = Vec::new();
    let mut all_pending = Vec::new();

    for (name, fn_code, fn_relocs, fn_pending) in &compiled {
        let start = code.len() as u32;
        start_offsets.insert(name.clone(), start);
        for reloc in fn_relocs {
            relocations.push(Relocation { from: reloc.from + start, ..reloc.clone() });
        }
        for pending in fn_pending {
            all_pending.push((start, pending.from, pending.callee.clone()));
        }
        code.extend_from_slice(fn_code);
    }

    // `call_imm32` encodes a PC-relative `E8 rel32` (spec §4.3's abstract
    // interface leaves the concrete encoding to the backend), so an
    // intra-module call site can be patched the moment both its own and its
    // callee's offsets are known — which is already true here, before a
    // single byte has been handed to the image emitter. Going through
    // `cc-image`'s relocation pass instead would require it to add a final
    // `code_vaddr` to the patched value (spec §4.4's literal `CODE` rule),
    // which is correct for a relocation that patches an *absolute* operand
    // but wrong for a relative call displacement — the two conventions don't
    // mix, so this driver never emits `RelocKind::Code` relocations at all.
    for (fn_start, local_from, callee) in all_pending {
        let &target = start_offsets
            .get(&callee)
            .ok_or_else(|| CodegenError::UnknownFunction { name: callee.clone() })?;
        let call_site = fn_start + local_from;
        let disp = target as i64 - (call_site as i64 + 4);
        cc_target::emit::set32(&mut code, call_site, disp as u32);
    }

    let entry_offset = build_trampoline(&mut code, &start_offsets, backend, options)?;

    Ok(CompiledModule { code, data, entry_offset, relocations, functions: start_offsets, dynamic_symbols })
}

/// A small stub appended after every user function: call `main`, then
/// either exit the process with its result (file targets — there is no
/// libc to return into) or just `ret` it back to a native caller (the
/// memory target, invoked as a plain function pointer by `cc-image`).
fn build_trampoline(
    code: &mut Vec<u8>,
    start_offsets: &FxHashMap<String, u32>,
    backend: &mut dyn TargetBackend,
    options: CodegenOptions,
) -> CodegenResult<u32> {
    let &main_offset = start_offsets
        .get("main")
        .ok_or_else(|| CodegenError::UnknownFunction { name: "main".to_string() })?;

    let entry_offset = code.len() as u32;
    let call_site = backend.call_imm32(code);
    let call_target = main_offset as i64 - (call_site as i64 + 4);
    cc_target::emit::set32(code, call_site, call_target as u32);

    if options.target.trampoline_must_exit() {
        backend.exit_instr(code);
    } else {
        backend.ret(code);
    }
    Ok(entry_offset)
}
