//! Shared mutable state threaded through one function's compilation
//! (spec §4.2): the in-progress code/data buffers, the register pool, the
//! loop-scope stack `break` resolves against, and the bookkeeping needed to
//! patch cross-function calls once every function's final offset is known.

use crate::options::CodegenOptions;
use crate::regs::RegPool;
use cc_ast::{DynamicSymbol, FunctionRecord, NodeArena, NodeId, Relocation, SymbolResolver};
use cc_target::{JumpSlot, TargetBackend};
use rustc_hash::FxHashMap;

/// One open loop's break targets, recorded so a `break` anywhere inside can
/// be patched once the loop's exit point is known (spec §4.2: "a small
/// stack of loop scopes lets break find its target").
#[derive(Debug, Default)]
pub struct LoopScope {
    pub break_jumps: Vec<JumpSlot>,
}

/// A call to a user function whose code offset isn't known yet — every
/// function is compiled into its own buffer before buffers are concatenated
/// (spec §4.2 "relocations... applied once by the image emitter" implies
/// the driver itself doesn't know final offsets mid-walk either).
pub struct PendingCall {
    /// Offset of the `call`'s placeholder, local to the compiling
    /// function's own code buffer.
    pub from: u32,
    pub callee: String,
}

pub struct CompileCtx<'a> {
    pub arena: &'a NodeArena,
    pub backend: &'a mut dyn TargetBackend,
    pub resolver: &'a mut dyn SymbolResolver,
    pub options: CodegenOptions,
    /// Current function's own code buffer; rebased into the module's single
    /// code stream once every function has been compiled.
    pub code: Vec<u8>,
    /// Process-wide data segment. Owned here and handed back to the driver
    /// after each function compiles (rather than borrowed) so backend calls
    /// that need `&mut` access to both `code` and `data` in the same
    /// expression don't fight the borrow checker over a shared reference.
    pub data: Vec<u8>,
    pub regs: RegPool,
    pub function: FunctionRecord,
    pub functions: &'a FxHashMap<String, NodeId>,
    pub loops: Vec<LoopScope>,
    pub pending_calls: Vec<PendingCall>,
    /// `DATA`/`IMPORT` relocations; `from` is still local to `self.code`
    /// until the driver rebases it at concatenation time.
    pub relocations: Vec<Relocation>,
    /// Import-resolved symbols discovered while compiling this function,
    /// folded into the module-wide list the driver returns on
    /// `CompiledModule` (spec §3 "a process-wide list owned by the
    /// driver").
    pub dynamic_symbols: Vec<DynamicSymbol>,
}

impl<'a> CompileCtx<'a> {
    pub fn word_size(&self) -> u32 {
        self.backend.word_size()
    }

    pub fn type_ctx(&self) -> crate::typeinfer::TypeCtx<'_> {
        crate::typeinfer::TypeCtx {
            arena: self.arena,
            function: &self.function,
            functions: self.functions,
            word_size: self.word_size(),
        }
    }
}
