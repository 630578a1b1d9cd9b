//! Compile-time choices that are not part of the AST: which image target
//! the code is ultimately bound for (it changes how `main`'s result leaves
//! the process, and whether `syscall(...)` is legal at all) and whether
//! `-d` was passed (spec §6 pairs `-d` with `int3()`).

/// Spec §6's `-b{windows,linux,memory,opcodes}` choice, as seen from
/// codegen. `cc-image` has the richer `Elf32`/`Elf64` split; codegen only
/// cares about the three behavioral axes below, so it collapses that to one
/// `Linux` variant covering both word sizes (the word size itself comes
/// from `TargetBackend::word_size`, not from this enum).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Linux,
    Windows,
    Memory,
    Opcodes,
}

impl TargetKind {
    /// spec §4.2 function-call rule 1: "Name is `syscall` (on a Linux
    /// target)". The memory target runs in-process on a Linux host in this
    /// implementation (spec §4.4's `MemoryResolver` is POSIX `dlopen`-based),
    /// so a raw `syscall(...)` is equally meaningful there; `-bopcodes` has
    /// no process context of its own but the bytes it dumps are meant to
    /// disassemble identically to the Linux target's (spec §8's round-trip
    /// test), so it is permitted too. Only the PE target has no syscall
    /// convention to lower to.
    pub fn allows_raw_syscall(self) -> bool {
        !matches!(self, TargetKind::Windows)
    }

    /// Whether the process-entry trampoline (§driver) must terminate the
    /// process itself after `main` returns (file targets: no libc to return
    /// into) or can simply `ret` the value back to a native caller (the
    /// memory target, invoked as a plain function pointer by `cc-image`).
    pub fn trampoline_must_exit(self) -> bool {
        !matches!(self, TargetKind::Memory)
    }
}

/// Ambient codegen configuration spanning an entire `codegen()` call.
#[derive(Debug, Clone, Copy)]
pub struct CodegenOptions {
    pub target: TargetKind,
    /// spec §6 `-d`: "Insert breakpoints on `int3()` calls". SPEC_FULL §4:
    /// absent this flag, a bare `int3()` call still parses and type-checks
    /// but lowers to a `nop`.
    pub debug_breakpoints: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self { target: TargetKind::Memory, debug_breakpoints: false }
    }
}
