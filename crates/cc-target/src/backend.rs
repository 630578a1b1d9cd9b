//! The codegen interface (spec §4.3): the ~40 abstract operations the
//! codegen driver invokes without knowing which architecture answers them.
//! "A table of function pointers (in Rust: a trait)" — design note §9.

/// Byte buffer a backend appends machine code or data into. A free-standing
/// alias rather than a newtype: both code and data segments are plain
/// `Vec<u8>`, and the `emit` module's helpers operate on either.
pub type CodeBuffer = Vec<u8>;

/// A logical register name the driver asks for; each backend maps it to a
/// physical one ("virtual-to-physical register mapping", spec §4.3).
/// `Ip` is carried for completeness with spec §4.2's pool enumeration but is
/// never the target of a `mov`-family call in practice — control flow is
/// expressed entirely through `jmp_begin`/`jmp_end` and call relocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VReg {
    V0,
    V1,
    V2,
    V3,
    Sp,
    Bp,
    Ip,
    ReturnValue,
}

/// The relational test a `cmp` lowers to (spec §4.2's `x op y` table row for
/// `==,!=,<,>,<=,>=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Which edge of a conditional the two-phase jump protocol emits (spec
/// §4.3's `jmp_begin(kind, slot)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Always,
    IfZero,
    IfNotZero,
}

/// Bookkeeping for one half of the forward-jump protocol. For a plain
/// forward jump (`jmp_begin`/`jmp_end`), `offset` is the byte position of
/// the displacement placeholder `jmp_end` patches. For the `RJ_REVERSE`
/// pairing (`jmp_begin_reverse`/`jmp_end_reverse`), `offset` is instead the
/// loop-head position the later `jmp_end_reverse` jumps back to — "a
/// `RJ_REVERSE` flag reverses the roles so that a loop head can be patched
/// by a later tail" (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct JumpSlot {
    pub offset: u32,
}

/// The low 3 bits used in a ModRM byte / opcode-plus-register encoding for
/// each logical register. Shared between the x86 and x64 backends since
/// both map the driver's six logical registers onto the same low 8
/// single-byte-addressable slots (EAX/RAX..EBP/RBP) — no REX.B extension
/// is ever needed.
pub(crate) fn reg_index(v: VReg) -> u8 {
    match v {
        VReg::V0 | VReg::ReturnValue => 0,
        VReg::V1 => 1,
        VReg::V2 => 2,
        VReg::V3 => 3,
        VReg::Sp => 4,
        VReg::Bp => 5,
        VReg::Ip => unreachable!("Ip is never the operand of a backend op"),
    }
}

/// The `ModRM` byte for a register-direct operand pair: `reg` in the
/// reg field, `rm` in the r/m field (mode 11). Matches the direction x86's
/// two-operand instructions use — e.g. `ADD r/m32, r32` writes into `rm`
/// reading `reg` as the source.
pub(crate) fn modrm_reg(reg: VReg, rm: VReg) -> u8 {
    0xC0 | (reg_index(reg) << 3) | reg_index(rm)
}

/// The ~40-operation codegen interface (spec §4.3), implemented once per
/// target architecture.
pub trait TargetBackend {
    /// Bytes per general-purpose register / pointer on this target (4 or 8).
    /// `data_type_size` in `cc-codegen` asks this for `int`/pointer sizing
    /// (spec §4.2's type-sizing table, "word size of target").
    fn word_size(&self) -> u32;

    fn add(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn sub(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn imul(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn idiv(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn mod_(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn inc(&mut self, code: &mut CodeBuffer, dst: VReg);
    fn neg(&mut self, code: &mut CodeBuffer, dst: VReg);
    fn and(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn or(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn xor(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    /// `dst <<= src` / `dst >>= src` (logical). Not named among spec §4.3's
    /// enumerated ~40 operations, but `<<`/`>>` are in the precedence table
    /// (level 7) and no Non-goal excludes them, so the interface carries
    /// these two alongside the listed arithmetic/bitwise ops.
    fn shl(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn shr(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);

    fn push(&mut self, code: &mut CodeBuffer, src: VReg);
    fn pop(&mut self, code: &mut CodeBuffer, dst: VReg);
    fn mov(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg);
    fn mov_r_imm32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32);

    /// `mov dst, imm32` whose immediate is a data-address placeholder a
    /// `DATA` relocation patches later; returns the placeholder's offset
    /// (spec §4.3 "String literals").
    fn mov_r_string(&mut self, code: &mut CodeBuffer, dst: VReg) -> u32;

    fn load_reg(&mut self, code: &mut CodeBuffer, dst: VReg, addr: VReg, size: u32);
    fn store_reg(&mut self, code: &mut CodeBuffer, addr: VReg, src: VReg, size: u32);
    fn load_base_offset(&mut self, code: &mut CodeBuffer, dst: VReg, base: VReg, offset: i32, size: u32);
    fn store_base_offset(&mut self, code: &mut CodeBuffer, base: VReg, offset: i32, src: VReg, size: u32);

    fn sub_regn_imm32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32);
    fn add_imm8_to_r32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i8);
    fn add_imm32_to_r32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32);

    /// `dst = (lhs cmp rhs) ? 1 : 0`, the rvalue technique spec §4.2's table
    /// gives for relational `x op y`.
    fn cmp(&mut self, code: &mut CodeBuffer, dst: VReg, kind: CmpKind, lhs: VReg, rhs: VReg);
    /// Sets the flags a following `jmp_begin(IfZero | IfNotZero, ..)` reads.
    fn test(&mut self, code: &mut CodeBuffer, reg: VReg);

    fn jmp_begin(&mut self, code: &mut CodeBuffer, kind: JumpKind) -> JumpSlot;
    fn jmp_end(&mut self, code: &mut CodeBuffer, slot: JumpSlot);
    /// `RJ_REVERSE` variant: records the loop head as the jump target.
    fn jmp_begin_reverse(&mut self, code: &mut CodeBuffer) -> JumpSlot;
    /// `RJ_REVERSE` variant: emits the jump back to the recorded head.
    fn jmp_end_reverse(&mut self, code: &mut CodeBuffer, kind: JumpKind, slot: JumpSlot);

    fn ret(&mut self, code: &mut CodeBuffer);
    /// Near call whose target is a placeholder a `CODE` relocation patches;
    /// returns the placeholder's offset.
    fn call_imm32(&mut self, code: &mut CodeBuffer) -> u32;
    fn call_r32(&mut self, code: &mut CodeBuffer, target: VReg);
    /// Indirect call through a data-segment slot an `IMPORT` relocation
    /// patches; returns the placeholder's offset.
    fn indirect_call_imm32(&mut self, code: &mut CodeBuffer) -> u32;

    /// Pops `numargs + 1` words (syscall number, then arguments, pushed in
    /// reverse order by the driver) into the target's syscall-argument
    /// registers and emits the trap/instruction that enters the kernel.
    fn invoke_syscall(&mut self, code: &mut CodeBuffer, numargs: u32);
    /// Terminates the process using `ReturnValue` as the exit status —
    /// file targets have no libc to return into, unlike the memory target.
    fn exit_instr(&mut self, code: &mut CodeBuffer);
    fn int3(&mut self, code: &mut CodeBuffer);
    fn nop(&mut self, code: &mut CodeBuffer);

    /// Appends `bytes` to the data buffer, returns the offset it starts at
    /// (spec §4.3's `add_indexed_data(buffer, len)`).
    fn add_indexed_data(&mut self, data: &mut CodeBuffer, bytes: &[u8]) -> u32;

    /// Save frame pointer, set frame pointer to stack pointer, subtract
    /// `frame_size` (spec §4.2's prologue).
    fn prologue(&mut self, code: &mut CodeBuffer, frame_size: u32);
    /// Restore stack pointer from frame pointer, pop frame pointer (spec
    /// §4.2's epilogue, emitted at every `return` and at function end).
    fn epilogue(&mut self, code: &mut CodeBuffer);
}
