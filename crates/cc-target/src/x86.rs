//! 32-bit x86 implementation of [`TargetBackend`]. Encodes by hand, the way
//! `original_source/x86.c`'s `db`/`dd` calls do, rather than pulling in a
//! full disassembler/assembler crate — the instruction set this driver
//! needs is small and fixed.

use crate::backend::{reg_index, CmpKind, CodeBuffer, JumpKind, JumpSlot, TargetBackend, VReg};
use crate::emit::{dd, db, set32};

/// `ModRM` byte for an indirect operand with a 32-bit displacement
/// (mod = 10): `reg` in the reg field, `rm`'s register holds the base
/// address. Always disp32, never disp8 or disp0 — `rm` is frequently `Bp`,
/// and disp0 with rm=101 means "absolute disp32, no base" in 32-bit ModRM,
/// not `[ebp]`, so the disp8/disp0 special cases are simplest to avoid
/// altogether.
fn modrm_disp32(reg: VReg, rm: VReg) -> u8 {
    0x80 | (reg_index(reg) << 3) | reg_index(rm)
}

/// `ModRM` byte for an indirect operand with no displacement (mod = 00).
/// Only used where `rm` is guaranteed to be one of `V0..V3` (never `Sp`
/// or `Bp`, which would hit the SIB/disp32-no-base special cases).
fn modrm_indirect(reg: VReg, rm: VReg) -> u8 {
    (reg_index(reg) << 3) | reg_index(rm)
}

fn cc_bits(kind: CmpKind) -> u8 {
    match kind {
        CmpKind::Eq => 0x94,
        CmpKind::Ne => 0x95,
        CmpKind::Lt => 0x9C,
        CmpKind::Ge => 0x9D,
        CmpKind::Le => 0x9E,
        CmpKind::Gt => 0x9F,
    }
}

fn jump_opcode(kind: JumpKind) -> &'static [u8] {
    match kind {
        JumpKind::Always => &[0xE9],
        JumpKind::IfZero => &[0x0F, 0x84],
        JumpKind::IfNotZero => &[0x0F, 0x85],
    }
}

#[derive(Debug, Default)]
pub struct X86Backend;

impl X86Backend {
    pub fn new() -> Self {
        Self
    }

    /// `idiv`/`mod` share this: x86's `IDIV` always divides `EDX:EAX` by an
    /// r/m32 and leaves the quotient in `EAX`, remainder in `EDX`, so any
    /// other live value currently parked in `eax`/`ecx`/`edx` (our dividend,
    /// divisor-scratch, and remainder registers) has to survive the trip.
    /// `dst`'s own prior value never needs preserving — it's about to become
    /// the result — so it's excluded from the save/restore set, which also
    /// sidesteps the case where `dst` aliases one of the three physical
    /// registers this sequence clobbers.
    fn div_like(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg, want_remainder: bool) {
        let preserve: Vec<VReg> =
            [VReg::V0, VReg::V1, VReg::V2].into_iter().filter(|&r| r != dst).collect();
        for &r in &preserve {
            self.push(code, r);
        }
        self.push(code, dst);
        self.push(code, src);
        self.pop(code, VReg::V1); // ecx = original src (divisor)
        self.pop(code, VReg::V0); // eax = original dst (dividend)
        db(code, 0x99); // cdq: sign-extend eax into edx:eax
        db(code, 0xF7);
        db(code, 0xF8 | reg_index(VReg::V1)); // idiv ecx
        let result = if want_remainder { VReg::V2 } else { VReg::V0 };
        self.mov(code, dst, result);
        for &r in preserve.iter().rev() {
            self.pop(code, r);
        }
    }

    fn emit_backward_jump(&mut self, code: &mut CodeBuffer, opcode: &[u8], target: u32) {
        code.extend_from_slice(opcode);
        let disp_at = code.len();
        dd(code, 0);
        let end = code.len() as i64;
        let disp = target as i64 - end;
        set32(code, disp_at as u32, disp as u32);
    }

    /// `SHL`/`SHR r/m32, CL` (`0xD3 /ext`) always reads the count from `CL`,
    /// which aliases `V1`/ecx's low byte. When `dst` is itself `V1`, loading
    /// the count into `cl` would clobber the value being shifted before the
    /// shift executes, so that case round-trips the original value through
    /// `src` (guaranteed distinct from `dst` by the driver) via the stack.
    fn shift_like(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg, ext: u8) {
        if dst == VReg::V1 {
            self.push(code, VReg::V1); // save original dst value
            self.mov(code, VReg::V1, src); // ecx = count
            self.pop(code, src); // src = original dst value
            db(code, 0xD3);
            db(code, 0xC0 | (ext << 3) | reg_index(src));
            self.mov(code, dst, src);
        } else {
            let save = src != VReg::V1;
            if save {
                self.push(code, VReg::V1);
            }
            if src != VReg::V1 {
                self.mov(code, VReg::V1, src);
            }
            db(code, 0xD3);
            db(code, 0xC0 | (ext << 3) | reg_index(dst));
            if save {
                self.pop(code, VReg::V1);
            }
        }
    }
}

impl TargetBackend for X86Backend {
    fn word_size(&self) -> u32 {
        4
    }

    fn add(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x01);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn sub(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x29);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn imul(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x0F);
        db(code, 0xAF);
        db(code, crate::backend::modrm_reg(dst, src));
    }

    fn idiv(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        self.div_like(code, dst, src, false);
    }

    fn mod_(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        self.div_like(code, dst, src, true);
    }

    fn inc(&mut self, code: &mut CodeBuffer, dst: VReg) {
        db(code, 0xFF);
        db(code, 0xC0 | reg_index(dst));
    }

    fn neg(&mut self, code: &mut CodeBuffer, dst: VReg) {
        db(code, 0xF7);
        db(code, 0xD8 | reg_index(dst));
    }

    fn and(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x21);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn or(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x09);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn xor(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x31);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn shl(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        self.shift_like(code, dst, src, 4);
    }

    fn shr(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        self.shift_like(code, dst, src, 5);
    }

    fn push(&mut self, code: &mut CodeBuffer, src: VReg) {
        db(code, 0x50 + reg_index(src));
    }

    fn pop(&mut self, code: &mut CodeBuffer, dst: VReg) {
        db(code, 0x58 + reg_index(dst));
    }

    fn mov(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, 0x89);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn mov_r_imm32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32) {
        db(code, 0xB8 + reg_index(dst));
        dd(code, imm as u32);
    }

    fn mov_r_string(&mut self, code: &mut CodeBuffer, dst: VReg) -> u32 {
        db(code, 0xB8 + reg_index(dst));
        let at = code.len() as u32;
        dd(code, 0);
        at
    }

    fn load_reg(&mut self, code: &mut CodeBuffer, dst: VReg, addr: VReg, size: u32) {
        match size {
            1 => {
                db(code, 0x0F);
                db(code, 0xB6);
                db(code, modrm_indirect(dst, addr));
            }
            2 => {
                db(code, 0x0F);
                db(code, 0xB7);
                db(code, modrm_indirect(dst, addr));
            }
            _ => {
                db(code, 0x8B);
                db(code, modrm_indirect(dst, addr));
            }
        }
    }

    fn store_reg(&mut self, code: &mut CodeBuffer, addr: VReg, src: VReg, size: u32) {
        match size {
            1 => {
                db(code, 0x88);
                db(code, modrm_indirect(src, addr));
            }
            2 => {
                db(code, 0x66);
                db(code, 0x89);
                db(code, modrm_indirect(src, addr));
            }
            _ => {
                db(code, 0x89);
                db(code, modrm_indirect(src, addr));
            }
        }
    }

    fn load_base_offset(&mut self, code: &mut CodeBuffer, dst: VReg, base: VReg, offset: i32, size: u32) {
        match size {
            1 => {
                db(code, 0x0F);
                db(code, 0xB6);
                db(code, modrm_disp32(dst, base));
                dd(code, offset as u32);
            }
            2 => {
                db(code, 0x0F);
                db(code, 0xB7);
                db(code, modrm_disp32(dst, base));
                dd(code, offset as u32);
            }
            _ => {
                db(code, 0x8B);
                db(code, modrm_disp32(dst, base));
                dd(code, offset as u32);
            }
        }
    }

    fn store_base_offset(&mut self, code: &mut CodeBuffer, base: VReg, offset: i32, src: VReg, size: u32) {
        match size {
            1 => {
                db(code, 0x88);
                db(code, modrm_disp32(src, base));
                dd(code, offset as u32);
            }
            2 => {
                db(code, 0x66);
                db(code, 0x89);
                db(code, modrm_disp32(src, base));
                dd(code, offset as u32);
            }
            _ => {
                db(code, 0x89);
                db(code, modrm_disp32(src, base));
                dd(code, offset as u32);
            }
        }
    }

    fn sub_regn_imm32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32) {
        db(code, 0x81);
        db(code, 0xE8 | reg_index(dst));
        dd(code, imm as u32);
    }

    fn add_imm8_to_r32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i8) {
        db(code, 0x83);
        db(code, 0xC0 | reg_index(dst));
        db(code, imm as u8);
    }

    fn add_imm32_to_r32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32) {
        db(code, 0x81);
        db(code, 0xC0 | reg_index(dst));
        dd(code, imm as u32);
    }

    fn cmp(&mut self, code: &mut CodeBuffer, dst: VReg, kind: CmpKind, lhs: VReg, rhs: VReg) {
        db(code, 0x39);
        db(code, crate::backend::modrm_reg(rhs, lhs));
        db(code, 0x0F);
        db(code, cc_bits(kind));
        db(code, 0xC0 | reg_index(dst));
        db(code, 0x0F);
        db(code, 0xB6);
        db(code, crate::backend::modrm_reg(dst, dst));
    }

    fn test(&mut self, code: &mut CodeBuffer, reg: VReg) {
        db(code, 0x85);
        db(code, crate::backend::modrm_reg(reg, reg));
    }

    fn jmp_begin(&mut self, code: &mut CodeBuffer, kind: JumpKind) -> JumpSlot {
        code.extend_from_slice(jump_opcode(kind));
        let offset = code.len() as u32;
        dd(code, 0);
        JumpSlot { offset }
    }

    fn jmp_end(&mut self, code: &mut CodeBuffer, slot: JumpSlot) {
        let here = code.len() as i64;
        let disp = here - (slot.offset as i64 + 4);
        set32(code, slot.offset, disp as u32);
    }

    fn jmp_begin_reverse(&mut self, code: &mut CodeBuffer) -> JumpSlot {
        JumpSlot { offset: code.len() as u32 }
    }

    fn jmp_end_reverse(&mut self, code: &mut CodeBuffer, kind: JumpKind, slot: JumpSlot) {
        self.emit_backward_jump(code, jump_opcode(kind), slot.offset);
    }

    fn ret(&mut self, code: &mut CodeBuffer) {
        db(code, 0xC3);
    }

    fn call_imm32(&mut self, code: &mut CodeBuffer) -> u32 {
        db(code, 0xE8);
        let at = code.len() as u32;
        dd(code, 0);
        at
    }

    fn call_r32(&mut self, code: &mut CodeBuffer, target: VReg) {
        db(code, 0xFF);
        db(code, 0xD0 | reg_index(target));
    }

    /// `FF /2 [disp32]` dereferences an absolute memory cell to find its
    /// call target — unlike `call_r32`'s register form, there's no way to
    /// embed the target address directly in the instruction. So this emits
    /// the instruction, jumps over a 4-byte storage cell, and returns the
    /// position of the *disp32 operand* (which must be patched with that
    /// cell's own absolute address, not the callee's). The cell itself sits
    /// 6 bytes past the returned offset — `original_source/compiler.c`'s
    /// `#if 0`-disabled import-call block does the identical
    /// `indirect_call_imm32` / `jmp` / `dd 0x0 //location P` dance and
    /// patches `realcodepos + 6` for the same reason.
    fn indirect_call_imm32(&mut self, code: &mut CodeBuffer) -> u32 {
        db(code, 0xFF);
        db(code, 0x15);
        let at = code.len() as u32;
        dd(code, 0);
        db(code, 0xEB); // jmp +4, short
        db(code, 0x04);
        dd(code, 0); // storage cell, patched with the resolved symbol's address
        at
    }

    fn invoke_syscall(&mut self, code: &mut CodeBuffer, numargs: u32) {
        self.pop(code, VReg::V0); // eax = syscall number
        let arg_regs = [VReg::V3, VReg::V1, VReg::V2]; // ebx, ecx, edx
        for &r in arg_regs.iter().take(numargs as usize) {
            self.pop(code, r);
        }
        db(code, 0xCD);
        db(code, 0x80);
    }

    fn exit_instr(&mut self, code: &mut CodeBuffer) {
        self.mov(code, VReg::V3, VReg::ReturnValue); // ebx = exit status
        self.mov_r_imm32(code, VReg::V0, 1); // eax = sys_exit
        db(code, 0xCD);
        db(code, 0x80);
    }

    fn int3(&mut self, code: &mut CodeBuffer) {
        db(code, 0xCC);
    }

    fn nop(&mut self, code: &mut CodeBuffer) {
        db(code, 0x90);
    }

    fn add_indexed_data(&mut self, data: &mut CodeBuffer, bytes: &[u8]) -> u32 {
        let at = data.len() as u32;
        data.extend_from_slice(bytes);
        at
    }

    fn prologue(&mut self, code: &mut CodeBuffer, frame_size: u32) {
        self.push(code, VReg::Bp);
        self.mov(code, VReg::Bp, VReg::Sp);
        if frame_size > 0 {
            db(code, 0x81);
            db(code, 0xEC);
            dd(code, frame_size);
        }
    }

    fn epilogue(&mut self, code: &mut CodeBuffer) {
        db(code, 0xC9); // leave: mov esp, ebp; pop ebp
    }
}
