//! 64-bit x86-64 implementation of [`TargetBackend`]. Same encoding shape
//! as [`crate::x86::X86Backend`] with a `REX.W` prefix (`0x48`) in front of
//! every opcode that must operate on the full 64-bit register instead of
//! its 32-bit alias — our six logical registers all live in the low 8
//! physical slots (`rax/rcx/rdx/rbx/rsp/rbp`), so no `REX.R`/`REX.X`/`REX.B`
//! extension bit is ever needed for them, matching `backend::reg_index`'s
//! doc comment.

use crate::backend::{reg_index, CmpKind, CodeBuffer, JumpKind, JumpSlot, TargetBackend, VReg};
use crate::emit::{db, dd, dq, set32};

const REX_W: u8 = 0x48;

fn modrm_disp32(reg: VReg, rm: VReg) -> u8 {
    0x80 | (reg_index(reg) << 3) | reg_index(rm)
}

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

/// The six Linux x86-64 syscall argument registers, in order, encoded by
/// their raw 4-bit index (needs `REX.B` when >= 8) rather than through
/// [`VReg`] — they're physical ABI slots (`rdi/rsi/rdx/r10/r8/r9`) disjoint
/// from our six logical registers, not something the driver ever names.
const SYSCALL_ARG_REGS: [u8; 6] = [7 /* rdi */, 6 /* rsi */, 2 /* rdx */, 10 /* r10 */, 8 /* r8 */, 9 /* r9 */];

fn pop_physical(code: &mut CodeBuffer, phys: u8) {
    if phys >= 8 {
        db(code, 0x41); // REX.B
    }
    db(code, 0x58 + (phys & 7));
}

#[derive(Debug, Default)]
pub struct X64Backend;

impl X64Backend {
    pub fn new() -> Self {
        Self
    }

    /// See `X86Backend::div_like`: `IDIV r/m64` divides `RDX:RAX` by an
    /// r/m64 and leaves quotient in `RAX`, remainder in `RDX`.
    fn div_like(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg, want_remainder: bool) {
        let preserve: Vec<VReg> =
            [VReg::V0, VReg::V1, VReg::V2].into_iter().filter(|&r| r != dst).collect();
        for &r in &preserve {
            self.push(code, r);
        }
        self.push(code, dst);
        self.push(code, src);
        self.pop(code, VReg::V1); // rcx = divisor
        self.pop(code, VReg::V0); // rax = dividend
        db(code, REX_W);
        db(code, 0x99); // cqo: sign-extend rax into rdx:rax
        db(code, REX_W);
        db(code, 0xF7);
        db(code, 0xF8 | reg_index(VReg::V1)); // idiv rcx
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

    /// See `X86Backend::shift_like` — same CL-clobber hazard, same fix.
    fn shift_like(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg, ext: u8) {
        if dst == VReg::V1 {
            self.push(code, VReg::V1);
            self.mov(code, VReg::V1, src);
            self.pop(code, src);
            db(code, REX_W);
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
            db(code, REX_W);
            db(code, 0xD3);
            db(code, 0xC0 | (ext << 3) | reg_index(dst));
            if save {
                self.pop(code, VReg::V1);
            }
        }
    }
}

impl TargetBackend for X64Backend {
    fn word_size(&self) -> u32 {
        8
    }

    fn add(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
        db(code, 0x01);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn sub(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
        db(code, 0x29);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn imul(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
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
        db(code, REX_W);
        db(code, 0xFF);
        db(code, 0xC0 | reg_index(dst));
    }

    fn neg(&mut self, code: &mut CodeBuffer, dst: VReg) {
        db(code, REX_W);
        db(code, 0xF7);
        db(code, 0xD8 | reg_index(dst));
    }

    fn and(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
        db(code, 0x21);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn or(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
        db(code, 0x09);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn xor(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
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
        // `push r64` defaults to 64-bit operand size already; no REX.W.
        db(code, 0x50 + reg_index(src));
    }

    fn pop(&mut self, code: &mut CodeBuffer, dst: VReg) {
        db(code, 0x58 + reg_index(dst));
    }

    fn mov(&mut self, code: &mut CodeBuffer, dst: VReg, src: VReg) {
        db(code, REX_W);
        db(code, 0x89);
        db(code, crate::backend::modrm_reg(src, dst));
    }

    fn mov_r_imm32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32) {
        // `MOV r/m64, imm32` (0xC7 /0): sign-extends into the full 64-bit
        // register, unlike `0xB8+r`, which in 64-bit mode takes a 64-bit
        // immediate. Every literal and relocation target this driver
        // produces is well within the sign-extended 32-bit range.
        db(code, REX_W);
        db(code, 0xC7);
        db(code, 0xC0 | reg_index(dst));
        dd(code, imm as u32);
    }

    fn mov_r_string(&mut self, code: &mut CodeBuffer, dst: VReg) -> u32 {
        db(code, REX_W);
        db(code, 0xC7);
        db(code, 0xC0 | reg_index(dst));
        let at = code.len() as u32;
        dd(code, 0);
        at
    }

    fn load_reg(&mut self, code: &mut CodeBuffer, dst: VReg, addr: VReg, size: u32) {
        match size {
            1 => {
                db(code, REX_W);
                db(code, 0x0F);
                db(code, 0xB6);
                db(code, modrm_indirect(dst, addr));
            }
            2 => {
                db(code, REX_W);
                db(code, 0x0F);
                db(code, 0xB7);
                db(code, modrm_indirect(dst, addr));
            }
            4 => {
                db(code, 0x8B);
                db(code, modrm_indirect(dst, addr));
            }
            _ => {
                db(code, REX_W);
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
            4 => {
                db(code, 0x89);
                db(code, modrm_indirect(src, addr));
            }
            _ => {
                db(code, REX_W);
                db(code, 0x89);
                db(code, modrm_indirect(src, addr));
            }
        }
    }

    fn load_base_offset(&mut self, code: &mut CodeBuffer, dst: VReg, base: VReg, offset: i32, size: u32) {
        match size {
            1 => {
                db(code, REX_W);
                db(code, 0x0F);
                db(code, 0xB6);
                db(code, modrm_disp32(dst, base));
                dd(code, offset as u32);
            }
            2 => {
                db(code, REX_W);
                db(code, 0x0F);
                db(code, 0xB7);
                db(code, modrm_disp32(dst, base));
                dd(code, offset as u32);
            }
            4 => {
                db(code, 0x8B);
                db(code, modrm_disp32(dst, base));
                dd(code, offset as u32);
            }
            _ => {
                db(code, REX_W);
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
            4 => {
                db(code, 0x89);
                db(code, modrm_disp32(src, base));
                dd(code, offset as u32);
            }
            _ => {
                db(code, REX_W);
                db(code, 0x89);
                db(code, modrm_disp32(src, base));
                dd(code, offset as u32);
            }
        }
    }

    fn sub_regn_imm32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32) {
        db(code, REX_W);
        db(code, 0x81);
        db(code, 0xE8 | reg_index(dst));
        dd(code, imm as u32);
    }

    fn add_imm8_to_r32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i8) {
        db(code, REX_W);
        db(code, 0x83);
        db(code, 0xC0 | reg_index(dst));
        db(code, imm as u8);
    }

    fn add_imm32_to_r32(&mut self, code: &mut CodeBuffer, dst: VReg, imm: i32) {
        db(code, REX_W);
        db(code, 0x81);
        db(code, 0xC0 | reg_index(dst));
        dd(code, imm as u32);
    }

    fn cmp(&mut self, code: &mut CodeBuffer, dst: VReg, kind: CmpKind, lhs: VReg, rhs: VReg) {
        db(code, REX_W);
        db(code, 0x39);
        db(code, crate::backend::modrm_reg(rhs, lhs));
        db(code, 0x0F);
        db(code, cc_bits(kind));
        db(code, 0xC0 | reg_index(dst));
        db(code, REX_W);
        db(code, 0x0F);
        db(code, 0xB6);
        db(code, crate::backend::modrm_reg(dst, dst));
    }

    fn test(&mut self, code: &mut CodeBuffer, reg: VReg) {
        db(code, REX_W);
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

    /// Unlike x86's `FF /2 [disp32]` (absolute memory operand), `mod=00
    /// rm=101` means `[RIP + disp32]` in 64-bit mode, not an absolute
    /// address — so reusing that encoding here would silently change
    /// meaning. Instead this emits `movabs r10, imm64` (patched by an
    /// `IMPORT` relocation with `width = 8`) followed by `call r10`,
    /// using `r10` as scratch since it's never mapped to a logical
    /// register (backend.rs: "free to clobber scratch physical registers
    /// not mapped to any virtual register").
    fn indirect_call_imm32(&mut self, code: &mut CodeBuffer) -> u32 {
        db(code, 0x49); // REX.WB
        db(code, 0xBA); // movabs r10, imm64
        let at = code.len() as u32;
        dq(code, 0);
        db(code, 0x41); // REX.B
        db(code, 0xFF);
        db(code, 0xD2); // call r10
        at
    }

    fn invoke_syscall(&mut self, code: &mut CodeBuffer, numargs: u32) {
        self.pop(code, VReg::V0); // rax = syscall number
        for &phys in SYSCALL_ARG_REGS.iter().take(numargs as usize) {
            pop_physical(code, phys);
        }
        db(code, 0x0F);
        db(code, 0x05); // syscall
    }

    fn exit_instr(&mut self, code: &mut CodeBuffer) {
        // mov edi, eax (32-bit: ReturnValue -> rdi, the exit-status arg)
        db(code, 0x89);
        db(code, 0xC7);
        self.mov_r_imm32(code, VReg::V0, 60); // sys_exit
        db(code, 0x0F);
        db(code, 0x05); // syscall
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
            db(code, REX_W);
            db(code, 0x81);
            db(code, 0xEC);
            dd(code, frame_size);
        }
    }

    fn epilogue(&mut self, code: &mut CodeBuffer) {
        db(code, 0xC9); // leave
    }
}
