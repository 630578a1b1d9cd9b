//! Relocation application (spec §4.4 "Relocation pass"): patches
//! `Code`/`Data`/`Import` placeholders already written into a code buffer
//! by `cc-codegen`, against whatever base addresses the target's layout
//! assigns to `.text`/`.data`, immediately before the bytes are finalized.

use crate::error::{EmitError, EmitResult};
use cc_ast::{DynamicSymbol, RelocKind, RelocTarget, Relocation};
use cc_target::emit::{set32, set64};

fn patch(code: &mut [u8], from: u32, value: u64, width: u8) {
    match width {
        4 => set32(code, from, value as u32),
        8 => set64(code, from, value),
        other => unreachable!("relocation width is always 4 or 8 bytes, got {other}"),
    }
}

/// File targets (ELF/PE): `Code`/`Data` relocations patch absolute
/// virtual addresses computed from the image's own layout. `Import`
/// relocations are left untouched — spec §4.4 "PE/ELF64 specifics": IAT is
/// disabled, imports are only meaningful for the memory target.
pub fn apply_file_relocations(code: &mut [u8], relocations: &[Relocation], code_vaddr: u64, data_vaddr: u64) {
    for reloc in relocations {
        match (reloc.kind, &reloc.target) {
            (RelocKind::Code, RelocTarget::CodeOffset(to)) => patch(code, reloc.from, *to as u64 + code_vaddr, reloc.width),
            (RelocKind::Data, RelocTarget::DataOffset(to)) => patch(code, reloc.from, *to as u64 + data_vaddr, reloc.width),
            (RelocKind::Import, _) => {}
            _ => unreachable!("a relocation's kind always agrees with its target's variant"),
        }
    }
}

/// The memory target: every relocation kind is meaningful, since the whole
/// image lives in one address space the resolver can actually hand out
/// addresses in.
pub fn apply_memory_relocations(
    code: &mut [u8],
    relocations: &[Relocation],
    code_base: u64,
    data_base: u64,
    dynamic_symbols: &[DynamicSymbol],
) -> EmitResult<()> {
    for reloc in relocations {
        match (reloc.kind, &reloc.target) {
            (RelocKind::Code, RelocTarget::CodeOffset(to)) => patch(code, reloc.from, *to as u64 + code_base, reloc.width),
            (RelocKind::Data, RelocTarget::DataOffset(to)) => patch(code, reloc.from, *to as u64 + data_base, reloc.width),
            (RelocKind::Import, RelocTarget::ImportSymbol(name)) => {
                let symbol = dynamic_symbols
                    .iter()
                    .find(|s| &s.symbol == name)
                    .ok_or_else(|| EmitError::UnresolvedImport { symbol: name.clone() })?;
                patch(code, reloc.from, symbol.address, reloc.width);
            }
            _ => unreachable!("a relocation's kind always agrees with its target's variant"),
        }
    }
    Ok(())
}

/// `-bopcodes`: the raw instruction stream has no real base address of its
/// own, so `Code` relocations patch a bare offset and `Data` relocations
/// patch an offset from the end of the code buffer (where the dump appends
/// the data segment) — `original_source/main.c`'s `BT_OPCODES` case.
/// `Import` has no meaning outside a real image and is rejected, matching
/// that same switch's `default` arm ("unknown relocation type").
pub fn apply_opcode_relocations(code: &mut [u8], relocations: &[Relocation], data_offset: u32) -> EmitResult<()> {
    for reloc in relocations {
        match (reloc.kind, &reloc.target) {
            (RelocKind::Code, RelocTarget::CodeOffset(to)) => patch(code, reloc.from, *to as u64, reloc.width),
            (RelocKind::Data, RelocTarget::DataOffset(to)) => patch(code, reloc.from, *to as u64 + data_offset as u64, reloc.width),
            (RelocKind::Import, RelocTarget::ImportSymbol(name)) => {
                return Err(EmitError::UnresolvedImport { symbol: name.clone() });
            }
            _ => unreachable!("a relocation's kind always agrees with its target's variant"),
        }
    }
    Ok(())
}

pub fn align_up(value: u32, align: u32) -> u32 {
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_the_next_multiple() {
        assert_eq!(align_up(0, 0x1000), 0);
        assert_eq!(align_up(1, 0x1000), 0x1000);
        assert_eq!(align_up(0x1000, 0x1000), 0x1000);
        assert_eq!(align_up(0x1001, 0x1000), 0x2000);
    }

    #[test]
    fn file_relocations_leave_imports_untouched() {
        let mut code = vec![0u8; 8];
        let relocs = vec![Relocation { kind: RelocKind::Import, from: 0, target: RelocTarget::ImportSymbol("puts".into()), width: 4 }];
        apply_file_relocations(&mut code, &relocs, 0x1000, 0x2000);
        assert_eq!(code, vec![0u8; 8]);
    }

    #[test]
    fn data_relocation_patches_absolute_address() {
        let mut code = vec![0u8; 4];
        let relocs = vec![Relocation { kind: RelocKind::Data, from: 0, target: RelocTarget::DataOffset(0x10), width: 4 }];
        apply_file_relocations(&mut code, &relocs, 0x1000, 0x2000);
        assert_eq!(u32::from_le_bytes(code.try_into().unwrap()), 0x2010);
    }
}
