//! ELF32/ELF64 Tiny-ELF emitter (spec §4.4, §6 "File formats produced").
//! Grounded on `original_source/elf.c`/`elf64.c`'s two/three-`PT_LOAD`
//! layout and header field values; the `.data` segment's placement follows
//! SPEC_FULL.md §3.5's prose (`ORG + page_size + align_up(code_size,
//! page_size)`), not `elf.c`'s literal `vaddr += align_to(vaddr,
//! ALIGNMENT)` line, which computes a different (and, read literally,
//! self-inconsistent) quantity than the layout it's meant to produce.

use crate::error::EmitResult;
use crate::reloc::{align_up, apply_file_relocations};
use cc_codegen::CompiledModule;
use cc_target::emit::{db, dd, dw, pad, pad_align};

const PAGE_SIZE: u32 = 0x1000;

const PT_LOAD: u32 = 1;
const PF_X: u32 = 1;
const PF_W: u32 = 2;
const PF_R: u32 = 4;

const EM_386: u16 = 3;
const EM_X86_64: u16 = 0x3e;
const ET_EXEC: u16 = 2;

/// `ORG = 0x08048000` (spec §4.4).
pub fn build_elf32(module: &CompiledModule) -> EmitResult<Vec<u8>> {
    const ORG: u32 = 0x0804_8000;
    const EHSIZE: u32 = 52;
    const PHENTSIZE: u32 = 32;

    let phnum = if module.data.is_empty() { 2 } else { 3 };
    let headers_size = EHSIZE + phnum * PHENTSIZE;

    let code_vaddr = ORG + PAGE_SIZE;
    let data_vaddr = ORG + PAGE_SIZE + align_up(module.code.len() as u32, PAGE_SIZE);
    let entry = code_vaddr + module.entry_offset;

    let mut code = module.code.clone();
    apply_file_relocations(&mut code, &module.relocations, code_vaddr as u64, data_vaddr as u64);

    let mut out = Vec::new();
    db(&mut out, 0x7f);
    out.extend_from_slice(b"ELF");
    db(&mut out, 1); // EI_CLASS = ELFCLASS32
    db(&mut out, 1); // EI_DATA = ELFDATA2LSB
    db(&mut out, 1); // EI_VERSION
    db(&mut out, 0); // EI_OSABI = System V
    pad(&mut out, 8); // EI_ABIVERSION + EI_PAD

    dw(&mut out, ET_EXEC);
    dw(&mut out, EM_386);
    dd(&mut out, 1); // e_version
    dd(&mut out, entry);
    dd(&mut out, EHSIZE); // e_phoff: program headers sit right after this header
    dd(&mut out, 0); // e_shoff
    dd(&mut out, 0); // e_flags
    dw(&mut out, EHSIZE as u16);
    dw(&mut out, PHENTSIZE as u16);
    dw(&mut out, phnum as u16);
    dw(&mut out, 0); // e_shentsize
    dw(&mut out, 0); // e_shnum
    dw(&mut out, 0); // e_shstrndx
    debug_assert_eq!(out.len() as u32, EHSIZE);

    write_phdr32(&mut out, PT_LOAD, 0, ORG, headers_size, headers_size, PF_R);
    write_phdr32(&mut out, PT_LOAD, PAGE_SIZE, code_vaddr, code.len() as u32, code.len() as u32, PF_R | PF_X);
    if !module.data.is_empty() {
        let data_offset = PAGE_SIZE + align_up(code.len() as u32, PAGE_SIZE);
        write_phdr32(&mut out, PT_LOAD, data_offset, data_vaddr, module.data.len() as u32, module.data.len() as u32, PF_R | PF_W);
    }
    debug_assert_eq!(out.len() as u32, headers_size);

    pad(&mut out, (PAGE_SIZE - headers_size) as usize);
    out.extend_from_slice(&code);
    if !module.data.is_empty() {
        pad_align(&mut out, PAGE_SIZE as usize);
        out.extend_from_slice(&module.data);
    }
    Ok(out)
}

fn write_phdr32(out: &mut Vec<u8>, p_type: u32, offset: u32, vaddr: u32, filesz: u32, memsz: u32, flags: u32) {
    dd(out, p_type);
    dd(out, offset);
    dd(out, vaddr); // p_vaddr
    dd(out, vaddr); // p_paddr (unused on Linux, mirrors p_vaddr)
    dd(out, filesz);
    dd(out, memsz);
    dd(out, flags);
    dd(out, PAGE_SIZE); // p_align
}

/// `ORG = 0x00040000` (spec §4.4) — ELF64 mirrors ELF32 with 64-bit header
/// fields and `e_machine = 0x3e` (AMD64).
pub fn build_elf64(module: &CompiledModule) -> EmitResult<Vec<u8>> {
    const ORG: u64 = 0x0004_0000;
    const EHSIZE: u64 = 64;
    const PHENTSIZE: u64 = 56;

    let phnum = if module.data.is_empty() { 2 } else { 3 };
    let headers_size = EHSIZE + phnum * PHENTSIZE;

    let code_vaddr = ORG + PAGE_SIZE as u64;
    let data_vaddr = ORG + PAGE_SIZE as u64 + align_up(module.code.len() as u32, PAGE_SIZE) as u64;
    let entry = code_vaddr + module.entry_offset as u64;

    let mut code = module.code.clone();
    apply_file_relocations(&mut code, &module.relocations, code_vaddr, data_vaddr);

    let mut out = Vec::new();
    db(&mut out, 0x7f);
    out.extend_from_slice(b"ELF");
    db(&mut out, 2); // EI_CLASS = ELFCLASS64
    db(&mut out, 1); // EI_DATA = ELFDATA2LSB
    db(&mut out, 1); // EI_VERSION
    db(&mut out, 0); // EI_OSABI
    pad(&mut out, 8);

    dw(&mut out, ET_EXEC);
    dw(&mut out, EM_X86_64);
    dd(&mut out, 1); // e_version
    out.extend_from_slice(&entry.to_le_bytes());
    out.extend_from_slice(&EHSIZE.to_le_bytes()); // e_phoff
    out.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    dd(&mut out, 0); // e_flags
    dw(&mut out, EHSIZE as u16);
    dw(&mut out, PHENTSIZE as u16);
    dw(&mut out, phnum as u16);
    dw(&mut out, 0); // e_shentsize
    dw(&mut out, 0); // e_shnum
    dw(&mut out, 0); // e_shstrndx
    debug_assert_eq!(out.len() as u64, EHSIZE);

    write_phdr64(&mut out, PT_LOAD, 0, ORG, headers_size, headers_size, PF_R);
    write_phdr64(&mut out, PT_LOAD, PAGE_SIZE as u64, code_vaddr, code.len() as u64, code.len() as u64, PF_R | PF_X);
    if !module.data.is_empty() {
        let data_offset = PAGE_SIZE as u64 + align_up(code.len() as u32, PAGE_SIZE) as u64;
        write_phdr64(&mut out, PT_LOAD, data_offset, data_vaddr, module.data.len() as u64, module.data.len() as u64, PF_R | PF_W);
    }
    debug_assert_eq!(out.len() as u64, headers_size);

    pad(&mut out, (PAGE_SIZE as u64 - headers_size) as usize);
    out.extend_from_slice(&code);
    if !module.data.is_empty() {
        pad_align(&mut out, PAGE_SIZE as usize);
        out.extend_from_slice(&module.data);
    }
    Ok(out)
}

fn write_phdr64(out: &mut Vec<u8>, p_type: u32, offset: u64, vaddr: u64, filesz: u64, memsz: u64, flags: u32) {
    dd(out, p_type);
    dd(out, flags); // Elf64_Phdr orders flags right after p_type, before p_offset
    out.extend_from_slice(&offset.to_le_bytes());
    out.extend_from_slice(&vaddr.to_le_bytes());
    out.extend_from_slice(&vaddr.to_le_bytes()); // p_paddr
    out.extend_from_slice(&filesz.to_le_bytes());
    out.extend_from_slice(&memsz.to_le_bytes());
    out.extend_from_slice(&(PAGE_SIZE as u64).to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::DynamicSymbol;
    use rustc_hash::FxHashMap;

    fn module_returning(code: Vec<u8>, entry_offset: u32) -> CompiledModule {
        CompiledModule {
            code,
            data: Vec::new(),
            entry_offset,
            relocations: Vec::new(),
            functions: FxHashMap::default(),
            dynamic_symbols: Vec::<DynamicSymbol>::new(),
        }
    }

    #[test]
    fn elf32_starts_with_the_magic_and_class() {
        let module = module_returning(vec![0xb8, 0x07, 0, 0, 0, 0xc3], 0);
        let bytes = build_elf32(&module).unwrap();
        assert_eq!(&bytes[0..4], b"\x7fELF");
        assert_eq!(bytes[4], 1); // ELFCLASS32
        assert_eq!(u16::from_le_bytes([bytes[18], bytes[19]]), EM_386);
    }

    #[test]
    fn elf32_entry_point_accounts_for_entry_offset() {
        let module = module_returning(vec![0u8; 16], 10);
        let bytes = build_elf32(&module).unwrap();
        let entry = u32::from_le_bytes(bytes[24..28].try_into().unwrap());
        assert_eq!(entry, 0x0804_8000 + 0x1000 + 10);
    }

    #[test]
    fn elf64_uses_class_two_and_amd64_machine() {
        let module = module_returning(vec![0u8; 8], 0);
        let bytes = build_elf64(&module).unwrap();
        assert_eq!(bytes[4], 2); // ELFCLASS64
        assert_eq!(u16::from_le_bytes([bytes[18], bytes[19]]), EM_X86_64);
    }

    #[test]
    fn elf32_with_data_gets_a_third_segment() {
        let mut module = module_returning(vec![0u8; 8], 0);
        module.data = vec![1, 2, 3, 4];
        let bytes = build_elf32(&module).unwrap();
        let phnum = u16::from_le_bytes([bytes[44], bytes[45]]);
        assert_eq!(phnum, 3);
    }
}
