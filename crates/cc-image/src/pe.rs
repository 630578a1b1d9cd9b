//! PE emitter (spec §4.4/§6: "DOS stub with offset-to-PE at file offset
//! 0x3c; PE signature; `IMAGE_FILE_HEADER` with machine `0x14c`;
//! `IMAGE_OPTIONAL_HEADER32`..."). Grounded on `original_source/pe.c`'s
//! header field values and single-`.text`-section layout, but wiring in
//! the actual compiled code/relocations rather than `pe.c`'s hardcoded
//! four-byte example body.

use crate::error::EmitResult;
use crate::reloc::{align_up, apply_file_relocations};
use cc_codegen::CompiledModule;
use cc_target::emit::{dd, dw, pad, pad_align};

const IMAGE_BASE: u32 = 0x0040_0000;
const SECTION_ALIGNMENT: u32 = 0x1000;
const FILE_ALIGNMENT: u32 = 0x200;
const IMAGE_FILE_MACHINE_I386: u16 = 0x14c;
const IMAGE_FILE_32BIT_MACHINE: u16 = 0x0100;
const IMAGE_FILE_EXECUTABLE_IMAGE: u16 = 0x0002;
const IMAGE_SUBSYSTEM_WINDOWS_CUI: u16 = 3;
const IMAGE_DLLCHARACTERISTICS_NX_COMPAT: u16 = 0x0100;
const IMAGE_DLLCHARACTERISTICS_DYNAMIC_BASE: u16 = 0x0040;
const IMAGE_DLLCHARACTERISTICS_NO_SEH: u16 = 0x0400;
const IMAGE_DLLCHARACTERISTICS_TERMINAL_SERVER_AWARE: u16 = 0x8000;
const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;

/// Imports are only meaningful for the memory target — `.text`'s `Code`/
/// `Data` relocations still get patched against this section's own
/// virtual address, since those are self-referential and don't need a
/// real import table. PE code never carries the x86 two-relocation import
/// convention into a finished binary; any `syscall()`/import call compiled
/// for `-bwindows` will fault at runtime, matching `pe.c`'s own
/// commented-out import directory.
/// DOS stub (0x40) + `"PE\0\0"` (4) + `IMAGE_FILE_HEADER` (20) +
/// `IMAGE_OPTIONAL_HEADER32` (0xe0) + one `IMAGE_SECTION_HEADER` (40):
/// fixed regardless of code size, so the raw-data file offset is known
/// before a single code byte is written.
const HEADERS_SIZE: u32 = 0x40 + 4 + 20 + 0xe0 + 40;

pub fn build_pe(module: &CompiledModule) -> EmitResult<Vec<u8>> {
    let text_rva = SECTION_ALIGNMENT; // base_of_code, address_of_entry_point
    let code_vaddr = IMAGE_BASE + text_rva;
    let data_vaddr = code_vaddr; // single section: data shares .text's address space
    let entry_rva = text_rva + module.entry_offset;

    let mut code = module.code.clone();
    apply_file_relocations(&mut code, &module.relocations, code_vaddr as u64, data_vaddr as u64);
    code.extend_from_slice(&module.data);

    let raw_data_offset = align_up(HEADERS_SIZE, FILE_ALIGNMENT);
    let size_of_raw_data = align_up(code.len() as u32, FILE_ALIGNMENT);
    let virtual_size = code.len() as u32;
    let size_of_image = align_up(text_rva + virtual_size, SECTION_ALIGNMENT);

    let mut out = Vec::new();
    write_dos_stub(&mut out);

    out.extend_from_slice(b"PE\0\0");
    // IMAGE_FILE_HEADER
    dw(&mut out, IMAGE_FILE_MACHINE_I386);
    dw(&mut out, 1); // NumberOfSections
    dd(&mut out, 0); // TimeDateStamp
    dd(&mut out, 0); // PointerToSymbolTable
    dd(&mut out, 0); // NumberOfSymbols
    dw(&mut out, 0xe0); // SizeOfOptionalHeader (IMAGE_OPTIONAL_HEADER32)
    dw(&mut out, IMAGE_FILE_32BIT_MACHINE | IMAGE_FILE_EXECUTABLE_IMAGE);

    // IMAGE_OPTIONAL_HEADER32
    let opt_header_start = out.len();
    dw(&mut out, 0x10b); // Magic: PE32
    out.push(0); // MajorLinkerVersion
    out.push(0); // MinorLinkerVersion
    dd(&mut out, size_of_raw_data); // SizeOfCode
    dd(&mut out, 0); // SizeOfInitializedData
    dd(&mut out, 0); // SizeOfUninitializedData
    dd(&mut out, entry_rva); // AddressOfEntryPoint
    dd(&mut out, text_rva); // BaseOfCode
    dd(&mut out, text_rva); // BaseOfData
    dd(&mut out, IMAGE_BASE); // ImageBase
    dd(&mut out, SECTION_ALIGNMENT); // SectionAlignment
    dd(&mut out, FILE_ALIGNMENT); // FileAlignment
    dw(&mut out, 4); // MajorOperatingSystemVersion
    dw(&mut out, 0); // MinorOperatingSystemVersion
    dw(&mut out, 0); // MajorImageVersion
    dw(&mut out, 0); // MinorImageVersion
    dw(&mut out, 4); // MajorSubsystemVersion
    dw(&mut out, 0); // MinorSubsystemVersion
    dd(&mut out, 0); // Win32VersionValue
    dd(&mut out, size_of_image); // SizeOfImage
    dd(&mut out, raw_data_offset); // SizeOfHeaders
    dd(&mut out, 0); // CheckSum
    dw(&mut out, IMAGE_SUBSYSTEM_WINDOWS_CUI);
    dw(
        &mut out,
        IMAGE_DLLCHARACTERISTICS_NX_COMPAT
            | IMAGE_DLLCHARACTERISTICS_DYNAMIC_BASE
            | IMAGE_DLLCHARACTERISTICS_NO_SEH
            | IMAGE_DLLCHARACTERISTICS_TERMINAL_SERVER_AWARE,
    );
    dd(&mut out, 0x10_0000); // SizeOfStackReserve
    dd(&mut out, 0x1000); // SizeOfStackCommit
    dd(&mut out, 0x10_0000); // SizeOfHeapReserve
    dd(&mut out, 0x1000); // SizeOfHeapCommit
    dd(&mut out, 0); // LoaderFlags
    dd(&mut out, 16); // NumberOfRvaAndSizes
    for _ in 0..16 {
        dd(&mut out, 0); // data_dir[16]: every directory (including imports) disabled
    }
    debug_assert_eq!(out.len() - opt_header_start, 0xe0);

    // IMAGE_SECTION_HEADER for ".text"
    let mut name = [0u8; 8];
    name[..5].copy_from_slice(b".text");
    out.extend_from_slice(&name);
    dd(&mut out, virtual_size);
    dd(&mut out, text_rva);
    dd(&mut out, size_of_raw_data);
    dd(&mut out, raw_data_offset); // PointerToRawData
    dd(&mut out, 0); // PointerToRelocations
    dd(&mut out, 0); // PointerToLinenumbers
    dw(&mut out, 0); // NumberOfRelocations
    dw(&mut out, 0); // NumberOfLinenumbers
    dd(&mut out, IMAGE_SCN_CNT_CODE | IMAGE_SCN_MEM_EXECUTE | IMAGE_SCN_MEM_READ);
    debug_assert_eq!(out.len() as u32, HEADERS_SIZE);

    pad_align(&mut out, FILE_ALIGNMENT as usize);
    debug_assert_eq!(out.len() as u32, raw_data_offset);
    out.extend_from_slice(&code);
    pad_align(&mut out, FILE_ALIGNMENT as usize);

    Ok(out)
}

fn write_dos_stub(out: &mut Vec<u8>) {
    out.extend_from_slice(b"MZ");
    pad(out, 0x3a); // up to (not including) the e_lfanew field at 0x3c
    dd(out, 0x40); // e_lfanew: PE header starts right after a minimal 0x40-byte stub
    pad(out, 0x40 - out.len());
    debug_assert_eq!(out.len(), 0x40);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::DynamicSymbol;
    use rustc_hash::FxHashMap;

    fn module_returning(code: Vec<u8>) -> CompiledModule {
        CompiledModule {
            code,
            data: Vec::new(),
            entry_offset: 0,
            relocations: Vec::new(),
            functions: FxHashMap::default(),
            dynamic_symbols: Vec::<DynamicSymbol>::new(),
        }
    }

    #[test]
    fn starts_with_mz_and_has_the_pe_offset_at_0x3c() {
        let bytes = build_pe(&module_returning(vec![0xb8, 0x2a, 0, 0, 0, 0xc3])).unwrap();
        assert_eq!(&bytes[0..2], b"MZ");
        let pe_offset = u32::from_le_bytes(bytes[0x3c..0x40].try_into().unwrap());
        assert_eq!(&bytes[pe_offset as usize..pe_offset as usize + 4], b"PE\0\0");
    }

    #[test]
    fn optional_header_declares_pe32_and_windows_cui() {
        let bytes = build_pe(&module_returning(vec![0u8; 16])).unwrap();
        let pe_offset = u32::from_le_bytes(bytes[0x3c..0x40].try_into().unwrap()) as usize;
        let opt_header = pe_offset + 4 + 20;
        let magic = u16::from_le_bytes(bytes[opt_header..opt_header + 2].try_into().unwrap());
        assert_eq!(magic, 0x10b);
    }
}
