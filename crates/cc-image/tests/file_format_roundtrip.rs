//! File-format round trips (SPEC_FULL.md §1.4, spec §8 "File-format
//! tests"): an ELF produced for `linux-x64` with `main` returning a fixed
//! value, written to disk and executed on this Linux host, must exit with
//! that value.

use cc_ast::NullResolver;
use cc_codegen::{codegen, CodegenOptions, TargetKind};
use cc_image::{build_elf32, build_elf64};
use cc_lexer::{lex, LexFlags};
use cc_parser::parse;
use cc_target::{X64Backend, X86Backend};

fn compile_x64(source: &str, target: TargetKind) -> cc_codegen::CompiledModule {
    let tokens = lex(source, LexFlags::default()).expect("lex");
    let (root, arena) = parse(&tokens).expect("parse");
    let mut backend = X64Backend::new();
    let mut resolver = NullResolver::default();
    let options = CodegenOptions { target, debug_breakpoints: false };
    codegen(&arena, root, &mut backend, &mut resolver, options).expect("codegen")
}

fn compile_x86(source: &str, target: TargetKind) -> cc_codegen::CompiledModule {
    let tokens = lex(source, LexFlags::default()).expect("lex");
    let (root, arena) = parse(&tokens).expect("parse");
    let mut backend = X86Backend::new();
    let mut resolver = NullResolver::default();
    let options = CodegenOptions { target, debug_breakpoints: false };
    codegen(&arena, root, &mut backend, &mut resolver, options).expect("codegen")
}

#[cfg(target_os = "linux")]
#[test]
fn elf64_executable_exits_with_mains_return_value() {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let module = compile_x64("int main(){return 42;}", TargetKind::Linux);
    let bytes = build_elf64(&module).expect("build elf64");

    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(&bytes).expect("write elf bytes");
    let path = file.into_temp_path();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();

    let status = std::process::Command::new(&path).status().expect("exec the produced elf64");
    assert_eq!(status.code(), Some(42));
}

#[test]
fn elf32_header_has_the_expected_class_and_machine() {
    let module = compile_x86("int main(){return 1;}", TargetKind::Linux);
    let bytes = build_elf32(&module).expect("build elf32");
    assert_eq!(&bytes[0..4], b"\x7fELF");
    assert_eq!(bytes[4], 1); // ELFCLASS32
    assert_eq!(u16::from_le_bytes([bytes[18], bytes[19]]), 3); // EM_386
}

#[test]
fn pe_produces_a_well_formed_dos_and_pe_header() {
    let module = compile_x86("int main(){return 1;}", TargetKind::Windows);
    let bytes = cc_image::build_pe(&module).expect("build pe");
    assert_eq!(&bytes[0..2], b"MZ");
    let pe_offset = u32::from_le_bytes(bytes[0x3c..0x40].try_into().unwrap()) as usize;
    assert_eq!(&bytes[pe_offset..pe_offset + 4], b"PE\0\0");
    let machine = u16::from_le_bytes(bytes[pe_offset + 4..pe_offset + 6].try_into().unwrap());
    assert_eq!(machine, 0x14c);
}

#[cfg(target_os = "linux")]
#[test]
fn memory_target_executes_sum_loop_in_process() {
    let module = compile_x64(
        "int sum(int n){int s=0;for(int i=1;i<=n;i=i+1)s=s+i;return s;} int main(){return sum(10);}",
        TargetKind::Memory,
    );
    let status = cc_image::execute(&module).expect("mmap/mprotect should succeed on a Linux host");
    assert_eq!(status, 55);
}
