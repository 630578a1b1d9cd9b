//! Image emitter (spec §4.4): turns a [`cc_codegen::CompiledModule`] into
//! one of an ELF32 file, an ELF64 file, a PE file, or a live in-process
//! executable memory region.

mod elf;
mod error;
mod memory;
mod pe;
mod reloc;

pub use elf::{build_elf32, build_elf64};
pub use error::{EmitError, EmitResult};
pub use memory::{execute, MemoryImage};
pub use pe::build_pe;
pub use reloc::apply_opcode_relocations;

use cc_codegen::CompiledModule;

/// The four forms a compiled module can be turned into. `-bopcodes`'s raw
/// byte dump isn't a member here — it bypasses image emission entirely
/// and is handled directly by `cc-driver`, which already has the code
/// buffer before any of these layouts are built.
pub enum Image {
    Elf32(Vec<u8>),
    Elf64(Vec<u8>),
    Pe(Vec<u8>),
    Memory(MemoryImage),
}

/// Which concrete layout [`build`] should produce. Distinct from
/// `cc_codegen::TargetKind` because that type also carries `Opcodes`,
/// which never reaches this crate, and because ELF32 vs. ELF64 depends on
/// which backend word size the driver picked, not on the `-b` flag alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Elf32,
    Elf64,
    Pe,
    Memory,
}

pub fn build(module: &CompiledModule, format: ImageFormat) -> EmitResult<Image> {
    match format {
        ImageFormat::Elf32 => Ok(Image::Elf32(build_elf32(module)?)),
        ImageFormat::Elf64 => Ok(Image::Elf64(build_elf64(module)?)),
        ImageFormat::Pe => Ok(Image::Pe(build_pe(module)?)),
        ImageFormat::Memory => Ok(Image::Memory(memory::MemoryImage::build(module)?)),
    }
}

impl Image {
    /// Returns the file bytes for a file-backed image, or `None` for
    /// [`Image::Memory`], which was never meant to touch disk.
    pub fn file_bytes(&self) -> Option<&[u8]> {
        match self {
            Image::Elf32(bytes) | Image::Elf64(bytes) | Image::Pe(bytes) => Some(bytes),
            Image::Memory(_) => None,
        }
    }
}
