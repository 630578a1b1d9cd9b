//! Per-function variable bookkeeping and relocation records (spec §3).

use crate::node::NodeId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct VariableRecord {
    pub name: String,
    /// Byte offset from the function's frame base. Parameters use a
    /// positive offset above the saved frame pointer; locals use a negative
    /// offset below it (see `cc-codegen::layout`).
    pub offset: i32,
    pub is_param: bool,
    pub data_type: NodeId,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRecord {
    pub name: String,
    pub variables: FxHashMap<String, VariableRecord>,
    pub local_variable_size: u32,
    /// This function's own machine code. Intra-function jumps (`if`,
    /// loops, `break`) are always patched before the function's code is
    /// done growing, so nothing here is ever left unresolved; cross-function
    /// calls are patched later by concatenating every function's buffer and
    /// resolving `Relocation`s against the final offsets.
    pub code: Vec<u8>,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}

/// Kind of relocation pending against the emitted image (spec §3/§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    Code,
    Data,
    Import,
}

/// What a relocation ultimately resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocTarget {
    CodeOffset(u32),
    DataOffset(u32),
    ImportSymbol(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub kind: RelocKind,
    /// Byte offset in the code stream where the placeholder lives.
    pub from: u32,
    pub target: RelocTarget,
    pub width: u8,
}

/// A dynamic symbol known to the resolver (spec §3/§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSymbol {
    pub library: String,
    pub symbol: String,
    pub address: u64,
    pub hash: u32,
}

impl DynamicSymbol {
    pub fn new(library: impl Into<String>, symbol: impl Into<String>, address: u64) -> Self {
        let library = library.into();
        let symbol = symbol.into();
        let hash = crc32fast::hash(symbol.as_bytes());
        Self { library, symbol, address, hash }
    }
}
