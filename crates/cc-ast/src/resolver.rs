//! The dynamic-symbol resolver callback (spec §1/§6): "given a symbol name,
//! returns an absolute address (for memory target) or metadata (library
//! name, symbol name) for image-file targets". The core consumes this
//! through one trait object so `cc-codegen` never depends on `cc-resolver`'s
//! platform-specific `dlopen`/`GetProcAddress` machinery — only on this
//! interface, the same separation spec §1 draws around the resolver as an
//! "external collaborator."

use crate::record::DynamicSymbol;

/// `resolve(name) -> {library, symbol, address, hash} | none` (spec §6).
pub trait SymbolResolver {
    fn resolve(&mut self, name: &str) -> Option<DynamicSymbol>;
}

/// A resolver that never finds anything, for targets/tests with no import
/// surface (e.g. `-bopcodes`, or unit tests of pure arithmetic).
#[derive(Debug, Default)]
pub struct NullResolver;

impl SymbolResolver for NullResolver {
    fn resolve(&mut self, _name: &str) -> Option<DynamicSymbol> {
        None
    }
}
