//! The `-bmemory` resolver: `dlopen`/`dlsym` (or `LoadLibraryW`/
//! `GetProcAddress`) against the libraries named on the command line via
//! `-l<name>`, returning a real absolute address — the only resolver that
//! can, since the memory target calls directly into the host process.

use crate::library::{Library, ResolverError};
use cc_ast::{DynamicSymbol, SymbolResolver};

/// Enumerates the libraries named by `-l<name>` and answers `resolve`
/// queries against their combined symbol tables, first match wins, in the
/// order the libraries were given — the same linear search
/// `raya-engine`'s FFI loader performs when a host module imports a symbol
/// from one of several loaded native modules.
pub struct MemoryResolver {
    libraries: Vec<Library>,
}

impl MemoryResolver {
    /// Opens every named library eagerly, so a missing `-l<name>` is
    /// reported at compile start rather than surfacing as a spurious
    /// `UnknownFunction` deep inside codegen.
    pub fn new(library_names: &[String]) -> Result<Self, ResolverError> {
        let libraries = library_names.iter().map(|name| Library::open(name)).collect::<Result<Vec<_>, _>>()?;
        Ok(MemoryResolver { libraries })
    }
}

impl SymbolResolver for MemoryResolver {
    fn resolve(&mut self, name: &str) -> Option<DynamicSymbol> {
        for lib in &self.libraries {
            if let Ok(Some(address)) = lib.symbol_address(name) {
                return Some(DynamicSymbol::new(lib.name().to_string(), name.to_string(), address));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_library_is_an_error() {
        let result = MemoryResolver::new(&["no_such_library_ccvm_test".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn resolver_with_no_libraries_resolves_nothing() {
        let mut resolver = MemoryResolver::new(&[]).expect("empty library list always succeeds");
        assert!(resolver.resolve("anything").is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn resolves_a_libc_symbol() {
        let mut resolver = MemoryResolver::new(&["c".to_string()]).expect("libc is always present");
        let sym = resolver.resolve("getpid").expect("libc exports getpid");
        assert_eq!(sym.symbol, "getpid");
        assert_ne!(sym.address, 0);
    }
}
