//! Dynamic symbol resolvers implementing `cc_ast::SymbolResolver` (spec §6
//! "Resolver interface"): [`MemoryResolver`] for the `-bmemory` target,
//! [`ImportResolver`] for the `-bwindows`/`-blinux` file targets.

mod import;
mod library;
mod memory;

pub use import::ImportResolver;
pub use library::{Library, ResolverError};
pub use memory::MemoryResolver;
