//! Image-emitter error taxonomy (spec §7: `EmitError(io-reason)`, bubbled
//! up unchanged by `cc-driver`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("i/o error writing image: {0}")]
    Io(#[from] std::io::Error),

    /// An `IMPORT` relocation with no matching resolved symbol — an
    /// implementation invariant, not a user-facing input error: `cc-codegen`
    /// only emits an `Import` relocation alongside a `DynamicSymbol` it just
    /// pushed onto `CompiledModule::dynamic_symbols` for the same name.
    #[error("no resolved symbol for import '{symbol}'")]
    UnresolvedImport { symbol: String },

    #[error("memory target is only supported on this host's native architecture")]
    UnsupportedMemoryTarget,

    #[error("failed to map executable memory: {0}")]
    MapFailed(String),
}

pub type EmitResult<T> = Result<T, EmitError>;
