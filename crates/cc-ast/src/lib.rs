//! Shared AST, token, arena, and per-function record types for ccvm.
//!
//! This crate holds no behavior — only the data model spec §3 describes —
//! so that `cc-parser` (producer) and `cc-codegen` (consumer) can agree on
//! it without either depending on the other.

pub mod arena;
pub mod node;
pub mod record;
pub mod resolver;
pub mod token;

pub use arena::NodeArena;
pub use node::{
    AssignOp, BinOp, Node, NodeId, NodeKind, Param, Primitive, SizeofTarget, UnaryOp,
};
pub use record::{DynamicSymbol, FunctionRecord, RelocKind, RelocTarget, Relocation, VariableRecord};
pub use resolver::{NullResolver, SymbolResolver};
pub use token::{Keyword, Operator, Span, Token, TokenKind};
