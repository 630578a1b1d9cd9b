//! Codegen error taxonomy (spec §4.2's public contract: "`CodegenError`
//! kinds: `UnknownIdentifier`, `UnknownFunction`, `TypeMismatch`,
//! `OperandSizeUnknown`, `DuplicateVariable`, `DuplicateFunction`,
//! `UnsupportedConstruct`").

use cc_ast::NodeId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("unknown identifier '{name}' at node {node:?}")]
    UnknownIdentifier { name: String, node: NodeId },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("type mismatch at node {node:?}: {message}")]
    TypeMismatch { node: NodeId, message: String },

    #[error("operand size unknown at node {node:?}: {message}")]
    OperandSizeUnknown { node: NodeId, message: String },

    #[error("duplicate variable '{name}' in function '{function}'")]
    DuplicateVariable { name: String, function: String },

    #[error("duplicate function '{name}'")]
    DuplicateFunction { name: String },

    #[error("unsupported construct at node {node:?}: {message}")]
    UnsupportedConstruct { node: NodeId, message: String },
}

pub type CodegenResult<T> = Result<T, CodegenError>;
