//! Parser state: token cursor, the AST arena it fills in, and the handful
//! of tables a single-translation-unit parse needs (struct/union tags,
//! the function currently being parsed).

use crate::cursor::Cursor;
use cc_ast::{NodeArena, NodeId, Token};
use rustc_hash::FxHashMap;

pub struct Parser<'a> {
    pub(crate) arena: NodeArena,
    pub(crate) cur: Cursor<'a>,
    /// struct/union tag name -> its `StructDecl` node, so `struct Foo x;`
    /// can reference a tag declared earlier without repeating its fields.
    pub(crate) structs: FxHashMap<String, NodeId>,
    /// The `FunctionDecl` node currently being parsed, so nested
    /// `VariableDecl`s can be appended to its `declarations` list
    /// (spec §4.1: "this drives local-frame sizing in §4.2").
    pub(crate) current_function: Option<NodeId>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            arena: NodeArena::new(),
            cur: Cursor::new(tokens),
            structs: FxHashMap::default(),
            current_function: None,
        }
    }

    pub(crate) fn record_declaration(&mut self, decl: NodeId) {
        if let Some(func) = self.current_function {
            if let cc_ast::NodeKind::FunctionDecl { declarations, .. } = &mut self.arena.get_mut(func).kind {
                declarations.push(decl);
            }
        }
    }
}
