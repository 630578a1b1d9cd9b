//! Single bulk allocator owning every AST node of one parse.
//!
//! The whole arena is released together when the `(NodeId, NodeArena)` pair
//! returned by the parser is dropped — there is no per-node free and no
//! possibility of a dangling parent link, since parents are indices into
//! this same `Vec`, not raw pointers (spec §5/§9).

use crate::node::{Node, NodeId, NodeKind};
use crate::token::Span;

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Allocate a node with no parent yet; the caller fixes up `parent`
    /// once the child is attached to its owner (see `set_parent`).
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { parent: None, kind, span });
        id
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        self.nodes[child.0 as usize].parent = Some(parent);
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.get(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk upward from `id` looking for the nearest ancestor whose kind
    /// satisfies `pred`. Used by `break` resolution (spec invariant:
    /// a `BreakStmt`'s nearest enclosing `{FOR,WHILE,DO_WHILE}` must exist).
    pub fn find_ancestor(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut cur = self.parent(id);
        while let Some(n) = cur {
            if pred(self.kind(n)) {
                return Some(n);
            }
            cur = self.parent(n);
        }
        None
    }
}
