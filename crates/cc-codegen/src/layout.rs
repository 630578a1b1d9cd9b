//! Type sizing, struct/union field offsets, and per-function frame layout
//! (spec §4.2 "Type sizing (`data_type_size`)" and "Local-frame layout").
//!
//! One implementation, not the teacher-noted three near-duplicates (design
//! note §9) — `cc-parser` never calls this, only `cc-codegen` does.

use crate::error::{CodegenError, CodegenResult};
use cc_ast::{FunctionRecord, NodeArena, NodeId, NodeKind, Param, Primitive, VariableRecord};
use rustc_hash::FxHashMap;

/// A resolved type, decoupled from the AST node that spelled it — needed
/// because type inference over expressions (`typeinfer.rs`) synthesizes
/// types (a literal's type, a dereference's pointee) with no node of their
/// own in the original arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    Primitive(Primitive),
    Pointer(Box<CType>),
    Array(Box<CType>, u32),
    /// The `StructDecl` node; `is_union` is read off it on demand rather
    /// than duplicated here.
    Struct(NodeId),
}

impl CType {
    pub fn pointer_to(self) -> CType {
        CType::Pointer(Box::new(self))
    }

    /// The type one `[i]`/`*`/field-dereference layer down — lvalue chains
    /// peel one layer at a time (SPEC_FULL §4: multi-dimensional array
    /// indexing "recurses one `ARRAY_DATA_TYPE` layer per `[...]`").
    pub fn inner(&self) -> Option<&CType> {
        match self {
            CType::Pointer(t) | CType::Array(t, _) => Some(t),
            _ => None,
        }
    }
}

/// Converts an AST type node (`PrimitiveDataType`/`PointerDataType`/
/// `ArrayDataType`/`StructDataType`) into the decoupled [`CType`] codegen
/// reasons about.
pub fn ctype_of(arena: &NodeArena, ty: NodeId) -> CType {
    match arena.kind(ty) {
        NodeKind::PrimitiveDataType { primitive, .. } => CType::Primitive(*primitive),
        NodeKind::PointerDataType { pointee, .. } => CType::Pointer(Box::new(ctype_of(arena, *pointee))),
        NodeKind::ArrayDataType { element, size } => CType::Array(Box::new(ctype_of(arena, *element)), *size),
        NodeKind::StructDataType { decl } => CType::Struct(*decl),
        other => unreachable!("not a type node: {other:?}"),
    }
}

/// spec §4.2's `data_type_size` table, parameterized on the target's word
/// size rather than hard-coding 4 everywhere (design note §9: "the rewrite
/// should parameterize word size on the target and forbid raw literals in
/// the driver"). `int` stays the conventional 4 bytes on both targets;
/// `long` and pointers scale with `word_size` — the one place this
/// compiler's "word size of target" phrase actually means ILP32-vs-LP64.
pub fn data_type_size(arena: &NodeArena, node: NodeId, ty: &CType, word_size: u32) -> CodegenResult<u32> {
    let size = match ty {
        CType::Primitive(Primitive::Char) => 1,
        CType::Primitive(Primitive::Short) => 2,
        CType::Primitive(Primitive::Int) => 4,
        CType::Primitive(Primitive::Long) => word_size,
        CType::Primitive(Primitive::Float) => 4,
        CType::Primitive(Primitive::Double) => 8,
        CType::Primitive(Primitive::Void) => 0,
        CType::Pointer(_) => word_size,
        CType::Array(elem, n) => data_type_size(arena, node, elem, word_size)?.checked_mul(*n).ok_or_else(|| {
            CodegenError::OperandSizeUnknown { node, message: "array size overflows u32".into() }
        })?,
        CType::Struct(decl) => {
            let NodeKind::StructDecl { fields, is_union, .. } = arena.kind(*decl) else {
                unreachable!("StructDataType must reference a StructDecl")
            };
            if *is_union {
                let mut max = 0u32;
                for &f in fields {
                    max = max.max(field_ctype_size(arena, node, f, word_size)?);
                }
                max
            } else {
                let mut total = 0u32;
                for &f in fields {
                    total += field_ctype_size(arena, node, f, word_size)?;
                }
                total
            }
        }
    };
    Ok(size)
}

fn field_ctype_size(arena: &NodeArena, node: NodeId, field: NodeId, word_size: u32) -> CodegenResult<u32> {
    let NodeKind::VariableDecl { data_type, .. } = arena.kind(field) else {
        unreachable!("struct/union field must be a VariableDecl")
    };
    data_type_size(arena, node, &ctype_of(arena, *data_type), word_size)
}

/// `data_type_size` for an lvalue/operand position: zero is only legal for
/// `void`, everything else reaching here is an error (spec: "Zero-size
/// results on a type that is being stored or loaded are an error
/// (`OperandSizeUnknown`)").
pub fn operand_size(arena: &NodeArena, node: NodeId, ty: &CType, word_size: u32) -> CodegenResult<u32> {
    let size = data_type_size(arena, node, ty, word_size)?;
    if size == 0 {
        return Err(CodegenError::OperandSizeUnknown {
            node,
            message: format!("operand of type {ty:?} has size 0"),
        });
    }
    Ok(size)
}

/// Walks `struct_decl`'s field list summing preceding fields' byte sizes
/// (no padding) to get `field`'s offset (SPEC_FULL §4: "Struct/union field
/// offset computation", grounded on `original_source/compiler.c`'s
/// `AST_MEMBER_EXPR` lvalue case). Returns the offset and the field's own
/// type node (so the caller can keep indexing/dereferencing through it).
pub fn field_offset(
    arena: &NodeArena,
    node: NodeId,
    struct_decl: NodeId,
    field: &str,
    word_size: u32,
) -> CodegenResult<(u32, NodeId)> {
    let NodeKind::StructDecl { fields, is_union, name } = arena.kind(struct_decl) else {
        unreachable!("field_offset called on a non-StructDecl")
    };
    let mut offset = 0u32;
    for &f in fields {
        let NodeKind::VariableDecl { name: fname, data_type, .. } = arena.kind(f) else { unreachable!() };
        if fname == field {
            return Ok((offset, *data_type));
        }
        if !*is_union {
            offset += data_type_size(arena, node, &ctype_of(arena, *data_type), word_size)?;
        }
    }
    Err(CodegenError::TypeMismatch {
        node,
        message: format!("no field '{field}' in struct/union '{}'", name.as_deref().unwrap_or("<anonymous>")),
    })
}

/// Per-function frame: parameter offsets above the saved frame pointer,
/// local offsets below it, and the total (aligned, 32-byte-minimum) frame
/// size (spec §4.2 "Local-frame layout").
pub struct FrameLayout {
    pub variables: FxHashMap<String, VariableRecord>,
    pub frame_size: u32,
}

/// Stack alignment this driver targets for every function's frame,
/// regardless of word size — satisfies both the 32-bit ABI's 4-byte
/// minimum and the x86-64 ABI's 16-byte call-site alignment expectation,
/// at the cost of a few wasted bytes on 32-bit targets.
const FRAME_ALIGN: u32 = 16;

/// Builds a function's frame from its parameter list and the declarations
/// its body collected while parsing (spec: "a single declaration-collecting
/// pre-pass"). Parameters get positive offsets starting at `2 * word_size`
/// (past the return address and saved frame pointer), increasing with
/// parameter index — first parameter closest to the frame pointer, matching
/// a right-to-left push order (spec §4.2 "Function calls": "push arguments
/// right-to-left"). Locals get negative offsets, `local_variable_size +=
/// this_var_size` at the point of declaration, exactly as spec describes.
pub fn build_frame(
    arena: &NodeArena,
    function: &str,
    params: &[Param],
    declarations: &[NodeId],
    word_size: u32,
) -> CodegenResult<FrameLayout> {
    let mut variables = FxHashMap::default();

    let mut param_offset = 2 * word_size as i32;
    for param in params {
        if let Param::Named { ty, name, .. } = param {
            if variables.contains_key(name) {
                return Err(CodegenError::DuplicateVariable { name: name.clone(), function: function.to_string() });
            }
            variables.insert(
                name.clone(),
                VariableRecord { name: name.clone(), offset: param_offset, is_param: true, data_type: *ty },
            );
            param_offset += word_size as i32;
        }
    }

    let mut running = 0u32;
    for &decl in declarations {
        let NodeKind::VariableDecl { name, data_type, .. } = arena.kind(decl) else {
            unreachable!("FunctionDecl::declarations must only contain VariableDecl nodes")
        };
        if variables.contains_key(name) {
            return Err(CodegenError::DuplicateVariable { name: name.clone(), function: function.to_string() });
        }
        let size = data_type_size(arena, decl, &ctype_of(arena, *data_type), word_size)?;
        running += size.max(1);
        variables.insert(
            name.clone(),
            VariableRecord { name: name.clone(), offset: -(running as i32), is_param: false, data_type: *data_type },
        );
    }

    let frame_size = align_up(running.max(32), FRAME_ALIGN);
    Ok(FrameLayout { variables, frame_size })
}

fn align_up(n: u32, align: u32) -> u32 {
    (n + align - 1) / align * align
}

/// True for a floating-point primitive type node — used by the rejection of
/// float/double *values* outside `sizeof` (SPEC_FULL §5's resolved Open
/// Question, choice (a)).
pub fn is_floating(arena: &NodeArena, ty: NodeId) -> bool {
    matches!(arena.kind(ty), NodeKind::PrimitiveDataType { primitive: Primitive::Float | Primitive::Double, .. })
}

pub fn is_floating_ctype(ty: &CType) -> bool {
    matches!(ty, CType::Primitive(Primitive::Float | Primitive::Double))
}

/// Builds the `FunctionRecord` a [`FrameLayout`] implies — kept here
/// instead of `cc-ast` so the "what a function record looks like right
/// after frame layout" shape stays next to the logic that builds it.
pub fn new_function_record(name: &str, frame: FrameLayout) -> FunctionRecord {
    let mut rec = FunctionRecord::new(name);
    rec.variables = frame.variables;
    rec.local_variable_size = frame.frame_size;
    rec
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_ast::Span;

    fn leaf(arena: &mut NodeArena, kind: NodeKind) -> NodeId {
        arena.alloc(kind, Span::dummy())
    }

    #[test]
    fn primitive_sizes() {
        let mut arena = NodeArena::new();
        let int_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Int, is_const: false });
        assert_eq!(data_type_size(&arena, int_ty, &ctype_of(&arena, int_ty), 4).unwrap(), 4);
        let char_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Char, is_const: false });
        assert_eq!(data_type_size(&arena, char_ty, &ctype_of(&arena, char_ty), 8).unwrap(), 1);
    }

    #[test]
    fn pointer_size_tracks_word_size() {
        let mut arena = NodeArena::new();
        let int_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Int, is_const: false });
        let ptr_ty = leaf(&mut arena, NodeKind::PointerDataType { pointee: int_ty, is_const: false });
        let ty = ctype_of(&arena, ptr_ty);
        assert_eq!(data_type_size(&arena, ptr_ty, &ty, 4).unwrap(), 4);
        assert_eq!(data_type_size(&arena, ptr_ty, &ty, 8).unwrap(), 8);
    }

    #[test]
    fn int_stays_four_bytes_on_both_word_sizes() {
        let mut arena = NodeArena::new();
        let int_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Int, is_const: false });
        let ty = ctype_of(&arena, int_ty);
        assert_eq!(data_type_size(&arena, int_ty, &ty, 4).unwrap(), 4);
        assert_eq!(data_type_size(&arena, int_ty, &ty, 8).unwrap(), 4);
    }

    #[test]
    fn array_size_is_n_times_elem() {
        let mut arena = NodeArena::new();
        let int_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Int, is_const: false });
        let arr_ty = leaf(&mut arena, NodeKind::ArrayDataType { element: int_ty, size: 4 });
        let ty = ctype_of(&arena, arr_ty);
        assert_eq!(data_type_size(&arena, arr_ty, &ty, 4).unwrap(), 16);
    }

    #[test]
    fn frame_minimum_is_32_bytes_aligned() {
        let arena = NodeArena::new();
        let frame = build_frame(&arena, "f", &[], &[], 4).unwrap();
        assert_eq!(frame.frame_size, 32);
    }

    #[test]
    fn struct_size_sums_fields_without_padding() {
        let mut arena = NodeArena::new();
        let char_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Char, is_const: false });
        let int_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Int, is_const: false });
        let f1 = leaf(&mut arena, NodeKind::VariableDecl { name: "a".into(), data_type: char_ty, initializer: None });
        let f2 = leaf(&mut arena, NodeKind::VariableDecl { name: "b".into(), data_type: int_ty, initializer: None });
        let decl = leaf(&mut arena, NodeKind::StructDecl { name: Some("S".into()), fields: vec![f1, f2], is_union: false });
        let ty = CType::Struct(decl);
        assert_eq!(data_type_size(&arena, decl, &ty, 4).unwrap(), 5);
        let (off, fty) = field_offset(&arena, decl, decl, "b", 4).unwrap();
        assert_eq!(off, 1);
        assert_eq!(fty, int_ty);
    }

    #[test]
    fn union_size_is_max_of_fields() {
        let mut arena = NodeArena::new();
        let char_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Char, is_const: false });
        let int_ty = leaf(&mut arena, NodeKind::PrimitiveDataType { primitive: Primitive::Int, is_const: false });
        let f1 = leaf(&mut arena, NodeKind::VariableDecl { name: "a".into(), data_type: char_ty, initializer: None });
        let f2 = leaf(&mut arena, NodeKind::VariableDecl { name: "b".into(), data_type: int_ty, initializer: None });
        let decl = leaf(&mut arena, NodeKind::StructDecl { name: Some("U".into()), fields: vec![f1, f2], is_union: true });
        let ty = CType::Struct(decl);
        assert_eq!(data_type_size(&arena, decl, &ty, 4).unwrap(), 4);
    }
}
