//! `-a`: dump the parsed AST and stop (spec §6).
//!
//! `original_source/main-ast.c` never renders a tree of its own — it calls
//! `generate_ast(..., print = true)` and lets that pass interleave
//! printing with construction. This crate's parser has no such printing
//! hook (spec's "Visitor by dispatch table, not function-pointer arrays"
//! redesign note already turned that kind of side-effecting callback into
//! plain pattern matching), so `-a` instead walks the finished
//! [`cc_ast::NodeArena`] itself: an indented, pre-order S-expression dump,
//! one node per line.

use cc_ast::{NodeArena, NodeId, NodeKind};
use std::fmt::Write as _;

pub fn dump(arena: &NodeArena, root: NodeId) -> String {
    let mut out = String::new();
    write_node(&mut out, arena, root, 0);
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_node(out: &mut String, arena: &NodeArena, id: NodeId, depth: usize) {
    indent(out, depth);
    match arena.kind(id) {
        NodeKind::Program { functions } => {
            let _ = writeln!(out, "(Program");
            for &f in functions {
                write_node(out, arena, f, depth + 1);
            }
            indent(out, depth);
            out.push(')');
            out.push('\n');
        }
        NodeKind::FunctionDecl { name, return_type, params, body, .. } => {
            let _ = writeln!(out, "(FunctionDecl {name}");
            write_node(out, arena, *return_type, depth + 1);
            for p in params {
                indent(out, depth + 1);
                match p {
                    cc_ast::Param::Named { name, .. } => {
                        let _ = writeln!(out, "(Param {name})");
                    }
                    cc_ast::Param::Variadic => {
                        out.push_str("(Param ...)\n");
                    }
                }
            }
            if let Some(body) = body {
                write_node(out, arena, *body, depth + 1);
            }
            indent(out, depth);
            out.push(')');
            out.push('\n');
        }
        NodeKind::BlockStmt { statements } => {
            let _ = writeln!(out, "(Block");
            for &s in statements {
                write_node(out, arena, s, depth + 1);
            }
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::IfStmt { cond, then_branch, else_branch } => {
            let _ = writeln!(out, "(If");
            write_node(out, arena, *cond, depth + 1);
            write_node(out, arena, *then_branch, depth + 1);
            if let Some(e) = else_branch {
                write_node(out, arena, *e, depth + 1);
            }
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::WhileStmt { cond, body } => {
            let _ = writeln!(out, "(While");
            write_node(out, arena, *cond, depth + 1);
            write_node(out, arena, *body, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::DoWhileStmt { body, cond } => {
            let _ = writeln!(out, "(DoWhile");
            write_node(out, arena, *body, depth + 1);
            write_node(out, arena, *cond, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::ForStmt { init, test, update, body } => {
            let _ = writeln!(out, "(For");
            for part in [init, test, update] {
                if let Some(n) = part {
                    write_node(out, arena, *n, depth + 1);
                } else {
                    indent(out, depth + 1);
                    out.push_str("(Empty)\n");
                }
            }
            write_node(out, arena, *body, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::BreakStmt => out.push_str("(Break)\n"),
        NodeKind::ReturnStmt { value } => {
            if let Some(v) = value {
                let _ = writeln!(out, "(Return");
                write_node(out, arena, *v, depth + 1);
                indent(out, depth);
                out.push_str(")\n");
            } else {
                out.push_str("(Return)\n");
            }
        }
        NodeKind::ExprStmt { expr } => {
            let _ = writeln!(out, "(ExprStmt");
            write_node(out, arena, *expr, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::VariableDecl { name, data_type, initializer } => {
            let _ = writeln!(out, "(VariableDecl {name}");
            write_node(out, arena, *data_type, depth + 1);
            if let Some(init) = initializer {
                write_node(out, arena, *init, depth + 1);
            }
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::Identifier { name } => {
            let _ = writeln!(out, "(Identifier {name})");
        }
        NodeKind::IntLiteral { value } => {
            let _ = writeln!(out, "(IntLiteral {value})");
        }
        NodeKind::StringLiteral { value } => {
            let _ = writeln!(out, "(StringLiteral {value:?})");
        }
        NodeKind::BinExpr { op, lhs, rhs } => {
            let _ = writeln!(out, "(BinExpr {op:?}");
            write_node(out, arena, *lhs, depth + 1);
            write_node(out, arena, *rhs, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::AssignmentExpr { op, target, value } => {
            let _ = writeln!(out, "(Assign {op:?}");
            write_node(out, arena, *target, depth + 1);
            write_node(out, arena, *value, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::UnaryExpr { op, operand } => {
            let _ = writeln!(out, "(UnaryExpr {op:?}");
            write_node(out, arena, *operand, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::TernaryExpr { condition, consequent, alternative } => {
            let _ = writeln!(out, "(Ternary");
            write_node(out, arena, *condition, depth + 1);
            write_node(out, arena, *consequent, depth + 1);
            write_node(out, arena, *alternative, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::IndexExpr { base, index } => {
            let _ = writeln!(out, "(Index");
            write_node(out, arena, *base, depth + 1);
            write_node(out, arena, *index, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::FieldExpr { base, field, arrow } => {
            let op = if *arrow { "->" } else { "." };
            let _ = writeln!(out, "(Field {op}{field}");
            write_node(out, arena, *base, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::FunctionCallExpr { callee, args } => {
            let _ = writeln!(out, "(Call {callee}");
            for &a in args {
                write_node(out, arena, a, depth + 1);
            }
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::Sizeof { target } => match target {
            cc_ast::SizeofTarget::Type(t) => {
                let _ = writeln!(out, "(Sizeof type");
                write_node(out, arena, *t, depth + 1);
                indent(out, depth);
                out.push_str(")\n");
            }
            cc_ast::SizeofTarget::Expr(e) => {
                let _ = writeln!(out, "(Sizeof expr");
                write_node(out, arena, *e, depth + 1);
                indent(out, depth);
                out.push_str(")\n");
            }
        },
        NodeKind::AddressOf { operand } => {
            let _ = writeln!(out, "(AddressOf");
            write_node(out, arena, *operand, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::Dereference { operand } => {
            let _ = writeln!(out, "(Dereference");
            write_node(out, arena, *operand, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::SeqExpr { exprs } => {
            let _ = writeln!(out, "(Seq");
            for &e in exprs {
                write_node(out, arena, e, depth + 1);
            }
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::PrimitiveDataType { primitive, is_const } => {
            let c = if *is_const { " const" } else { "" };
            let _ = writeln!(out, "(Type {primitive:?}{c})");
        }
        NodeKind::PointerDataType { pointee, is_const } => {
            let c = if *is_const { " const" } else { "" };
            let _ = writeln!(out, "(Pointer{c}");
            write_node(out, arena, *pointee, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::ArrayDataType { element, size } => {
            let _ = writeln!(out, "(Array[{size}]");
            write_node(out, arena, *element, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::StructDataType { decl } => {
            let _ = writeln!(out, "(StructType");
            write_node(out, arena, *decl, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::StructDecl { name, fields, is_union } => {
            let kw = if *is_union { "Union" } else { "Struct" };
            let label = name.as_deref().unwrap_or("<anon>");
            let _ = writeln!(out, "({kw}Decl {label}");
            for &f in fields {
                write_node(out, arena, f, depth + 1);
            }
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::Cast { target_type, operand } => {
            let _ = writeln!(out, "(Cast");
            write_node(out, arena, *target_type, depth + 1);
            write_node(out, arena, *operand, depth + 1);
            indent(out, depth);
            out.push_str(")\n");
        }
        NodeKind::Empty => out.push_str("(Empty)\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cc_lexer::{lex, LexFlags};
    use cc_parser::parse;

    #[test]
    fn dumps_a_minimal_program_with_balanced_parens() {
        let tokens = lex("int main(){return 7;}", LexFlags::default()).unwrap();
        let (root, arena) = parse(&tokens).unwrap();
        let text = dump(&arena, root);
        assert!(text.starts_with("(Program"));
        assert_eq!(text.matches('(').count(), text.matches(')').count());
        assert!(text.contains("FunctionDecl main"));
        assert!(text.contains("IntLiteral 7"));
    }
}
