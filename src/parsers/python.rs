//! Python front-end
//!
//! Lowers tree-sitter-python trees into normalized form. Python's
//! grammar materializes suite `block` nodes that the language's own
//! AST never shows; those are spliced so statements hang directly off
//! their construct, which keeps one-statement functions to a single
//! region.

use tree_sitter::Node;

use super::Mapping;
use crate::ast::{NodeId, NodeKind, NormalizedTree};
use crate::error::Error;

pub(crate) fn parse(source: &str) -> Result<NormalizedTree, Error> {
    let native = super::parse_native(source, &tree_sitter_python::LANGUAGE.into(), "Python")?;
    let src = source.as_bytes();

    let mut tree = NormalizedTree::new();
    let roots = lower(native.root_node(), src, &mut tree);
    if let Some(&root) = roots.first() {
        tree.set_root(root);
    }
    Ok(tree)
}

fn classify(kind: &str) -> Mapping {
    use NodeKind::*;
    match kind {
        "comment" => Mapping::Drop,
        "block" => Mapping::Splice,

        "module" => Mapping::Kind(Module),
        "function_definition" => Mapping::Kind(Function),
        "class_definition" => Mapping::Kind(Class),
        "if_statement" | "elif_clause" => Mapping::Kind(If),
        "for_statement" => Mapping::Kind(For),
        "while_statement" => Mapping::Kind(While),
        "match_statement" => Mapping::Kind(Switch),
        "case_clause" => Mapping::Kind(Case),
        "try_statement" => Mapping::Kind(Try),
        "except_clause" | "except_group_clause" => Mapping::Kind(Catch),
        "finally_clause" => Mapping::Kind(Finally),
        "default_parameter" | "typed_parameter" | "typed_default_parameter" => {
            Mapping::Kind(Param)
        }

        "identifier" => Mapping::Kind(Reference),
        "integer" | "float" | "string" | "true" | "false" | "none" | "ellipsis" => {
            Mapping::Kind(Literal)
        }

        "binary_operator" | "boolean_operator" | "comparison_operator" | "unary_operator"
        | "not_operator" | "augmented_assignment" => Mapping::Kind(Operator),

        _ => Mapping::Kind(Other),
    }
}

fn lower(node: Node<'_>, source: &[u8], tree: &mut NormalizedTree) -> Vec<NodeId> {
    match classify(node.kind()) {
        Mapping::Drop => Vec::new(),
        Mapping::Splice => lower_children(node, source, tree),
        Mapping::Kind(kind) => {
            let children = if super::is_leaf_kind(kind) {
                Vec::new()
            } else {
                lower_children(node, source, tree)
            };
            let token = super::derive_token(kind, node, source);
            vec![tree.add_node(kind, token, children)]
        }
    }
}

fn lower_children(node: Node<'_>, source: &[u8], tree: &mut NormalizedTree) -> Vec<NodeId> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    let mut out = Vec::new();
    for child in children {
        out.extend(lower(child, source, tree));
    }
    out
}
