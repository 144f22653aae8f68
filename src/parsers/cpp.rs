//! C++ front-end
//!
//! Lowers tree-sitter-cpp trees into normalized form. Two quirks are
//! specific to this grammar:
//!
//! - system `#include <...>` directives are pruned entirely (the
//!   standard-library boundary), while local `#include "..."` stays;
//! - `function_definition` does not distinguish functions, methods,
//!   constructors, and destructors, so classification is contextual:
//!   the declarator name is matched against the enclosing (or
//!   qualifying) type.

use tree_sitter::Node;

use super::Mapping;
use crate::ast::{NodeId, NodeKind, NormalizedTree};
use crate::error::Error;

pub(crate) fn parse(source: &str) -> Result<NormalizedTree, Error> {
    let native = super::parse_native(source, &tree_sitter_cpp::LANGUAGE.into(), "C++")?;
    let src = source.as_bytes();

    let mut tree = NormalizedTree::new();
    let mut types = Vec::new();
    let roots = lower(native.root_node(), src, &mut tree, &mut types);
    if let Some(&root) = roots.first() {
        tree.set_root(root);
    }
    Ok(tree)
}

fn classify(node: Node<'_>, source: &[u8], types: &[String]) -> Mapping {
    use NodeKind::*;
    match node.kind() {
        "comment" => Mapping::Drop,
        // System headers are outside the program; local headers stay.
        "preproc_include" => {
            if includes_system_header(node) {
                Mapping::Drop
            } else {
                Mapping::Kind(Other)
            }
        }
        "field_declaration_list" | "declaration_list" => Mapping::Splice,

        "translation_unit" => Mapping::Kind(Module),
        "function_definition" => Mapping::Kind(function_kind(node, source, types)),
        "declaration" | "field_declaration" => {
            if has_function_declarator(node) {
                Mapping::Kind(function_kind(node, source, types))
            } else if node.kind() == "field_declaration" {
                Mapping::Kind(Field)
            } else {
                Mapping::Kind(Var)
            }
        }
        "class_specifier" => Mapping::Kind(Class),
        "struct_specifier" => Mapping::Kind(Struct),
        "union_specifier" => Mapping::Kind(Union),
        "enum_specifier" => Mapping::Kind(Enum),
        "namespace_definition" => Mapping::Kind(Namespace),
        "parameter_declaration" | "optional_parameter_declaration" => Mapping::Kind(Param),
        "type_parameter_declaration"
        | "optional_type_parameter_declaration"
        | "template_template_parameter_declaration" => Mapping::Kind(TemplateParam),
        "if_statement" => Mapping::Kind(If),
        "for_statement" | "for_range_loop" => Mapping::Kind(For),
        "while_statement" => Mapping::Kind(While),
        "do_statement" => Mapping::Kind(DoWhile),
        "switch_statement" => Mapping::Kind(Switch),
        "case_statement" => Mapping::Kind(Case),
        "try_statement" => Mapping::Kind(Try),
        "catch_clause" => Mapping::Kind(Catch),
        "compound_statement" => Mapping::Kind(Body),

        "identifier" | "field_identifier" | "type_identifier" | "namespace_identifier"
        | "qualified_identifier" | "destructor_name" | "operator_name" | "primitive_type"
        | "sized_type_specifier" | "auto" => Mapping::Kind(Reference),
        "number_literal" | "string_literal" | "char_literal" | "raw_string_literal"
        | "concatenated_string" | "true" | "false" | "null" | "nullptr" => {
            Mapping::Kind(Literal)
        }

        "binary_expression" | "unary_expression" | "update_expression"
        | "assignment_expression" => Mapping::Kind(Operator),

        _ => Mapping::Kind(Other),
    }
}

/// Whether a `#include` pulls in a `<system>` header.
fn includes_system_header(node: Node<'_>) -> bool {
    match node.child_by_field_name("path") {
        Some(path) => path.kind() == "system_lib_string",
        None => false,
    }
}

/// Whether a declaration declares a function (prototype or member
/// declaration) rather than an object.
fn has_function_declarator(node: Node<'_>) -> bool {
    let mut decl = match node.child_by_field_name("declarator") {
        Some(d) => d,
        None => return false,
    };
    loop {
        match decl.kind() {
            "function_declarator" => return true,
            "pointer_declarator" | "reference_declarator" | "parenthesized_declarator" => {
                match decl
                    .child_by_field_name("declarator")
                    .or_else(|| decl.named_child(0))
                {
                    Some(inner) => decl = inner,
                    None => return false,
                }
            }
            _ => return false,
        }
    }
}

/// Innermost declarator name of a function-like node.
fn declared_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let mut decl = node.child_by_field_name("declarator")?;
    loop {
        match decl.kind() {
            "function_declarator"
            | "pointer_declarator"
            | "reference_declarator"
            | "parenthesized_declarator" => {
                match decl
                    .child_by_field_name("declarator")
                    .or_else(|| decl.named_child(0))
                {
                    Some(inner) => decl = inner,
                    None => break,
                }
            }
            _ => break,
        }
    }
    Some(super::node_text(decl, source))
}

/// Classify a function-like node from its declarator name and the
/// stack of enclosing type names.
fn function_kind(node: Node<'_>, source: &[u8], types: &[String]) -> NodeKind {
    let name = match declared_name(node, source) {
        Some(name) => name,
        None => return NodeKind::Function,
    };

    let segments: Vec<&str> = name.split("::").filter(|s| !s.is_empty()).collect();
    let base = match segments.last() {
        Some(base) => *base,
        None => return NodeKind::Function,
    };
    let owner = segments.len().checked_sub(2).map(|i| segments[i]);

    if base.starts_with('~') {
        return NodeKind::Destructor;
    }
    // Out-of-class member definition: `T::T` or `T::f`.
    if let Some(owner) = owner {
        return if strip_template_args(owner) == strip_template_args(base) {
            NodeKind::Constructor
        } else {
            NodeKind::Method
        };
    }
    // In-class definition: compare against the enclosing type.
    if let Some(enclosing) = types.last() {
        return if enclosing == base {
            NodeKind::Constructor
        } else {
            NodeKind::Method
        };
    }
    NodeKind::Function
}

fn strip_template_args(name: &str) -> &str {
    match name.find('<') {
        Some(idx) => &name[..idx],
        None => name,
    }
}

/// Name of a type specifier, for the enclosing-type stack.
fn type_name(node: Node<'_>, source: &[u8]) -> String {
    node.child_by_field_name("name")
        .map(|n| super::node_text(n, source))
        .unwrap_or_default()
}

fn lower(
    node: Node<'_>,
    source: &[u8],
    tree: &mut NormalizedTree,
    types: &mut Vec<String>,
) -> Vec<NodeId> {
    match classify(node, source, types) {
        Mapping::Drop => Vec::new(),
        Mapping::Splice => lower_children(node, source, tree, types),
        Mapping::Kind(kind) => {
            let entered_type = matches!(
                kind,
                NodeKind::Class | NodeKind::Struct | NodeKind::Union
            );
            if entered_type {
                types.push(type_name(node, source));
            }
            let children = if super::is_leaf_kind(kind) {
                Vec::new()
            } else {
                lower_children(node, source, tree, types)
            };
            if entered_type {
                types.pop();
            }
            let token = super::derive_token(kind, node, source);
            vec![tree.add_node(kind, token, children)]
        }
    }
}

fn lower_children(
    node: Node<'_>,
    source: &[u8],
    tree: &mut NormalizedTree,
    types: &mut Vec<String>,
) -> Vec<NodeId> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.named_children(&mut cursor).collect();
    let mut out = Vec::new();
    for child in children {
        out.extend(lower(child, source, tree, types));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::blocks::{block_sequence, flat_sequence, Block};

    fn kind_tokens(tree: &NormalizedTree) -> Vec<String> {
        flat_sequence(tree)
    }

    #[test]
    fn test_free_function() {
        let tree = parse("int add(int a, int b) { return a + b; }\n").unwrap();
        let flat = kind_tokens(&tree);
        assert!(flat.contains(&"funcdef".to_string()));
        assert!(flat.contains(&"paramdecl".to_string()));
        assert!(flat.contains(&"+".to_string()));

        let seq = block_sequence(&tree);
        let ends = seq.iter().filter(|b| matches!(b, Block::End)).count();
        // function region + compound body region
        assert_eq!(ends, 2);
    }

    #[test]
    fn test_method_constructor_destructor() {
        let src = "\
class Foo {
public:
    Foo() {}
    ~Foo() {}
    int bar() { return 1; }
};
";
        let tree = parse(src).unwrap();
        let flat = kind_tokens(&tree);
        assert!(flat.contains(&"classdef".to_string()));
        assert!(flat.contains(&"constructor".to_string()));
        assert!(flat.contains(&"destructor".to_string()));
        assert!(flat.contains(&"methoddef".to_string()));
    }

    #[test]
    fn test_out_of_class_members() {
        let src = "\
class Foo {
    Foo();
    int bar();
};
Foo::Foo() {}
int Foo::bar() { return 2; }
";
        let tree = parse(src).unwrap();
        let flat = kind_tokens(&tree);
        let ctors = flat.iter().filter(|t| *t == "constructor").count();
        let methods = flat.iter().filter(|t| *t == "methoddef").count();
        // One in-class declaration + one out-of-class definition each.
        assert_eq!(ctors, 2);
        assert_eq!(methods, 2);
    }

    #[test]
    fn test_system_include_pruned_local_kept() {
        let src = "\
#include <vector>
#include \"local.h\"
int x = 1;
";
        let tree = parse(src).unwrap();
        let flat = kind_tokens(&tree);
        assert!(!flat.iter().any(|t| t.contains("vector")));
        assert!(flat.contains(&"preproc_include".to_string()));
        assert!(flat.contains(&"\"local.h\"".to_string()));
    }

    #[test]
    fn test_control_flow_kinds() {
        let src = "\
void f(int n) {
    if (n > 0) { g(); }
    for (int i = 0; i < n; i++) { g(); }
    while (n) { n--; }
    do { n++; } while (n < 0);
    switch (n) { case 1: break; default: break; }
}
";
        let tree = parse(src).unwrap();
        let flat = kind_tokens(&tree);
        for token in ["if", "for", "while", "dowhile", "switch", "case"] {
            assert!(
                flat.contains(&token.to_string()),
                "missing {token} in {flat:?}"
            );
        }
        // Operator text comes through with case/symbols intact.
        assert!(flat.contains(&">".to_string()));
        assert!(flat.contains(&"++".to_string()));
    }

    #[test]
    fn test_try_catch() {
        let src = "\
void f() {
    try { g(); } catch (int e) { h(); }
}
";
        let tree = parse(src).unwrap();
        let seq = block_sequence(&tree);
        let opened = crate::ast::blocks::region_block_count(&tree, &seq);
        let ends = seq.iter().filter(|b| matches!(b, Block::End)).count();
        assert_eq!(ends, opened);

        let flat = kind_tokens(&tree);
        assert!(flat.contains(&"try".to_string()));
        assert!(flat.contains(&"catch".to_string()));
    }

    #[test]
    fn test_namespace_is_not_scope_opening() {
        let src = "\
namespace util {
int helper() { return 3; }
}
";
        let tree = parse(src).unwrap();
        let flat = kind_tokens(&tree);
        assert!(flat.contains(&"namespace".to_string()));

        let seq = block_sequence(&tree);
        let ends = seq.iter().filter(|b| matches!(b, Block::End)).count();
        // Only the function and its body close; the namespace does not.
        assert_eq!(ends, 2);
    }

    #[test]
    fn test_qualified_reference_collapses() {
        let src = "\
int f() { return std::max(1, 2); }
";
        let tree = parse(src).unwrap();
        let flat = kind_tokens(&tree);
        assert!(flat.contains(&"std::max".to_string()));
    }

    #[test]
    fn test_invalid_syntax_is_recoverable() {
        let err = parse("int f( {{{\n").unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("C++"));
    }
}
