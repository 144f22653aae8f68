//! Java front-end
//!
//! Lowers tree-sitter-java trees into normalized form. Type bodies
//! (`class_body` and friends) are spliced so members hang directly off
//! the declaring type; statement `block` nodes are kept as bodies and
//! open their own regions.

use tree_sitter::Node;

use super::Mapping;
use crate::ast::{NodeId, NodeKind, NormalizedTree};
use crate::error::Error;

pub(crate) fn parse(source: &str) -> Result<NormalizedTree, Error> {
    let native = super::parse_native(source, &tree_sitter_java::LANGUAGE.into(), "Java")?;
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
        "line_comment" | "block_comment" => Mapping::Drop,
        "class_body" | "interface_body" | "enum_body" | "annotation_type_body" => Mapping::Splice,

        "program" => Mapping::Kind(Module),
        "class_declaration" => Mapping::Kind(Class),
        "enum_declaration" => Mapping::Kind(Enum),
        "method_declaration" => Mapping::Kind(Method),
        "constructor_declaration" => Mapping::Kind(Constructor),
        "field_declaration" => Mapping::Kind(Field),
        "local_variable_declaration" => Mapping::Kind(Var),
        "formal_parameter" | "spread_parameter" | "receiver_parameter" => Mapping::Kind(Param),
        "type_parameter" => Mapping::Kind(TemplateParam),
        "if_statement" => Mapping::Kind(If),
        "for_statement" | "enhanced_for_statement" => Mapping::Kind(For),
        "while_statement" => Mapping::Kind(While),
        "do_statement" => Mapping::Kind(DoWhile),
        "switch_expression" | "switch_statement" => Mapping::Kind(Switch),
        "switch_label" => Mapping::Kind(Case),
        "try_statement" | "try_with_resources_statement" => Mapping::Kind(Try),
        "catch_clause" => Mapping::Kind(Catch),
        "finally_clause" => Mapping::Kind(Finally),
        "block" | "constructor_body" => Mapping::Kind(Body),

        "identifier" | "type_identifier" => Mapping::Kind(Reference),
        "decimal_integer_literal"
        | "hex_integer_literal"
        | "octal_integer_literal"
        | "binary_integer_literal"
        | "decimal_floating_point_literal"
        | "hex_floating_point_literal"
        | "string_literal"
        | "character_literal"
        | "true"
        | "false"
        | "null_literal" => Mapping::Kind(Literal),

        "binary_expression" | "unary_expression" | "update_expression"
        | "assignment_expression" | "instanceof_expression" => Mapping::Kind(Operator),

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::blocks::{block_sequence, flat_sequence, Block};

    fn end_count(seq: &[Block]) -> usize {
        seq.iter().filter(|b| matches!(b, Block::End)).count()
    }

    #[test]
    fn test_class_with_method() {
        let src = "\
class Adder {
    int add(int x, int y) {
        return x + y;
    }
}
";
        let tree = parse(src).unwrap();
        let flat = flat_sequence(&tree);
        assert!(flat.contains(&"classdef".to_string()));
        assert!(flat.contains(&"methoddef".to_string()));
        assert!(flat.contains(&"Adder".to_string()));
        assert!(flat.contains(&"+".to_string()));
        // class_body is spliced away.
        assert!(!flat.contains(&"class_body".to_string()));

        let seq = block_sequence(&tree);
        // class region + method region + method body region
        assert_eq!(end_count(&seq), 3);
    }

    #[test]
    fn test_constructor_and_kinds() {
        let src = "\
class Point {
    int x;
    Point(int x) {
        this.x = x;
    }
}
";
        let tree = parse(src).unwrap();
        let root = tree.root().unwrap();
        let class = tree.children(root)[0];
        assert_eq!(tree.kind(class), NodeKind::Class);

        let kinds: Vec<NodeKind> = tree
            .children(class)
            .iter()
            .map(|&c| tree.kind(c))
            .collect();
        assert!(kinds.contains(&NodeKind::Field));
        assert!(kinds.contains(&NodeKind::Constructor));

        let flat = flat_sequence(&tree);
        assert!(flat.contains(&"constructor".to_string()));
        assert!(flat.contains(&"fielddecl".to_string()));
    }

    #[test]
    fn test_statement_block_opens_region() {
        let src = "\
class C {
    void run() {
        int a = 1;
        int b = 2;
    }
}
";
        let tree = parse(src).unwrap();
        let seq = block_sequence(&tree);
        // class + method + body block regions
        assert_eq!(end_count(&seq), 3);

        // Both locals are appended inside the body region.
        let var_blocks = seq
            .iter()
            .filter(|b| matches!(b, Block::Node(id) if tree.kind(*id) == NodeKind::Var))
            .count();
        assert_eq!(var_blocks, 2);
    }

    #[test]
    fn test_try_catch_regions() {
        let src = "\
class C {
    void f() {
        try {
            g();
        } catch (Exception e) {
            h();
        } finally {
            i();
        }
    }
}
";
        let tree = parse(src).unwrap();
        let seq = block_sequence(&tree);
        let tokens: Vec<&str> = seq
            .iter()
            .filter_map(|b| match b {
                Block::Node(id) => Some(tree.token(*id)),
                Block::End => None,
            })
            .collect();
        assert!(tokens.contains(&"try"));
        assert!(tokens.contains(&"catch"));
        assert!(tokens.contains(&"finally"));

        // class + method + method body + try + catch (incl. its body)
        // + finally (incl. its body): the exact count depends on the
        // grammar's block shapes, but pairing must hold.
        let opened = crate::ast::blocks::region_block_count(&tree, &seq);
        assert_eq!(end_count(&seq), opened);
    }

    #[test]
    fn test_loop_kinds() {
        let src = "\
class C {
    void f(int[] xs) {
        for (int x : xs) { g(x); }
        while (true) { h(); }
        do { i(); } while (false);
    }
}
";
        let tree = parse(src).unwrap();
        let flat = flat_sequence(&tree);
        assert!(flat.contains(&"for".to_string()));
        assert!(flat.contains(&"while".to_string()));
        assert!(flat.contains(&"dowhile".to_string()));
    }

    #[test]
    fn test_literal_case_preserved() {
        let src = "\
class C {
    String s = \"MixedCase\";
}
";
        let tree = parse(src).unwrap();
        let flat = flat_sequence(&tree);
        assert!(flat.contains(&"\"MixedCase\"".to_string()));
    }

    #[test]
    fn test_invalid_syntax_is_recoverable() {
        let err = parse("class {{{\n").unwrap_err();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Java"));
    }
}
