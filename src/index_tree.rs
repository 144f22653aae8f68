//! Vocabulary-indexed block trees
//!
//! The numeric form a program takes between segmentation and encoding.
//! Each block becomes one [`IndexTree`] mirroring its subtree, with
//! every node replaced by its vocabulary id; an end sentinel becomes a
//! single-node tree carrying the sentinel's id. Unknown tokens take the
//! vocabulary's reserved id, so indexing never fails.

use serde::{Deserialize, Serialize};

use crate::ast::blocks::{Block, END_SENTINEL};
use crate::ast::{NodeId, NormalizedTree};
use crate::models::TokenTree;
use crate::vocab::Vocabulary;

// ---------- trees ----------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexTree {
    pub id: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<IndexTree>,
}

impl IndexTree {
    pub fn leaf(id: u32) -> Self {
        IndexTree {
            id,
            children: Vec::new(),
        }
    }

    fn from_node(tree: &NormalizedTree, node: NodeId, vocab: &Vocabulary) -> Self {
        IndexTree {
            id: vocab.id(tree.token(node)),
            children: tree
                .children(node)
                .iter()
                .map(|&child| IndexTree::from_node(tree, child, vocab))
                .collect(),
        }
    }

    /// Resolve a persisted token tree against a vocabulary.
    pub fn from_token_tree(tree: &TokenTree, vocab: &Vocabulary) -> Self {
        IndexTree {
            id: vocab.id(&tree.token),
            children: tree
                .children
                .iter()
                .map(|child| IndexTree::from_token_tree(child, vocab))
                .collect(),
        }
    }

    /// Total node count.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(IndexTree::size).sum::<usize>()
    }

    /// Longest root-to-leaf path, counted in nodes.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(IndexTree::depth)
            .max()
            .unwrap_or(0)
    }
}

// ---------- forests ----------

/// Ordered block trees for one source unit. Order matches the block
/// sequence exactly; the sequence model depends on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexForest {
    pub trees: Vec<IndexTree>,
}

impl IndexForest {
    pub fn from_blocks(tree: &NormalizedTree, blocks: &[Block], vocab: &Vocabulary) -> Self {
        let trees = blocks
            .iter()
            .map(|block| match block {
                Block::Node(id) => IndexTree::from_node(tree, *id, vocab),
                Block::End => IndexTree::leaf(vocab.id(END_SENTINEL)),
            })
            .collect();
        IndexForest { trees }
    }

    /// Resolve a corpus record's block trees against a vocabulary.
    pub fn from_token_trees(blocks: &[TokenTree], vocab: &Vocabulary) -> Self {
        IndexForest {
            trees: blocks
                .iter()
                .map(|block| IndexTree::from_token_tree(block, vocab))
                .collect(),
        }
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Nodes across all trees.
    pub fn node_count(&self) -> usize {
        self.trees.iter().map(IndexTree::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::blocks::block_sequence;
    use crate::parsers::{parse_source, Language};
    use nalgebra::DMatrix;

    fn vocab_of(tokens: &[&str]) -> Vocabulary {
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        let vectors = DMatrix::zeros(4, tokens.len());
        Vocabulary::from_parts(tokens, vectors)
    }

    #[test]
    fn test_forest_mirrors_block_sequence() {
        let tree = parse_source("def f():\n    return 1\n", Language::Python).unwrap();
        let blocks = block_sequence(&tree);
        let vocab = vocab_of(&["End", "funcdef", "f", "return_statement", "1"]);
        let forest = IndexForest::from_blocks(&tree, &blocks, &vocab);

        assert_eq!(forest.len(), blocks.len());
        // Function block carries the whole subtree.
        match blocks[0] {
            Block::Node(root) => assert_eq!(forest.trees[0].size(), tree.subtree_size(root)),
            Block::End => panic!("first block should open the function"),
        }
        // The last block is the sentinel, a leaf with the End id.
        let last = forest.trees.last().unwrap();
        assert!(last.children.is_empty());
        assert_eq!(last.id, vocab.id(END_SENTINEL));
    }

    #[test]
    fn test_unknown_tokens_take_reserved_id() {
        let tree = parse_source("def f():\n    return 1\n", Language::Python).unwrap();
        let blocks = block_sequence(&tree);
        let vocab = vocab_of(&["End", "funcdef"]);
        let forest = IndexForest::from_blocks(&tree, &blocks, &vocab);

        assert_eq!(forest.trees[0].id, vocab.id("funcdef"));
        let known = |t: &IndexTree| t.id < vocab.unknown_id();
        fn any<F: Fn(&IndexTree) -> bool + Copy>(t: &IndexTree, f: F) -> bool {
            f(t) || t.children.iter().any(|c| any(c, f))
        }
        // "f" and "1" are out of vocabulary.
        assert!(any(&forest.trees[0], |t| !known(t)));
    }

    #[test]
    fn test_indexing_is_deterministic() {
        let src = "def f(a):\n    if a:\n        return a\n    return 0\n";
        let tree = parse_source(src, Language::Python).unwrap();
        let blocks = block_sequence(&tree);
        let vocab = vocab_of(&["End", "funcdef", "if", "a", "return_statement"]);

        let first = IndexForest::from_blocks(&tree, &blocks, &vocab);
        let second = IndexForest::from_blocks(&tree, &blocks, &vocab);
        assert_eq!(first, second);
    }

    #[test]
    fn test_token_trees_resolve_like_blocks() {
        let src = "def f(a):\n    return a\n";
        let tree = parse_source(src, Language::Python).unwrap();
        let blocks = block_sequence(&tree);
        let vocab = vocab_of(&["End", "funcdef", "a", "return_statement"]);

        let direct = IndexForest::from_blocks(&tree, &blocks, &vocab);
        let token_trees: Vec<TokenTree> = blocks
            .iter()
            .map(|block| match block {
                Block::Node(id) => tree.token_tree(*id),
                Block::End => TokenTree::leaf(END_SENTINEL),
            })
            .collect();
        let via_tokens = IndexForest::from_token_trees(&token_trees, &vocab);
        assert_eq!(direct, via_tokens);
    }

    #[test]
    fn test_measures() {
        let forest = IndexForest {
            trees: vec![
                IndexTree {
                    id: 0,
                    children: vec![IndexTree::leaf(1), IndexTree::leaf(2)],
                },
                IndexTree::leaf(3),
            ],
        };
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.node_count(), 4);
        assert_eq!(forest.trees[0].depth(), 2);
        assert_eq!(forest.trees[1].depth(), 1);
        assert!(!forest.is_empty());
    }

    #[test]
    fn test_serde_roundtrip_skips_empty_children() {
        let forest = IndexForest {
            trees: vec![IndexTree {
                id: 5,
                children: vec![IndexTree::leaf(6)],
            }],
        };
        let json = serde_json::to_string(&forest).unwrap();
        assert!(json.contains("\"id\":6"));
        // Leaves serialize without a children field.
        assert!(!json.contains("\"children\":[]"));
        let back: IndexForest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, forest);
    }
}
