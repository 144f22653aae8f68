//! Block linearization policies
//!
//! Turns a `NormalizedTree` into the two flat views the rest of the
//! pipeline consumes:
//!
//! - `flat_sequence` emits one token per node in pre-order, closing
//!   every scope-opening construct with an `End` sentinel. This is the
//!   vocabulary-training corpus view.
//! - `block_sequence` emits statement-level Blocks: scope-opening
//!   nodes become Blocks, their simple children become standalone
//!   Blocks, and every opened region is closed by an `End`. This is
//!   the classifier input view.
//!
//! The direct-append exclusion rule is uniform across languages:
//! scope-opening kinds, body kinds, and exception regions are never
//! appended as plain children. They always produce their own Blocks.

use super::{NodeId, NodeKind, NormalizedTree};

/// Closing marker for a scope-opening Block.
pub const END_SENTINEL: &str = "End";

/// One linearized unit: a subtree of the normalized tree, or the
/// sentinel that closes the most recent open region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Node(NodeId),
    End,
}

/// Kinds that start a block region of their own and therefore get an
/// `End`: scope-opening constructs plus bare bodies and finally
/// regions.
fn opens_region(kind: NodeKind) -> bool {
    kind.is_scope_opening() || matches!(kind, NodeKind::Body | NodeKind::Finally)
}

/// Whether a child may be appended as a standalone Block from its
/// parent's region. Region starters and the file root never are; they
/// are reached by recursion and open their own regions instead.
fn directly_appendable(kind: NodeKind) -> bool {
    !opens_region(kind) && kind != NodeKind::Module
}

// ---------------------------------------------------------------------------
// Flat-sequence policy (vocabulary corpus)
// ---------------------------------------------------------------------------

/// Pre-order token emission: one token per node, recurse into all
/// children, `End` after any scope-opening kind.
pub fn flat_sequence(tree: &NormalizedTree) -> Vec<String> {
    let mut seq = Vec::new();
    if let Some(root) = tree.root() {
        flat_walk(tree, root, &mut seq);
    }
    seq
}

fn flat_walk(tree: &NormalizedTree, id: NodeId, seq: &mut Vec<String>) {
    seq.push(tree.token(id).to_string());
    for &child in tree.children(id) {
        flat_walk(tree, child, seq);
    }
    if tree.kind(id).is_scope_opening() {
        seq.push(END_SENTINEL.to_string());
    }
}

// ---------------------------------------------------------------------------
// Block-sequence policy (classifier input)
// ---------------------------------------------------------------------------

/// Statement-level linearization. The returned Blocks borrow node ids
/// from `tree` and are valid for the tree's lifetime.
pub fn block_sequence(tree: &NormalizedTree) -> Vec<Block> {
    let mut seq = Vec::new();
    if let Some(root) = tree.root() {
        block_walk(tree, root, &mut seq);
    }
    seq
}

fn block_walk(tree: &NormalizedTree, id: NodeId, seq: &mut Vec<Block>) {
    let kind = tree.kind(id);
    if kind == NodeKind::Try {
        // Exception region: the try body's statements are only
        // recursed; handlers and finally open their own regions on
        // the way down.
        seq.push(Block::Node(id));
        for &child in tree.children(id) {
            block_walk(tree, child, seq);
        }
        seq.push(Block::End);
    } else if opens_region(kind) {
        seq.push(Block::Node(id));
        for &child in tree.children(id) {
            if directly_appendable(tree.kind(child)) {
                seq.push(Block::Node(child));
            }
            block_walk(tree, child, seq);
        }
        seq.push(Block::End);
    } else {
        for &child in tree.children(id) {
            block_walk(tree, child, seq);
        }
    }
}

/// Count of Blocks in `seq` that open a region. Always equals the
/// count of `End` sentinels.
pub fn region_block_count(tree: &NormalizedTree, seq: &[Block]) -> usize {
    seq.iter()
        .filter(|b| match b {
            Block::Node(id) => opens_region(tree.kind(*id)),
            Block::End => false,
        })
        .count()
}
