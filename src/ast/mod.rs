//! Language-agnostic AST shape
//!
//! Native parse trees from every grammar are lowered into one
//! `NormalizedTree`: an arena of nodes with a canonical `NodeKind`, a
//! derived token string, and ordered children referenced by index.
//! Keeping nodes in one contiguous array (children by `NodeId`, no
//! pointer graph) is what lets the encoder partition whole batches by
//! depth later on.

pub mod blocks;

use crate::models::TokenTree;

/// Canonical classification of a normalized node.
///
/// Structural kinds carry a fixed lowercase label; `Operator`,
/// `Literal`, and `Reference` nodes carry source text instead (case
/// preserved); `Other` falls back to the raw grammar kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Function,
    Method,
    Constructor,
    Destructor,
    If,
    For,
    While,
    DoWhile,
    Switch,
    Case,
    Try,
    Catch,
    Finally,
    Class,
    Struct,
    Union,
    Enum,
    Namespace,
    Field,
    Param,
    Var,
    TemplateParam,
    Body,
    Module,
    Operator,
    Literal,
    Reference,
    Other,
}

impl NodeKind {
    /// Canonical lowercase label for structural kinds. Text-bearing
    /// kinds (`Operator`/`Literal`/`Reference`/`Other`) return `None`;
    /// their token comes from the source instead.
    pub fn label(&self) -> Option<&'static str> {
        let label = match self {
            NodeKind::Function => "funcdef",
            NodeKind::Method => "methoddef",
            NodeKind::Constructor => "constructor",
            NodeKind::Destructor => "destructor",
            NodeKind::If => "if",
            NodeKind::For => "for",
            NodeKind::While => "while",
            NodeKind::DoWhile => "dowhile",
            NodeKind::Switch => "switch",
            NodeKind::Case => "case",
            NodeKind::Try => "try",
            NodeKind::Catch => "catch",
            NodeKind::Finally => "finally",
            NodeKind::Class => "classdef",
            NodeKind::Struct => "structdef",
            NodeKind::Union => "uniondef",
            NodeKind::Enum => "enumdef",
            NodeKind::Namespace => "namespace",
            NodeKind::Field => "fielddecl",
            NodeKind::Param => "paramdecl",
            NodeKind::Var => "vardecl",
            NodeKind::TemplateParam => "templateparam",
            NodeKind::Body => "block",
            NodeKind::Module => "module",
            NodeKind::Operator
            | NodeKind::Literal
            | NodeKind::Reference
            | NodeKind::Other => return None,
        };
        Some(label)
    }

    /// Kinds that become their own Block and are closed by an `End`
    /// sentinel.
    pub fn is_scope_opening(&self) -> bool {
        matches!(
            self,
            NodeKind::Function
                | NodeKind::Method
                | NodeKind::Constructor
                | NodeKind::Destructor
                | NodeKind::Class
                | NodeKind::Struct
                | NodeKind::If
                | NodeKind::For
                | NodeKind::While
                | NodeKind::DoWhile
                | NodeKind::Switch
                | NodeKind::Try
                | NodeKind::Catch
        )
    }
}

/// Index of a node inside its `NormalizedTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    token: String,
    children: Vec<NodeId>,
}

/// Arena-owned normalized tree. Nodes are pushed bottom-up (children
/// before parents), so every child id in the arena is always valid.
#[derive(Debug, Default)]
pub struct NormalizedTree {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
}

impl NormalizedTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a node whose children were already pushed.
    pub fn add_node(
        &mut self,
        kind: NodeKind,
        token: impl Into<String>,
        children: Vec<NodeId>,
    ) -> NodeId {
        debug_assert!(children.iter().all(|c| c.index() < self.nodes.len()));
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            token: token.into(),
            children,
        });
        id
    }

    /// Convenience for childless nodes.
    pub fn add_leaf(&mut self, kind: NodeKind, token: impl Into<String>) -> NodeId {
        self.add_node(kind, token, Vec::new())
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.index()].kind
    }

    pub fn token(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].token
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node count of the subtree rooted at `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        1 + self
            .children(id)
            .iter()
            .map(|&c| self.subtree_size(c))
            .sum::<usize>()
    }

    /// Depth of the subtree rooted at `id`; a leaf has depth 1.
    pub fn subtree_depth(&self, id: NodeId) -> usize {
        1 + self
            .children(id)
            .iter()
            .map(|&c| self.subtree_depth(c))
            .max()
            .unwrap_or(0)
    }

    /// Detached token snapshot of the subtree rooted at `id`.
    pub fn token_tree(&self, id: NodeId) -> TokenTree {
        TokenTree {
            token: self.token(id).to_string(),
            children: self
                .children(id)
                .iter()
                .map(|&c| self.token_tree(c))
                .collect(),
        }
    }
}
