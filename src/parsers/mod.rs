//! Source code parsers using tree-sitter
//!
//! One module per supported grammar. Each module parses raw text with
//! its tree-sitter grammar and lowers the native tree into the
//! language-agnostic `NormalizedTree` via a fixed kind table.

mod cpp;
mod java;
mod python;

use std::fmt;
use std::path::Path;

use tree_sitter::Node;

use crate::ast::{NodeKind, NormalizedTree};
use crate::error::Error;

/// Supported grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Java,
    Cpp,
}

impl Language {
    /// Canonical display name.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Java => "Java",
            Language::Cpp => "C++",
        }
    }

    /// Resolve a file extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext {
            "py" | "pyi" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "cc" | "cxx" | "c++" | "hpp" | "hh" | "hxx" | "h++" | "h" => {
                Some(Language::Cpp)
            }
            _ => None,
        }
    }

    /// Resolve a user-supplied language name (CLI `--language`).
    pub fn from_name(name: &str) -> Option<Language> {
        match name.to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "c++" | "cxx" => Some(Language::Cpp),
            _ => None,
        }
    }

    /// Resolve a path by its extension.
    pub fn from_path(path: &Path) -> Result<Language, Error> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Language::from_extension(ext)
            .ok_or_else(|| Error::UnsupportedLanguage(path.display().to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All extensions the batch pipeline picks up.
pub fn supported_extensions() -> &'static [&'static str] {
    &[
        "py", "pyi", // Python
        "java", // Java
        "cpp", "cc", "cxx", "c++", "hpp", "hh", "hxx", "h++", "h", // C++
    ]
}

/// Parse source text in the given grammar into a normalized tree.
pub fn parse_source(source: &str, language: Language) -> Result<NormalizedTree, Error> {
    match language {
        Language::Python => python::parse(source),
        Language::Java => java::parse(source),
        Language::Cpp => cpp::parse(source),
    }
}

// ---------------------------------------------------------------------------
// Shared lowering machinery
// ---------------------------------------------------------------------------

/// What a language's kind table says to do with one native node.
pub(crate) enum Mapping {
    /// Lower to a normalized node of this kind.
    Kind(NodeKind),
    /// Drop the node, lift its children into the parent.
    Splice,
    /// Drop the node and its whole subtree.
    Drop,
}

/// Run the grammar over `source` and return the native tree, mapping
/// any syntax error to a recoverable `Error::Parse`.
pub(crate) fn parse_native(
    source: &str,
    grammar: &tree_sitter::Language,
    language_name: &str,
) -> Result<tree_sitter::Tree, Error> {
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(grammar).map_err(|e| Error::Parse {
        language: language_name.to_string(),
        detail: format!("grammar unavailable: {e}"),
    })?;

    let tree = parser.parse(source, None).ok_or_else(|| Error::Parse {
        language: language_name.to_string(),
        detail: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        let detail = match first_error(root) {
            Some(bad) => format!(
                "invalid syntax at row {}, column {}",
                bad.start_position().row + 1,
                bad.start_position().column + 1
            ),
            None => "invalid syntax".to_string(),
        };
        return Err(Error::Parse {
            language: language_name.to_string(),
            detail,
        });
    }

    Ok(tree)
}

/// Find the shallowest error or missing node.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    for child in children {
        if let Some(bad) = first_error(child) {
            return Some(bad);
        }
    }
    Some(node)
}

/// Source text of a node.
pub(crate) fn node_text(node: Node<'_>, source: &[u8]) -> String {
    node.utf8_text(source).unwrap_or_default().to_string()
}

/// Operator symbol of an operator-family node: the `operator` field
/// when the grammar names one, otherwise the first anonymous child
/// (comparison chains, plain assignments), otherwise the kind name.
pub(crate) fn operator_token(node: Node<'_>, source: &[u8]) -> String {
    if let Some(op) = node.child_by_field_name("operator") {
        return node_text(op, source);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if !child.is_named() {
            return node_text(child, source);
        }
    }
    node.kind().to_string()
}

/// Token for a node classified as `kind`. Text-bearing kinds read the
/// source; structural kinds use their canonical label; unmapped kinds
/// keep the raw grammar kind name.
pub(crate) fn derive_token(kind: NodeKind, node: Node<'_>, source: &[u8]) -> String {
    match kind {
        NodeKind::Operator => operator_token(node, source),
        NodeKind::Literal | NodeKind::Reference => node_text(node, source),
        NodeKind::Other => node.kind().to_string(),
        structural => match structural.label() {
            Some(label) => label.to_string(),
            None => node.kind().to_string(),
        },
    }
}

/// Literals and references are leaves by definition: their subtree
/// collapses into the token text.
pub(crate) fn is_leaf_kind(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Literal | NodeKind::Reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("java"), Some(Language::Java));
        assert_eq!(Language::from_extension("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("hpp"), Some(Language::Cpp));
        assert_eq!(Language::from_extension("rs"), None);
    }

    #[test]
    fn test_language_from_name() {
        assert_eq!(Language::from_name("Python"), Some(Language::Python));
        assert_eq!(Language::from_name("C++"), Some(Language::Cpp));
        assert_eq!(Language::from_name("java"), Some(Language::Java));
        assert_eq!(Language::from_name("cobol"), None);
    }

    #[test]
    fn test_language_from_path_unsupported() {
        let err = Language::from_path(&PathBuf::from("notes.txt")).unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_parse_source_dispatch() {
        let tree = parse_source("x = 1\n", Language::Python).unwrap();
        assert!(!tree.is_empty());

        let err = parse_source("def broken(:\n", Language::Python).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_supported_extensions_cover_languages() {
        for ext in supported_extensions() {
            assert!(Language::from_extension(ext).is_some(), "extension {ext}");
        }
    }
}
