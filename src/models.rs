//! Shared data models
//!
//! Value types that cross module boundaries: predictions, corpus
//! records, and per-file batch outcomes. All of them serialize with
//! serde so the CLI can emit them as JSON/JSONL.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::index_tree::IndexForest;

/// One source program handed to the pipeline.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Raw source text.
    pub text: String,
    /// Grammar the text is written in.
    pub language: crate::parsers::Language,
}

impl SourceUnit {
    pub fn new(text: impl Into<String>, language: crate::parsers::Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }
}

/// Classification result for one program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the winning class.
    pub label: usize,
    /// Name of the winning class (per the head's class names).
    pub class_name: String,
    /// Softmax probabilities, one per class, summing to ~1.
    pub probabilities: Vec<f32>,
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let confidence = self
            .probabilities
            .get(self.label)
            .copied()
            .unwrap_or(0.0);
        write!(f, "{} ({:.1}%)", self.class_name, confidence * 100.0)
    }
}

/// A Block's subtree snapshot with derived tokens, as written to the
/// corpus file. Sentinels are childless trees whose token is the
/// sentinel text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTree {
    pub token: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TokenTree>,
}

impl TokenTree {
    pub fn leaf(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TokenTree::size).sum::<usize>()
    }
}

/// One corpus line: a program's flat token sequence (vocabulary
/// training) and Block sequence (supervised training), tagged with
/// identity and label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Program identity, usually the source path.
    pub id: String,
    /// Supervision label name (e.g. "human").
    pub label: String,
    /// Flat pre-order token sequence.
    pub tokens: Vec<String>,
    /// Block sequence as token trees, sentinels included.
    pub blocks: Vec<TokenTree>,
}

/// One encoded line: the corpus record's blocks resolved to vocabulary
/// ids, ready for an external trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub id: String,
    pub label: String,
    pub forest: IndexForest,
}

/// Per-file success inside a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FileClassification {
    pub path: PathBuf,
    pub prediction: Prediction,
}

/// Per-file failure inside a batch run. Recoverable by definition:
/// fatal errors abort the batch instead of landing here.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}
