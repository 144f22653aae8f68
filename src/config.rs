//! Model configuration
//!
//! The `(embedding_dim, encode_dim, hidden_dim, classes)` tuple is the
//! compatibility key between a vocabulary snapshot and a weights
//! checkpoint: both artifacts embed it, and `Classifier::new` refuses
//! to pair artifacts whose tuples disagree.

use serde::{Deserialize, Serialize};

/// Dimension of the token embedding vectors.
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Output dimension of the statement (tree) encoder.
pub const DEFAULT_ENCODE_DIM: usize = 128;

/// Hidden dimension of each GRU direction.
pub const DEFAULT_HIDDEN_DIM: usize = 100;

/// Number of output classes.
pub const DEFAULT_CLASSES: usize = 2;

/// Tokens below this corpus frequency are dropped from the vocabulary.
pub const DEFAULT_MIN_COUNT: usize = 3;

/// Class names in label-index order.
pub const DEFAULT_CLASS_NAMES: [&str; 2] = ["machine", "human"];

/// Shape parameters shared by the vocabulary, the weights, and the
/// encoder. Serialized into every persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Width of one embedding vector.
    pub embedding_dim: usize,
    /// Width of one statement-encoder output.
    pub encode_dim: usize,
    /// Width of one GRU direction's hidden state.
    pub hidden_dim: usize,
    /// Number of output classes.
    pub classes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            encode_dim: DEFAULT_ENCODE_DIM,
            hidden_dim: DEFAULT_HIDDEN_DIM,
            classes: DEFAULT_CLASSES,
        }
    }
}

impl ModelConfig {
    /// Width of the final program embedding (both GRU directions).
    pub fn program_dim(&self) -> usize {
        2 * self.hidden_dim
    }

    /// Human-readable tuple for error messages.
    pub fn describe(&self) -> String {
        format!(
            "embedding={} encode={} hidden={} classes={}",
            self.embedding_dim, self.encode_dim, self.hidden_dim, self.classes
        )
    }
}
