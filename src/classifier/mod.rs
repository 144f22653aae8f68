//! Provenance classification
//!
//! [`Classifier`] is the immutable inference context: a vocabulary and
//! a set of model weights checked against each other once, at
//! construction. Classification itself is pure with respect to the
//! context, so one classifier can serve any number of units, and a
//! dimension mismatch surfaces before any unit is encoded.

mod encoder;
pub mod weights;

pub use weights::ModelWeights;

use std::path::Path;

use nalgebra::DVector;
use tracing::{debug, info};

use crate::ast::blocks::block_sequence;
use crate::config::{ModelConfig, DEFAULT_CLASS_NAMES};
use crate::error::Error;
use crate::index_tree::IndexForest;
use crate::models::{Prediction, SourceUnit};
use crate::parsers;
use crate::vocab::Vocabulary;
use encoder::Encoder;

// ---------- classifier ----------

pub struct Classifier {
    vocab: Vocabulary,
    weights: ModelWeights,
    class_names: Vec<String>,
}

impl Classifier {
    /// Pair a vocabulary with model weights. Fails with
    /// [`Error::ConfigMismatch`] when the embedding widths disagree.
    pub fn new(vocab: Vocabulary, weights: ModelWeights) -> Result<Self, Error> {
        let config = weights.config;
        if vocab.dim() != config.embedding_dim {
            return Err(Error::ConfigMismatch {
                detail: format!(
                    "vocabulary embeddings are {}-dimensional, weights were trained for {}",
                    vocab.dim(),
                    config.embedding_dim,
                ),
            });
        }
        if config.classes == 0 {
            return Err(Error::ConfigMismatch {
                detail: "weights declare zero classes".to_string(),
            });
        }
        let class_names = if config.classes == DEFAULT_CLASS_NAMES.len() {
            DEFAULT_CLASS_NAMES.iter().map(|n| n.to_string()).collect()
        } else {
            (0..config.classes).map(|i| format!("class-{i}")).collect()
        };
        info!(
            config = %config.describe(),
            tokens = vocab.len(),
            "classifier ready"
        );
        Ok(Classifier {
            vocab,
            weights,
            class_names,
        })
    }

    pub fn from_files(vocab_path: &Path, weights_path: &Path) -> Result<Self, Error> {
        let vocab = Vocabulary::load(vocab_path)?;
        let weights = ModelWeights::load(weights_path)?;
        Classifier::new(vocab, weights)
    }

    /// Replace the default class names. The count must match the
    /// configured class count.
    pub fn with_class_names(mut self, names: Vec<String>) -> Result<Self, Error> {
        if names.len() != self.weights.config.classes {
            return Err(Error::ConfigMismatch {
                detail: format!(
                    "{} class names supplied for {} classes",
                    names.len(),
                    self.weights.config.classes,
                ),
            });
        }
        self.class_names = names;
        Ok(self)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.weights.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    // ---------- inference ----------

    /// Classify one source unit end to end: parse, segment into
    /// blocks, index, encode, project.
    pub fn classify(&self, unit: &SourceUnit) -> Result<Prediction, Error> {
        let tree = parsers::parse_source(&unit.text, unit.language)?;
        let blocks = block_sequence(&tree);
        if blocks.is_empty() {
            return Err(Error::EmptyUnit);
        }
        let forest = IndexForest::from_blocks(&tree, &blocks, &self.vocab);
        debug!(
            language = %unit.language,
            blocks = forest.len(),
            nodes = forest.node_count(),
            "classifying unit"
        );
        self.classify_forest(&forest)
    }

    /// Classify an already indexed program.
    pub fn classify_forest(&self, forest: &IndexForest) -> Result<Prediction, Error> {
        if forest.is_empty() {
            return Err(Error::EmptyUnit);
        }
        let embedding = Encoder::new(&self.weights, &self.vocab).encode_one(forest);
        Ok(self.predict(&embedding))
    }

    /// Classify a batch of indexed programs in one pass through the
    /// encoder. Results line up with the input order.
    pub fn classify_forests(&self, forests: &[IndexForest]) -> Result<Vec<Prediction>, Error> {
        if forests.iter().any(IndexForest::is_empty) {
            return Err(Error::EmptyUnit);
        }
        let refs: Vec<&IndexForest> = forests.iter().collect();
        let embeddings = Encoder::new(&self.weights, &self.vocab).encode_batch(&refs);
        Ok((0..forests.len())
            .map(|i| self.predict(&embeddings.column(i).clone_owned()))
            .collect())
    }

    fn predict(&self, embedding: &DVector<f32>) -> Prediction {
        let logits = &self.weights.w_out * embedding + &self.weights.b_out;
        let probabilities = softmax(logits.as_slice());
        let label = argmax(&probabilities);
        let class_name = self.class_names.get(label).cloned().unwrap_or_default();
        Prediction {
            label,
            class_name,
            probabilities,
        }
    }
}

// ---------- head ----------

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&z| (z - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
