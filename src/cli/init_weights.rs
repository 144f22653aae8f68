//! `init-weights` command

use std::path::Path;

use anyhow::{Context, Result};

use crate::classifier::{Classifier, ModelWeights};
use crate::config::ModelConfig;
use crate::vocab::Vocabulary;

pub(crate) fn run(
    vocab_path: &Path,
    encode_dim: usize,
    hidden: usize,
    classes: usize,
    seed: u64,
    output: &Path,
) -> Result<()> {
    let vocab = Vocabulary::load(vocab_path)
        .with_context(|| format!("failed to load vocabulary {}", vocab_path.display()))?;
    let config = ModelConfig {
        embedding_dim: vocab.dim(),
        encode_dim,
        hidden_dim: hidden,
        classes,
    };
    let weights = ModelWeights::seeded(config, seed);
    // Validate the pairing before writing anything.
    Classifier::new(vocab, weights.clone())?;
    weights.save(output)?;

    println!("initialized {} -> {}", config.describe(), output.display());
    Ok(())
}
