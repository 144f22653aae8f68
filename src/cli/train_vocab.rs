//! `train-vocab` command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::pipeline;
use crate::vocab::{self, VocabConfig};

pub(crate) fn run(corpus: &[PathBuf], config: &VocabConfig, output: &Path) -> Result<()> {
    let mut sequences = Vec::new();
    for path in corpus {
        let records = pipeline::read_corpus(path)
            .with_context(|| format!("failed to read corpus {}", path.display()))?;
        sequences.extend(records.into_iter().map(|r| r.tokens));
    }

    let vocab = vocab::train(&sequences, config).context("vocabulary training failed")?;
    vocab.save(output)?;

    println!(
        "trained {} tokens ({} dims) from {} sequences -> {}",
        vocab.len(),
        vocab.dim(),
        sequences.len(),
        output.display()
    );
    Ok(())
}
