//! `encode` command

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::index_tree::IndexForest;
use crate::models::EncodedRecord;
use crate::pipeline;
use crate::vocab::Vocabulary;

pub(crate) fn run(corpus: &[PathBuf], vocab_path: &Path, output: &Path) -> Result<()> {
    let vocab = Vocabulary::load(vocab_path)
        .with_context(|| format!("failed to load vocabulary {}", vocab_path.display()))?;

    let mut out = BufWriter::new(
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    let mut programs = 0usize;
    let mut blocks = 0usize;
    for path in corpus {
        let records = pipeline::read_corpus(path)
            .with_context(|| format!("failed to read corpus {}", path.display()))?;
        for record in records {
            let forest = IndexForest::from_token_trees(&record.blocks, &vocab);
            blocks += forest.len();
            let encoded = EncodedRecord {
                id: record.id,
                label: record.label,
                forest,
            };
            serde_json::to_writer(&mut out, &encoded)?;
            out.write_all(b"\n")?;
            programs += 1;
        }
    }
    out.flush()?;

    println!(
        "encoded {programs} programs ({blocks} blocks) -> {}",
        output.display()
    );
    Ok(())
}
