//! Batch classification and corpus preparation
//!
//! Orchestrates the per-file pipeline over directory trees:
//! 1. Walk source files (gitignore-aware, supported extensions only)
//! 2. Parse and segment each file
//! 3. Classify, or emit corpus records for training
//!
//! Per-file failures are recorded and skipped at this boundary; one
//! unparsable file never aborts the rest of the batch.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::ast::blocks::{block_sequence, flat_sequence, Block, END_SENTINEL};
use crate::classifier::Classifier;
use crate::error::Error;
use crate::models::{
    CorpusRecord, FileClassification, Prediction, SkippedFile, SourceUnit, TokenTree,
};
use crate::parsers::{self, supported_extensions, Language};

// ---------- classification ----------

/// Batch classification over a directory tree.
pub struct Pipeline<'a> {
    classifier: &'a Classifier,
}

impl<'a> Pipeline<'a> {
    pub fn new(classifier: &'a Classifier) -> Self {
        Self { classifier }
    }

    /// Classify every supported file under `root`.
    pub fn run(&self, root: &Path) -> Result<BatchReport, Error> {
        let files = collect_files(root);
        info!(root = %root.display(), files = files.len(), "classifying batch");

        let mut report = BatchReport::default();
        for path in files {
            match self.classify_file(&path) {
                Ok(prediction) => {
                    debug!(path = %path.display(), label = %prediction.class_name, "classified");
                    report.results.push(FileClassification { path, prediction });
                }
                // Unreadable files are a per-file condition here, same
                // as a parse failure.
                Err(err) if err.is_recoverable() || matches!(err, Error::Io(_)) => {
                    warn!(path = %path.display(), error = %err, "skipping file");
                    report.skipped.push(SkippedFile {
                        path,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
        info!("batch complete: {}", report.summary());
        Ok(report)
    }

    /// Classify a single file, resolving the language from its
    /// extension.
    pub fn classify_file(&self, path: &Path) -> Result<Prediction, Error> {
        let language = Language::from_path(path)?;
        let text = fs::read_to_string(path)?;
        self.classifier.classify(&SourceUnit::new(text, language))
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: Vec<FileClassification>,
    pub skipped: Vec<SkippedFile>,
}

impl BatchReport {
    /// Files seen, classified or not.
    pub fn total(&self) -> usize {
        self.results.len() + self.skipped.len()
    }

    /// Classified-file counts per class name, alphabetical.
    pub fn class_counts(&self) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for file in &self.results {
            *counts.entry(file.prediction.class_name.clone()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} classified", self.results.len()),
            format!("{} skipped", self.skipped.len()),
        ];
        for (name, count) in self.class_counts() {
            parts.push(format!("{count} {name}"));
        }
        parts.join(", ")
    }
}

// ---------- corpus preparation ----------

/// Corpus records plus the files that failed to produce one.
#[derive(Debug, Default)]
pub struct CorpusBuild {
    pub records: Vec<CorpusRecord>,
    pub skipped: Vec<SkippedFile>,
}

/// Walk `root` and emit one [`CorpusRecord`] per parsable file, all
/// tagged with `label`. Files that fail to parse or produce no blocks
/// are recorded as skipped.
pub fn prepare_corpus(root: &Path, label: &str) -> CorpusBuild {
    let files = collect_files(root);
    info!(root = %root.display(), files = files.len(), label, "preparing corpus");

    let mut build = CorpusBuild::default();
    for path in files {
        match corpus_record(root, &path, label) {
            Ok(record) => build.records.push(record),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping file");
                build.skipped.push(SkippedFile {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }
    info!(
        records = build.records.len(),
        skipped = build.skipped.len(),
        "corpus ready"
    );
    build
}

fn corpus_record(root: &Path, path: &Path, label: &str) -> Result<CorpusRecord, Error> {
    let language = Language::from_path(path)?;
    let text = fs::read_to_string(path)?;
    let tree = parsers::parse_source(&text, language)?;
    let blocks = block_sequence(&tree);
    if blocks.is_empty() {
        return Err(Error::EmptyUnit);
    }
    let block_trees = blocks
        .iter()
        .map(|block| match block {
            Block::Node(id) => tree.token_tree(*id),
            Block::End => TokenTree::leaf(END_SENTINEL),
        })
        .collect();
    let id = path
        .strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string();
    Ok(CorpusRecord {
        id,
        label: label.to_string(),
        tokens: flat_sequence(&tree),
        blocks: block_trees,
    })
}

/// Read corpus records back from a JSONL file, one record per
/// non-empty line.
pub fn read_corpus(path: &Path) -> Result<Vec<CorpusRecord>, Error> {
    let file = File::open(path)?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

// ---------- file discovery ----------

/// Supported source files under `root`, gitignore-aware, in sorted
/// order so batch output is stable.
fn collect_files(root: &Path) -> Vec<PathBuf> {
    let extensions = supported_extensions();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .build();

    let mut files: Vec<PathBuf> = walker
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| extensions.contains(&ext))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
