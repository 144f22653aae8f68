//! `classify` command

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::classifier::Classifier;
use crate::models::SourceUnit;
use crate::parsers::Language;
use crate::pipeline::Pipeline;

pub(crate) fn run(
    path: &Path,
    vocab: &Path,
    weights: &Path,
    language: Option<Language>,
    format: &str,
) -> Result<()> {
    let classifier = Classifier::from_files(vocab, weights).with_context(|| {
        format!(
            "failed to load model from {} and {}",
            vocab.display(),
            weights.display()
        )
    })?;
    let pipeline = Pipeline::new(&classifier);

    if path.is_dir() {
        let report = pipeline.run(path)?;
        if format == "json" {
            let doc = serde_json::json!({
                "results": report.results,
                "skipped": report.skipped,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            for file in &report.results {
                println!("{}: {}", file.path.display(), file.prediction);
            }
            for skip in &report.skipped {
                println!("{}: skipped ({})", skip.path.display(), skip.reason);
            }
            println!();
            println!("{}", report.summary());
        }
        return Ok(());
    }

    let prediction = match language {
        // Explicit language: read the file as-is, extension ignored.
        Some(language) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            classifier.classify(&SourceUnit::new(text, language))?
        }
        None => pipeline.classify_file(path)?,
    };

    if format == "json" {
        let doc = serde_json::json!({
            "path": path,
            "prediction": prediction,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        println!("{}: {}", path.display(), prediction);
    }
    Ok(())
}
