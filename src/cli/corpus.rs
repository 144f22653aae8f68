//! `corpus` command

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::pipeline;

pub(crate) fn run(path: &Path, label: &str, output: &Path) -> Result<()> {
    let build = pipeline::prepare_corpus(path, label);
    if build.records.is_empty() {
        bail!("no usable source files under {}", path.display());
    }

    let mut out = BufWriter::new(
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    for record in &build.records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    println!(
        "wrote {} records to {} ({} skipped)",
        build.records.len(),
        output.display(),
        build.skipped.len()
    );
    Ok(())
}
