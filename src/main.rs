//! Codeprov - AST-based code provenance classification CLI
//!
//! Parses source files into normalized block sequences, encodes them
//! with a two-level recurrent model, and labels each program as
//! human- or machine-authored.

use anyhow::Result;
use clap::Parser;
use codeprov::cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Parse CLI args and run
    let cli = cli::Cli::parse();
    cli::run(cli)
}
