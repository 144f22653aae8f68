//! CLI command definitions and handlers

mod classify;
mod corpus;
mod encode;
mod init_weights;
mod train_vocab;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::parsers::Language;
use crate::vocab::VocabConfig;

/// Parse and validate an embedding dimension (1-4096)
fn parse_dim(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("dimension must be at least 1".to_string())
    } else if n > 4096 {
        Err("dimension cannot exceed 4096".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a language override (python, java, cpp)
fn parse_language(s: &str) -> Result<Language, String> {
    Language::from_name(s)
        .ok_or_else(|| format!("unknown language '{}' (expected python, java, or cpp)", s))
}

/// Codeprov - source code provenance classification
///
/// 100% LOCAL - inference runs on your machine against local model files.
#[derive(Parser, Debug)]
#[command(name = "codeprov")]
#[command(
    version,
    about = "Classify source code as human- or machine-authored from its syntax structure",
    long_about = "Codeprov parses Python, Java, and C++ sources, normalizes their syntax \
trees into a shared statement-block form, and scores each program with a \
recurrent encoder over learned token embeddings.\n\n\
The model files are plain JSON: train a vocabulary from your own corpus, \
initialize weights for it, and classify.",
    after_help = "\
Examples:
  codeprov corpus ./theirs --label machine -o machine.jsonl
  codeprov corpus ./ours --label human -o human.jsonl
  codeprov train-vocab machine.jsonl human.jsonl -o vocab.json
  codeprov encode machine.jsonl human.jsonl --vocab vocab.json -o encoded.jsonl
  codeprov init-weights --vocab vocab.json -o weights.json
  codeprov classify src/ --vocab vocab.json --weights weights.json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify a file or directory tree
    #[command(after_help = "\
Examples:
  codeprov classify main.py --vocab vocab.json --weights weights.json
  codeprov classify src/ --vocab vocab.json --weights weights.json --format json
  codeprov classify snippet.txt --language python    Treat any file as Python")]
    Classify {
        /// File or directory to classify
        path: PathBuf,

        /// Trained vocabulary (token table plus embeddings)
        #[arg(long, default_value = "vocab.json")]
        vocab: PathBuf,

        /// Trained or initialized model weights
        #[arg(long, default_value = "weights.json")]
        weights: PathBuf,

        /// Override extension-based language detection (single files only)
        #[arg(long, value_parser = parse_language)]
        language: Option<Language>,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// Build a labeled training corpus from a directory of sources
    #[command(after_help = "\
Examples:
  codeprov corpus ./generated --label machine -o machine.jsonl
  codeprov corpus ./handwritten --label human -o human.jsonl")]
    Corpus {
        /// Directory of source files
        path: PathBuf,

        /// Label recorded on every record (e.g. human, machine)
        #[arg(long)]
        label: String,

        /// Output JSONL path
        #[arg(long, short = 'o', default_value = "corpus.jsonl")]
        output: PathBuf,
    },

    /// Train token embeddings from corpus token sequences
    #[command(after_help = "\
Examples:
  codeprov train-vocab corpus.jsonl -o vocab.json
  codeprov train-vocab machine.jsonl human.jsonl --dim 128 --min-count 3
  codeprov train-vocab corpus.jsonl --max-vocab 5000 --seed 7")]
    TrainVocab {
        /// Corpus JSONL files produced by `codeprov corpus`
        #[arg(required = true)]
        corpus: Vec<PathBuf>,

        /// Embedding width
        #[arg(long, default_value = "128", value_parser = parse_dim)]
        dim: usize,

        /// Drop tokens seen fewer than this many times
        #[arg(long, default_value = "3")]
        min_count: usize,

        /// Keep only the most frequent N tokens
        #[arg(long)]
        max_vocab: Option<usize>,

        /// Maximum context offset on either side of a token
        #[arg(long, default_value = "5")]
        window: usize,

        /// Negative samples per context pair
        #[arg(long, default_value = "5")]
        negatives: usize,

        #[arg(long, default_value = "5")]
        epochs: usize,

        #[arg(long, default_value = "0.025")]
        learning_rate: f32,

        #[arg(long, default_value = "1")]
        seed: u64,

        /// Output vocabulary path
        #[arg(long, short = 'o', default_value = "vocab.json")]
        output: PathBuf,
    },

    /// Resolve corpus blocks to vocabulary ids for an external trainer
    Encode {
        /// Corpus JSONL files produced by `codeprov corpus`
        #[arg(required = true)]
        corpus: Vec<PathBuf>,

        /// Trained vocabulary
        #[arg(long, default_value = "vocab.json")]
        vocab: PathBuf,

        /// Output JSONL path
        #[arg(long, short = 'o', default_value = "encoded.jsonl")]
        output: PathBuf,
    },

    /// Write freshly initialized weights shaped for a vocabulary
    #[command(after_help = "\
Examples:
  codeprov init-weights --vocab vocab.json -o weights.json
  codeprov init-weights --vocab vocab.json --hidden 100 --seed 42")]
    InitWeights {
        /// Vocabulary the weights must pair with
        #[arg(long, default_value = "vocab.json")]
        vocab: PathBuf,

        /// Block vector width
        #[arg(long, default_value = "128", value_parser = parse_dim)]
        encode_dim: usize,

        /// Recurrent hidden width per direction
        #[arg(long, default_value = "100", value_parser = parse_dim)]
        hidden: usize,

        /// Number of output classes
        #[arg(long, default_value = "2")]
        classes: usize,

        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output weights path
        #[arg(long, short = 'o', default_value = "weights.json")]
        output: PathBuf,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Classify {
            path,
            vocab,
            weights,
            language,
            format,
        } => classify::run(&path, &vocab, &weights, language, &format),

        Commands::Corpus {
            path,
            label,
            output,
        } => corpus::run(&path, &label, &output),

        Commands::TrainVocab {
            corpus,
            dim,
            min_count,
            max_vocab,
            window,
            negatives,
            epochs,
            learning_rate,
            seed,
            output,
        } => {
            let config = VocabConfig {
                dim,
                min_count,
                max_vocab,
                window,
                negatives,
                epochs,
                learning_rate,
                seed,
            };
            train_vocab::run(&corpus, &config, &output)
        }

        Commands::Encode {
            corpus,
            vocab,
            output,
        } => encode::run(&corpus, &vocab, &output),

        Commands::InitWeights {
            vocab,
            encode_dim,
            hidden,
            classes,
            seed,
            output,
        } => init_weights::run(&vocab, encode_dim, hidden, classes, seed, &output),
    }
}
