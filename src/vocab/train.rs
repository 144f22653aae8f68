//! Skip-gram embedding training
//!
//! Learns the vocabulary's embedding table from flat token sequences
//! with skip-gram negative sampling. Counting, selection, and the
//! update loop are all driven by a seeded generator, so a given corpus
//! and config always produce the same table.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::Vocabulary;
use crate::config::{DEFAULT_EMBEDDING_DIM, DEFAULT_MIN_COUNT};
use crate::error::Error;

const MIN_LEARNING_RATE: f32 = 1e-4;
const FREQUENCY_EXPONENT: f32 = 0.75;

// ---------- configuration ----------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VocabConfig {
    /// Embedding width.
    pub dim: usize,
    /// Tokens seen fewer times than this are left out of the table.
    pub min_count: usize,
    /// Hard cap on vocabulary size, keeping the most frequent tokens.
    pub max_vocab: Option<usize>,
    /// Maximum context offset on either side of a token.
    pub window: usize,
    /// Negative samples drawn per context pair.
    pub negatives: usize,
    pub epochs: usize,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for VocabConfig {
    fn default() -> Self {
        VocabConfig {
            dim: DEFAULT_EMBEDDING_DIM,
            min_count: DEFAULT_MIN_COUNT,
            max_vocab: None,
            window: 5,
            negatives: 5,
            epochs: 5,
            learning_rate: 0.025,
            seed: 1,
        }
    }
}

// ---------- training ----------

/// Train a [`Vocabulary`] over flat token sequences, one sequence per
/// source unit. Fails with [`Error::EmptyUnit`] when no token clears
/// `min_count`.
pub fn train(sequences: &[Vec<String>], config: &VocabConfig) -> Result<Vocabulary, Error> {
    let counts = count_tokens(sequences);
    let selected = select(counts, config.min_count, config.max_vocab);
    if selected.is_empty() {
        return Err(Error::EmptyUnit);
    }

    let tokens: Vec<String> = selected.iter().map(|(t, _)| t.clone()).collect();
    let freqs: Vec<u64> = selected.iter().map(|(_, c)| *c).collect();
    let index: HashMap<&str, usize> = tokens
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    let dim = config.dim;
    let window = config.window.max(1);
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut model = Sgns {
        syn0: DMatrix::from_fn(dim, tokens.len(), |_, _| {
            (rng.random::<f32>() - 0.5) / dim as f32
        }),
        syn1: DMatrix::zeros(dim, tokens.len()),
    };
    let table = UnigramTable::new(&freqs);

    info!(
        tokens = tokens.len(),
        sequences = sequences.len(),
        dim,
        epochs = config.epochs,
        "training token embeddings"
    );

    for epoch in 0..config.epochs {
        let lr = decayed_rate(config.learning_rate, epoch, config.epochs);
        for sequence in sequences {
            let ids: Vec<usize> = sequence
                .iter()
                .filter_map(|t| index.get(t.as_str()).copied())
                .collect();
            if ids.len() < 2 {
                continue;
            }
            for (i, &center) in ids.iter().enumerate() {
                let reach = rng.random_range(1..=window);
                let lo = i.saturating_sub(reach);
                let hi = (i + reach).min(ids.len() - 1);
                for j in lo..=hi {
                    if j == i {
                        continue;
                    }
                    model.train_window(ids[j], center, config.negatives, &table, &mut rng, lr);
                }
            }
        }
        debug!(epoch, lr, "embedding epoch complete");
    }

    Ok(Vocabulary::from_parts(tokens, model.syn0))
}

/// Occurrence counts over every token in every sequence.
pub(crate) fn count_tokens(sequences: &[Vec<String>]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for sequence in sequences {
        for token in sequence {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
    }
    counts
}

/// Keep tokens at or above `min_count`, most frequent first with ties
/// broken by token text, optionally capped at `max_vocab`.
fn select(
    counts: HashMap<String, u64>,
    min_count: usize,
    max_vocab: Option<usize>,
) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counts
        .into_iter()
        .filter(|(_, c)| *c >= min_count as u64)
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(cap) = max_vocab {
        entries.truncate(cap);
    }
    entries
}

fn decayed_rate(base: f32, epoch: usize, epochs: usize) -> f32 {
    if epochs <= 1 {
        return base.max(MIN_LEARNING_RATE);
    }
    let progress = epoch as f32 / epochs as f32;
    (base * (1.0 - progress)).max(MIN_LEARNING_RATE)
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

// ---------- model ----------

struct Sgns {
    // Input vectors, one column per token; these become the table.
    syn0: DMatrix<f32>,
    // Output vectors for the sampled softmax.
    syn1: DMatrix<f32>,
}

impl Sgns {
    /// One positive pair plus sampled negatives. The input column is
    /// updated once, after all targets have contributed.
    fn train_window<R: Rng>(
        &mut self,
        input: usize,
        center: usize,
        negatives: usize,
        table: &UnigramTable,
        rng: &mut R,
        lr: f32,
    ) {
        let h = self.syn0.column(input).clone_owned();
        let mut grad = DVector::zeros(h.len());
        self.step(center, 1.0, lr, &h, &mut grad);
        for _ in 0..negatives {
            let target = table.sample(rng);
            if target == center {
                continue;
            }
            self.step(target, 0.0, lr, &h, &mut grad);
        }
        self.syn0.column_mut(input).axpy(1.0, &grad, 1.0);
    }

    fn step(&mut self, target: usize, label: f32, lr: f32, h: &DVector<f32>, grad: &mut DVector<f32>) {
        let z = h.dot(&self.syn1.column(target));
        let g = (label - sigmoid(z)) * lr;
        grad.axpy(g, &self.syn1.column(target).clone_owned(), 1.0);
        self.syn1.column_mut(target).axpy(g, h, 1.0);
    }
}

/// Cumulative distribution over token frequencies raised to 3/4, the
/// standard negative-sampling skew.
struct UnigramTable {
    cumulative: Vec<f32>,
    total: f32,
}

impl UnigramTable {
    fn new(freqs: &[u64]) -> Self {
        let mut cumulative = Vec::with_capacity(freqs.len());
        let mut total = 0.0f32;
        for &f in freqs {
            total += (f as f32).powf(FREQUENCY_EXPONENT);
            cumulative.push(total);
        }
        UnigramTable { cumulative, total }
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        let x = rng.random::<f32>() * self.total;
        let idx = self.cumulative.partition_point(|&c| c <= x);
        idx.min(self.cumulative.len().saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Vec<String>> {
        let line = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();
        vec![
            line("funcdef x y End"),
            line("funcdef x z End"),
            line("funcdef x y End"),
            line("if x End"),
        ]
    }

    fn small_config() -> VocabConfig {
        VocabConfig {
            dim: 8,
            min_count: 1,
            epochs: 2,
            ..VocabConfig::default()
        }
    }

    #[test]
    fn test_min_count_filters_rare_tokens() {
        let config = VocabConfig {
            min_count: 3,
            ..small_config()
        };
        let vocab = train(&corpus(), &config).unwrap();
        assert!(vocab.contains("funcdef"));
        assert!(vocab.contains("x"));
        assert!(vocab.contains("End"));
        assert!(!vocab.contains("y"));
        assert!(!vocab.contains("z"));
        assert_eq!(vocab.id("z"), vocab.unknown_id());
    }

    #[test]
    fn test_frequency_ordering_with_lexical_ties() {
        let vocab = train(&corpus(), &small_config()).unwrap();
        // x and End appear 4 times each, funcdef 3, y 2, if and z once.
        assert_eq!(vocab.token(0), Some("End"));
        assert_eq!(vocab.token(1), Some("x"));
        assert_eq!(vocab.token(2), Some("funcdef"));
        assert_eq!(vocab.token(3), Some("y"));
        assert_eq!(vocab.token(4), Some("if"));
        assert_eq!(vocab.token(5), Some("z"));
    }

    #[test]
    fn test_max_vocab_keeps_most_frequent() {
        let config = VocabConfig {
            max_vocab: Some(2),
            ..small_config()
        };
        let vocab = train(&corpus(), &config).unwrap();
        assert_eq!(vocab.len(), 2);
        assert!(vocab.contains("End"));
        assert!(vocab.contains("x"));
        assert!(!vocab.contains("funcdef"));
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = train(&corpus(), &small_config()).unwrap();
        let b = train(&corpus(), &small_config()).unwrap();
        assert_eq!(a.embeddings(), b.embeddings());
    }

    #[test]
    fn test_seed_changes_table() {
        let a = train(&corpus(), &small_config()).unwrap();
        let b = train(
            &corpus(),
            &VocabConfig {
                seed: 7,
                ..small_config()
            },
        )
        .unwrap();
        assert_ne!(a.embeddings(), b.embeddings());
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        let err = train(&[], &small_config()).unwrap_err();
        assert!(matches!(err, Error::EmptyUnit));
    }

    #[test]
    fn test_dimensions_follow_config() {
        let vocab = train(&corpus(), &small_config()).unwrap();
        assert_eq!(vocab.dim(), 8);
        assert_eq!(vocab.embeddings().ncols(), vocab.len() + 1);
    }

    #[test]
    fn test_unigram_sampling_stays_in_range() {
        let table = UnigramTable::new(&[10, 5, 1]);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            assert!(table.sample(&mut rng) < 3);
        }
    }
}
