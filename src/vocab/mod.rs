//! Token vocabulary and embedding table
//!
//! Maps normalized-node tokens to dense ids and stores one embedding
//! column per token. Lookup never fails: tokens outside the vocabulary
//! map to a reserved trailing id whose embedding is the zero vector, so
//! unseen code degrades gradually instead of erroring.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;

pub mod train;

pub use train::{train, VocabConfig};

// ---------- vocabulary ----------

#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
    // dim x (tokens.len() + 1); the extra column is the zero embedding
    // for out-of-vocabulary tokens.
    vectors: DMatrix<f32>,
}

impl Vocabulary {
    /// Assemble a vocabulary from trained parts. `vectors` holds one
    /// column per token (dim x tokens.len()); the out-of-vocabulary
    /// column is appended here.
    pub(crate) fn from_parts(tokens: Vec<String>, vectors: DMatrix<f32>) -> Self {
        debug_assert_eq!(vectors.ncols(), tokens.len());
        let dim = vectors.nrows();
        let known = vectors.ncols();
        let padded = DMatrix::from_fn(dim, known + 1, |r, c| {
            if c < known {
                vectors[(r, c)]
            } else {
                0.0
            }
        });
        let ids = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i as u32))
            .collect();
        Vocabulary {
            tokens,
            ids,
            vectors: padded,
        }
    }

    /// Id for `token`, falling back to [`Vocabulary::unknown_id`].
    pub fn id(&self, token: &str) -> u32 {
        match self.ids.get(token) {
            Some(&id) => id,
            None => self.unknown_id(),
        }
    }

    /// Reserved id whose embedding is the zero vector.
    pub fn unknown_id(&self) -> u32 {
        self.tokens.len() as u32
    }

    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    /// Token text for a known id.
    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Number of known tokens, excluding the out-of-vocabulary slot.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Embedding width.
    pub fn dim(&self) -> usize {
        self.vectors.nrows()
    }

    /// Full embedding table, dim x (len + 1). Column index equals
    /// token id; the last column is the zero vector.
    pub fn embeddings(&self) -> &DMatrix<f32> {
        &self.vectors
    }

    // ---------- persistence ----------

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let known = self.tokens.len();
        let mut data = Vec::with_capacity(self.dim() * known);
        for row in 0..self.dim() {
            for col in 0..known {
                data.push(self.vectors[(row, col)]);
            }
        }
        let file = VocabFile {
            dim: self.dim(),
            tokens: self.tokens.clone(),
            vectors: data,
        };
        let out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(out, &file)?;
        info!(
            path = %path.display(),
            tokens = known,
            dim = self.dim(),
            "saved vocabulary"
        );
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let file: VocabFile = serde_json::from_reader(reader)?;
        if file.vectors.len() != file.dim * file.tokens.len() {
            return Err(Error::ConfigMismatch {
                detail: format!(
                    "vocabulary at {} holds {} values, expected {} ({} tokens x {} dims)",
                    path.display(),
                    file.vectors.len(),
                    file.dim * file.tokens.len(),
                    file.tokens.len(),
                    file.dim,
                ),
            });
        }
        let vectors = DMatrix::from_row_slice(file.dim, file.tokens.len(), &file.vectors);
        Ok(Vocabulary::from_parts(file.tokens, vectors))
    }
}

/// On-disk layout. Vector data is row-major and excludes the
/// out-of-vocabulary column, which is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct VocabFile {
    dim: usize,
    tokens: Vec<String>,
    vectors: Vec<f32>,
}
