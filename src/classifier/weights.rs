//! Model parameters
//!
//! Holds every tensor of the two-level encoder and the output head,
//! persisted as a named-tensor map keyed by the [`ModelConfig`] it was
//! shaped for. Loading checks each tensor against the embedded config
//! so a mismatched pairing fails up front, not mid-encode.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ModelConfig;
use crate::error::Error;

// ---------- parameter groups ----------

/// One direction of the recurrent layer. Gate rows are stacked
/// reset, update, candidate, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct GruParams {
    /// 3*hidden x input.
    pub w_ih: DMatrix<f32>,
    /// 3*hidden x hidden.
    pub w_hh: DMatrix<f32>,
    pub b_ih: DVector<f32>,
    pub b_hh: DVector<f32>,
}

impl GruParams {
    fn seeded<R: Rng>(rng: &mut R, input: usize, hidden: usize) -> Self {
        let bound = inv_sqrt(hidden);
        GruParams {
            w_ih: uniform_matrix(rng, 3 * hidden, input, bound),
            w_hh: uniform_matrix(rng, 3 * hidden, hidden, bound),
            b_ih: uniform_vector(rng, 3 * hidden, bound),
            b_hh: uniform_vector(rng, 3 * hidden, bound),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelWeights {
    pub config: ModelConfig,
    /// Shared node transform, encode_dim x embedding_dim.
    pub w_combine: DMatrix<f32>,
    pub b_combine: DVector<f32>,
    pub forward: GruParams,
    pub backward: GruParams,
    /// Output head, classes x 2*hidden_dim.
    pub w_out: DMatrix<f32>,
    pub b_out: DVector<f32>,
}

impl ModelWeights {
    /// Fresh parameters drawn uniformly from +-1/sqrt(fan), one fixed
    /// draw order, so a config and seed always give the same tensors.
    pub fn seeded(config: ModelConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let combine_bound = inv_sqrt(config.embedding_dim);
        let w_combine =
            uniform_matrix(&mut rng, config.encode_dim, config.embedding_dim, combine_bound);
        let b_combine = uniform_vector(&mut rng, config.encode_dim, combine_bound);
        let forward = GruParams::seeded(&mut rng, config.encode_dim, config.hidden_dim);
        let backward = GruParams::seeded(&mut rng, config.encode_dim, config.hidden_dim);
        let out_bound = inv_sqrt(config.program_dim());
        let w_out = uniform_matrix(&mut rng, config.classes, config.program_dim(), out_bound);
        let b_out = uniform_vector(&mut rng, config.classes, out_bound);
        ModelWeights {
            config,
            w_combine,
            b_combine,
            forward,
            backward,
            w_out,
            b_out,
        }
    }

    // ---------- persistence ----------

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let out = BufWriter::new(File::create(path)?);
        serde_json::to_writer(out, &self.to_file())?;
        info!(path = %path.display(), config = %self.config.describe(), "saved model weights");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        let file: WeightsFile = serde_json::from_reader(reader)?;
        let weights = Self::from_file(file)?;
        info!(path = %path.display(), config = %weights.config.describe(), "loaded model weights");
        Ok(weights)
    }

    fn to_file(&self) -> WeightsFile {
        let mut tensors = BTreeMap::new();
        tensors.insert("combine.weight".to_string(), tensor_of(&self.w_combine));
        tensors.insert("combine.bias".to_string(), tensor_of_vector(&self.b_combine));
        for (prefix, params) in [("gru.forward", &self.forward), ("gru.backward", &self.backward)]
        {
            tensors.insert(format!("{prefix}.weight_ih"), tensor_of(&params.w_ih));
            tensors.insert(format!("{prefix}.weight_hh"), tensor_of(&params.w_hh));
            tensors.insert(format!("{prefix}.bias_ih"), tensor_of_vector(&params.b_ih));
            tensors.insert(format!("{prefix}.bias_hh"), tensor_of_vector(&params.b_hh));
        }
        tensors.insert("out.weight".to_string(), tensor_of(&self.w_out));
        tensors.insert("out.bias".to_string(), tensor_of_vector(&self.b_out));
        WeightsFile {
            config: self.config,
            tensors,
        }
    }

    fn from_file(file: WeightsFile) -> Result<Self, Error> {
        let config = file.config;
        let mut tensors = file.tensors;
        let w_combine = take_matrix(
            &mut tensors,
            "combine.weight",
            config.encode_dim,
            config.embedding_dim,
        )?;
        let b_combine = take_vector(&mut tensors, "combine.bias", config.encode_dim)?;
        let forward = take_gru(&mut tensors, "gru.forward", &config)?;
        let backward = take_gru(&mut tensors, "gru.backward", &config)?;
        let w_out = take_matrix(&mut tensors, "out.weight", config.classes, config.program_dim())?;
        let b_out = take_vector(&mut tensors, "out.bias", config.classes)?;
        if let Some(extra) = tensors.keys().next() {
            return Err(Error::ConfigMismatch {
                detail: format!("unexpected tensor {extra}"),
            });
        }
        Ok(ModelWeights {
            config,
            w_combine,
            b_combine,
            forward,
            backward,
            w_out,
            b_out,
        })
    }
}

fn take_gru(
    tensors: &mut BTreeMap<String, Tensor>,
    prefix: &str,
    config: &ModelConfig,
) -> Result<GruParams, Error> {
    let gates = 3 * config.hidden_dim;
    Ok(GruParams {
        w_ih: take_matrix(tensors, &format!("{prefix}.weight_ih"), gates, config.encode_dim)?,
        w_hh: take_matrix(tensors, &format!("{prefix}.weight_hh"), gates, config.hidden_dim)?,
        b_ih: take_vector(tensors, &format!("{prefix}.bias_ih"), gates)?,
        b_hh: take_vector(tensors, &format!("{prefix}.bias_hh"), gates)?,
    })
}

// ---------- tensor layout ----------

/// On-disk layout: the config tuple plus row-major named tensors.
#[derive(Serialize, Deserialize)]
struct WeightsFile {
    config: ModelConfig,
    tensors: BTreeMap<String, Tensor>,
}

#[derive(Serialize, Deserialize)]
struct Tensor {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

fn tensor_of(m: &DMatrix<f32>) -> Tensor {
    let mut data = Vec::with_capacity(m.nrows() * m.ncols());
    for r in 0..m.nrows() {
        for c in 0..m.ncols() {
            data.push(m[(r, c)]);
        }
    }
    Tensor {
        rows: m.nrows(),
        cols: m.ncols(),
        data,
    }
}

fn tensor_of_vector(v: &DVector<f32>) -> Tensor {
    Tensor {
        rows: v.len(),
        cols: 1,
        data: v.as_slice().to_vec(),
    }
}

fn take_matrix(
    tensors: &mut BTreeMap<String, Tensor>,
    name: &str,
    rows: usize,
    cols: usize,
) -> Result<DMatrix<f32>, Error> {
    let tensor = tensors.remove(name).ok_or_else(|| Error::ConfigMismatch {
        detail: format!("missing tensor {name}"),
    })?;
    if tensor.rows != rows || tensor.cols != cols || tensor.data.len() != rows * cols {
        return Err(Error::ConfigMismatch {
            detail: format!(
                "tensor {name} is {}x{} with {} values, config requires {rows}x{cols}",
                tensor.rows,
                tensor.cols,
                tensor.data.len(),
            ),
        });
    }
    Ok(DMatrix::from_row_slice(rows, cols, &tensor.data))
}

fn take_vector(
    tensors: &mut BTreeMap<String, Tensor>,
    name: &str,
    rows: usize,
) -> Result<DVector<f32>, Error> {
    let matrix = take_matrix(tensors, name, rows, 1)?;
    Ok(DVector::from_column_slice(matrix.as_slice()))
}

fn uniform_matrix<R: Rng>(rng: &mut R, rows: usize, cols: usize, bound: f32) -> DMatrix<f32> {
    DMatrix::from_fn(rows, cols, |_, _| rng.random_range(-bound..=bound))
}

fn uniform_vector<R: Rng>(rng: &mut R, rows: usize, bound: f32) -> DVector<f32> {
    DVector::from_fn(rows, |_, _| rng.random_range(-bound..=bound))
}

fn inv_sqrt(dim: usize) -> f32 {
    1.0 / (dim.max(1) as f32).sqrt()
}
