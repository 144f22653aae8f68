//! Two-level recurrent encoder
//!
//! Turns index forests into fixed-width program embeddings in two
//! stages. Stage one encodes every tree bottom-up: a node's vector is
//! the shared transform of its own embedding plus the elementwise max
//! of its children's vectors, and the root's vector stands for the
//! block. Stage two runs a bidirectional recurrent layer over each
//! program's block vectors in sequence order and max-pools the hidden
//! states over time.
//!
//! Trees and programs vary in shape, so neither stage loops one
//! program at a time. Tree nodes are grouped by depth across the whole
//! batch and each level is one matrix operation, deepest first, so
//! children are always resolved before their parents. Programs are
//! sorted by descending block count before the recurrent passes; the
//! active set at any time step is then a column prefix, and pooled
//! results are written back through the sort order so callers see
//! input order throughout.

use nalgebra::{DMatrix, DVector};

use super::weights::{GruParams, ModelWeights};
use crate::index_tree::{IndexForest, IndexTree};
use crate::vocab::Vocabulary;

pub(crate) struct Encoder<'a> {
    weights: &'a ModelWeights,
    table: &'a DMatrix<f32>,
}

impl<'a> Encoder<'a> {
    pub(crate) fn new(weights: &'a ModelWeights, vocab: &'a Vocabulary) -> Self {
        Encoder {
            weights,
            table: vocab.embeddings(),
        }
    }

    /// Embed one program.
    pub(crate) fn encode_one(&self, program: &IndexForest) -> DVector<f32> {
        let out = self.encode_batch(&[program]);
        out.column(0).clone_owned()
    }

    /// Embed a batch. Column `i` of the result is the embedding of
    /// `programs[i]`; a program with no blocks embeds to zero.
    pub(crate) fn encode_batch(&self, programs: &[&IndexForest]) -> DMatrix<f32> {
        let hidden = self.weights.config.hidden_dim;
        let flat = Flat::build(programs);
        let reps = self.encode_trees(&flat);

        // Descending block count; ties keep input order.
        let lengths: Vec<usize> = programs.iter().map(|p| p.len()).collect();
        let mut order: Vec<usize> = (0..programs.len()).collect();
        order.sort_by(|&a, &b| lengths[b].cmp(&lengths[a]).then(a.cmp(&b)));
        let sorted_lengths: Vec<usize> = order.iter().map(|&p| lengths[p]).collect();
        let max_len = sorted_lengths.first().copied().unwrap_or(0);

        let mut pooled = DMatrix::from_element(
            self.weights.config.program_dim(),
            programs.len(),
            f32::NEG_INFINITY,
        );

        // Forward sweep: the active prefix shrinks as short programs run out.
        let mut state = DMatrix::zeros(hidden, order.len());
        for t in 0..max_len {
            let active = sorted_lengths.partition_point(|&l| l > t);
            if active == 0 {
                break;
            }
            let x = self.step_input(&flat, &reps, &order[..active], t);
            let next = gru_step(&self.weights.forward, &x, &state.columns(0, active).clone_owned());
            state.columns_mut(0, active).copy_from(&next);
            pool_into(&mut pooled, &next, &order[..active], 0);
        }

        // Backward sweep: columns join with zero state as t decreases.
        let mut state = DMatrix::zeros(hidden, order.len());
        for t in (0..max_len).rev() {
            let active = sorted_lengths.partition_point(|&l| l > t);
            let x = self.step_input(&flat, &reps, &order[..active], t);
            let next =
                gru_step(&self.weights.backward, &x, &state.columns(0, active).clone_owned());
            state.columns_mut(0, active).copy_from(&next);
            pool_into(&mut pooled, &next, &order[..active], hidden);
        }

        for (p, &len) in lengths.iter().enumerate() {
            if len == 0 {
                pooled.column_mut(p).fill(0.0);
            }
        }
        pooled
    }

    /// Block vectors for one time step, one column per active program.
    fn step_input(
        &self,
        flat: &Flat,
        reps: &DMatrix<f32>,
        active: &[usize],
        t: usize,
    ) -> DMatrix<f32> {
        let mut x = DMatrix::zeros(self.weights.config.encode_dim, active.len());
        for (k, &p) in active.iter().enumerate() {
            x.set_column(k, &reps.column(flat.roots[p][t]));
        }
        x
    }

    /// Bottom-up node vectors for every tree in the batch, one level
    /// per matrix operation.
    fn encode_trees(&self, flat: &Flat) -> DMatrix<f32> {
        let mut reps = DMatrix::zeros(self.weights.config.encode_dim, flat.len());
        for level in flat.by_depth.iter().rev() {
            if level.is_empty() {
                continue;
            }
            // Ids past the table end collapse to the reserved column.
            let last = self.table.ncols().saturating_sub(1);
            let ids: Vec<usize> = level.iter().map(|&n| flat.vocab_ids[n].min(last)).collect();
            let mut combined = &self.weights.w_combine * self.table.select_columns(ids.iter());
            for mut col in combined.column_iter_mut() {
                col.axpy(1.0, &self.weights.b_combine, 1.0);
            }
            for (k, &node) in level.iter().enumerate() {
                let mut col = combined.column(k).clone_owned();
                if let Some((&first, rest)) = flat.children[node].split_first() {
                    let mut max = reps.column(first).clone_owned();
                    for &child in rest {
                        max.zip_apply(&reps.column(child), |a, b| *a = a.max(b));
                    }
                    col += &max;
                }
                reps.set_column(node, &col);
            }
        }
        reps
    }
}

/// One GRU step over a column batch. Gates follow the stacked
/// reset/update/candidate layout of [`GruParams`].
fn gru_step(params: &GruParams, x: &DMatrix<f32>, h_prev: &DMatrix<f32>) -> DMatrix<f32> {
    let hidden = h_prev.nrows();
    let mut gi = &params.w_ih * x;
    let mut gh = &params.w_hh * h_prev;
    for mut col in gi.column_iter_mut() {
        col.axpy(1.0, &params.b_ih, 1.0);
    }
    for mut col in gh.column_iter_mut() {
        col.axpy(1.0, &params.b_hh, 1.0);
    }

    let reset = (gi.rows(0, hidden) + gh.rows(0, hidden)).map(sigmoid);
    let update = (gi.rows(hidden, hidden) + gh.rows(hidden, hidden)).map(sigmoid);
    let candidate = (gi.rows(2 * hidden, hidden)
        + gh.rows(2 * hidden, hidden).component_mul(&reset))
    .map(f32::tanh);

    candidate.zip_map(&update, |n, z| (1.0 - z) * n) + update.component_mul(h_prev)
}

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Fold hidden states into the pooled program embeddings, routing each
/// active column back to its program's slot.
fn pool_into(pooled: &mut DMatrix<f32>, states: &DMatrix<f32>, active: &[usize], row: usize) {
    let hidden = states.nrows();
    for (k, &p) in active.iter().enumerate() {
        let mut slot = pooled.view_mut((row, p), (hidden, 1));
        slot.zip_apply(&states.column(k), |a, b| *a = a.max(b));
    }
}

// ---------- batch layout ----------

/// Every node of every tree in the batch, flattened with its depth and
/// child indices, so levels can be processed as array partitions.
struct Flat {
    vocab_ids: Vec<usize>,
    children: Vec<Vec<usize>>,
    /// Node indices grouped by depth from the root.
    by_depth: Vec<Vec<usize>>,
    /// Per program, the flat index of each block tree's root.
    roots: Vec<Vec<usize>>,
}

impl Flat {
    fn build(programs: &[&IndexForest]) -> Self {
        let mut flat = Flat {
            vocab_ids: Vec::new(),
            children: Vec::new(),
            by_depth: Vec::new(),
            roots: Vec::new(),
        };
        for program in programs {
            let roots = program
                .trees
                .iter()
                .map(|tree| flat.push_tree(tree, 0))
                .collect();
            flat.roots.push(roots);
        }
        flat
    }

    fn push_tree(&mut self, tree: &IndexTree, depth: usize) -> usize {
        let idx = self.vocab_ids.len();
        self.vocab_ids.push(tree.id as usize);
        self.children.push(Vec::new());
        if self.by_depth.len() <= depth {
            self.by_depth.resize_with(depth + 1, Vec::new);
        }
        self.by_depth[depth].push(idx);
        let children = tree
            .children
            .iter()
            .map(|child| self.push_tree(child, depth + 1))
            .collect();
        self.children[idx] = children;
        idx
    }

    fn len(&self) -> usize {
        self.vocab_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn test_config() -> ModelConfig {
        ModelConfig {
            embedding_dim: 4,
            encode_dim: 3,
            hidden_dim: 2,
            classes: 2,
        }
    }

    fn test_vocab() -> Vocabulary {
        let tokens: Vec<String> = ["End", "funcdef", "if", "x", "return_statement"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let vectors = DMatrix::from_fn(4, 5, |r, c| ((r * 5 + c) as f32).sin());
        Vocabulary::from_parts(tokens, vectors)
    }

    fn tree(id: u32, children: Vec<IndexTree>) -> IndexTree {
        IndexTree { id, children }
    }

    fn sample_program() -> IndexForest {
        IndexForest {
            trees: vec![
                tree(1, vec![tree(3, vec![]), tree(4, vec![tree(3, vec![])])]),
                tree(2, vec![tree(3, vec![])]),
                tree(0, vec![]),
                tree(0, vec![]),
            ],
        }
    }

    fn short_program() -> IndexForest {
        IndexForest {
            trees: vec![tree(2, vec![tree(3, vec![])]), tree(0, vec![])],
        }
    }

    #[test]
    fn test_batch_matches_single_encoding() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);

        let a = sample_program();
        let b = short_program();
        let batch = encoder.encode_batch(&[&a, &b]);
        // The short program was padded and reordered internally; its
        // column must still equal a standalone encoding.
        assert_eq!(batch.column(0), encoder.encode_one(&a));
        assert_eq!(batch.column(1), encoder.encode_one(&b));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);

        let a = sample_program();
        let b = short_program();
        let first = encoder.encode_batch(&[&a, &b]);
        let second = encoder.encode_batch(&[&a, &b]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_block_order_changes_embedding() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);

        let forward = sample_program();
        let mut reversed = sample_program();
        reversed.trees.reverse();
        assert_ne!(encoder.encode_one(&forward), encoder.encode_one(&reversed));
    }

    #[test]
    fn test_tree_shape_changes_embedding() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);

        let nested = IndexForest {
            trees: vec![tree(1, vec![tree(3, vec![tree(4, vec![])])])],
        };
        let flat = IndexForest {
            trees: vec![tree(1, vec![tree(3, vec![]), tree(4, vec![])])],
        };
        assert_ne!(encoder.encode_one(&nested), encoder.encode_one(&flat));
    }

    #[test]
    fn test_out_of_range_id_uses_reserved_column() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);

        let stray = IndexForest {
            trees: vec![tree(9999, vec![])],
        };
        let reserved = IndexForest {
            trees: vec![tree(vocab.unknown_id(), vec![])],
        };
        assert_eq!(encoder.encode_one(&stray), encoder.encode_one(&reserved));
    }

    #[test]
    fn test_empty_program_embeds_to_zero() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);

        let empty = IndexForest::default();
        let out = encoder.encode_batch(&[&empty, &short_program()]);
        assert!(out.column(0).iter().all(|&v| v == 0.0));
        assert!(out.column(1).iter().any(|&v| v != 0.0));
    }

    #[test]
    fn test_embedding_width_is_twice_hidden() {
        let weights = ModelWeights::seeded(test_config(), 5);
        let vocab = test_vocab();
        let encoder = Encoder::new(&weights, &vocab);
        let out = encoder.encode_one(&sample_program());
        assert_eq!(out.len(), 4);
    }
}
