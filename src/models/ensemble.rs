//! Gradient-boosted tree ensemble evaluation.
//!
//! Trees are kept the way the training framework serializes them: parallel
//! per-node arrays, with leaf outputs stored in `split_conditions` and the
//! training cover of each node in `sum_hessian`. At load time every tree
//! additionally gets a cover-weighted expected value per node, which the
//! explainer uses as the attribution baseline and for decision-path deltas.

use crate::error::{PipelineError, Result};
use serde::Deserialize;

/// A single regression tree in parallel-array form.
///
/// A node `i` is a leaf when `left_children[i] < 0`; its output then lives
/// in `split_conditions[i]`.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub(crate) left_children: Vec<i32>,
    pub(crate) right_children: Vec<i32>,
    pub(crate) split_indices: Vec<u32>,
    pub(crate) split_conditions: Vec<f64>,
    pub(crate) default_left: Vec<i32>,
    pub(crate) sum_hessian: Vec<f64>,
    /// Cover-weighted mean leaf value below each node; filled at load.
    #[serde(skip)]
    pub(crate) node_values: Vec<f64>,
}

impl Tree {
    fn is_leaf(&self, node: usize) -> bool {
        self.left_children[node] < 0
    }

    /// Validate array consistency and precompute expected values.
    pub(crate) fn finalize(&mut self, tree_index: usize, num_features: usize) -> Result<()> {
        let n = self.left_children.len();
        let widths = [
            self.right_children.len(),
            self.split_indices.len(),
            self.split_conditions.len(),
            self.default_left.len(),
            self.sum_hessian.len(),
        ];
        if n == 0 || widths.iter().any(|&w| w != n) {
            return Err(PipelineError::ModelLoad(format!(
                "tree {tree_index}: inconsistent node arrays"
            )));
        }

        for node in 0..n {
            let left = self.left_children[node];
            let right = self.right_children[node];
            if (left < 0) != (right < 0) {
                return Err(PipelineError::ModelLoad(format!(
                    "tree {tree_index}, node {node}: one-sided leaf"
                )));
            }
            if left >= 0 {
                if left as usize >= n || right as usize >= n {
                    return Err(PipelineError::ModelLoad(format!(
                        "tree {tree_index}, node {node}: child index out of range"
                    )));
                }
                if self.split_indices[node] as usize >= num_features {
                    return Err(PipelineError::ModelLoad(format!(
                        "tree {tree_index}, node {node}: split feature {} outside the {num_features}-feature input",
                        self.split_indices[node]
                    )));
                }
            }
            if !(self.sum_hessian[node] > 0.0) {
                return Err(PipelineError::ModelLoad(format!(
                    "tree {tree_index}, node {node}: non-positive cover"
                )));
            }
        }

        self.node_values = vec![0.0; n];
        let mut visited = vec![false; n];
        self.fill_node_value(0, &mut visited, tree_index)?;
        Ok(())
    }

    fn fill_node_value(
        &mut self,
        node: usize,
        visited: &mut [bool],
        tree_index: usize,
    ) -> Result<f64> {
        if visited[node] {
            return Err(PipelineError::ModelLoad(format!(
                "tree {tree_index}: cycle through node {node}"
            )));
        }
        visited[node] = true;

        let value = if self.is_leaf(node) {
            self.split_conditions[node]
        } else {
            let left = self.left_children[node] as usize;
            let right = self.right_children[node] as usize;
            let left_value = self.fill_node_value(left, visited, tree_index)?;
            let right_value = self.fill_node_value(right, visited, tree_index)?;
            let left_cover = self.sum_hessian[left];
            let right_cover = self.sum_hessian[right];
            (left_value * left_cover + right_value * right_cover) / (left_cover + right_cover)
        };

        self.node_values[node] = value;
        Ok(value)
    }

    /// Next node on the decision path. NaN routes along `default_left`.
    fn descend(&self, node: usize, x: &[f64]) -> usize {
        let value = x[self.split_indices[node] as usize];
        let go_left = if value.is_nan() {
            self.default_left[node] != 0
        } else {
            value < self.split_conditions[node]
        };
        if go_left {
            self.left_children[node] as usize
        } else {
            self.right_children[node] as usize
        }
    }

    /// Leaf output for a feature vector.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            node = self.descend(node, x);
        }
        self.split_conditions[node]
    }

    /// Expected output over the training population.
    pub fn expected_value(&self) -> f64 {
        self.node_values[0]
    }

    /// Walk the decision path, crediting each split's feature with the
    /// change in expected value, and return the leaf output.
    ///
    /// The deltas telescope: the root expected value plus this tree's
    /// credited contributions equals the returned leaf value exactly.
    pub fn path_contributions(&self, x: &[f64], contributions: &mut [f64]) -> f64 {
        let mut node = 0;
        while !self.is_leaf(node) {
            let next = self.descend(node, x);
            contributions[self.split_indices[node] as usize] +=
                self.node_values[next] - self.node_values[node];
            node = next;
        }
        self.split_conditions[node]
    }
}

/// A loaded tree ensemble with its margin-space bias.
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    num_features: usize,
    base_margin: f64,
}

impl TreeEnsemble {
    pub(crate) fn new(mut trees: Vec<Tree>, num_features: usize, base_margin: f64) -> Result<Self> {
        if trees.is_empty() {
            return Err(PipelineError::ModelLoad("model has no trees".to_string()));
        }
        if num_features == 0 {
            return Err(PipelineError::ModelLoad(
                "model declares zero input features".to_string(),
            ));
        }
        for (index, tree) in trees.iter_mut().enumerate() {
            tree.finalize(index, num_features)?;
        }
        Ok(Self {
            trees,
            num_features,
            base_margin,
        })
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Summed margin of all trees for a feature vector.
    ///
    /// The caller guarantees `x.len() == num_features()`.
    pub fn margin(&self, x: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|tree| tree.predict(x)).sum::<f64>()
    }

    /// Expected margin over the training population.
    pub fn expected_margin(&self) -> f64 {
        self.base_margin
            + self
                .trees
                .iter()
                .map(|tree| tree.expected_value())
                .sum::<f64>()
    }

    /// Per-feature decision-path contributions.
    ///
    /// Returns `(baseline, contributions)` with
    /// `baseline + contributions.sum() == margin(x)`.
    pub fn contributions(&self, x: &[f64]) -> (f64, Vec<f64>) {
        let mut contributions = vec![0.0; self.num_features];
        for tree in &self.trees {
            tree.path_contributions(x, &mut contributions);
        }
        (self.expected_margin(), contributions)
    }
}
