//! Least-squares gradient boosting over depth-limited regression trees.
//!
//! With squared loss the negative gradient is the residual `y - F(x)`, so each
//! stage fits a tree to the current residuals and the ensemble moves
//! `learning_rate` of the way along it. Splits are exact: every distinct
//! threshold of every feature is scored by variance reduction.

use serde::{Deserialize, Serialize};

use crate::{EstimatorError, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    pub learning_rate: f64,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            n_estimators: 100,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Flat tree; node 0 is the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split { feature, threshold, left, right } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// `features` is column-major: `features[f][i]` is feature `f` of row `i`.
    fn fit(features: &[Vec<f64>], residuals: &[f64], params: &GbdtParams) -> Self {
        let mut nodes = Vec::new();
        let rows: Vec<usize> = (0..residuals.len()).collect();
        grow(&mut nodes, features, residuals, rows, 0, params);
        Self { nodes }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn grow(
    nodes: &mut Vec<Node>,
    features: &[Vec<f64>],
    residuals: &[f64],
    rows: Vec<usize>,
    depth: usize,
    params: &GbdtParams,
) -> usize {
    let id = nodes.len();
    let mean = rows.iter().map(|&i| residuals[i]).sum::<f64>() / rows.len() as f64;
    nodes.push(Node::Leaf { value: mean });

    if depth >= params.max_depth || rows.len() < params.min_samples_split.max(2) {
        return id;
    }
    let Some(split) = best_split(features, residuals, &rows, params.min_samples_leaf.max(1)) else {
        return id;
    };

    let column = &features[split.feature];
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.into_iter().partition(|&i| column[i] <= split.threshold);

    let left = grow(nodes, features, residuals, left_rows, depth + 1, params);
    let right = grow(nodes, features, residuals, right_rows, depth + 1, params);
    nodes[id] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    id
}

fn best_split(
    features: &[Vec<f64>],
    residuals: &[f64],
    rows: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&i| residuals[i]).sum();
    let parent_score = total * total / n as f64;

    let mut best: Option<SplitCandidate> = None;
    let mut order = rows.to_vec();

    for (f, column) in features.iter().enumerate() {
        order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += residuals[order[k]];
            let (x, next) = (column[order[k]], column[order[k + 1]]);
            if x == next {
                continue;
            }
            let (n_left, n_right) = (k + 1, n - k - 1);
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64
                + right_sum * right_sum / n_right as f64
                - parent_score;

            if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                best = Some(SplitCandidate {
                    feature: f,
                    threshold: x + (next - x) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: GbdtParams,
    init: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingRegressor {
    pub fn fit(features: &[Vec<f64>], target: &[f64], params: GbdtParams) -> Result<Self> {
        let n_rows = target.len();
        if n_rows == 0 {
            return Err(EstimatorError::EmptyDataset);
        }
        for (f, column) in features.iter().enumerate() {
            if column.len() != n_rows {
                return Err(EstimatorError::LengthMismatch {
                    expected: n_rows,
                    actual: column.len(),
                });
            }
            if column.iter().any(|v| !v.is_finite()) {
                return Err(EstimatorError::NonFinite(format!("feature #{f}")));
            }
        }
        if target.iter().any(|y| !y.is_finite()) {
            return Err(EstimatorError::NonFinite("target".into()));
        }

        let init = target.iter().sum::<f64>() / n_rows as f64;
        let mut current = vec![init; n_rows];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = target.iter().zip(&current).map(|(y, p)| y - p).collect();
            let tree = RegressionTree::fit(features, &residuals, &params);

            let mut row = vec![0.0; features.len()];
            for (i, pred) in current.iter_mut().enumerate() {
                for (f, column) in features.iter().enumerate() {
                    row[f] = column[i];
                }
                *pred += params.learning_rate * tree.predict_row(&row);
            }
            trees.push(tree);
        }

        Ok(Self {
            params,
            init,
            n_features: features.len(),
            trees,
        })
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(EstimatorError::LengthMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(self
            .trees
            .iter()
            .fold(self.init, |acc, t| acc + self.params.learning_rate * t.predict_row(row)))
    }
}
