//! CART regression tree
//!
//! Splits are chosen to maximize the reduction in the sum of squared errors.
//! Each split only looks at a random subset of the features when the tree is
//! grown inside a forest.

use crate::error::{ForecastError, Result};
use rand::rngs::StdRng;
use rand::seq::index::sample;

/// Growth limits for a single tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features examined per split
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total squared-error reduction credited to each feature
    impurity_decrease: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeGrower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows selected by `indices` (repeats allowed)
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if indices.is_empty() {
            return Err(ForecastError::InsufficientData(
                "Cannot grow a tree without samples".to_string(),
            ));
        }

        let n_features = x[0].len();
        if n_features == 0 || params.max_features == 0 || params.max_features > n_features {
            return Err(ForecastError::InvalidParameter(format!(
                "max_features {} is invalid for {} features",
                params.max_features, n_features
            )));
        }

        let mut grower = TreeGrower {
            x,
            y,
            params,
            rng,
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; n_features],
        };
        grower.grow(indices);

        Ok(Self {
            nodes: grower.nodes,
            n_features,
            impurity_decrease: grower.impurity_decrease,
        })
    }

    /// Predict a single row
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Impurity-decrease importances normalized to sum to one
    ///
    /// A tree that never split reports all zeros.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.n_features];
        }
        self.impurity_decrease.iter().map(|d| d / total).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(0usize, 0usize)];
        while let Some((index, depth)) = pending.pop() {
            match &self.nodes[index] {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    pending.push((*left, depth + 1));
                    pending.push((*right, depth + 1));
                }
            }
        }
        deepest
    }
}

impl TreeGrower<'_> {
    /// Grow the tree depth-first from an explicit stack
    ///
    /// Nodes are visited in the same pre-order as a recursive descent, so the
    /// feature sampling draws from the rng in a stable order.
    fn grow(&mut self, indices: Vec<usize>) {
        self.nodes.push(Node::Leaf { value: 0.0 });
        let mut pending = vec![(0usize, indices, 0usize)];

        while let Some((index, indices, depth)) = pending.pop() {
            let n = indices.len() as f64;
            let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
                (s + self.y[i], sq + self.y[i] * self.y[i])
            });
            let mean = sum / n;
            let sse = (sum_sq - sum * sum / n).max(0.0);

            let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
            let split = if depth_reached
                || indices.len() < self.params.min_samples_split
                || indices.len() < 2 * self.params.min_samples_leaf
                || sse <= f64::EPSILON
            {
                None
            } else {
                self.best_split(&indices, sse)
            };

            let Some(split) = split else {
                self.nodes[index] = Node::Leaf { value: mean };
                continue;
            };

            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| self.x[i][split.feature] <= split.threshold);

            self.impurity_decrease[split.feature] += split.gain;

            let left = self.nodes.len();
            let right = left + 1;
            self.nodes.push(Node::Leaf { value: mean });
            self.nodes.push(Node::Leaf { value: mean });
            self.nodes[index] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            // Right first so the left subtree is finished before it
            pending.push((right, right_indices, depth + 1));
            pending.push((left, left_indices, depth + 1));
        }
    }

    fn best_split(&mut self, indices: &[usize], parent_sse: f64) -> Option<SplitCandidate> {
        let n_features = self.impurity_decrease.len();
        let mut features = sample(&mut *self.rng, n_features, self.params.max_features).into_vec();
        features.sort_unstable();

        let min_leaf = self.params.min_samples_leaf;
        let total = indices.len();
        let mut best: Option<SplitCandidate> = None;
        let mut order = indices.to_vec();

        for feature in features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let (total_sum, total_sq) = order.iter().fold((0.0, 0.0), |(s, sq), &i| {
                (s + self.y[i], sq + self.y[i] * self.y[i])
            });
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for pos in 0..total - 1 {
                let y = self.y[order[pos]];
                left_sum += y;
                left_sq += y * y;

                let left_n = pos + 1;
                let right_n = total - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let here = self.x[order[pos]][feature];
                let next = self.x[order[pos + 1]][feature];
                if here >= next {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = (left_sq - left_sum * left_sum / left_n as f64).max(0.0);
                let right_sse = (right_sq - right_sum * right_sum / right_n as f64).max(0.0);
                let gain = parent_sse - left_sse - right_sse;

                if gain > best.map_or(f64::EPSILON, |b| b.gain) {
                    let mid = here + (next - here) / 2.0;
                    let threshold = if mid < next { mid } else { here };
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}
