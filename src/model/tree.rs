//! CART decision tree for binary classification
//!
//! Nodes live in a flat arena; internal nodes send a row left when
//! `row[feature] <= threshold`. Leaves store the positive-class fraction of
//! the training samples that reached them.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{PipelineError, Result};
use crate::features::N_FEATURES;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn per split before the search may stop
    pub max_features: usize,
}

/// One arena node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        probability: f64,
        samples: usize,
    },
}

/// A fitted classification tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

/// Gini impurity of a node with `positives` out of `n` samples
fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Search for the split with the lowest weighted Gini impurity
///
/// Features are visited in random order. Once `max_features` features have
/// been examined the search stops, unless no valid split has been found
/// yet, in which case it continues through the remaining features.
fn best_split(
    x: &[[f64; N_FEATURES]],
    y: &[bool],
    indices: &[usize],
    positives: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<SplitCandidate> {
    let mut features: SmallVec<[usize; N_FEATURES]> = (0..N_FEATURES).collect();
    features.shuffle(rng);

    let n = indices.len();
    let mut sorted = indices.to_vec();
    let mut best: Option<SplitCandidate> = None;

    for (visited, &feature) in features.iter().enumerate() {
        if visited >= params.max_features && best.is_some() {
            break;
        }

        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_pos = 0;
        for k in 0..n - 1 {
            if y[sorted[k]] {
                left_pos += 1;
            }
            let current = x[sorted[k]][feature];
            let next = x[sorted[k + 1]][feature];
            if next <= current {
                continue;
            }

            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < params.min_samples_leaf || right_n < params.min_samples_leaf {
                continue;
            }

            let impurity = (left_n as f64 * gini(left_pos, left_n)
                + right_n as f64 * gini(positives - left_pos, right_n))
                / n as f64;

            if best.is_none_or(|b| impurity < b.impurity) {
                let mut threshold = current / 2.0 + next / 2.0;
                if threshold >= next {
                    threshold = current;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `sample` (duplicates allowed)
    #[must_use]
    pub fn fit(
        x: &[[f64; N_FEATURES]],
        y: &[bool],
        sample: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let placeholder = || Node::Leaf {
            probability: 0.0,
            samples: 0,
        };
        let mut nodes = vec![placeholder()];
        let mut stack = vec![(0usize, sample.to_vec(), 0usize)];

        while let Some((node_id, indices, depth)) = stack.pop() {
            let n = indices.len();
            let positives = indices.iter().filter(|&&i| y[i]).count();

            let splittable = positives > 0
                && positives < n
                && n >= params.min_samples_split
                && params.max_depth.is_none_or(|max| depth < max);

            let split = if splittable {
                best_split(x, y, &indices, positives, params, rng)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[node_id] = Node::Leaf {
                    probability: if n == 0 { 0.0 } else { positives as f64 / n as f64 },
                    samples: n,
                };
                continue;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[i][split.feature] <= split.threshold);

            let left = nodes.len();
            let right = left + 1;
            nodes.push(placeholder());
            nodes.push(placeholder());
            nodes[node_id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };

            stack.push((right, right_rows, depth + 1));
            stack.push((left, left_rows, depth + 1));
        }

        Self { nodes }
    }

    /// Positive-class fraction of the leaf the row falls into
    #[must_use]
    pub fn predict_proba(&self, row: &[f64; N_FEATURES]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { probability, .. } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Number of leaves
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Check that a deserialized tree is a well-formed arena
    ///
    /// Children must point forward, which also rules out cycles.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(PipelineError::SchemaDrift("tree has no nodes".into()));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let in_range = |child: usize| child > idx && child < self.nodes.len();
                    if *feature >= N_FEATURES || !threshold.is_finite() || !in_range(*left) || !in_range(*right) {
                        return Err(PipelineError::SchemaDrift(format!(
                            "tree node {idx} is malformed"
                        )));
                    }
                }
                Node::Leaf { probability, .. } => {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(PipelineError::SchemaDrift(format!(
                            "tree leaf {idx} has probability {probability}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
