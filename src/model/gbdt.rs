//! Deterministic gradient-boosted regression trees for binary classification.
//!
//! Trees are grown depth-first on histogram bins with second-order (Newton)
//! leaf weights under logistic loss. Sample weights scale both gradient and
//! hessian, which is how class balancing enters the fit. No step draws random
//! numbers, so identical inputs always yield an identical ensemble.

use serde::{Deserialize, Serialize};

/// Floor applied to per-row hessians so saturated rows still carry weight.
const MIN_HESSIAN: f32 = 1e-6;
/// Splits must improve the objective by more than this.
const MIN_GAIN: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostParams {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    pub learning_rate: f32,
    pub max_depth: usize,
    /// Minimum hessian sum in each child of a split.
    pub min_child_weight: f32,
    /// L2 penalty on leaf weights.
    pub l2: f32,
    /// Histogram bins per feature.
    pub bins: usize,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.01,
            max_depth: 6,
            min_child_weight: 1.0,
            l2: 1.0,
            bins: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature_index: u16,
        /// Rows with `value < threshold` (or a non-finite value) go left.
        threshold: f32,
        left: u32,
        right: u32,
    },
    Leaf {
        value: f32,
    },
}

/// Flat tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict(&self, features: &[f32]) -> f32 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = features.get(*feature_index as usize).copied().unwrap_or(0.0);
                    let next = if goes_left(v, *threshold) { *left } else { *right };
                    idx = next as usize;
                }
                None => return 0.0,
            }
        }
    }

    fn validate(&self, num_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature_index,
                left,
                right,
                ..
            } = node
            {
                if *feature_index as usize >= num_features {
                    return Err(format!(
                        "node {i} splits on feature {feature_index} but only {num_features} exist"
                    ));
                }
                // Children always come after their parent, which also rules out cycles.
                for child in [*left, *right] {
                    let child = child as usize;
                    if child <= i || child >= self.nodes.len() {
                        return Err(format!("node {i} has invalid child index {child}"));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub num_features: usize,
    pub learning_rate: f32,
    /// Raw score (log-odds) before any tree contributes.
    pub base_score: f32,
    pub trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    pub fn validate(&self) -> Result<(), String> {
        if self.num_features == 0 {
            return Err("ensemble expects zero features".to_string());
        }
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err("non-finite base score or learning rate".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.num_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    pub fn predict_raw(&self, features: &[f32]) -> f32 {
        let mut raw = self.base_score;
        for tree in &self.trees {
            raw += self.learning_rate * tree.predict(features);
        }
        raw
    }

    /// Probability of the positive class.
    pub fn predict_proba(&self, features: &[f32]) -> f32 {
        sigmoid(self.predict_raw(features))
    }
}

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn goes_left(value: f32, threshold: f32) -> bool {
    !value.is_finite() || value < threshold
}

/// Fit an ensemble on row-major `x` with 0/1 labels and per-row weights.
///
/// Callers are responsible for checking that the inputs are non-empty and
/// aligned; this function only asserts it in debug builds.
pub fn fit(x: &[Vec<f32>], y: &[bool], weights: &[f32], params: &BoostParams) -> TreeEnsemble {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), weights.len());
    let n = x.len();
    let d = x.first().map(Vec::len).unwrap_or(0);

    let cuts = FeatureCuts::compute(x, d, params.bins);
    let binned: Vec<Vec<u8>> = x
        .iter()
        .map(|row| (0..d).map(|j| cuts[j].bin_of(row[j])).collect())
        .collect();

    let base_score = weighted_log_odds(y, weights);
    let mut raw = vec![base_score; n];
    let mut grad = vec![0f32; n];
    let mut hess = vec![0f32; n];
    let all_rows: Vec<usize> = (0..n).collect();

    let mut trees = Vec::with_capacity(params.n_estimators);
    for _round in 0..params.n_estimators {
        for i in 0..n {
            let p = sigmoid(raw[i]);
            let target = if y[i] { 1.0 } else { 0.0 };
            grad[i] = (p - target) * weights[i];
            hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN) * weights[i];
        }

        let grower = TreeGrower {
            x,
            binned: &binned,
            cuts: &cuts,
            grad: &grad,
            hess: &hess,
            params,
        };
        let mut nodes = Vec::new();
        grower.grow(&mut nodes, &all_rows, 0);
        let tree = RegressionTree { nodes };

        for i in 0..n {
            raw[i] += params.learning_rate * tree.predict(&x[i]);
        }
        trees.push(tree);
    }

    TreeEnsemble {
        num_features: d,
        learning_rate: params.learning_rate,
        base_score,
        trees,
    }
}

fn weighted_log_odds(y: &[bool], weights: &[f32]) -> f32 {
    let mut pos = 0f64;
    let mut neg = 0f64;
    for (label, w) in y.iter().zip(weights) {
        if *label {
            pos += f64::from(*w);
        } else {
            neg += f64::from(*w);
        }
    }
    if pos <= 0.0 || neg <= 0.0 {
        return 0.0;
    }
    (pos / neg).ln() as f32
}

/// Uniform bin edges for one feature.
#[derive(Debug, Clone)]
struct FeatureCuts {
    min: f32,
    width: f32,
    bins: usize,
}

impl FeatureCuts {
    fn compute(x: &[Vec<f32>], d: usize, bins: usize) -> Vec<Self> {
        let bins = bins.clamp(2, 256);
        let mut mins = vec![f32::INFINITY; d];
        let mut maxs = vec![f32::NEG_INFINITY; d];
        for row in x {
            for (j, &v) in row.iter().take(d).enumerate() {
                if v.is_finite() {
                    mins[j] = mins[j].min(v);
                    maxs[j] = maxs[j].max(v);
                }
            }
        }
        mins.into_iter()
            .zip(maxs)
            .map(|(min, max)| {
                let (min, max) = if min.is_finite() && max.is_finite() {
                    (min, max)
                } else {
                    (0.0, 0.0)
                };
                let span = if max > min { max - min } else { 1.0 };
                FeatureCuts {
                    min,
                    width: span / bins as f32,
                    bins,
                }
            })
            .collect()
    }

    fn bin_of(&self, v: f32) -> u8 {
        if !v.is_finite() {
            return 0;
        }
        let b = ((v - self.min) / self.width).floor();
        b.clamp(0.0, (self.bins - 1) as f32) as u8
    }

    /// Threshold separating bins `..=split_bin` from the rest.
    fn threshold_after(&self, split_bin: usize) -> f32 {
        self.min + (split_bin + 1) as f32 * self.width
    }
}

struct SplitCandidate {
    gain: f64,
    feature_index: usize,
    threshold: f32,
}

struct TreeGrower<'a> {
    x: &'a [Vec<f32>],
    binned: &'a [Vec<u8>],
    cuts: &'a [FeatureCuts],
    grad: &'a [f32],
    hess: &'a [f32],
    params: &'a BoostParams,
}

impl TreeGrower<'_> {
    fn grow(&self, nodes: &mut Vec<Node>, rows: &[usize], depth: usize) -> u32 {
        let (g, h) = self.sums(rows);
        let id = nodes.len() as u32;
        nodes.push(Node::Leaf {
            value: leaf_weight(g, h, self.params.l2),
        });

        let min_child = f64::from(self.params.min_child_weight);
        if depth >= self.params.max_depth || h < 2.0 * min_child {
            return id;
        }
        let Some(split) = self.best_split(rows, g, h) else {
            return id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| goes_left(self.x[i][split.feature_index], split.threshold));
        if left_rows.is_empty() || right_rows.is_empty() {
            return id;
        }

        let left = self.grow(nodes, &left_rows, depth + 1);
        let right = self.grow(nodes, &right_rows, depth + 1);
        nodes[id as usize] = Node::Split {
            feature_index: split.feature_index as u16,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &i| {
            (g + f64::from(self.grad[i]), h + f64::from(self.hess[i]))
        })
    }

    fn best_split(&self, rows: &[usize], g: f64, h: f64) -> Option<SplitCandidate> {
        let l2 = f64::from(self.params.l2);
        let min_child = f64::from(self.params.min_child_weight);
        let parent_score = g * g / (h + l2);
        let mut best: Option<SplitCandidate> = None;

        for (feature_index, cuts) in self.cuts.iter().enumerate() {
            let mut grad_hist = vec![0f64; cuts.bins];
            let mut hess_hist = vec![0f64; cuts.bins];
            for &i in rows {
                let b = self.binned[i][feature_index] as usize;
                grad_hist[b] += f64::from(self.grad[i]);
                hess_hist[b] += f64::from(self.hess[i]);
            }

            let mut gl = 0f64;
            let mut hl = 0f64;
            for split_bin in 0..cuts.bins - 1 {
                gl += grad_hist[split_bin];
                hl += hess_hist[split_bin];
                let gr = g - gl;
                let hr = h - hl;
                if hl < min_child || hr < min_child {
                    continue;
                }
                let gain = gl * gl / (hl + l2) + gr * gr / (hr + l2) - parent_score;
                let improves = match &best {
                    Some(b) => gain > b.gain,
                    None => gain > MIN_GAIN,
                };
                if improves {
                    best = Some(SplitCandidate {
                        gain,
                        feature_index,
                        threshold: cuts.threshold_after(split_bin),
                    });
                }
            }
        }
        best
    }
}

fn leaf_weight(g: f64, h: f64, l2: f32) -> f32 {
    (-g / (h + f64::from(l2))) as f32
}
