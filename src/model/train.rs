use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::features::FeatureVector;

use super::gbdt::BoostParams;
use super::metrics::ClassificationReport;

/// Training configuration for the delay classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOptions {
    pub boost: BoostParams,
    /// Share of rows held out for the evaluation report. `0.0` fits on everything.
    pub holdout_fraction: f64,
    /// Seed for the holdout shuffle.
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            boost: BoostParams::default(),
            holdout_fraction: 0.33,
            seed: 42,
        }
    }
}

/// Feature rows with their delay labels.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub rows: Vec<FeatureVector>,
    pub labels: Vec<bool>,
}

impl TrainingSet {
    pub fn new(rows: Vec<FeatureVector>, labels: Vec<bool>) -> Result<Self, DataError> {
        if rows.len() != labels.len() {
            return Err(DataError::LengthMismatch {
                features: rows.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { rows, labels })
    }

    pub fn push(&mut self, row: FeatureVector, label: bool) {
        self.rows.push(row);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|l| **l).count()
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub holdout_rows: usize,
    /// Weight applied to each delayed example.
    pub scale_pos_weight: f32,
    /// Evaluation on the holdout rows, when any were held out.
    pub holdout: Option<ClassificationReport>,
}

/// Sample weights that balance the classes: delayed rows weigh
/// `count(on_time) / count(delayed)`, on-time rows weigh 1.
pub fn balanced_weights(labels: &[bool]) -> Result<(Vec<f32>, f32), DataError> {
    if labels.is_empty() {
        return Err(DataError::EmptyDataset);
    }
    let positives = labels.iter().filter(|l| **l).count();
    let negatives = labels.len() - positives;
    if positives == 0 {
        return Err(DataError::SingleClass("delayed"));
    }
    if negatives == 0 {
        return Err(DataError::SingleClass("on-time"));
    }
    let scale = negatives as f32 / positives as f32;
    let weights = labels
        .iter()
        .map(|&delayed| if delayed { scale } else { 1.0 })
        .collect();
    Ok((weights, scale))
}

/// Seeded shuffle split into `(fit, holdout)` row indices.
///
/// The holdout size is `ceil(n * fraction)`, capped so at least one row is
/// left to fit on.
pub fn holdout_split(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n == 0 || fraction <= 0.0 {
        return (indices, Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let holdout = ((n as f64 * fraction.min(1.0)).ceil() as usize).min(n - 1);
    let fit = indices.split_off(holdout);
    (fit, indices)
}
