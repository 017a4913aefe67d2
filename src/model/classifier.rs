use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::FeatureSchema;
use crate::error::{DataError, DelayError, Result, ShapeMismatchError};
use crate::features::FeatureVector;
use crate::store::ModelStore;
use crate::types::PredictionResult;

use super::gbdt;
use super::metrics::ClassificationReport;
use super::train::{balanced_weights, holdout_split, TrainOptions, TrainingReport, TrainingSet};
use super::TrainedModel;

/// Probabilities strictly above this are reported as delayed.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Owns the current [`TrainedModel`] and serves predictions from it.
///
/// Readers clone the `Arc` and score without holding the lock, so a retrain
/// only contends with readers for the instant of the pointer swap. Training
/// runs are serialized by a separate guard that readers never touch.
#[derive(Debug, Default)]
pub struct DelayClassifier {
    current: RwLock<Option<Arc<TrainedModel>>>,
    training: Mutex<()>,
}

impl DelayClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: TrainedModel) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(model))),
            training: Mutex::new(()),
        }
    }

    /// Load from `store` and install the result. On failure the current
    /// model, if any, stays in place.
    pub fn load_from(&self, store: &dyn ModelStore) -> Result<Arc<TrainedModel>> {
        let model = store.load()?;
        tracing::info!(
            trees = model.ensemble.trees.len(),
            schema_version = model.schema.version,
            trained_at = %model.trained_at,
            "model loaded"
        );
        Ok(self.install(model))
    }

    /// Replace the current model wholesale and return the new handle.
    pub fn install(&self, model: TrainedModel) -> Arc<TrainedModel> {
        let model = Arc::new(model);
        *self.current.write() = Some(Arc::clone(&model));
        model
    }

    pub fn snapshot(&self) -> Option<Arc<TrainedModel>> {
        self.current.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// True while a [`train`](Self::train) call holds the training guard.
    pub fn is_training(&self) -> bool {
        self.training.is_locked()
    }

    /// Fit a new model on `set` and swap it in.
    ///
    /// The previous model keeps serving until the fit has fully succeeded;
    /// a failed run leaves it untouched. Concurrent calls run one at a time
    /// in the order they acquire the guard, so the last caller's model wins.
    pub fn train(
        &self,
        set: &TrainingSet,
        schema: &FeatureSchema,
        options: &TrainOptions,
    ) -> Result<TrainingReport> {
        let _guard = self.training.lock();
        schema.validate()?;
        if set.is_empty() {
            return Err(DataError::EmptyDataset.into());
        }
        if set.rows.len() != set.labels.len() {
            return Err(DataError::LengthMismatch {
                features: set.rows.len(),
                labels: set.labels.len(),
            }
            .into());
        }
        for row in &set.rows {
            if !row.matches(&schema.columns) {
                return Err(ShapeMismatchError {
                    expected: schema.columns.clone(),
                    found: row.columns().to_vec(),
                }
                .into());
            }
        }

        let (fit_idx, holdout_idx) = holdout_split(set.len(), options.holdout_fraction, options.seed);
        let x: Vec<Vec<f32>> = fit_idx.iter().map(|&i| set.rows[i].values().to_vec()).collect();
        let y: Vec<bool> = fit_idx.iter().map(|&i| set.labels[i]).collect();
        let (weights, scale_pos_weight) = balanced_weights(&y)?;

        tracing::info!(
            rows = set.len(),
            fit_rows = x.len(),
            holdout_rows = holdout_idx.len(),
            scale_pos_weight,
            "training delay classifier"
        );
        let ensemble = gbdt::fit(&x, &y, &weights, &options.boost);
        let model = TrainedModel::new(schema.clone(), ensemble, scale_pos_weight);

        let holdout = if holdout_idx.is_empty() {
            None
        } else {
            let rows: Vec<FeatureVector> = holdout_idx.iter().map(|&i| set.rows[i].clone()).collect();
            let truth: Vec<bool> = holdout_idx.iter().map(|&i| set.labels[i]).collect();
            let predicted: Vec<bool> = model
                .predict_proba(&rows)?
                .into_iter()
                .map(|p| p > DECISION_THRESHOLD)
                .collect();
            let report = ClassificationReport::new(&truth, &predicted);
            tracing::info!("holdout performance:\n{report}");
            Some(report)
        };

        self.install(model);
        tracing::info!("model trained");

        Ok(TrainingReport {
            rows: set.len(),
            train_rows: fit_idx.len(),
            holdout_rows: holdout_idx.len(),
            scale_pos_weight,
            holdout,
        })
    }

    pub fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f32>> {
        let model = self.snapshot().ok_or(DelayError::ModelNotLoaded)?;
        Ok(model.predict_proba(rows)?)
    }

    pub fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<PredictionResult>> {
        Ok(self
            .predict_proba(rows)?
            .into_iter()
            .map(|probability| PredictionResult {
                probability,
                delayed: probability > DECISION_THRESHOLD,
            })
            .collect())
    }
}
