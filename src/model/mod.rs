//! Delay classifier: tree ensemble, training, evaluation and the trained
//! model artifact.

mod classifier;
pub mod gbdt;
pub mod metrics;
mod train;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FeatureSchema;
use crate::error::ShapeMismatchError;
use crate::features::FeatureVector;

pub use classifier::{DelayClassifier, DECISION_THRESHOLD};
pub use gbdt::{BoostParams, TreeEnsemble};
pub use metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use train::{balanced_weights, holdout_split, TrainOptions, TrainingReport, TrainingSet};

/// Bumped whenever the serialized layout of [`TrainedModel`] changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// A fitted ensemble together with the feature schema it was trained on.
///
/// Never mutated after construction; a retrain produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub format_version: u32,
    pub schema: FeatureSchema,
    pub ensemble: TreeEnsemble,
    pub scale_pos_weight: f32,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    pub fn new(schema: FeatureSchema, ensemble: TreeEnsemble, scale_pos_weight: f32) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            schema,
            ensemble,
            scale_pos_weight,
            trained_at: Utc::now(),
        }
    }

    /// Ordered feature columns this model expects.
    pub fn columns(&self) -> &[String] {
        &self.schema.columns
    }

    /// Structural checks run on every freshly loaded artifact.
    pub fn validate(&self) -> Result<(), String> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {MODEL_FORMAT_VERSION})",
                self.format_version
            ));
        }
        self.schema.validate().map_err(|e| e.to_string())?;
        if self.ensemble.num_features != self.schema.columns.len() {
            return Err(format!(
                "ensemble expects {} features but schema lists {} columns",
                self.ensemble.num_features,
                self.schema.columns.len()
            ));
        }
        self.ensemble.validate()
    }

    pub fn check_signature(&self, row: &FeatureVector) -> Result<(), ShapeMismatchError> {
        if row.matches(self.columns()) {
            Ok(())
        } else {
            Err(ShapeMismatchError {
                expected: self.columns().to_vec(),
                found: row.columns().to_vec(),
            })
        }
    }

    /// Delay probability per row. Every row is checked before any is scored.
    pub fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<f32>, ShapeMismatchError> {
        for row in rows {
            self.check_signature(row)?;
        }
        Ok(rows
            .iter()
            .map(|row| self.ensemble.predict_proba(row.values()))
            .collect())
    }
}
