use std::sync::Arc;

use crate::config::{validate_columns, FeatureSchema};
use crate::error::ConfigurationError;

use super::encoding::FeatureMap;

/// Dense feature values tagged with the columns they were projected onto.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Arc<[String]>,
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn new(columns: Arc<[String]>, values: Vec<f32>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when both the column identity and the value count match `expected`.
    pub fn matches(&self, expected: &[String]) -> bool {
        self.values.len() == expected.len() && *self.columns == *expected
    }
}

/// Projects a one-hot feature map onto a fixed, ordered column list.
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    columns: Arc<[String]>,
}

impl FeatureSelector {
    pub fn new(columns: &[String]) -> Result<Self, ConfigurationError> {
        validate_columns(columns)?;
        Ok(Self {
            columns: Arc::from(columns.to_vec()),
        })
    }

    pub fn from_schema(schema: &FeatureSchema) -> Result<Self, ConfigurationError> {
        Self::new(&schema.columns)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns missing from `features` are zero-filled; extra ones are dropped.
    pub fn project(&self, features: &FeatureMap) -> FeatureVector {
        let values = self
            .columns
            .iter()
            .map(|c| features.get(c).copied().unwrap_or(0.0))
            .collect();
        FeatureVector::new(Arc::clone(&self.columns), values)
    }
}
