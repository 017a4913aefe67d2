//! Flight delay prediction: feature engineering over historical flight
//! records, a class-balanced gradient-boosted classifier, and a validating
//! prediction service with an HTTP front end.

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod types;

pub use config::{FeatureSchema, ServiceConfig};
pub use error::{DelayError, Result};
pub use features::{FeatureBuilder, FeatureEncoder, FeatureSelector, FeatureVector};
pub use model::{DelayClassifier, TrainOptions, TrainedModel, TrainingReport, TrainingSet};
pub use service::PredictionService;
pub use store::{FileModelStore, LayeredModelStore, MemoryModelStore, ModelStore, RetryPolicy, RetryingStore};
pub use types::{FlightDetail, FlightRecord, PredictResponse, PredictionResult};
