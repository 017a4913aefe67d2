//! Entry point used by the transport layer: validate, encode, score.

use std::sync::Arc;

use crate::config::FeatureSchema;
use crate::error::{ConfigurationError, Result, ValidationError};
use crate::features::{FeatureEncoder, FeatureSelector, FeatureVector};
use crate::model::{DelayClassifier, TrainedModel};
use crate::types::{FlightDetail, FlightType, PredictResponse, PredictionResult, ValidFlight};

pub struct PredictionService {
    schema: FeatureSchema,
    selector: FeatureSelector,
    encoder: FeatureEncoder,
    classifier: Arc<DelayClassifier>,
}

impl PredictionService {
    /// Fails when the schema is incomplete, or when the classifier already
    /// holds a model trained on different columns or airlines.
    pub fn new(schema: FeatureSchema, classifier: Arc<DelayClassifier>) -> std::result::Result<Self, ConfigurationError> {
        schema.validate()?;
        if let Some(model) = classifier.snapshot() {
            ensure_compatible(&schema, &model)?;
        }
        Ok(Self {
            selector: FeatureSelector::from_schema(&schema)?,
            schema,
            encoder: FeatureEncoder,
            classifier,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn classifier(&self) -> &Arc<DelayClassifier> {
        &self.classifier
    }

    pub fn validate(&self, flight: &FlightDetail) -> std::result::Result<ValidFlight, ValidationError> {
        let month = match u8::try_from(flight.mes) {
            Ok(m @ 1..=12) => m,
            _ => {
                return Err(ValidationError::new(
                    "MES",
                    flight.mes.to_string(),
                    "must be between 1 and 12",
                ))
            }
        };
        if !self.schema.is_known_airline(&flight.opera) {
            return Err(ValidationError::new(
                "OPERA",
                flight.opera.clone(),
                "must be one of the known airlines",
            ));
        }
        let flight_type = FlightType::from_code(&flight.tipovuelo).ok_or_else(|| {
            ValidationError::new("TIPOVUELO", flight.tipovuelo.clone(), "must be either 'N' or 'I'")
        })?;

        Ok(ValidFlight {
            airline: flight.opera.clone(),
            flight_type,
            month,
        })
    }

    /// Validates every record; the first failure rejects the whole batch.
    pub fn validate_all(&self, flights: &[FlightDetail]) -> std::result::Result<Vec<ValidFlight>, ValidationError> {
        if flights.is_empty() {
            return Err(ValidationError::new("flights", "[]", "must contain at least one flight"));
        }
        flights
            .iter()
            .enumerate()
            .map(|(i, f)| self.validate(f).map_err(|e| e.at(i)))
            .collect()
    }

    pub fn features(&self, flight: &ValidFlight) -> FeatureVector {
        self.selector.project(&self.encoder.encode_flight(flight))
    }

    /// One result per submitted flight, in submission order.
    pub fn predict(&self, flights: &[FlightDetail]) -> Result<Vec<PredictionResult>> {
        let valid = self.validate_all(flights)?;
        let rows: Vec<FeatureVector> = valid.iter().map(|f| self.features(f)).collect();
        let results = self.classifier.predict(&rows)?;
        tracing::debug!(
            flights = results.len(),
            delayed = results.iter().filter(|r| r.delayed).count(),
            "batch scored"
        );
        Ok(results)
    }

    pub fn predict_response(&self, flights: &[FlightDetail]) -> Result<PredictResponse> {
        let results = self.predict(flights)?;
        Ok(PredictResponse::from(results.as_slice()))
    }
}

fn ensure_compatible(schema: &FeatureSchema, model: &TrainedModel) -> std::result::Result<(), ConfigurationError> {
    if model.columns() != schema.columns.as_slice() {
        return Err(ConfigurationError::SchemaMismatch {
            model: model.columns().to_vec(),
            configured: schema.columns.clone(),
        });
    }
    if sorted(&model.schema.airlines) != sorted(&schema.airlines) {
        return Err(ConfigurationError::AirlineMismatch {
            model: model.schema.airlines.clone(),
            configured: schema.airlines.clone(),
        });
    }
    if model.schema.version != schema.version {
        tracing::warn!(
            model_version = model.schema.version,
            configured_version = schema.version,
            "schema versions differ but columns and airlines match"
        );
    }
    Ok(())
}

fn sorted(airlines: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = airlines.iter().map(String::as_str).collect();
    out.sort_unstable();
    out
}
