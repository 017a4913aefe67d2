use std::fmt;

use serde::{Deserialize, Serialize};

// ---------- Historical records ----------

/// One row of the historical flight log.
///
/// Field names follow the column headers of the source CSV. Timestamps stay
/// as raw text; [`crate::features::FeatureBuilder`] parses them so a bad
/// value surfaces as a per-row `DataError` instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Scheduled date and time, `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "Fecha-I")]
    pub scheduled_at: String,
    #[serde(rename = "Vlo-I")]
    pub scheduled_flight: String,
    #[serde(rename = "Ori-I")]
    pub scheduled_origin: String,
    #[serde(rename = "Des-I")]
    pub scheduled_destination: String,
    #[serde(rename = "Emp-I")]
    pub scheduled_airline: String,
    /// Operated date and time; absent for flights that have not flown yet.
    #[serde(rename = "Fecha-O", default)]
    pub operated_at: Option<String>,
    #[serde(rename = "Vlo-O", default)]
    pub operated_flight: Option<String>,
    #[serde(rename = "Ori-O", default)]
    pub operated_origin: Option<String>,
    #[serde(rename = "Des-O", default)]
    pub operated_destination: Option<String>,
    #[serde(rename = "Emp-O", default)]
    pub operated_airline: Option<String>,
    #[serde(rename = "DIA")]
    pub day: u32,
    #[serde(rename = "MES")]
    pub month: u32,
    #[serde(rename = "AÑO")]
    pub year: i32,
    #[serde(rename = "DIANOM")]
    pub day_name: String,
    #[serde(rename = "TIPOVUELO")]
    pub flight_type: String,
    #[serde(rename = "OPERA")]
    pub operator: String,
    #[serde(rename = "SIGLAORI")]
    pub origin_city: String,
    #[serde(rename = "SIGLADES")]
    pub destination_city: String,
}

// ---------- Engineered features ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodDay {
    Morning,
    Afternoon,
    Night,
}

impl PeriodDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodDay::Morning => "morning",
            PeriodDay::Afternoon => "afternoon",
            PeriodDay::Night => "night",
        }
    }
}

impl fmt::Display for PeriodDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineeredFeatures {
    pub high_season: bool,
    /// Operated minus scheduled, in minutes. `None` when not yet operated.
    pub min_diff: Option<f64>,
    pub period_day: PeriodDay,
    /// Training label; `None` when `min_diff` is unavailable.
    pub delay: Option<bool>,
}

// ---------- Prediction input/output ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightType {
    #[serde(rename = "N")]
    National,
    #[serde(rename = "I")]
    International,
}

impl FlightType {
    pub fn code(&self) -> &'static str {
        match self {
            FlightType::National => "N",
            FlightType::International => "I",
        }
    }

    /// Strict parse: only the exact codes `N` and `I` are accepted.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "N" => Some(FlightType::National),
            "I" => Some(FlightType::International),
            _ => None,
        }
    }
}

/// Flight details as submitted for scoring. Unvalidated.
///
/// `MES` is kept as a wide integer so out-of-range months reach validation
/// rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightDetail {
    #[serde(rename = "OPERA")]
    pub opera: String,
    #[serde(rename = "TIPOVUELO")]
    pub tipovuelo: String,
    #[serde(rename = "MES")]
    pub mes: i64,
}

impl FlightDetail {
    pub fn new(opera: impl Into<String>, tipovuelo: impl Into<String>, mes: i64) -> Self {
        Self {
            opera: opera.into(),
            tipovuelo: tipovuelo.into(),
            mes,
        }
    }
}

impl From<&FlightRecord> for FlightDetail {
    fn from(record: &FlightRecord) -> Self {
        Self {
            opera: record.operator.clone(),
            tipovuelo: record.flight_type.clone(),
            mes: i64::from(record.month),
        }
    }
}

/// A flight detail that passed the input contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFlight {
    pub airline: String,
    pub flight_type: FlightType,
    pub month: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Probability of the delayed class.
    pub probability: f32,
    pub delayed: bool,
}

impl PredictionResult {
    pub fn label(&self) -> u8 {
        u8::from(self.delayed)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictionRequest {
    pub flights: Vec<FlightDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predict: Vec<u8>,
}

impl From<&[PredictionResult]> for PredictResponse {
    fn from(results: &[PredictionResult]) -> Self {
        Self {
            predict: results.iter().map(PredictionResult::label).collect(),
        }
    }
}
