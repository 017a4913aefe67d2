use std::collections::BTreeMap;

use crate::types::{FlightRecord, ValidFlight};

pub const AIRLINE_PREFIX: &str = "OPERA";
pub const FLIGHT_TYPE_PREFIX: &str = "TIPOVUELO";
pub const MONTH_PREFIX: &str = "MES";

/// Sparse one-hot encoding keyed by column name. Absent columns are zero.
pub type FeatureMap = BTreeMap<String, f32>;

/// Column name for a one-hot indicator, e.g. `OPERA_Grupo LATAM` or `MES_7`.
pub fn column_name(prefix: &str, value: impl std::fmt::Display) -> String {
    format!("{prefix}_{value}")
}

/// One-hot encodes the categorical fields a flight is scored on.
///
/// Every value produces a column, known or not; whether the model cares is
/// the selector's business.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn encode(&self, airline: &str, flight_type: &str, month: u32) -> FeatureMap {
        let mut map = FeatureMap::new();
        map.insert(column_name(AIRLINE_PREFIX, airline), 1.0);
        map.insert(column_name(FLIGHT_TYPE_PREFIX, flight_type), 1.0);
        map.insert(column_name(MONTH_PREFIX, month), 1.0);
        map
    }

    pub fn encode_flight(&self, flight: &ValidFlight) -> FeatureMap {
        self.encode(&flight.airline, flight.flight_type.code(), u32::from(flight.month))
    }

    pub fn encode_record(&self, record: &FlightRecord) -> FeatureMap {
        self.encode(&record.operator, &record.flight_type, record.month)
    }
}
