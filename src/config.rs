use std::{collections::HashSet, env, fs, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Columns ranked top-10 by importance during model development.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 10] = [
    "OPERA_Latin American Wings",
    "MES_7",
    "MES_10",
    "OPERA_Grupo LATAM",
    "MES_12",
    "TIPOVUELO_I",
    "MES_4",
    "MES_11",
    "OPERA_Sky Airline",
    "OPERA_Copa Air",
];

/// Airlines present in the historical data.
pub const DEFAULT_AIRLINES: [&str; 23] = [
    "Aerolineas Argentinas",
    "Aeromexico",
    "Air Canada",
    "Air France",
    "Alitalia",
    "American Airlines",
    "Austral",
    "Avianca",
    "British Airways",
    "Copa Air",
    "Delta Air",
    "Gol Trans",
    "Grupo LATAM",
    "Iberia",
    "JetSmart SPA",
    "K.L.M.",
    "Lacsa",
    "Latin American Wings",
    "Oceanair Linhas Aereas",
    "Plus Ultra Lineas Aereas",
    "Qantas Airways",
    "Sky Airline",
    "United Airlines",
];

pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

/// Versioned feature configuration: the ordered model columns and the airline
/// enumeration accepted at the service boundary.
///
/// A copy travels inside every trained model, so a retrain that changes the
/// columns changes both together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<String>,
    pub airlines: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            version: DEFAULT_SCHEMA_VERSION,
            columns: DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            airlines: DEFAULT_AIRLINES.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl FeatureSchema {
    /// Load a schema from a JSON file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Self = serde_json::from_str(&data).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_columns(&self.columns)?;
        if self.airlines.is_empty() {
            return Err(ConfigurationError::EmptyAirlines);
        }
        Ok(())
    }

    pub fn is_known_airline(&self, airline: &str) -> bool {
        self.airlines.iter().any(|a| a == airline)
    }
}

pub(crate) fn validate_columns(columns: &[String]) -> Result<(), ConfigurationError> {
    if columns.is_empty() {
        return Err(ConfigurationError::EmptyColumns);
    }
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(ConfigurationError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Local model artifact.
    pub model_path: PathBuf,
    /// Secondary artifact consulted when `model_path` does not exist.
    pub fallback_model_path: Option<PathBuf>,
    /// Optional JSON feature schema; built-in defaults otherwise.
    pub schema_path: Option<PathBuf>,
    pub port: u16,
    pub store_retry_attempts: usize,
    pub json_logs: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.json"),
            fallback_model_path: None,
            schema_path: None,
            port: 8080,
            store_retry_attempts: 3,
            json_logs: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let defaults = Self::default();
        Ok(Self {
            model_path: env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            fallback_model_path: env::var("FALLBACK_MODEL_PATH").ok().map(PathBuf::from),
            schema_path: env::var("SCHEMA_PATH").ok().map(PathBuf::from),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            store_retry_attempts: parse_var("STORE_RETRY_ATTEMPTS")?
                .unwrap_or(defaults.store_retry_attempts),
            json_logs: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        })
    }

    /// The configured schema file, or the built-in schema.
    pub fn feature_schema(&self) -> Result<FeatureSchema, ConfigurationError> {
        match &self.schema_path {
            Some(path) => FeatureSchema::load(path),
            None => Ok(FeatureSchema::default()),
        }
    }
}

fn parse_var<T>(var: &'static str) -> Result<Option<T>, ConfigurationError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigurationError::Env {
                var,
                reason: format!("{raw:?}: {e}"),
            }),
        Err(_) => Ok(None),
    }
}
