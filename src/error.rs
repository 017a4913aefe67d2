//! Error taxonomy for the delay pipeline.
//!
//! Each failure class gets its own type so callers can react to it without
//! string matching. [`DelayError`] gathers them for APIs that can fail in more
//! than one way.

use std::path::PathBuf;

use thiserror::Error;

/// A flight-detail field that failed the input contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}invalid {field} {value:?}: {reason}", location = .index.map(|i| format!("flight #{i}: ")).unwrap_or_default())]
pub struct ValidationError {
    /// Position of the record inside a submitted batch, when known.
    pub index: Option<usize>,
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            index: None,
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Attach the batch position of the offending record.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

/// Malformed historical data. Row-droppable during training.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("unparsable {field} timestamp {value:?}: {reason}")]
    Timestamp {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("malformed row: {0}")]
    Malformed(String),

    #[error("record has no operated timestamp; delay label unavailable")]
    MissingLabel,

    #[error("training set is empty")]
    EmptyDataset,

    #[error("training labels contain no {0} flights")]
    SingleClass(&'static str),

    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
}

/// A feature vector whose columns differ from the model signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("feature columns {found:?} do not match model signature {expected:?}")]
pub struct ShapeMismatchError {
    pub expected: Vec<String>,
    pub found: Vec<String>,
}

/// Fixed configuration data is missing or inconsistent. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("feature column list is empty")]
    EmptyColumns,

    #[error("feature column {0:?} is listed more than once")]
    DuplicateColumn(String),

    #[error("known airline enumeration is empty")]
    EmptyAirlines,

    #[error("model was trained on columns {model:?} but service is configured with {configured:?}")]
    SchemaMismatch {
        model: Vec<String>,
        configured: Vec<String>,
    },

    #[error("model knows airlines {model:?} but service is configured with {configured:?}")]
    AirlineMismatch {
        model: Vec<String>,
        configured: Vec<String>,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },
}

/// Model artifact could not be loaded or saved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no model artifact at {location}")]
    NotFound { location: String },

    #[error("i/o error on {location}: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },

    #[error("model artifact at {location} is corrupt: {reason}")]
    Corrupt { location: String, reason: String },

    #[error("model store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io { .. } | StoreError::Unavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum DelayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    ShapeMismatch(#[from] ShapeMismatchError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no trained model is loaded")]
    ModelNotLoaded,
}

pub type Result<T> = std::result::Result<T, DelayError>;
