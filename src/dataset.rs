//! Historical flight data: CSV loading and training-set construction.

use std::{fs::File, io::Read, path::Path};

use serde::Serialize;

use crate::error::DataError;
use crate::features::{FeatureBuilder, FeatureEncoder, FeatureSelector};
use crate::model::TrainingSet;
use crate::types::FlightRecord;

/// How many dropped rows are echoed to the log.
const LOGGED_ROW_ERRORS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based data row, not counting the header.
    pub row: usize,
    pub error: String,
}

/// Rows seen versus rows that made it into the training set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSummary {
    pub processed: usize,
    pub kept: usize,
    pub dropped: usize,
    pub errors: Vec<RowError>,
}

/// Parse CSV data with a header row into one result per data row.
pub fn read_records<R: Read>(reader: R) -> Vec<Result<FlightRecord, DataError>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);
    rdr.deserialize::<FlightRecord>()
        .map(|row| row.map_err(|e| DataError::Malformed(e.to_string())))
        .collect()
}

pub fn load_records(path: &Path) -> std::io::Result<Vec<Result<FlightRecord, DataError>>> {
    let file = File::open(path)?;
    let records = read_records(file);
    tracing::info!(path = %path.display(), rows = records.len(), "historical data read");
    Ok(records)
}

/// Label and encode every record; rows that fail any step are dropped and
/// reported in the summary.
pub fn build_training_set<I>(
    records: I,
    builder: &FeatureBuilder,
    selector: &FeatureSelector,
) -> (TrainingSet, RowSummary)
where
    I: IntoIterator<Item = Result<FlightRecord, DataError>>,
{
    let encoder = FeatureEncoder;
    let mut set = TrainingSet::default();
    let mut summary = RowSummary::default();

    for (i, record) in records.into_iter().enumerate() {
        summary.processed += 1;
        let labelled = record.and_then(|r| builder.label(&r).map(|delayed| (r, delayed)));
        match labelled {
            Ok((record, delayed)) => {
                set.push(selector.project(&encoder.encode_record(&record)), delayed);
                summary.kept += 1;
            }
            Err(e) => {
                summary.dropped += 1;
                summary.errors.push(RowError {
                    row: i + 1,
                    error: e.to_string(),
                });
            }
        }
    }

    if summary.dropped > 0 {
        for e in summary.errors.iter().take(LOGGED_ROW_ERRORS) {
            tracing::warn!(row = e.row, error = %e.error, "dropped training row");
        }
    }
    tracing::info!(
        processed = summary.processed,
        kept = summary.kept,
        dropped = summary.dropped,
        positives = set.positives(),
        "training set built"
    );
    (set, summary)
}
