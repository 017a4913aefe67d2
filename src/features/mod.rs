//! Feature engineering: calendar/delay features, one-hot encoding and the
//! fixed column projection consumed by the classifier.

mod builder;
mod encoding;
mod selector;

pub use builder::{
    is_high_season, min_diff, parse_timestamp, period_day, FeatureBuilder,
    DELAY_THRESHOLD_MINUTES, TIMESTAMP_FORMAT,
};
pub use encoding::{column_name, FeatureEncoder, FeatureMap};
pub use selector::{FeatureSelector, FeatureVector};
