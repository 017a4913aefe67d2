use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::DataError;
use crate::types::{EngineeredFeatures, FlightRecord, PeriodDay};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flights operated more than this many minutes late count as delayed.
pub const DELAY_THRESHOLD_MINUTES: f64 = 15.0;

/// Inclusive `(month, day)` windows that do not cross a year boundary.
const HIGH_SEASON_WINDOWS: [((u32, u32), (u32, u32)); 2] = [((7, 15), (7, 31)), ((9, 11), (9, 30))];

/// Derives calendar and delay features from a raw flight record.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    threshold_minutes: f64,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self {
            threshold_minutes: DELAY_THRESHOLD_MINUTES,
        }
    }
}

impl FeatureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(&self, record: &FlightRecord) -> Result<EngineeredFeatures, DataError> {
        let scheduled = parse_timestamp("Fecha-I", &record.scheduled_at)?;
        let min_diff = match record.operated_at.as_deref() {
            Some(raw) => Some(min_diff(scheduled, parse_timestamp("Fecha-O", raw)?)),
            None => None,
        };

        Ok(EngineeredFeatures {
            high_season: is_high_season(scheduled.date()),
            min_diff,
            period_day: period_day(scheduled),
            delay: min_diff.map(|m| self.is_delayed(m)),
        })
    }

    /// One result per input record, in input order.
    pub fn build_all(&self, records: &[FlightRecord]) -> Vec<Result<EngineeredFeatures, DataError>> {
        records.iter().map(|r| self.build(r)).collect()
    }

    /// Delay label for a record; fails when it has not been operated.
    pub fn label(&self, record: &FlightRecord) -> Result<bool, DataError> {
        self.build(record)?.delay.ok_or(DataError::MissingLabel)
    }

    pub fn is_delayed(&self, min_diff: f64) -> bool {
        min_diff > self.threshold_minutes
    }
}

pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<NaiveDateTime, DataError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(|e| DataError::Timestamp {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Signed minutes from `scheduled` to `operated`.
pub fn min_diff(scheduled: NaiveDateTime, operated: NaiveDateTime) -> f64 {
    (operated - scheduled).num_seconds() as f64 / 60.0
}

/// Dec 15 – Mar 3 wraps the new year, so it is checked as two halves.
pub fn is_high_season(date: NaiveDate) -> bool {
    let md = (date.month(), date.day());
    if md >= (12, 15) || md <= (3, 3) {
        return true;
    }
    HIGH_SEASON_WINDOWS
        .iter()
        .any(|(start, end)| md >= *start && md <= *end)
}

pub fn period_day(at: NaiveDateTime) -> PeriodDay {
    match at.hour() {
        5..=11 => PeriodDay::Morning,
        12..=18 => PeriodDay::Afternoon,
        _ => PeriodDay::Night,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp("test", raw).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(scheduled: &str, operated: Option<&str>) -> FlightRecord {
        FlightRecord {
            scheduled_at: scheduled.to_string(),
            scheduled_flight: "226".into(),
            scheduled_origin: "SCEL".into(),
            scheduled_destination: "KMIA".into(),
            scheduled_airline: "AAL".into(),
            operated_at: operated.map(str::to_string),
            operated_flight: Some("226".into()),
            operated_origin: Some("SCEL".into()),
            operated_destination: Some("KMIA".into()),
            operated_airline: Some("AAL".into()),
            day: 1,
            month: 1,
            year: 2017,
            day_name: "Domingo".into(),
            flight_type: "I".into(),
            operator: "American Airlines".into(),
            origin_city: "Santiago".into(),
            destination_city: "Miami".into(),
        }
    }

    #[test]
    fn min_diff_is_signed_and_exact() {
        assert_eq!(min_diff(ts("2017-01-01 23:30:00"), ts("2017-01-01 23:33:00")), 3.0);
        assert_eq!(min_diff(ts("2017-01-01 10:00:00"), ts("2017-01-01 09:52:00")), -8.0);
        assert_eq!(min_diff(ts("2017-01-01 23:50:00"), ts("2017-01-02 00:10:00")), 20.0);
        assert_eq!(min_diff(ts("2017-01-01 10:00:00"), ts("2017-01-01 10:00:30")), 0.5);
    }

    #[test]
    fn high_season_boundaries() {
        assert!(!is_high_season(date(2017, 12, 14)));
        assert!(is_high_season(date(2017, 12, 15)));
        assert!(is_high_season(date(2017, 12, 31)));
        assert!(is_high_season(date(2018, 1, 1)));
        assert!(is_high_season(date(2017, 3, 3)));
        assert!(!is_high_season(date(2017, 3, 4)));

        assert!(!is_high_season(date(2017, 7, 14)));
        assert!(is_high_season(date(2017, 7, 15)));
        assert!(is_high_season(date(2017, 7, 31)));
        assert!(!is_high_season(date(2017, 8, 1)));

        assert!(!is_high_season(date(2017, 9, 10)));
        assert!(is_high_season(date(2017, 9, 11)));
        assert!(is_high_season(date(2017, 9, 30)));
        assert!(!is_high_season(date(2017, 10, 1)));

        assert!(!is_high_season(date(2017, 5, 20)));
    }

    #[test]
    fn period_day_boundaries_are_half_open() {
        assert_eq!(period_day(ts("2017-01-01 04:59:00")), PeriodDay::Night);
        assert_eq!(period_day(ts("2017-01-01 05:00:00")), PeriodDay::Morning);
        assert_eq!(period_day(ts("2017-01-01 11:59:00")), PeriodDay::Morning);
        assert_eq!(period_day(ts("2017-01-01 12:00:00")), PeriodDay::Afternoon);
        assert_eq!(period_day(ts("2017-01-01 18:59:00")), PeriodDay::Afternoon);
        assert_eq!(period_day(ts("2017-01-01 19:00:00")), PeriodDay::Night);
        assert_eq!(period_day(ts("2017-01-01 00:00:00")), PeriodDay::Night);
    }

    #[test]
    fn delay_threshold_is_strict() {
        let builder = FeatureBuilder::new();
        let on_limit = builder
            .build(&record("2017-01-01 10:00:00", Some("2017-01-01 10:15:00")))
            .unwrap();
        assert_eq!(on_limit.min_diff, Some(15.0));
        assert_eq!(on_limit.delay, Some(false));

        let late = builder
            .build(&record("2017-01-01 10:00:00", Some("2017-01-01 10:16:00")))
            .unwrap();
        assert_eq!(late.delay, Some(true));

        let early = builder
            .build(&record("2017-01-01 10:00:00", Some("2017-01-01 09:40:00")))
            .unwrap();
        assert_eq!(early.min_diff, Some(-20.0));
        assert_eq!(early.delay, Some(false));
    }

    #[test]
    fn missing_operated_time_leaves_label_empty() {
        let builder = FeatureBuilder::new();
        let r = record("2017-07-20 13:00:00", None);
        let features = builder.build(&r).unwrap();
        assert_eq!(features.min_diff, None);
        assert_eq!(features.delay, None);
        assert!(features.high_season);
        assert_eq!(features.period_day, PeriodDay::Afternoon);
        assert_eq!(builder.label(&r), Err(DataError::MissingLabel));
    }

    #[test]
    fn malformed_timestamps_fail_per_row() {
        let builder = FeatureBuilder::new();
        let records = vec![
            record("2017-01-01 10:00:00", Some("2017-01-01 10:20:00")),
            record("01/01/2017 10:00", Some("2017-01-01 10:20:00")),
            record("2017-01-01 10:00:00", Some("not a date")),
        ];
        let results = builder.build_all(&records);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(
            &results[1],
            Err(DataError::Timestamp { field: "Fecha-I", .. })
        ));
        assert!(matches!(
            &results[2],
            Err(DataError::Timestamp { field: "Fecha-O", .. })
        ));
    }

    #[test]
    fn results_do_not_depend_on_row_order() {
        let builder = FeatureBuilder::new();
        let a = record("2017-03-03 23:00:00", Some("2017-03-03 23:30:00"));
        let b = record("2017-06-10 08:00:00", Some("2017-06-10 08:05:00"));
        let forward = builder.build_all(&[a.clone(), b.clone()]);
        let backward = builder.build_all(&[b, a]);
        assert_eq!(forward[0], backward[1]);
        assert_eq!(forward[1], backward[0]);
    }
}
