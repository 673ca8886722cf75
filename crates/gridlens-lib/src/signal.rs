use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hourly-cadence series selected out of a production dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Observation start times, non-decreasing.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Samples aligned with `timestamps`. NaN marks a missing value.
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        debug_assert_eq!(timestamps.len(), values.len());
        Self { timestamps, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Hours elapsed since the first timestamp, one entry per sample.
    pub fn hours_from_start(&self) -> Vec<f64> {
        hours_from_start(&self.timestamps)
    }

    /// Hours elapsed since `origin`, one entry per sample.
    pub fn hours_since(&self, origin: DateTime<Utc>) -> Vec<f64> {
        hours_since(&self.timestamps, origin)
    }
}

pub fn hours_since(timestamps: &[DateTime<Utc>], origin: DateTime<Utc>) -> Vec<f64> {
    timestamps
        .iter()
        .map(|ts| (*ts - origin).num_seconds() as f64 / 3600.0)
        .collect()
}

pub fn hours_from_start(timestamps: &[DateTime<Utc>]) -> Vec<f64> {
    match timestamps.first() {
        Some(first) => hours_since(timestamps, *first),
        None => Vec::new(),
    }
}

/// The (price area, production group) pair identifying one series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoricalFilter {
    pub price_area: String,
    pub production_group: String,
}

impl CategoricalFilter {
    pub fn new(price_area: impl Into<String>, production_group: impl Into<String>) -> Self {
        Self {
            price_area: price_area.into(),
            production_group: production_group.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hours_from_start_counts_whole_hours() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let timestamps = (0..3).map(|h| start + chrono::Duration::hours(h)).collect();
        let ts = TimeSeries::new(timestamps, vec![1.0, f64::NAN, 3.0]);
        assert_eq!(ts.hours_from_start(), vec![0.0, 1.0, 2.0]);
        assert_eq!(ts.missing_count(), 1);
        assert_eq!(ts.hours_since(start - chrono::Duration::hours(2)), vec![2.0, 3.0, 4.0]);
        assert!(hours_from_start(&[]).is_empty());
    }
}
