use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the production dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionRecord {
    pub price_area: String,
    pub production_group: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// `None` for an empty cell.
    #[serde(default)]
    pub quantity_kwh: Option<f64>,
}

impl ProductionRecord {
    /// Quantity as a sample value, with missing cells mapped to NaN.
    pub fn value(&self) -> f64 {
        self.quantity_kwh.unwrap_or(f64::NAN)
    }
}

/// Column names in the order they appear in the source CSV.
pub const COLUMNS: [&str; 5] = [
    "priceArea",
    "productionGroup",
    "startTime",
    "endTime",
    "quantityKwh",
];

/// Fully materialized production table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<ProductionRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ProductionRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_count(&self) -> usize {
        COLUMNS.len()
    }

    pub fn head(&self, n: usize) -> &[ProductionRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Sorted unique price areas.
    pub fn price_areas(&self) -> Vec<String> {
        unique(self.records.iter().map(|r| r.price_area.as_str()))
    }

    /// Sorted unique production groups.
    pub fn production_groups(&self) -> Vec<String> {
        unique(self.records.iter().map(|r| r.production_group.as_str()))
    }
}

fn unique<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(area: &str, group: &str) -> ProductionRecord {
        ProductionRecord {
            price_area: area.into(),
            production_group: group.into(),
            start_time: Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap(),
            end_time: None,
            quantity_kwh: None,
        }
    }

    #[test]
    fn unique_keys_are_sorted() {
        let ds = Dataset::new(vec![
            record("NO2", "wind"),
            record("NO1", "hydro"),
            record("NO2", "hydro"),
        ]);
        assert_eq!(ds.price_areas(), vec!["NO1", "NO2"]);
        assert_eq!(ds.production_groups(), vec!["hydro", "wind"]);
        assert_eq!(ds.head(10).len(), 3);
        assert!(ds.records[0].value().is_nan());
    }
}
