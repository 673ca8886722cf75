use crate::dataset::{Dataset, ProductionRecord, COLUMNS};
use crate::error::{AnalysisError, AnalysisResult};
use crate::select::GroupSeries;
use crate::signal::TimeSeries;
use chrono::Datelike;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PREVIEW_ROWS: usize = 10;
pub const ROLLING_WINDOW: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub rows: Vec<ProductionRecord>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub price_areas: Vec<String>,
    pub production_groups: Vec<String>,
}

pub fn preview(dataset: &Dataset, rows: usize) -> Preview {
    Preview {
        rows: dataset.head(rows).to_vec(),
        row_count: dataset.len(),
        column_count: dataset.column_count(),
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        price_areas: dataset.price_areas(),
        production_groups: dataset.production_groups(),
    }
}

/// Calendar month in UTC, written `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of<T: Datelike>(date: &T) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AnalysisError::invalid(format!("Invalid month '{s}', expected YYYY-MM"));
        let (year, month) = s.trim().split_once('-').ok_or_else(bad)?;
        let year: i32 = year.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;
        if !(1..=12).contains(&month) {
            return Err(bad());
        }
        Ok(Self { year, month })
    }
}

/// Inclusive range of months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl MonthRange {
    pub fn new(start: YearMonth, end: YearMonth) -> AnalysisResult<Self> {
        if end < start {
            return Err(AnalysisError::invalid(format!(
                "Month range end {end} is before start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }
}

/// Sorted distinct months covered by `series`.
pub fn months(series: &TimeSeries) -> Vec<YearMonth> {
    let mut out: Vec<YearMonth> = series.timestamps.iter().map(YearMonth::of).collect();
    out.sort();
    out.dedup();
    out
}

pub fn filter_months(series: &TimeSeries, range: &MonthRange) -> TimeSeries {
    let (timestamps, values) = series
        .timestamps
        .iter()
        .zip(&series.values)
        .filter(|(ts, _)| range.contains(YearMonth::of(*ts)))
        .map(|(ts, v)| (*ts, *v))
        .unzip();
    TimeSeries::new(timestamps, values)
}

/// Samples from the first calendar month of `series`.
pub fn first_month(series: &TimeSeries) -> TimeSeries {
    match months(series).first() {
        Some(first) => filter_months(
            series,
            &MonthRange {
                start: *first,
                end: *first,
            },
        ),
        None => series.clone(),
    }
}

/// Trailing mean over up to `window` samples; NaN entries are skipped and a
/// window with no finite sample yields NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let (sum, count) = values[start..=i]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Population z-score. A constant series maps to zeros.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return values.to_vec();
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let std = (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    values
        .iter()
        .map(|v| {
            if v.is_nan() {
                *v
            } else if std > 0.0 {
                (v - mean) / std
            } else {
                0.0
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExploreOptions {
    pub months: Option<MonthRange>,
    /// Apply the trailing rolling mean.
    pub smooth: bool,
    /// Z-score after smoothing.
    pub standardize: bool,
}

/// Prepare a selected series for the line-chart explorer.
pub fn explore(series: &TimeSeries, opts: &ExploreOptions) -> AnalysisResult<TimeSeries> {
    let mut out = match &opts.months {
        Some(range) => filter_months(series, range),
        None => series.clone(),
    };
    if out.is_empty() {
        return Err(AnalysisError::no_data());
    }
    if opts.smooth {
        out.values = rolling_mean(&out.values, ROLLING_WINDOW);
    }
    if opts.standardize {
        out.values = zscore(&out.values);
    }
    debug!(
        "explore: {} samples smooth={} standardize={}",
        out.len(),
        opts.smooth,
        opts.standardize
    );
    Ok(out)
}

/// Run [`explore`] on every group. Each group is smoothed and standardized on its own;
/// groups with no samples in the month range are dropped.
pub fn explore_groups(
    groups: &[GroupSeries],
    opts: &ExploreOptions,
) -> AnalysisResult<Vec<GroupSeries>> {
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        match explore(&group.series, opts) {
            Ok(series) => out.push(GroupSeries {
                production_group: group.production_group.clone(),
                series,
            }),
            Err(AnalysisError::NoData(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    if out.is_empty() {
        return Err(AnalysisError::no_data());
    }
    Ok(out)
}

/// One row of the first-month table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirstMonthSummary {
    pub production_group: String,
    pub month: YearMonth,
    pub samples: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// The month's values, for a sparkline.
    pub values: Vec<f64>,
}

/// First calendar month of each group, one row per group that has data.
pub fn first_month_table(groups: &[GroupSeries]) -> Vec<FirstMonthSummary> {
    groups
        .iter()
        .filter_map(|group| {
            let month = *months(&group.series).first()?;
            let values = first_month(&group.series).values;
            let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
            if present.is_empty() {
                return None;
            }
            Some(FirstMonthSummary {
                production_group: group.production_group.clone(),
                month,
                samples: values.len(),
                mean: present.iter().sum::<f64>() / present.len() as f64,
                min: present.iter().copied().fold(f64::INFINITY, f64::min),
                max: present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                values,
            })
        })
        .collect()
}
