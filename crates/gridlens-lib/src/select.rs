use crate::dataset::Dataset;
use crate::error::{AnalysisError, AnalysisResult};
use crate::signal::{CategoricalFilter, TimeSeries};
use log::debug;
use serde::{Deserialize, Serialize};

/// Pull the series for `(price_area, production_group)` out of `dataset`.
///
/// Rows are matched exactly on both keys, stably sorted by start time and gap
/// filled: forward from the nearest earlier value, then backward for a leading gap.
pub fn select_series(
    dataset: &Dataset,
    price_area: &str,
    production_group: &str,
) -> AnalysisResult<TimeSeries> {
    let mut rows: Vec<_> = dataset
        .records
        .iter()
        .filter(|r| r.price_area == price_area && r.production_group == production_group)
        .collect();
    if rows.is_empty() {
        return Err(AnalysisError::no_data());
    }
    rows.sort_by_key(|r| r.start_time);

    let timestamps = rows.iter().map(|r| r.start_time).collect();
    let mut values: Vec<f64> = rows.iter().map(|r| r.value()).collect();
    let filled = fill_gaps(&mut values);
    if values.iter().any(|v| v.is_nan()) {
        // Every value in the selection was missing.
        return Err(AnalysisError::no_data());
    }
    debug!(
        "selected {} rows for {}/{} ({} gap(s) filled)",
        values.len(),
        price_area,
        production_group,
        filled
    );
    Ok(TimeSeries::new(timestamps, values))
}

pub fn select_filtered(dataset: &Dataset, filter: &CategoricalFilter) -> AnalysisResult<TimeSeries> {
    select_series(dataset, &filter.price_area, &filter.production_group)
}

/// One production group's series within a price area.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSeries {
    pub production_group: String,
    pub series: TimeSeries,
}

/// Every production group of `price_area`, in sorted group order.
///
/// Groups whose values are all missing are skipped; an area with no usable group is NoData.
pub fn select_area(dataset: &Dataset, price_area: &str) -> AnalysisResult<Vec<GroupSeries>> {
    let mut groups = Vec::new();
    for group in dataset.production_groups() {
        match select_series(dataset, price_area, &group) {
            Ok(series) => groups.push(GroupSeries {
                production_group: group,
                series,
            }),
            Err(AnalysisError::NoData(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    if groups.is_empty() {
        return Err(AnalysisError::no_data());
    }
    debug!("selected {} group(s) for {}", groups.len(), price_area);
    Ok(groups)
}

/// Forward-fill then back-fill NaNs in place. Returns how many values were filled.
///
/// A slice with no finite value at all is left untouched.
pub fn fill_gaps(values: &mut [f64]) -> usize {
    let mut filled = 0;
    let mut last = None;
    for v in values.iter_mut() {
        if v.is_nan() {
            if let Some(prev) = last {
                *v = prev;
                filled += 1;
            }
        } else {
            last = Some(*v);
        }
    }
    let mut next = None;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            if let Some(after) = next {
                *v = after;
                filled += 1;
            }
        } else {
            next = Some(*v);
        }
    }
    filled
}
