use crate::error::{AnalysisError, AnalysisResult};
use crate::signal::TimeSeries;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIOD: usize = 24;
pub const DEFAULT_SEASONAL_WINDOW: usize = 7;

/// Caller-facing STL parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StlParams {
    pub period: usize,
    /// Seasonal LOESS span; even values are bumped to the next odd number.
    pub seasonal_window: usize,
    /// Trend LOESS span; derived from `period` and `seasonal_window` when `None`.
    pub trend_window: Option<usize>,
    pub robust: bool,
}

impl Default for StlParams {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}

impl StlParams {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            seasonal_window: DEFAULT_SEASONAL_WINDOW,
            trend_window: None,
            robust: false,
        }
    }

    pub fn with_seasonal_window(mut self, seasonal_window: usize) -> Self {
        self.seasonal_window = seasonal_window;
        self
    }

    pub fn with_trend_window(mut self, trend_window: Option<usize>) -> Self {
        self.trend_window = trend_window;
        self
    }

    pub fn robust(mut self, robust: bool) -> Self {
        self.robust = robust;
        self
    }

    /// Validate against a series of `n` observations and fill in derived spans.
    pub fn resolve(&self, n: usize) -> AnalysisResult<StlSettings> {
        let period = self.period;
        if period < 2 {
            return Err(AnalysisError::invalid(format!(
                "Seasonal period must be at least 2, got {period}"
            )));
        }
        let seasonal_window = make_odd(self.seasonal_window);
        if seasonal_window != self.seasonal_window {
            debug!(
                "seasonal window {} is even, using {}",
                self.seasonal_window, seasonal_window
            );
        }
        if seasonal_window < 3 {
            return Err(AnalysisError::invalid(format!(
                "Seasonal smoothing window must be an odd integer >= 3, got {}",
                self.seasonal_window
            )));
        }
        let trend_window = match self.trend_window {
            Some(requested) => {
                let trend = make_odd(requested);
                if trend <= period {
                    return Err(AnalysisError::invalid(format!(
                        "Trend window must be odd and larger than the period ({period}), got {requested}"
                    )));
                }
                trend
            }
            None => default_trend_window(period, seasonal_window),
        };
        if n < 2 * period {
            return Err(AnalysisError::invalid(format!(
                "Not enough data for STL decomposition: need at least {} observations, got {}",
                2 * period,
                n
            )));
        }
        let (inner_iterations, outer_iterations) = if self.robust { (2, 15) } else { (5, 0) };
        Ok(StlSettings {
            period,
            seasonal_window,
            trend_window,
            low_pass_window: make_odd(period + 1),
            robust: self.robust,
            inner_iterations,
            outer_iterations,
        })
    }
}

/// Fully resolved STL configuration, recorded alongside the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StlSettings {
    pub period: usize,
    pub seasonal_window: usize,
    pub trend_window: usize,
    pub low_pass_window: usize,
    pub robust: bool,
    pub inner_iterations: usize,
    /// Upper bound on robustness passes; the loop stops early once converged.
    pub outer_iterations: usize,
}

/// Smallest odd integer >= `1.5 * period / (1 - 1.5 / seasonal_window)`.
pub fn default_trend_window(period: usize, seasonal_window: usize) -> usize {
    let raw = 1.5 * period as f64 / (1.0 - 1.5 / seasonal_window as f64);
    make_odd(raw.ceil() as usize)
}

fn make_odd(window: usize) -> usize {
    if window % 2 == 0 {
        window + 1
    } else {
        window
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub timestamps: Vec<DateTime<Utc>>,
    pub original: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub settings: StlSettings,
    /// Robustness passes actually run.
    pub outer_passes: usize,
}

impl DecompositionResult {
    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    /// Largest |original - (trend + seasonal + residual)|.
    pub fn reconstruction_error(&self) -> f64 {
        self.original
            .iter()
            .zip(&self.trend)
            .zip(&self.seasonal)
            .zip(&self.residual)
            .map(|(((y, t), s), r)| (y - (t + s + r)).abs())
            .fold(0.0, f64::max)
    }
}

pub const fn stl_available() -> bool {
    cfg!(feature = "stl")
}

/// Additive STL decomposition of `series`.
#[cfg(feature = "stl")]
pub fn decompose(series: &TimeSeries, params: &StlParams) -> AnalysisResult<DecompositionResult> {
    if series.is_empty() {
        return Err(AnalysisError::no_data());
    }
    if series.missing_count() > 0 {
        return Err(AnalysisError::invalid(
            "Series contains missing values; fill gaps before decomposition",
        ));
    }
    let settings = params.resolve(series.len())?;
    let fit = super::stl::fit(&series.values, &settings);
    debug!(
        "STL period={} seasonal={} trend={} low_pass={} robust={} passes={}",
        settings.period,
        settings.seasonal_window,
        settings.trend_window,
        settings.low_pass_window,
        settings.robust,
        fit.outer_passes
    );
    Ok(DecompositionResult {
        timestamps: series.timestamps.clone(),
        original: series.values.clone(),
        trend: fit.trend,
        seasonal: fit.seasonal,
        residual: fit.residual,
        settings,
        outer_passes: fit.outer_passes,
    })
}

#[cfg(not(feature = "stl"))]
pub fn decompose(series: &TimeSeries, params: &StlParams) -> AnalysisResult<DecompositionResult> {
    let _ = (series, params);
    log::warn!("STL decomposition requested but the `stl` feature is disabled");
    Err(AnalysisError::LibraryUnavailable(
        crate::error::STL_UNAVAILABLE_MESSAGE.into(),
    ))
}
