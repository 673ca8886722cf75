use crate::error::{
    AnalysisError, AnalysisResult, INVALID_WINDOW_MESSAGE, NOT_ENOUGH_DATA_MESSAGE,
};
use crate::signal::TimeSeries;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::f64::consts::PI;

/// Added to the window energy before dividing.
pub const POWER_EPSILON: f64 = 1e-16;
/// Added to power before the dB conversion; 0 maps to -100 dB.
pub const DB_FLOOR: f64 = 1e-10;

/// Segment layout for a series of `n` samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub window_length: usize,
    pub overlap: usize,
    pub step: usize,
    pub segments: usize,
}

impl SegmentPlan {
    pub fn new(n: usize, window_length: usize, overlap: usize) -> AnalysisResult<Self> {
        if n == 0 || window_length == 0 || overlap >= window_length {
            return Err(AnalysisError::invalid(INVALID_WINDOW_MESSAGE));
        }
        let segments = segment_count(n, window_length, overlap);
        if segments == 0 {
            return Err(AnalysisError::invalid(NOT_ENOUGH_DATA_MESSAGE));
        }
        Ok(Self {
            window_length,
            overlap,
            step: window_length - overlap,
            segments,
        })
    }

    pub fn bins(&self) -> usize {
        self.window_length / 2 + 1
    }

    /// Copy segment `index` into `frame`, zero-padded on the right, times `window`.
    pub fn fill_frame(&self, samples: &[f64], index: usize, window: &[f64], frame: &mut [f64]) {
        let start = index * self.step;
        let end = (start + self.window_length).min(samples.len());
        let available = &samples[start.min(end)..end];
        for (i, (slot, w)) in frame.iter_mut().zip(window).enumerate() {
            *slot = available.get(i).map_or(0.0, |x| x * w);
        }
    }

    /// Segment start offsets in samples.
    pub fn times(&self) -> Vec<f64> {
        (0..self.segments)
            .map(|i| (i * self.step) as f64)
            .collect()
    }
}

/// `max(0, ceil((n - overlap) / (window_length - overlap)))`.
pub fn segment_count(n: usize, window_length: usize, overlap: usize) -> usize {
    if overlap >= window_length || n <= overlap {
        return 0;
    }
    (n - overlap).div_ceil(window_length - overlap)
}

/// Symmetric Hann window; a single-point window is `[1.0]`.
pub fn hann(size: usize) -> Vec<f64> {
    if size == 1 {
        return vec![1.0];
    }
    let denom = size as f64 - 1.0;
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// Bin centres of a real FFT of length `n` with sample spacing `d`.
pub fn rfftfreq(n: usize, d: f64) -> Vec<f64> {
    (0..=n / 2).map(|k| k as f64 / (n as f64 * d)).collect()
}

pub fn to_db(power: f64) -> f64 {
    10.0 * (power + DB_FLOOR).log10()
}

/// One way of turning windowed frames into squared spectral magnitudes.
///
/// Implementations differ only in how the transform is computed; windowing,
/// padding and normalization live in [`SpectralEstimator::power`].
pub trait SpectralEstimator {
    fn name(&self) -> &'static str;

    /// `|X_k|^2` for `k` in `0..=frame.len() / 2`. `frame` may be overwritten.
    fn squared_magnitudes(&self, frame: &mut [f64]) -> AnalysisResult<Vec<f64>>;

    /// Power matrix indexed `[frequency][segment]`.
    fn power(&self, samples: &[f64], plan: &SegmentPlan) -> AnalysisResult<Vec<Vec<f64>>> {
        let window = hann(plan.window_length);
        let norm = window.iter().map(|w| w * w).sum::<f64>() + POWER_EPSILON;
        let mut power = vec![vec![0.0; plan.segments]; plan.bins()];
        let mut frame = vec![0.0; plan.window_length];
        for segment in 0..plan.segments {
            plan.fill_frame(samples, segment, &window, &mut frame);
            let magnitudes = self.squared_magnitudes(&mut frame)?;
            for (row, value) in power.iter_mut().zip(magnitudes) {
                row[segment] = value / norm;
            }
        }
        Ok(power)
    }
}

/// FFT through a cached `realfft` planner.
#[cfg(feature = "realfft")]
pub struct RealFftEstimator {
    planner: RefCell<realfft::RealFftPlanner<f64>>,
}

#[cfg(feature = "realfft")]
impl RealFftEstimator {
    pub fn new() -> Self {
        Self {
            planner: RefCell::new(realfft::RealFftPlanner::new()),
        }
    }
}

#[cfg(feature = "realfft")]
impl Default for RealFftEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "realfft")]
impl SpectralEstimator for RealFftEstimator {
    fn name(&self) -> &'static str {
        "realfft"
    }

    fn squared_magnitudes(&self, frame: &mut [f64]) -> AnalysisResult<Vec<f64>> {
        let r2c = self.planner.borrow_mut().plan_fft_forward(frame.len());
        let mut spectrum = r2c.make_output_vec();
        r2c.process(frame, &mut spectrum)
            .map_err(|e| AnalysisError::invalid(format!("FFT failed: {e}")))?;
        Ok(spectrum.iter().map(|c| c.norm_sqr()).collect())
    }
}

/// Direct real DFT with a twiddle table per window length. O(n^2) per frame.
#[derive(Default)]
pub struct ManualDftEstimator {
    twiddles: RefCell<Option<Twiddles>>,
}

struct Twiddles {
    cos: Vec<f64>,
    sin: Vec<f64>,
}

impl Twiddles {
    fn new(n: usize) -> Self {
        let step = 2.0 * PI / n as f64;
        Self {
            cos: (0..n).map(|m| (step * m as f64).cos()).collect(),
            sin: (0..n).map(|m| (step * m as f64).sin()).collect(),
        }
    }
}

impl ManualDftEstimator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpectralEstimator for ManualDftEstimator {
    fn name(&self) -> &'static str {
        "manual-dft"
    }

    fn squared_magnitudes(&self, frame: &mut [f64]) -> AnalysisResult<Vec<f64>> {
        let n = frame.len();
        let mut cache = self.twiddles.borrow_mut();
        if cache.as_ref().map_or(true, |t| t.cos.len() != n) {
            *cache = None;
        }
        let tw = cache.get_or_insert_with(|| Twiddles::new(n));
        let out = (0..=n / 2)
            .map(|k| {
                let (mut re, mut im) = (0.0, 0.0);
                for (i, x) in frame.iter().enumerate() {
                    let m = (k * i) % n;
                    re += x * tw.cos[m];
                    im -= x * tw.sin[m];
                }
                re * re + im * im
            })
            .collect();
        Ok(out)
    }
}

/// Preferred estimator for this build: `realfft` when compiled in.
#[cfg(feature = "realfft")]
pub fn detect_estimator() -> Box<dyn SpectralEstimator> {
    Box::new(RealFftEstimator::new())
}

#[cfg(not(feature = "realfft"))]
pub fn detect_estimator() -> Box<dyn SpectralEstimator> {
    log::warn!("realfft backend not compiled in, falling back to manual DFT");
    Box::new(ManualDftEstimator::new())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrogramResult {
    /// Cycles per sample, ascending.
    pub frequencies: Vec<f64>,
    /// Segment start offsets in samples from the series start.
    pub times: Vec<f64>,
    /// dB power indexed `[frequency][time]`.
    pub power_db: Vec<Vec<f64>>,
    pub window_length: usize,
    pub window_overlap: usize,
    pub backend: String,
}

/// Short-time power spectrum of `series` in dB.
pub fn spectrogram_with(
    estimator: &dyn SpectralEstimator,
    series: &TimeSeries,
    window_length: usize,
    window_overlap: usize,
) -> AnalysisResult<SpectrogramResult> {
    let plan = SegmentPlan::new(series.len(), window_length, window_overlap)?;
    if series.missing_count() > 0 {
        return Err(AnalysisError::invalid(
            "Series contains missing values; fill gaps before computing a spectrogram",
        ));
    }
    let power = estimator.power(&series.values, &plan)?;
    let power_db = power
        .into_iter()
        .map(|row| row.into_iter().map(to_db).collect())
        .collect();
    log::debug!(
        "spectrogram via {}: {} bins x {} segments (step {})",
        estimator.name(),
        plan.bins(),
        plan.segments,
        plan.step
    );
    Ok(SpectrogramResult {
        frequencies: rfftfreq(window_length, 1.0),
        times: plan.times(),
        power_db,
        window_length,
        window_overlap,
        backend: estimator.name().to_string(),
    })
}
