pub mod decompose;
pub mod spectral;
#[cfg(feature = "stl")]
pub mod stl;

pub use decompose::{decompose, stl_available, DecompositionResult, StlParams, StlSettings};
pub use spectral::{
    detect_estimator, segment_count, spectrogram_with, ManualDftEstimator, SegmentPlan,
    SpectralEstimator, SpectrogramResult,
};
#[cfg(feature = "realfft")]
pub use spectral::RealFftEstimator;

use crate::error::AnalysisResult;
use crate::signal::TimeSeries;
use log::info;
use serde::Serialize;

/// Which numerical backends this build can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub stl: bool,
    pub spectral_backend: &'static str,
}

/// Entry point for both analyses. The spectral backend is chosen once at construction.
pub struct Analyzer {
    estimator: Box<dyn SpectralEstimator>,
}

impl Analyzer {
    pub fn detect() -> Self {
        let analyzer = Self::with_estimator(detect_estimator());
        let caps = analyzer.capabilities();
        info!(
            "analysis backends: stl={} spectral={}",
            caps.stl, caps.spectral_backend
        );
        analyzer
    }

    pub fn with_estimator(estimator: Box<dyn SpectralEstimator>) -> Self {
        Self { estimator }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            stl: stl_available(),
            spectral_backend: self.estimator.name(),
        }
    }

    pub fn decompose(
        &self,
        series: &TimeSeries,
        params: &StlParams,
    ) -> AnalysisResult<DecompositionResult> {
        decompose(series, params)
    }

    pub fn spectrogram(
        &self,
        series: &TimeSeries,
        window_length: usize,
        window_overlap: usize,
    ) -> AnalysisResult<SpectrogramResult> {
        spectrogram_with(
            self.estimator.as_ref(),
            series,
            window_length,
            window_overlap,
        )
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::detect()
    }
}
