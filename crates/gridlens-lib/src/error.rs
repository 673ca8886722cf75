use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NO_DATA_MESSAGE: &str = "No data available for selected combination";
pub const INVALID_WINDOW_MESSAGE: &str = "Invalid window settings for spectrogram";
pub const NOT_ENOUGH_DATA_MESSAGE: &str = "Not enough data for selected window/overlap settings";
pub const STL_UNAVAILABLE_MESSAGE: &str = "STL decomposition is unavailable because the `stl` feature \
was not compiled in; please rebuild gridlens with the feature enabled (e.g. cargo build --features stl)";

/// Failure outcome of an analysis request. Carries the message shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message")]
pub enum AnalysisError {
    #[error("{0}")]
    NoData(String),
    #[error("{0}")]
    LibraryUnavailable(String),
    #[error("{0}")]
    InvalidParameters(String),
}

impl AnalysisError {
    pub fn no_data() -> Self {
        Self::NoData(NO_DATA_MESSAGE.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoData(_) => "NoData",
            Self::LibraryUnavailable(_) => "LibraryUnavailable",
            Self::InvalidParameters(_) => "InvalidParameters",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::NoData(m) | Self::LibraryUnavailable(m) | Self::InvalidParameters(m) => m,
        }
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
