use crate::analysis::decompose::{StlParams, DEFAULT_PERIOD, DEFAULT_SEASONAL_WINDOW};
use crate::explore::DEFAULT_PREVIEW_ROWS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WINDOW_LENGTH: usize = 168;
pub const DEFAULT_MAX_PLOT_POINTS: usize = 2048;

/// Analysis defaults, read from an optional TOML file. Every key may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default = "default_period")]
    pub period: usize,
    #[serde(default = "default_seasonal_window")]
    pub seasonal_window: usize,
    #[serde(default)]
    pub trend_window: Option<usize>,
    #[serde(default = "default_true")]
    pub robust: bool,
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    /// Defaults to half of `window_length`.
    #[serde(default)]
    pub window_overlap: Option<usize>,
    #[serde(default)]
    pub data_path: Option<PathBuf>,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default = "default_max_plot_points")]
    pub max_plot_points: usize,
}

fn default_period() -> usize {
    DEFAULT_PERIOD
}

fn default_seasonal_window() -> usize {
    DEFAULT_SEASONAL_WINDOW
}

fn default_true() -> bool {
    true
}

fn default_window_length() -> usize {
    DEFAULT_WINDOW_LENGTH
}

fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

fn default_max_plot_points() -> usize {
    DEFAULT_MAX_PLOT_POINTS
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            seasonal_window: DEFAULT_SEASONAL_WINDOW,
            trend_window: None,
            robust: true,
            window_length: DEFAULT_WINDOW_LENGTH,
            window_overlap: None,
            data_path: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            max_plot_points: DEFAULT_MAX_PLOT_POINTS,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("parsing analysis config")
    }

    pub fn window_overlap(&self) -> usize {
        self.window_overlap.unwrap_or(self.window_length / 2)
    }

    pub fn stl_params(&self) -> StlParams {
        StlParams::new(self.period)
            .with_seasonal_window(self.seasonal_window)
            .with_trend_window(self.trend_window)
            .robust(self.robust)
    }
}

pub fn read_config(path: &Path) -> Result<AnalysisConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = AnalysisConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AnalysisConfig::default());
        assert_eq!(cfg.window_overlap(), 84);
        assert!(cfg.stl_params().robust);
    }

    #[test]
    fn overlap_follows_window_length_unless_set() {
        let cfg = AnalysisConfig::from_toml_str("window_length = 48").unwrap();
        assert_eq!(cfg.window_overlap(), 24);
        let cfg = AnalysisConfig::from_toml_str("window_length = 48\nwindow_overlap = 0").unwrap();
        assert_eq!(cfg.window_overlap(), 0);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AnalysisConfig::from_toml_str("windw_length = 48").is_err());
    }

    #[test]
    fn reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "period = 168\nseasonal_window = 8\nrobust = false").unwrap();
        let cfg = read_config(file.path()).unwrap();
        let params = cfg.stl_params();
        assert_eq!(params.period, 168);
        assert_eq!(params.seasonal_window, 8);
        assert!(!params.robust);
        assert!(read_config(Path::new("/nonexistent/gridlens.toml")).is_err());
    }
}
