use crate::analysis::{DecompositionResult, SpectrogramResult};
use crate::error::AnalysisError;
use crate::help::{help_text, HelpKey};
use crate::select::GroupSeries;
use crate::signal::{hours_from_start, hours_since, CategoricalFilter, TimeSeries};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
}

impl Axis {
    pub fn labelled(label: &str) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

/// Regular grid of values; `z` is indexed `[y][x]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heatmap {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<Vec<f64>>,
    pub z_label: Option<String>,
}

impl Heatmap {
    /// Finite (min, max) of `z`, or `None` for an empty grid.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.z
            .iter()
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
    Heatmap(Heatmap),
}

/// One set of axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Panel {
    pub fn new(x: Axis, y: Axis) -> Self {
        Self {
            x,
            y,
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }
}

/// Stacked panels sharing a title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub panels: Vec<Panel>,
    /// Reading guide shown under the figure.
    pub note: Option<String>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            panels: Vec::new(),
            note: None,
        }
    }

    pub fn add_panel(&mut self, panel: Panel) {
        self.panels.push(panel);
    }
}

/// What the renderer receives: a figure, or the message to show in its place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Figure(Figure),
    Error(AnalysisError),
}

impl From<Result<Figure, AnalysisError>> for AnalysisOutcome {
    fn from(result: Result<Figure, AnalysisError>) -> Self {
        match result {
            Ok(fig) => Self::Figure(fig),
            Err(err) => Self::Error(err),
        }
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        let sample = points[start];
        result.push(sample);
    }
    result
}

fn line(name: &str, xs: &[f64], ys: &[f64], max_points: usize, width: f32, color: u32) -> Series {
    let points: Vec<[f64; 2]> = xs.iter().zip(ys).map(|(x, y)| [*x, *y]).collect();
    Series::Line(LineSeries {
        name: name.into(),
        points: decimate_points(&points, max_points),
        style: Style {
            width,
            color: Color(color),
        },
    })
}

pub fn figure_from_timeseries(
    title: &str,
    y_label: &str,
    series: &TimeSeries,
    max_points: usize,
    color: u32,
) -> Figure {
    let mut panel = Panel::new(Axis::labelled("Time (hours from start)"), Axis::labelled(y_label));
    panel.add_series(line(
        title,
        &series.hours_from_start(),
        &series.values,
        max_points,
        1.4,
        color,
    ));
    let mut fig = Figure::new(Some(title.into()));
    fig.add_panel(panel);
    fig
}

/// Line colours for multi-series panels, cycled by series index.
pub const PALETTE: [u32; 6] = [0x1F77B4, 0xFF7F0E, 0x2CA02C, 0xD62728, 0x9467BD, 0x8C564B];

/// One panel with a line per production group, all on the same clock starting at the
/// earliest group's first sample.
pub fn figure_from_groups(
    title: &str,
    y_label: &str,
    groups: &[GroupSeries],
    max_points: usize,
) -> Figure {
    let origin = groups
        .iter()
        .filter_map(|g| g.series.timestamps.first())
        .min()
        .copied();
    let mut panel = Panel::new(Axis::labelled("Time (hours from start)"), Axis::labelled(y_label));
    for (idx, group) in groups.iter().enumerate() {
        let hours = match origin {
            Some(origin) => hours_since(&group.series.timestamps, origin),
            None => Vec::new(),
        };
        panel.add_series(line(
            &group.production_group,
            &hours,
            &group.series.values,
            max_points,
            1.4,
            PALETTE[idx % PALETTE.len()],
        ));
    }
    let mut fig = Figure::new(Some(title.into()));
    fig.add_panel(panel);
    fig
}

/// Four stacked panels: original, trend, seasonal, residual.
pub fn figure_from_decomposition(
    result: &DecompositionResult,
    filter: &CategoricalFilter,
    max_points: usize,
) -> Figure {
    let hours = hours_from_start(&result.timestamps);
    let components: [(&str, &[f64], f32, u32); 4] = [
        ("Original", &result.original, 1.0, 0x000000),
        ("Trend", &result.trend, 1.5, 0x0000FF),
        ("Seasonal", &result.seasonal, 1.0, 0x008000),
        ("Residual", &result.residual, 1.0, 0xFF0000),
    ];
    let mut fig = Figure::new(Some(format!(
        "STL Decomposition: {} in {}",
        filter.production_group, filter.price_area
    )));
    for (idx, (name, values, width, color)) in components.into_iter().enumerate() {
        // Only the bottom panel carries the time label.
        let x = if idx == 3 {
            Axis::labelled("Time (hours from start)")
        } else {
            Axis { label: None }
        };
        let mut panel = Panel::new(x, Axis::labelled(name));
        panel.add_series(line(name, &hours, values, max_points, width, color));
        fig.add_panel(panel);
    }
    fig.note = Some(help_text(HelpKey::StlInterpretation).into());
    fig
}

pub fn figure_from_spectrogram(result: &SpectrogramResult, filter: &CategoricalFilter) -> Figure {
    let mut panel = Panel::new(
        Axis::labelled("Time (hours from start)"),
        Axis::labelled("Frequency (cycles/hour)"),
    );
    panel.add_series(Series::Heatmap(Heatmap {
        name: "power".into(),
        x: result.times.clone(),
        y: result.frequencies.clone(),
        z: result.power_db.clone(),
        z_label: Some("Power (dB)".into()),
    }));
    let mut fig = Figure::new(Some(format!(
        "Spectrogram: {} Production in {}\nWindow: {}h, Overlap: {}h",
        filter.production_group, filter.price_area, result.window_length, result.window_overlap
    )));
    fig.add_panel(panel);
    fig.note = Some(help_text(HelpKey::SpectrogramKeyFrequencies).into());
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{StlSettings, SpectrogramResult};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn decimation_keeps_bucket_starts() {
        let points: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 0.0]).collect();
        let out = decimate_points(&points, 5);
        assert_eq!(out.len(), 5);
        assert_eq!(out[1][0], 2.0);
        assert_eq!(decimate_points(&points, 20).len(), 10);
    }

    #[test]
    fn decomposition_figure_has_four_labelled_panels() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let timestamps: Vec<_> = (0..4).map(|h| start + Duration::hours(h)).collect();
        let result = DecompositionResult {
            timestamps,
            original: vec![1.0; 4],
            trend: vec![1.0; 4],
            seasonal: vec![0.0; 4],
            residual: vec![0.0; 4],
            settings: StlSettings {
                period: 2,
                seasonal_window: 7,
                trend_window: 5,
                low_pass_window: 3,
                robust: false,
                inner_iterations: 5,
                outer_iterations: 0,
            },
            outer_passes: 0,
        };
        let fig = figure_from_decomposition(&result, &CategoricalFilter::new("NO1", "hydro"), 100);
        assert_eq!(fig.title.as_deref(), Some("STL Decomposition: hydro in NO1"));
        let labels: Vec<_> = fig
            .panels
            .iter()
            .map(|p| p.y.label.clone().unwrap_or_default())
            .collect();
        assert_eq!(labels, ["Original", "Trend", "Seasonal", "Residual"]);
        assert!(fig.panels[..3].iter().all(|p| p.x.label.is_none()));
        assert_eq!(fig.panels[3].x.label.as_deref(), Some("Time (hours from start)"));
        match &fig.panels[0].series[0] {
            Series::Line(line) => assert_eq!(line.points[3], [3.0, 1.0]),
            other => panic!("unexpected series {other:?}"),
        }
    }

    #[test]
    fn group_figure_shares_one_panel_and_clock() {
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let series = |offset: i64, n: i64| {
            let timestamps = (0..n).map(|h| start + Duration::hours(offset + h)).collect();
            TimeSeries::new(timestamps, (0..n).map(|v| v as f64).collect())
        };
        let groups = vec![
            GroupSeries {
                production_group: "hydro".into(),
                series: series(2, 3),
            },
            GroupSeries {
                production_group: "wind".into(),
                series: series(0, 4),
            },
        ];
        let fig = figure_from_groups("Production in NO1", "Quantity (kWh)", &groups, 100);
        assert_eq!(fig.panels.len(), 1);
        let lines: Vec<_> = fig.panels[0]
            .series
            .iter()
            .map(|s| match s {
                Series::Line(line) => line,
                other => panic!("unexpected series {other:?}"),
            })
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "hydro");
        assert_eq!(lines[0].points[0], [2.0, 0.0]);
        assert_eq!(lines[1].points[0], [0.0, 0.0]);
        assert_ne!(lines[0].style.color.0, lines[1].style.color.0);
    }

    #[test]
    fn spectrogram_figure_title_carries_window_settings() {
        let result = SpectrogramResult {
            frequencies: vec![0.0, 0.5],
            times: vec![0.0],
            power_db: vec![vec![-100.0], vec![f64::NEG_INFINITY]],
            window_length: 2,
            window_overlap: 1,
            backend: "manual-dft".into(),
        };
        let fig = figure_from_spectrogram(&result, &CategoricalFilter::new("NO2", "solar"));
        assert_eq!(
            fig.title.as_deref(),
            Some("Spectrogram: solar Production in NO2\nWindow: 2h, Overlap: 1h")
        );
        match &fig.panels[0].series[0] {
            Series::Heatmap(map) => assert_eq!(map.z_range(), Some((-100.0, -100.0))),
            other => panic!("unexpected series {other:?}"),
        }
    }

    #[test]
    fn outcome_serializes_errors_in_place_of_figures() {
        let outcome = AnalysisOutcome::from(Err(AnalysisError::no_data()));
        let js = serde_json::to_value(&outcome).unwrap();
        assert_eq!(js["error"]["kind"], "NoData");
        assert!(js.get("figure").is_none());
    }
}
