use anyhow::{bail, Result};
use gridlens_lib::plot::{self, Figure, Heatmap, Panel, PlotBackend, Series};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

const WIDTH: u32 = 1000;
const PANEL_HEIGHT: u32 = 240;
const HEATMAP_HEIGHT: u32 = 600;

/// Colour stops for the heatmap, low to high power.
const GRADIENT: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// Writes figures as PNG files through the plotters bitmap backend.
pub struct PngBackend<'a> {
    path: &'a Path,
}

impl<'a> PngBackend<'a> {
    pub fn new(path: &'a Path) -> Self {
        Self { path }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        draw_figure(self.path, fig)
    }
}

fn draw_figure(path: &Path, fig: &Figure) -> Result<()> {
    if fig.panels.is_empty() {
        bail!("figure has no panels");
    }
    let has_heatmap = fig
        .panels
        .iter()
        .any(|p| p.series.iter().any(|s| matches!(s, Series::Heatmap(_))));
    let height = if has_heatmap {
        HEATMAP_HEIGHT
    } else {
        PANEL_HEIGHT * fig.panels.len() as u32 + 40
    };
    let root = BitMapBackend::new(path, (WIDTH, height)).into_drawing_area();
    root.fill(&WHITE)?;
    let title = fig
        .title
        .clone()
        .unwrap_or_else(|| "Plot".into())
        .replace('\n', "  |  ");
    let root = root.titled(&title, ("sans-serif", 22))?;
    let areas = root.split_evenly((fig.panels.len(), 1));
    for (panel, area) in fig.panels.iter().zip(&areas) {
        let heatmap = panel.series.iter().find_map(|s| match s {
            Series::Heatmap(map) => Some(map),
            Series::Line(_) => None,
        });
        match heatmap {
            Some(map) => draw_heatmap(area, panel, map)?,
            None => draw_lines(area, panel)?,
        }
    }
    root.present()?;
    Ok(())
}

fn rgb(color: plot::Color) -> RGBColor {
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

/// Finite extent of `values`, widened when it collapses to a point.
fn extent(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        0.0..1.0
    } else if lo == hi {
        lo - 1.0..hi + 1.0
    } else {
        lo..hi
    }
}

fn draw_lines(area: &DrawingArea<BitMapBackend<'_>, Shift>, panel: &Panel) -> Result<()> {
    let lines: Vec<_> = panel
        .series
        .iter()
        .filter_map(|s| match s {
            Series::Line(line) => Some(line),
            Series::Heatmap(_) => None,
        })
        .collect();
    let x_range = extent(lines.iter().flat_map(|l| l.points.iter().map(|p| p[0])));
    let y_range = extent(lines.iter().flat_map(|l| l.points.iter().map(|p| p[1])));
    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .x_desc(panel.x.label.clone().unwrap_or_default())
        .y_desc(panel.y.label.clone().unwrap_or_default())
        .draw()?;
    for line in lines {
        let style = rgb(line.style.color).stroke_width(line.style.width.round().max(1.0) as u32);
        chart.draw_series(LineSeries::new(
            line.points
                .iter()
                .filter(|p| p[1].is_finite())
                .map(|p| (p[0], p[1])),
            style,
        ))?;
    }
    Ok(())
}

/// Cell edges for grid centres/starts: each cell extends to the next coordinate.
fn edges(coords: &[f64]) -> Vec<f64> {
    let step = match coords {
        [a, b, ..] => b - a,
        _ => 1.0,
    };
    let mut out = coords.to_vec();
    if let Some(last) = coords.last() {
        out.push(last + step);
    }
    out
}

fn gradient(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0) * (GRADIENT.len() - 1) as f64;
    let idx = (t.floor() as usize).min(GRADIENT.len() - 2);
    let frac = t - idx as f64;
    let (a, b) = (GRADIENT[idx], GRADIENT[idx + 1]);
    let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

fn draw_heatmap(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &Panel,
    map: &Heatmap,
) -> Result<()> {
    let Some((z_min, z_max)) = map.z_range() else {
        bail!("heatmap '{}' has no finite values", map.name);
    };
    let span = if z_max > z_min { z_max - z_min } else { 1.0 };
    let xs = edges(&map.x);
    let ys = edges(&map.y);
    let x_range = extent(xs.iter().copied());
    let y_range = extent(ys.iter().copied());
    let caption = format!(
        "{}: {:.1} to {:.1}",
        map.z_label.as_deref().unwrap_or("value"),
        z_min,
        z_max
    );
    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .caption(caption, ("sans-serif", 14))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(panel.x.label.clone().unwrap_or_default())
        .y_desc(panel.y.label.clone().unwrap_or_default())
        .draw()?;
    let cells = map.z.iter().enumerate().flat_map(|(j, row)| {
        let (xs, ys) = (&xs, &ys);
        row.iter().enumerate().map(move |(i, z)| {
            let color = if z.is_finite() {
                gradient((z - z_min) / span)
            } else {
                gradient(0.0)
            };
            Rectangle::new([(xs[i], ys[j]), (xs[i + 1], ys[j + 1])], color.filled())
        })
    });
    chart.draw_series(cells)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_extend_by_last_step() {
        assert_eq!(edges(&[0.0, 84.0, 168.0]), vec![0.0, 84.0, 168.0, 252.0]);
        assert_eq!(edges(&[0.0]), vec![0.0, 1.0]);
        assert!(edges(&[]).is_empty());
    }

    #[test]
    fn gradient_hits_end_stops() {
        assert_eq!(gradient(0.0), RGBColor(68, 1, 84));
        assert_eq!(gradient(1.0), RGBColor(253, 231, 37));
        assert_eq!(gradient(7.0), gradient(1.0));
    }

    #[test]
    fn extent_widens_flat_ranges() {
        assert_eq!(extent([2.0, 2.0].into_iter()), 1.0..3.0);
        assert_eq!(extent([f64::NAN].into_iter()), 0.0..1.0);
        assert_eq!(extent([3.0, -1.0, f64::INFINITY].into_iter()), -1.0..3.0);
    }
}
