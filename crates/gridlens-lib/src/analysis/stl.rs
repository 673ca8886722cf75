use super::decompose::StlSettings;

/// Raw STL output on plain sample vectors.
#[derive(Debug, Clone)]
pub struct StlFit {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    /// Final robustness weights (all ones when not robust).
    pub weights: Vec<f64>,
    pub outer_passes: usize,
}

/// Relative change threshold that ends the robustness loop early.
const CONVERGENCE: f64 = 0.01;

/// STL decomposition of `y` after Cleveland et al. (1990). Callers guarantee
/// `y.len() >= 2 * settings.period`.
///
/// LOESS fits are degree 1 with tricube weights, evaluated at every point. Robust
/// passes multiply those by bisquare weights of the current remainder.
pub fn fit(y: &[f64], settings: &StlSettings) -> StlFit {
    let n = y.len();
    let mut trend = vec![0.0; n];
    let mut seasonal = vec![0.0; n];
    let mut weights = vec![1.0; n];

    inner_loop(y, settings, None, &mut seasonal, &mut trend);

    let mut outer_passes = 0;
    if settings.robust {
        for _ in 0..settings.outer_iterations {
            let fitted: Vec<f64> = trend.iter().zip(&seasonal).map(|(t, s)| t + s).collect();
            weights = robustness_weights(y, &fitted);
            let prev_trend = trend.clone();
            let prev_seasonal = seasonal.clone();
            inner_loop(y, settings, Some(&weights), &mut seasonal, &mut trend);
            outer_passes += 1;
            if relative_change(&prev_seasonal, &seasonal) < CONVERGENCE
                && relative_change(&prev_trend, &trend) < CONVERGENCE
            {
                break;
            }
        }
    }

    let residual = y
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((y, t), s)| y - t - s)
        .collect();
    StlFit {
        trend,
        seasonal,
        residual,
        weights,
        outer_passes,
    }
}

fn inner_loop(
    y: &[f64],
    settings: &StlSettings,
    robustness: Option<&[f64]>,
    seasonal: &mut [f64],
    trend: &mut Vec<f64>,
) {
    let period = settings.period;
    for _ in 0..settings.inner_iterations {
        let detrended: Vec<f64> = y.iter().zip(trend.iter()).map(|(y, t)| y - t).collect();
        // n + 2 * period values: each cycle-subseries extended one step at both ends.
        let cycle = smooth_cycle_subseries(
            &detrended,
            period,
            settings.seasonal_window,
            robustness,
        );
        let low_pass = loess(
            &low_pass_filter(&cycle, period),
            settings.low_pass_window,
            None,
        );
        for (i, s) in seasonal.iter_mut().enumerate() {
            *s = cycle[period + i] - low_pass[i];
        }
        let deseasonalized: Vec<f64> = y.iter().zip(seasonal.iter()).map(|(y, s)| y - s).collect();
        *trend = loess(&deseasonalized, settings.trend_window, robustness);
    }
}

fn smooth_cycle_subseries(
    y: &[f64],
    period: usize,
    span: usize,
    robustness: Option<&[f64]>,
) -> Vec<f64> {
    let n = y.len();
    let mut out = vec![0.0; n + 2 * period];
    for phase in 0..period.min(n) {
        let k = (n - phase - 1) / period + 1;
        let values: Vec<f64> = (0..k).map(|i| y[i * period + phase]).collect();
        let weights: Option<Vec<f64>> =
            robustness.map(|rw| (0..k).map(|i| rw[i * period + phase]).collect());
        let weights = weights.as_deref();

        let smoothed = loess(&values, span, weights);
        let right = span.min(k) - 1;
        let before = local_fit(&values, span, -1.0, 0, right, weights).unwrap_or(smoothed[0]);
        let left = k.saturating_sub(span);
        let after =
            local_fit(&values, span, k as f64, left, k - 1, weights).unwrap_or(smoothed[k - 1]);

        out[phase] = before;
        for (m, value) in smoothed.iter().enumerate() {
            out[(m + 1) * period + phase] = *value;
        }
        out[(k + 1) * period + phase] = after;
    }
    out
}

/// Moving averages of length `period`, `period` and 3. Output is `2 * period` shorter than `x`.
fn low_pass_filter(x: &[f64], period: usize) -> Vec<f64> {
    let first = moving_average(x, period);
    let second = moving_average(&first, period);
    moving_average(&second, 3)
}

fn moving_average(x: &[f64], len: usize) -> Vec<f64> {
    if len == 0 || x.len() < len {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(x.len() - len + 1);
    let mut sum: f64 = x[..len].iter().sum();
    out.push(sum / len as f64);
    for i in len..x.len() {
        sum += x[i] - x[i - len];
        out.push(sum / len as f64);
    }
    out
}

/// LOESS smooth of `y` with a `span`-point neighbourhood.
fn loess(y: &[f64], span: usize, robustness: Option<&[f64]>) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return y.to_vec();
    }
    let mut out = vec![0.0; n];
    if span >= n {
        for (i, o) in out.iter_mut().enumerate() {
            *o = local_fit(y, span, i as f64, 0, n - 1, robustness).unwrap_or(y[i]);
        }
        return out;
    }
    let half = (span + 1) / 2;
    let (mut left, mut right) = (0, span - 1);
    for (i, o) in out.iter_mut().enumerate() {
        if i + 1 > half && right != n - 1 {
            left += 1;
            right += 1;
        }
        *o = local_fit(y, span, i as f64, left, right, robustness).unwrap_or(y[i]);
    }
    out
}

/// Weighted degree-1 fit over `y[left..=right]`, evaluated at position `xs`.
///
/// Returns `None` when every weight in the neighbourhood is zero.
fn local_fit(
    y: &[f64],
    span: usize,
    xs: f64,
    left: usize,
    right: usize,
    robustness: Option<&[f64]>,
) -> Option<f64> {
    let n = y.len();
    let range = n as f64 - 1.0;
    let mut h = (xs - left as f64).max(right as f64 - xs);
    if span > n {
        h += ((span - n) / 2) as f64;
    }
    let (h9, h1) = (0.999 * h, 0.001 * h);

    let mut w = vec![0.0; right - left + 1];
    let mut total = 0.0;
    for (j, wj) in (left..=right).zip(w.iter_mut()) {
        let r = (j as f64 - xs).abs();
        if r <= h9 {
            *wj = if r <= h1 {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            };
            if let Some(rw) = robustness {
                *wj *= rw[j];
            }
            total += *wj;
        }
    }
    if total <= 0.0 {
        return None;
    }
    w.iter_mut().for_each(|wj| *wj /= total);

    if h > 0.0 {
        let center: f64 = (left..=right).zip(&w).map(|(j, wj)| wj * j as f64).sum();
        let spread: f64 = (left..=right)
            .zip(&w)
            .map(|(j, wj)| wj * (j as f64 - center).powi(2))
            .sum();
        if spread.sqrt() > 0.001 * range {
            let slope = (xs - center) / spread;
            for (j, wj) in (left..=right).zip(w.iter_mut()) {
                *wj *= slope * (j as f64 - center) + 1.0;
            }
        }
    }
    Some((left..=right).zip(&w).map(|(j, wj)| wj * y[j]).sum())
}

/// Bisquare weights scaled by six times the median absolute remainder.
fn robustness_weights(y: &[f64], fitted: &[f64]) -> Vec<f64> {
    let residuals: Vec<f64> = y.iter().zip(fitted).map(|(y, f)| (y - f).abs()).collect();
    let n = residuals.len();
    let mut sorted = residuals.clone();
    sorted.sort_by(f64::total_cmp);
    let cmad = 3.0 * (sorted[n / 2] + sorted[n - n / 2 - 1]);
    let (c9, c1) = (0.999 * cmad, 0.001 * cmad);
    residuals
        .iter()
        .map(|&r| {
            if r <= c1 {
                1.0
            } else if r <= c9 {
                (1.0 - (r / cmad).powi(2)).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

/// Largest absolute change between passes relative to the previous range.
fn relative_change(prev: &[f64], next: &[f64]) -> f64 {
    let max_change = prev
        .iter()
        .zip(next)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    if max_change == 0.0 {
        return 0.0;
    }
    let (lo, hi) = prev
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = hi - lo;
    if range > 0.0 {
        max_change / range
    } else {
        f64::INFINITY
    }
}
