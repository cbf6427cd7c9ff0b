//! Returns-versus-benchmark scatter with a quadratic fit per series.

use crate::color::{n_colors, Rgb};
use crate::figure::{
    with_axes, Axes, Figure, Legend, LegendLoc, Line, LineStyle, Scatter, Ticks, VLine,
    DEFAULT_FONTSIZE, DEFAULT_SIZE,
};
use folioscope_core::perf::quadratic_fit;
use folioscope_core::{NumFormat, TimeSeriesTable};

const FIT_POINTS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterOptions {
    pub title: Option<String>,
    pub fontsize: f64,
    pub var_format: NumFormat,
    pub colors: Option<Vec<Rgb>>,
    /// Overlay `c0 + c1 x + c2 x^2` fitted per series.
    pub fit: bool,
    pub legend_loc: Option<LegendLoc>,
}

impl Default for ScatterOptions {
    fn default() -> Self {
        Self {
            title: None,
            fontsize: DEFAULT_FONTSIZE,
            var_format: NumFormat::percent(0),
            colors: None,
            fit: true,
            legend_loc: Some(LegendLoc::UpperLeft),
        }
    }
}

/// Scatter every non-`x` column of `returns` against column `x`. A missing
/// `x` column leaves the surface untouched.
pub fn render_returns_scatter(
    returns: &TimeSeriesTable,
    x: &str,
    opts: &ScatterOptions,
    ax: Option<&mut Axes>,
) -> Option<Figure> {
    with_axes(ax, DEFAULT_SIZE, |ax| draw_scatter(ax, returns, x, opts))
}

fn draw_scatter(ax: &mut Axes, returns: &TimeSeriesTable, x: &str, opts: &ScatterOptions) {
    let Some(xs) = returns.column(x) else {
        tracing::warn!(column = x, "scatter x column not found");
        return;
    };
    ax.fontsize = opts.fontsize;
    let ys: Vec<(&str, &[f64])> = returns.iter_columns().filter(|(n, _)| *n != x).collect();
    let colors = opts.colors.clone().unwrap_or_else(|| n_colors(ys.len()));

    let mut labels = Vec::with_capacity(ys.len());
    for (j, (name, values)) in ys.iter().enumerate() {
        let color = colors.get(j % colors.len().max(1)).copied().unwrap_or(Rgb::BLACK);
        let points: Vec<(f64, f64)> = xs
            .iter()
            .zip(values.iter())
            .filter(|(a, b)| a.is_finite() && b.is_finite())
            .map(|(a, b)| (*a, *b))
            .collect();

        let mut label = name.to_string();
        if opts.fit {
            if let Some([c0, c1, c2]) = quadratic_fit(&points) {
                let (lo, hi) = points
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, _)| {
                        (lo.min(*a), hi.max(*a))
                    });
                let curve = (0..FIT_POINTS)
                    .map(|k| {
                        let t = lo + (hi - lo) * k as f64 / (FIT_POINTS - 1) as f64;
                        (t, c0 + c1 * t + c2 * t * t)
                    })
                    .collect();
                label = format!("{name}: beta={c1:.2}, convexity={c2:.2}");
                ax.push(Line {
                    points: curve,
                    color,
                    width: 2.0,
                    style: LineStyle::Solid,
                    label: None,
                });
            }
        }
        ax.push(Scatter {
            points,
            color,
            radius: 3.0,
            label: Some(label.clone()),
        });
        labels.push(label);
    }

    ax.push(VLine {
        x: 0.0,
        y_range: None,
        color: Rgb::GREY,
        width: 1.0,
        style: LineStyle::Dashed,
        alpha: 1.0,
    });
    if let Some(loc) = opts.legend_loc {
        ax.legend = Some(Legend {
            fontsize: opts.fontsize,
            ..Legend::from_labels(&labels, &colors, loc, 2.0)
        });
    }
    ax.xlabel = Some(x.to_string());
    ax.x_ticks = Ticks::Format(opts.var_format);
    ax.y_ticks = Ticks::Format(opts.var_format);
    ax.x_grid = true;
    ax.y_grid = true;
    if opts.title.is_some() {
        ax.title = opts.title.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn fit_line_follows_parabola() {
        let base = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let xs: Vec<f64> = (-5..=5).map(|i| i as f64 / 100.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.5 * x + 2.0 * x * x).collect();
        let index = (0..xs.len()).map(|i| base + Duration::days(30 * i as i64)).collect();
        let t = TimeSeriesTable::new(index, vec![("bench".into(), xs), ("p".into(), ys)]).unwrap();

        let fig = render_returns_scatter(&t, "bench", &ScatterOptions::default(), None).unwrap();
        let line = fig.ax().lines().next().unwrap();
        assert_eq!(line.points.len(), FIT_POINTS);
        let (x, y) = line.points[FIT_POINTS - 1];
        assert!((x - 0.05).abs() < 1e-12);
        assert!((y - (0.5 * 0.05 + 2.0 * 0.0025)).abs() < 1e-9);
        let legend = fig.ax().legend.as_ref().unwrap();
        assert_eq!(legend.entries[0].label, "p: beta=0.50, convexity=2.00");
    }

    #[test]
    fn missing_x_column_draws_nothing() {
        let t = TimeSeriesTable::empty();
        let fig = render_returns_scatter(&t, "bench", &ScatterOptions::default(), None).unwrap();
        assert!(fig.ax().primitives().is_empty());
    }
}
