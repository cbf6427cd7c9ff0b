//! Date-indexed line charts.

use crate::color::{n_colors, Rgb};
use crate::figure::{
    date_x, with_axes, Axes, Figure, HLine, Legend, LegendLoc, LegendStats, Line, LineStyle,
    Ticks, DEFAULT_FONTSIZE, DEFAULT_SIZE,
};
use folioscope_core::{NumFormat, TimeSeriesTable};

#[derive(Debug, Clone, PartialEq)]
pub struct LineOptions {
    pub title: Option<String>,
    pub fontsize: f64,
    /// strftime pattern of the x tick labels.
    pub date_format: String,
    pub legend_stats: LegendStats,
    pub var_format: NumFormat,
    pub legend_loc: Option<LegendLoc>,
    pub colors: Option<Vec<Rgb>>,
    pub linewidth: f64,
    /// Columns drawn dashed, by position.
    pub dashed: Vec<usize>,
    pub y_limits: Option<(Option<f64>, Option<f64>)>,
    pub zero_line: bool,
    pub ylabel: Option<String>,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            title: None,
            fontsize: DEFAULT_FONTSIZE,
            date_format: "%b-%y".to_string(),
            legend_stats: LegendStats::None,
            var_format: NumFormat::thousands(2),
            legend_loc: Some(LegendLoc::UpperLeft),
            colors: None,
            linewidth: 1.0,
            dashed: Vec::new(),
            y_limits: None,
            zero_line: false,
            ylabel: None,
        }
    }
}

/// Split one column into runs of finite observations so gaps stay gaps.
fn runs(dates: &[f64], values: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, y) in dates.iter().zip(values.iter()) {
        if y.is_finite() {
            current.push((*x, *y));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// One line per column against the date index.
pub fn render_time_series(
    table: &TimeSeriesTable,
    opts: &LineOptions,
    ax: Option<&mut Axes>,
) -> Option<Figure> {
    with_axes(ax, DEFAULT_SIZE, |ax| draw_time_series(ax, table, opts))
}

pub(crate) fn draw_time_series(ax: &mut Axes, table: &TimeSeriesTable, opts: &LineOptions) {
    ax.fontsize = opts.fontsize;
    let colors = opts.colors.clone().unwrap_or_else(|| n_colors(table.width()));
    let xs: Vec<f64> = table.index().iter().map(|d| date_x(*d)).collect();

    let mut labels = Vec::with_capacity(table.width());
    for (j, (name, values)) in table.iter_columns().enumerate() {
        let color = colors.get(j % colors.len().max(1)).copied().unwrap_or(Rgb::BLACK);
        let label = opts.legend_stats.label(name, values, opts.var_format);
        let style = if opts.dashed.contains(&j) {
            LineStyle::Dashed
        } else {
            LineStyle::Solid
        };
        for (k, points) in runs(&xs, values).into_iter().enumerate() {
            ax.push(Line {
                points,
                color,
                width: opts.linewidth,
                style,
                label: (k == 0).then(|| label.clone()),
            });
        }
        labels.push(label);
    }

    if opts.zero_line {
        ax.push(HLine {
            y: 0.0,
            x_range: None,
            color: Rgb::BLACK,
            width: 1.0,
            style: LineStyle::Solid,
            alpha: 1.0,
        });
    }

    if let Some(loc) = opts.legend_loc {
        ax.legend = Some(Legend {
            fontsize: opts.fontsize,
            ..Legend::from_labels(&labels, &colors, loc, 2.0)
        });
    }

    ax.x_ticks = Ticks::Dates(opts.date_format.clone());
    ax.y_ticks = Ticks::Format(opts.var_format);
    ax.y_grid = true;
    ax.ylabel = opts.ylabel.clone();
    if let Some((lo, hi)) = opts.y_limits {
        ax.set_y_bounds(lo, hi);
    }
    if opts.title.is_some() {
        ax.title = opts.title.clone();
    }
}
