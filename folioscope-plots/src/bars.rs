//! Bar-chart renderer: grouped/stacked vertical bars and signed (diverging)
//! horizontal bars.
//!
//! Both entry points draw into a caller-supplied `Axes` when given one and
//! only return a `Figure` when they had to create the surface themselves.
//! Input tables are never modified; date indices are formatted on a local
//! copy.

use crate::color::{heatmap_colors, n_colors, Rgb};
use crate::figure::{
    with_axes, Axes, Bar, Coords, Figure, HAlign, HBar, HLine, Legend, LegendLoc, LegendStats,
    LineStyle, Text, Ticks, VAlign, VLine, DEFAULT_FONTSIZE, DEFAULT_SIZE,
};
use folioscope_core::{CategoryTable, NumFormat, TimeSeriesTable};
use std::borrow::Cow;

/// Total width of one category's bar group, in category units.
const GROUP_WIDTH: f64 = 0.8;
/// Thickness of a diverging bar row.
const ROW_THICKNESS: f64 = 0.5;
/// Tolerance under which a diverging segment counts as zero.
const ZERO_TOLERANCE: f64 = 1e-8;

/// Categorical or date-indexed bar input.
#[derive(Debug, Clone, Copy)]
pub enum BarInput<'a> {
    Categories(&'a CategoryTable),
    Dates(&'a TimeSeriesTable),
}

impl<'a> From<&'a CategoryTable> for BarInput<'a> {
    fn from(t: &'a CategoryTable) -> Self {
        BarInput::Categories(t)
    }
}

impl<'a> From<&'a TimeSeriesTable> for BarInput<'a> {
    fn from(t: &'a TimeSeriesTable) -> Self {
        BarInput::Dates(t)
    }
}

impl<'a> BarInput<'a> {
    fn categories(self, date_format: &str) -> Cow<'a, CategoryTable> {
        match self {
            BarInput::Categories(t) => Cow::Borrowed(t),
            BarInput::Dates(t) => Cow::Owned(CategoryTable::from_time_series(t, date_format)),
        }
    }
}

/// Where per-bar values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarValues {
    #[default]
    None,
    /// Inside the bar, offset by a fraction of its size.
    Inline,
    /// Pinned just below the top of the axes.
    Top,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarOptions {
    /// Stack series within a category instead of placing them side by side.
    pub stacked: bool,
    pub date_format: String,
    pub title: Option<String>,
    pub fontsize: f64,
    /// Bars with `|height|` at or below this are not labelled.
    pub min_max_for_bars_values: Option<f64>,
    pub bar_values: BarValues,
    pub legend_stats: LegendStats,
    /// Format of bar values and totals.
    pub var_format: NumFormat,
    /// Format of y ticks and legend statistics.
    pub yvar_format: NumFormat,
    pub x_rotation: f64,
    /// `None` draws no legend.
    pub legend_loc: Option<LegendLoc>,
    pub y_limits: Option<(Option<f64>, Option<f64>)>,
    /// One total per category.
    pub totals: Option<Vec<f64>>,
    pub top_totals: bool,
    /// Offset of total labels from the tick end, in points.
    pub totals_offset: (f64, f64),
    pub colors: Option<Vec<Rgb>>,
    pub legend_labels: Option<Vec<String>>,
    pub legend_colors: Option<Vec<Rgb>>,
    /// Categories before which a separator is drawn.
    pub vline_columns: Vec<usize>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub reversed_legend: bool,
    pub avg_line: bool,
}

impl Default for BarOptions {
    fn default() -> Self {
        Self {
            stacked: false,
            date_format: "%d-%b-%y".to_string(),
            title: None,
            fontsize: DEFAULT_FONTSIZE,
            min_max_for_bars_values: None,
            bar_values: BarValues::None,
            legend_stats: LegendStats::None,
            var_format: NumFormat::percent(1),
            yvar_format: NumFormat::thousands(2),
            x_rotation: 0.0,
            legend_loc: Some(LegendLoc::UpperCenter),
            y_limits: None,
            totals: None,
            top_totals: false,
            totals_offset: (2.55, 5.0),
            colors: None,
            legend_labels: None,
            legend_colors: None,
            vline_columns: Vec::new(),
            xlabel: None,
            ylabel: None,
            reversed_legend: false,
            avg_line: false,
        }
    }
}

/// Horizontal extent of one category's bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryExtent {
    pub x_min: f64,
    pub x_max: f64,
}

/// Bars as drawn, kept for annotation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarLayout {
    pub categories: Vec<CategoryExtent>,
    pub bars: Vec<Bar>,
}

/// Palette size for a bar table: one colour per category for a single
/// series, one per series otherwise.
fn bar_color_count(table: &CategoryTable) -> usize {
    if table.width() == 1 {
        table.len()
    } else {
        table.width()
    }
}

/// Lay out and draw one bar per `(category, series)` cell. `NaN` cells
/// leave a gap.
pub fn draw_bars(ax: &mut Axes, table: &CategoryTable, stacked: bool, colors: &[Rgb]) -> BarLayout {
    let k = table.width().max(1);
    let per_category = table.width() == 1;
    let mut layout = BarLayout::default();

    for i in 0..table.len() {
        let center = i as f64;
        let left = center - GROUP_WIDTH / 2.0;
        layout.categories.push(CategoryExtent {
            x_min: left,
            x_max: left + GROUP_WIDTH,
        });
        let (mut up, mut down) = (0.0, 0.0);
        for j in 0..table.width() {
            let v = table.value(i, j);
            if v.is_nan() {
                continue;
            }
            let color_idx = if per_category { i } else { j };
            let color = if colors.is_empty() {
                Rgb::BLACK
            } else {
                colors[color_idx % colors.len()]
            };
            let (x, width, bottom) = if stacked {
                let bottom = if v >= 0.0 { up } else { down };
                if v >= 0.0 {
                    up += v;
                } else {
                    down += v;
                }
                (left, GROUP_WIDTH, bottom)
            } else {
                let w = GROUP_WIDTH / k as f64;
                (left + j as f64 * w, w, 0.0)
            };
            let bar = Bar {
                x,
                width,
                bottom,
                height: v,
                color,
                category: i,
                series: j,
            };
            ax.push(bar);
            layout.bars.push(bar);
        }
    }
    layout
}

/// Grouped or stacked vertical bars with optional value labels, totals,
/// legend statistics and average line.
pub fn render_bars<'a>(
    data: impl Into<BarInput<'a>>,
    opts: &BarOptions,
    ax: Option<&mut Axes>,
) -> Option<Figure> {
    let table = data.into().categories(&opts.date_format);
    with_axes(ax, DEFAULT_SIZE, |ax| draw_bar_chart(ax, &table, opts))
}

fn draw_bar_chart(ax: &mut Axes, table: &CategoryTable, opts: &BarOptions) {
    let fontsize = opts.fontsize;
    let colors = opts
        .colors
        .clone()
        .unwrap_or_else(|| n_colors(bar_color_count(table)));
    ax.fontsize = fontsize;

    let layout = draw_bars(ax, table, opts.stacked, &colors);

    if opts.bar_values != BarValues::None {
        let (_, ymax) = ax.y_limits();
        for bar in &layout.bars {
            let h = bar.height;
            let suppressed = opts
                .min_max_for_bars_values
                .is_some_and(|threshold| h.abs() <= threshold);
            if suppressed || h == 0.0 {
                continue;
            }
            let x = bar.x + 0.2 * bar.width;
            let y = match opts.bar_values {
                BarValues::Top => 0.95 * ymax,
                _ if h > 0.0 => bar.bottom + 0.3 * h,
                _ => bar.bottom + 0.8 * h,
            };
            ax.push(Text::new(x, y, opts.var_format.format(h), fontsize));
        }
    }

    if let Some(totals) = &opts.totals {
        if opts.top_totals {
            let (ymin, ymax) = ax.y_limits();
            ax.set_y_limits(ymin, ymax * 1.1);
        }
        for (total, extent) in totals.iter().zip(layout.categories.iter()) {
            let label = opts.var_format.format(*total);
            if opts.top_totals {
                ax.push(Text {
                    coords: Coords::DataXAxesY,
                    ..Text::new(
                        extent.x_min + 0.2 * (extent.x_max - extent.x_min),
                        0.975,
                        label,
                        fontsize,
                    )
                });
            } else {
                ax.push(HLine {
                    y: *total,
                    x_range: Some((extent.x_min, extent.x_max)),
                    color: Rgb::BLACK,
                    width: 2.0,
                    style: LineStyle::Solid,
                    alpha: 1.0,
                });
                ax.push(Text {
                    offset: opts.totals_offset,
                    h_align: HAlign::Left,
                    v_align: VAlign::Top,
                    bold: true,
                    ..Text::new(extent.x_max, *total, label, fontsize)
                });
            }
        }
    }

    if !opts.vline_columns.is_empty() {
        let y_range = ax.y_limits();
        for c in &opts.vline_columns {
            ax.push(VLine {
                x: *c as f64 - 0.5,
                y_range: Some(y_range),
                color: Rgb::BLACK,
                width: 1.0,
                style: LineStyle::Solid,
                alpha: 1.0,
            });
        }
    }

    if let Some(loc) = opts.legend_loc {
        let mut labels = match &opts.legend_labels {
            Some(labels) => labels.clone(),
            None => table
                .names()
                .iter()
                .enumerate()
                .map(|(j, name)| opts.legend_stats.label(name, table.column_at(j), opts.yvar_format))
                .collect(),
        };
        let mut legend_colors = opts.legend_colors.clone().unwrap_or_else(|| colors.clone());
        if opts.reversed_legend {
            labels.reverse();
            legend_colors.reverse();
        }
        ax.legend = Some(Legend {
            fontsize,
            ..Legend::from_labels(&labels, &legend_colors, loc, 4.0)
        });
    }

    if opts.avg_line {
        let valid: Vec<f64> = table.values().filter(|v| !v.is_nan()).collect();
        if !valid.is_empty() {
            let avg = valid.iter().sum::<f64>() / valid.len() as f64;
            ax.push(HLine {
                y: avg,
                x_range: None,
                color: Rgb::CORAL,
                width: 2.0,
                style: LineStyle::Dashed,
                alpha: 1.0,
            });
            let (_, xmax) = ax.x_limits();
            ax.push(Text {
                color: Rgb::CORAL,
                ..Text::new(xmax, avg, "Average", fontsize)
            });
        }
    }

    ax.push(HLine {
        y: 0.0,
        x_range: None,
        color: Rgb::BLACK,
        width: 1.0,
        style: LineStyle::Solid,
        alpha: 1.0,
    });

    ax.xlabel = opts.xlabel.clone();
    ax.ylabel = opts.ylabel.clone();
    ax.x_ticks = Ticks::Labels(
        table
            .labels()
            .iter()
            .enumerate()
            .map(|(i, l)| (i as f64, l.clone()))
            .collect(),
    );
    ax.y_ticks = Ticks::Format(opts.yvar_format);
    ax.x_rotation = opts.x_rotation;
    if let Some((lo, hi)) = opts.y_limits {
        ax.set_y_bounds(lo, hi);
    }
    if opts.title.is_some() {
        ax.title = opts.title.clone();
    }
}

/// Colouring of diverging bars.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DivergingColors {
    /// Every segment of a category takes the heatmap colour of the
    /// category's total.
    #[default]
    ByCategoryTotal,
    /// One colour per series, generated when `None`.
    BySeries(Option<Vec<Rgb>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DivergingBarOptions {
    pub title: Option<String>,
    pub fontsize: f64,
    pub bar_values: bool,
    /// Append each segment's share of the category total.
    pub bar_perc_values: bool,
    pub var_format: NumFormat,
    pub legend_loc: Option<LegendLoc>,
    /// Category totals shown in row labels when `total_to_index` is set.
    pub totals: Option<Vec<f64>>,
    pub colors: DivergingColors,
    pub legend_labels: Option<Vec<String>>,
    pub legend_colors: Option<Vec<Rgb>>,
    pub x_rotation: f64,
    /// Moves the left x-limit by this amount.
    pub xmin_shift: Option<f64>,
    /// Label segments at their midpoint rather than at the widest stack.
    pub value_at_mid: bool,
    /// Short vertical tick at each category total.
    pub total_tick: bool,
    pub total_to_index: bool,
    /// `"total: …"` text to the right of the positive stack.
    pub total_label: bool,
    /// Round x-limits outward to multiples of this step.
    pub x_step: Option<f64>,
    pub x_limits: Option<(Option<f64>, Option<f64>)>,
    pub reversed_legend: bool,
    /// Rows above which a separator is drawn.
    pub rows_edge_lines: Vec<usize>,
}

impl Default for DivergingBarOptions {
    fn default() -> Self {
        Self {
            title: None,
            fontsize: DEFAULT_FONTSIZE,
            bar_values: true,
            bar_perc_values: false,
            var_format: NumFormat::percent(1),
            legend_loc: Some(LegendLoc::UpperCenter),
            totals: None,
            colors: DivergingColors::default(),
            legend_labels: None,
            legend_colors: None,
            x_rotation: 0.0,
            xmin_shift: None,
            value_at_mid: true,
            total_tick: true,
            total_to_index: false,
            total_label: false,
            x_step: None,
            x_limits: None,
            reversed_legend: true,
            rows_edge_lines: Vec::new(),
        }
    }
}

/// One drawn segment of a diverging bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackedSegment {
    pub category: usize,
    pub series: usize,
    /// Left edge; `left + |value|` is the right edge.
    pub left: f64,
    pub value: f64,
}

impl StackedSegment {
    pub fn width(&self) -> f64 {
        self.value.abs()
    }

    pub fn center(&self) -> f64 {
        self.left + self.width() / 2.0
    }
}

fn is_zero(v: f64) -> bool {
    v.abs() <= ZERO_TOLERANCE
}

/// Two-pass stacking of signed cells.
///
/// Negative parts come first: per category the running start begins at the
/// sum of the category's negative cells and moves right by each segment's
/// width in column order. Positive parts then stack rightward from zero in
/// column order. Zero and `NaN` cells produce no segment.
pub fn stack_segments(table: &CategoryTable) -> Vec<StackedSegment> {
    let n = table.len();
    let mut segments = Vec::new();

    let mut starts: Vec<f64> = (0..n)
        .map(|r| table.row(r).iter().filter(|v| **v < 0.0).sum())
        .collect();
    for j in 0..table.width() {
        for (r, start) in starts.iter_mut().enumerate() {
            let v = table.value(r, j);
            if !(v < 0.0) {
                continue;
            }
            if !is_zero(v) {
                segments.push(StackedSegment {
                    category: r,
                    series: j,
                    left: *start,
                    value: v,
                });
            }
            *start += v.abs();
        }
    }

    let mut starts = vec![0.0; n];
    for j in 0..table.width() {
        for (r, start) in starts.iter_mut().enumerate() {
            let v = table.value(r, j);
            if !(v > 0.0) {
                continue;
            }
            if !is_zero(v) {
                segments.push(StackedSegment {
                    category: r,
                    series: j,
                    left: *start,
                    value: v,
                });
            }
            *start += v;
        }
    }
    segments
}

/// Signed horizontal bars, one row per category.
pub fn render_diverging_bars(
    data: &CategoryTable,
    opts: &DivergingBarOptions,
    ax: Option<&mut Axes>,
) -> Option<Figure> {
    let height = (120.0 + 30.0 * data.len() as f64) as u32;
    with_axes(ax, (920, height.max(240)), |ax| draw_diverging(ax, data, opts))
}

fn draw_diverging(ax: &mut Axes, data: &CategoryTable, opts: &DivergingBarOptions) {
    let fontsize = opts.fontsize;
    ax.fontsize = fontsize;
    let n = data.len();

    let labels: Vec<String> = match (&opts.totals, opts.total_to_index) {
        (Some(totals), true) => data
            .labels()
            .iter()
            .zip(totals.iter())
            .map(|(l, t)| format!("{l} {}", opts.var_format.format(*t)))
            .collect(),
        _ => data.labels().to_vec(),
    };
    let totals = data.row_totals();

    // Row colours win over series colours when colouring by category total.
    let (row_colors, series_colors) = match &opts.colors {
        DivergingColors::ByCategoryTotal => {
            let column_sums: Vec<f64> = (0..data.width())
                .map(|j| data.column_at(j).iter().filter(|v| !v.is_nan()).sum())
                .collect();
            (Some(heatmap_colors(&totals)), heatmap_colors(&column_sums))
        }
        DivergingColors::BySeries(colors) => (
            None,
            colors.clone().unwrap_or_else(|| n_colors(data.width())),
        ),
    };
    let segment_color = |row: usize, col: usize| match &row_colors {
        Some(by_row) => by_row[row],
        None if series_colors.is_empty() => Rgb::BLACK,
        None => series_colors[col % series_colors.len()],
    };

    let bar_value_at_max = (!opts.value_at_mid).then(|| {
        (0..n)
            .flat_map(|r| {
                let mut acc = 0.0;
                data.row(r)
                    .into_iter()
                    .map(move |v| {
                        acc += v;
                        acc
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, f64::max)
    });

    ax.y_inverted = true;

    for seg in stack_segments(data) {
        ax.push(HBar {
            y: seg.category as f64,
            thickness: ROW_THICKNESS,
            left: seg.left,
            width: seg.width(),
            value: seg.value,
            color: segment_color(seg.category, seg.series),
            category: seg.category,
            series: seg.series,
        });
        if opts.bar_values {
            let x = bar_value_at_max.unwrap_or_else(|| seg.center());
            let label = if opts.bar_perc_values {
                format!(
                    "{} / {}",
                    opts.var_format.format(seg.value),
                    NumFormat::percent(0).format(seg.value / totals[seg.category])
                )
            } else {
                opts.var_format.format(seg.value)
            };
            ax.push(Text::new(x, seg.category as f64, label, fontsize).centered());
        }
    }

    if let Some(shift) = opts.xmin_shift {
        let (xmin, xmax) = ax.x_limits();
        ax.set_x_limits(xmin + shift, xmax);
    }

    if opts.total_tick {
        for (idx, total) in totals.iter().enumerate() {
            if total.is_nan() {
                continue;
            }
            ax.push(VLine {
                x: *total,
                y_range: Some((idx as f64 - 0.25, idx as f64 + 0.25)),
                color: Rgb::BLACK,
                width: 2.0,
                style: LineStyle::Solid,
                alpha: 1.0,
            });
        }
    }

    if opts.total_label {
        let widths: Vec<f64> = (0..n)
            .map(|r| data.row(r).iter().filter(|v| **v > 0.0).sum())
            .collect();
        let widest = widths.iter().copied().fold(0.0_f64, f64::max);
        let shift = (0.2 * widest).max(0.2);
        for (idx, total) in totals.iter().enumerate() {
            let label = format!("total: {}", opts.var_format.format(*total));
            ax.push(Text::new(widths[idx] + shift, idx as f64, label, fontsize).centered());
        }
    }

    if let Some(loc) = opts.legend_loc {
        let mut legend_labels = opts
            .legend_labels
            .clone()
            .unwrap_or_else(|| data.names().to_vec());
        let mut legend_colors = opts
            .legend_colors
            .clone()
            .unwrap_or_else(|| series_colors.clone());
        if opts.reversed_legend {
            legend_labels.reverse();
            legend_colors.reverse();
        }
        ax.legend = Some(Legend {
            fontsize,
            ..Legend::from_labels(&legend_labels, &legend_colors, loc, 5.0)
        });
    }

    if let Some((lo, hi)) = opts.x_limits {
        ax.set_x_bounds(lo, hi);
    }

    ax.x_grid = true;
    ax.push(VLine {
        x: 0.0,
        y_range: None,
        color: Rgb::ORANGE,
        width: 2.0,
        style: LineStyle::Solid,
        alpha: 1.0,
    });

    ax.x_ticks = Ticks::Format(opts.var_format);
    ax.y_ticks = Ticks::Labels(
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| (i as f64, l.clone()))
            .collect(),
    );
    ax.x_rotation = opts.x_rotation;

    if let Some(step) = opts.x_step.filter(|s| *s > 0.0) {
        let most_negative = (0..n)
            .map(|r| data.row(r).iter().filter(|v| **v < 0.0).sum::<f64>())
            .fold(0.0_f64, f64::min);
        let most_positive = (0..n)
            .map(|r| data.row(r).iter().filter(|v| **v > 0.0).sum::<f64>())
            .fold(0.0_f64, f64::max);
        ax.set_x_limits(
            step * (most_negative / step).floor(),
            step * (most_positive / step).ceil(),
        );
    }

    for row in &opts.rows_edge_lines {
        ax.push(HLine {
            y: *row as f64 - 0.5,
            x_range: None,
            color: Rgb::BLACK,
            width: 1.0,
            style: LineStyle::Solid,
            alpha: 0.5,
        });
    }

    if opts.title.is_some() {
        ax.title = opts.title.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_series() -> CategoryTable {
        CategoryTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                ("x".into(), vec![0.1, 0.2]),
                ("y".into(), vec![-0.3, 0.0]),
                ("z".into(), vec![f64::NAN, 0.4]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn grouped_bars_dodge_within_category() {
        let mut ax = Axes::new();
        let layout = draw_bars(&mut ax, &two_series(), false, &n_colors(2));
        assert_eq!(layout.bars.len(), 5);
        let first = layout.bars[0];
        assert!((first.x + 0.4).abs() < 1e-12);
        assert!((first.width - 0.4).abs() < 1e-12);
        assert!(layout.bars[1].x.abs() < 1e-12);
        assert!((layout.categories[2].x_min - 1.6).abs() < 1e-12);
        assert!((layout.categories[2].x_max - 2.4).abs() < 1e-12);
    }

    #[test]
    fn stacked_bars_split_positive_and_negative() {
        let t = CategoryTable::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![("x".into(), vec![0.1, -0.2, 0.3])],
        )
        .unwrap();
        let mut ax = Axes::new();
        let layout = draw_bars(&mut ax, &t, true, &n_colors(3));
        assert_eq!(layout.bars[1].bottom, 0.0);
        assert!((layout.bars[2].bottom - 0.1).abs() < 1e-12);
        assert_eq!(layout.bars[2].color, n_colors(3)[2]);
    }

    #[test]
    fn single_series_colors_per_category() {
        let t = CategoryTable::from_series("x", vec![("a".into(), 1.0), ("b".into(), 2.0)]);
        let fig = render_bars(&t, &BarOptions::default(), None).unwrap();
        let colors: Vec<Rgb> = fig.ax().bars().map(|b| b.color).collect();
        assert_eq!(colors, n_colors(2));
    }

    #[test]
    fn inline_values_skip_zero_and_small_bars() {
        let opts = BarOptions {
            bar_values: BarValues::Inline,
            min_max_for_bars_values: Some(0.15),
            ..BarOptions::default()
        };
        let fig = render_bars(&two_series(), &opts, None).unwrap();
        let texts: Vec<&str> = fig.ax().texts().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["20.0%", "-30.0%", "40.0%"]);

        let negative = fig.ax().texts().nth(1).unwrap();
        assert!((negative.y - 0.8 * -0.3).abs() < 1e-12);
    }

    #[test]
    fn top_totals_expand_axis_and_use_axes_fraction() {
        let opts = BarOptions {
            totals: Some(vec![0.5, 0.6]),
            top_totals: true,
            legend_loc: None,
            ..BarOptions::default()
        };
        let t = CategoryTable::from_series("x", vec![("a".into(), 1.0), ("b".into(), 2.0)]);
        let fig = render_bars(&t, &opts, None).unwrap();
        let (_, hi) = fig.ax().y_limits();
        assert!((hi - 2.1 * 1.1).abs() < 1e-9);
        let text = fig.ax().texts().next().unwrap();
        assert_eq!(text.coords, Coords::DataXAxesY);
        assert_eq!(text.y, 0.975);
        assert_eq!(text.text, "50.0%");
    }

    #[test]
    fn avg_line_and_zero_baseline() {
        let opts = BarOptions {
            avg_line: true,
            ..BarOptions::default()
        };
        let t = CategoryTable::from_series("x", vec![("a".into(), 1.0), ("b".into(), f64::NAN), ("c".into(), 3.0)]);
        let fig = render_bars(&t, &opts, None).unwrap();
        let hlines: Vec<&HLine> = fig.ax().hlines().collect();
        assert_eq!(hlines.len(), 2);
        assert_eq!(hlines[0].y, 2.0);
        assert_eq!(hlines[0].style, LineStyle::Dashed);
        assert_eq!(hlines[1].y, 0.0);
    }

    #[test]
    fn dates_are_formatted_on_a_copy() {
        use chrono::NaiveDate;
        let ts = TimeSeriesTable::from_series(
            "r",
            vec![NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()],
            vec![0.1],
        )
        .unwrap();
        let opts = BarOptions {
            date_format: "%b-%y".into(),
            ..BarOptions::default()
        };
        let fig = render_bars(&ts, &opts, None).unwrap();
        assert_eq!(fig.ax().x_ticks, Ticks::Labels(vec![(0.0, "Jan-24".into())]));
        assert_eq!(ts.names(), &["r"]);
    }

    #[test]
    fn negative_segments_walk_back_toward_zero() {
        let t = CategoryTable::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![("row".into(), vec![-0.2, 0.5, -0.3])],
        )
        .unwrap();
        let segs = stack_segments(&t);
        assert_eq!(segs.len(), 3);
        assert_eq!((segs[0].series, segs[0].left), (0, -0.5));
        assert!((segs[1].left + 0.3).abs() < 1e-12);
        assert_eq!(segs[1].series, 2);
        assert_eq!((segs[2].series, segs[2].left), (1, 0.0));
    }

    #[test]
    fn diverging_axis_is_inverted_with_total_ticks() {
        let t = CategoryTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![("r1".into(), vec![0.4, -0.1]), ("r2".into(), vec![-0.2, -0.2])],
        )
        .unwrap();
        let fig = render_diverging_bars(&t, &DivergingBarOptions::default(), None).unwrap();
        let ax = fig.ax();
        assert!(ax.y_inverted);
        let ticks: Vec<f64> = ax.vlines().filter(|v| v.y_range.is_some()).map(|v| v.x).collect();
        assert!((ticks[0] - 0.3).abs() < 1e-12);
        assert!((ticks[1] + 0.4).abs() < 1e-12);
        let legend = ax.legend.as_ref().unwrap();
        assert_eq!(legend.entries[0].label, "b");
        assert_eq!(legend.entries[0].line_width, 5.0);
    }

    #[test]
    fn x_step_rounds_limits_outward() {
        let t = CategoryTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![("r1".into(), vec![0.33, -0.12])],
        )
        .unwrap();
        let opts = DivergingBarOptions {
            x_step: Some(0.1),
            ..DivergingBarOptions::default()
        };
        let fig = render_diverging_bars(&t, &opts, None).unwrap();
        let (lo, hi) = fig.ax().x_limits();
        assert!((lo + 0.2).abs() < 1e-9);
        assert!((hi - 0.4).abs() < 1e-9);
    }

    #[test]
    fn percentage_labels_use_category_total() {
        let t = CategoryTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![("r1".into(), vec![0.3, 0.1])],
        )
        .unwrap();
        let opts = DivergingBarOptions {
            bar_perc_values: true,
            ..DivergingBarOptions::default()
        };
        let fig = render_diverging_bars(&t, &opts, None).unwrap();
        let texts: Vec<&str> = fig.ax().texts().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["30.0% / 75%", "10.0% / 25%"]);
    }
}
