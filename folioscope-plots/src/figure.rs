//! Backend-neutral scene model.
//!
//! Chart routines record primitives into an `Axes`; a `Figure` is a grid of
//! axes with a pixel size. Nothing here rasterises anything: `svg::render`
//! turns a finished figure into an SVG document, and tests inspect the
//! recorded primitives directly.

use crate::color::Rgb;
use chrono::NaiveDate;
use folioscope_core::NumFormat;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_SIZE: (u32, u32) = (960, 540);
pub const DEFAULT_FONTSIZE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VAlign {
    Top,
    Center,
    #[default]
    Bottom,
}

/// Coordinate system of a text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Coords {
    #[default]
    Data,
    /// `x` in data units, `y` as a fraction of the axes height.
    DataXAxesY,
    /// Both as fractions of the axes box.
    Axes,
}

/// Vertical bar: spans `x..x + width` and `bottom..bottom + height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub x: f64,
    pub width: f64,
    pub bottom: f64,
    pub height: f64,
    pub color: Rgb,
    pub category: usize,
    pub series: usize,
}

/// Horizontal bar centred on row `y`, drawn from `left` over `width >= 0`.
/// `value` keeps the signed cell the segment represents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HBar {
    pub y: f64,
    pub thickness: f64,
    pub left: f64,
    pub width: f64,
    pub value: f64,
    pub color: Rgb,
    pub category: usize,
    pub series: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub points: Vec<(f64, f64)>,
    pub color: Rgb,
    pub width: f64,
    pub style: LineStyle,
    pub label: Option<String>,
}

/// Horizontal rule; spans the whole axes when `x_range` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HLine {
    pub y: f64,
    pub x_range: Option<(f64, f64)>,
    pub color: Rgb,
    pub width: f64,
    pub style: LineStyle,
    pub alpha: f64,
}

/// Vertical rule; spans the whole axes when `y_range` is `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VLine {
    pub x: f64,
    pub y_range: Option<(f64, f64)>,
    pub color: Rgb,
    pub width: f64,
    pub style: LineStyle,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub coords: Coords,
    /// Extra displacement in points, `y` pointing up.
    pub offset: (f64, f64),
    pub h_align: HAlign,
    pub v_align: VAlign,
    pub bold: bool,
    pub fontsize: f64,
    pub color: Rgb,
}

impl Text {
    pub fn new(x: f64, y: f64, text: impl Into<String>, fontsize: f64) -> Self {
        Self {
            x,
            y,
            text: text.into(),
            coords: Coords::Data,
            offset: (0.0, 0.0),
            h_align: HAlign::Left,
            v_align: VAlign::Bottom,
            bold: false,
            fontsize,
            color: Rgb::BLACK,
        }
    }

    pub fn centered(mut self) -> Self {
        self.h_align = HAlign::Center;
        self.v_align = VAlign::Center;
        self
    }
}

/// Shaded vertical band between two x positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub x0: f64,
    pub x1: f64,
    pub color: Rgb,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scatter {
    pub points: Vec<(f64, f64)>,
    pub color: Rgb,
    pub radius: f64,
    pub label: Option<String>,
}

/// Text grid drawn in place of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub columns: Vec<String>,
    pub rows: Vec<String>,
    pub cells: Vec<Vec<String>>,
    pub cell_colors: Option<Vec<Vec<Rgb>>>,
    /// Rows above which a separator is drawn.
    pub row_edges: Vec<usize>,
    pub fontsize: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Bar(Bar),
    HBar(HBar),
    Line(Line),
    HLine(HLine),
    VLine(VLine),
    Text(Text),
    Span(Span),
    Scatter(Scatter),
    Table(TableBlock),
}

macro_rules! impl_from_primitive {
    ($($ty:ident),*) => {
        $(impl From<$ty> for Primitive {
            fn from(p: $ty) -> Self {
                Primitive::$ty(p)
            }
        })*
    };
}

impl_from_primitive!(Bar, HBar, Line, HLine, VLine, Text, Span, Scatter);

impl From<TableBlock> for Primitive {
    fn from(p: TableBlock) -> Self {
        Primitive::Table(p)
    }
}

/// Tick placement and labelling for one axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Ticks {
    #[default]
    Auto,
    Format(NumFormat),
    /// Fixed positions with explicit labels (categorical axes).
    Labels(Vec<(f64, String)>),
    /// Values are days since 1970-01-01, labelled with a strftime pattern.
    Dates(String),
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LegendLoc {
    #[default]
    Best,
    UpperLeft,
    UpperCenter,
    UpperRight,
    CenterLeft,
    CenterRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
}

impl LegendLoc {
    pub fn as_str(self) -> &'static str {
        match self {
            LegendLoc::Best => "best",
            LegendLoc::UpperLeft => "upper left",
            LegendLoc::UpperCenter => "upper center",
            LegendLoc::UpperRight => "upper right",
            LegendLoc::CenterLeft => "center left",
            LegendLoc::CenterRight => "center right",
            LegendLoc::LowerLeft => "lower left",
            LegendLoc::LowerCenter => "lower center",
            LegendLoc::LowerRight => "lower right",
        }
    }
}

impl FromStr for LegendLoc {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            LegendLoc::Best,
            LegendLoc::UpperLeft,
            LegendLoc::UpperCenter,
            LegendLoc::UpperRight,
            LegendLoc::CenterLeft,
            LegendLoc::CenterRight,
            LegendLoc::LowerLeft,
            LegendLoc::LowerCenter,
            LegendLoc::LowerRight,
        ];
        let wanted = s.trim().to_lowercase().replace(['_', '-'], " ");
        all.into_iter()
            .find(|l| l.as_str() == wanted)
            .ok_or_else(|| format!("unknown legend location '{s}'"))
    }
}

impl TryFrom<String> for LegendLoc {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LegendLoc> for String {
    fn from(value: LegendLoc) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Rgb,
    /// Sample line width in points.
    pub line_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    pub loc: LegendLoc,
    pub fontsize: f64,
}

impl Legend {
    /// Pair labels with colours, cycling colours when there are fewer.
    pub fn from_labels(labels: &[String], colors: &[Rgb], loc: LegendLoc, line_width: f64) -> Self {
        let entries = labels
            .iter()
            .enumerate()
            .map(|(i, label)| LegendEntry {
                label: label.clone(),
                color: if colors.is_empty() {
                    Rgb::BLACK
                } else {
                    colors[i % colors.len()]
                },
                line_width,
            })
            .collect();
        Self {
            entries,
            loc,
            fontsize: DEFAULT_FONTSIZE,
        }
    }
}

/// Summary appended to each legend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendStats {
    #[default]
    None,
    Avg,
    Last,
    AvgLast,
    FirstLast,
    Total,
}

impl LegendStats {
    /// Legend label for one series; `NaN` observations are ignored.
    pub fn label(self, name: &str, values: &[f64], format: NumFormat) -> String {
        let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let f = |v: Option<f64>| format.format(v.unwrap_or(f64::NAN));
        let avg = (!valid.is_empty()).then(|| valid.iter().sum::<f64>() / valid.len() as f64);
        let first = valid.first().copied();
        let last = valid.last().copied();
        match self {
            LegendStats::None => name.to_string(),
            LegendStats::Avg => format!("{name}: avg={}", f(avg)),
            LegendStats::Last => format!("{name}: last={}", f(last)),
            LegendStats::AvgLast => format!("{name}: avg={}, last={}", f(avg), f(last)),
            LegendStats::FirstLast => format!("{name}: first={}, last={}", f(first), f(last)),
            LegendStats::Total => format!("{name}: total={}", f(Some(valid.iter().sum()))),
        }
    }
}

/// One chart panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Axes {
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub fontsize: f64,
    pub x_ticks: Ticks,
    pub y_ticks: Ticks,
    /// Tick label rotation in degrees.
    pub x_rotation: f64,
    /// Category axes read top to bottom.
    pub y_inverted: bool,
    pub x_grid: bool,
    pub y_grid: bool,
    pub legend: Option<Legend>,
    x_limits: Option<(f64, f64)>,
    y_limits: Option<(f64, f64)>,
    primitives: Vec<Primitive>,
}

impl Default for Axes {
    fn default() -> Self {
        Self {
            title: None,
            xlabel: None,
            ylabel: None,
            fontsize: DEFAULT_FONTSIZE,
            x_ticks: Ticks::Auto,
            y_ticks: Ticks::Auto,
            x_rotation: 0.0,
            y_inverted: false,
            x_grid: false,
            y_grid: false,
            legend: None,
            x_limits: None,
            y_limits: None,
            primitives: Vec::new(),
        }
    }
}

const MARGIN: f64 = 0.05;

impl Axes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, primitive: impl Into<Primitive>) {
        self.primitives.push(primitive.into());
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn bars(&self) -> impl Iterator<Item = &Bar> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Bar(b) => Some(b),
            _ => None,
        })
    }

    pub fn hbars(&self) -> impl Iterator<Item = &HBar> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::HBar(b) => Some(b),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &Text> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Line(l) => Some(l),
            _ => None,
        })
    }

    pub fn hlines(&self) -> impl Iterator<Item = &HLine> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::HLine(l) => Some(l),
            _ => None,
        })
    }

    pub fn vlines(&self) -> impl Iterator<Item = &VLine> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::VLine(l) => Some(l),
            _ => None,
        })
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Span(s) => Some(s),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn set_x_limits(&mut self, lo: f64, hi: f64) {
        self.x_limits = Some((lo, hi));
    }

    pub fn set_y_limits(&mut self, lo: f64, hi: f64) {
        self.y_limits = Some((lo, hi));
    }

    /// Override either bound, keeping the current value for `None`.
    pub fn set_x_bounds(&mut self, lo: Option<f64>, hi: Option<f64>) {
        let (cur_lo, cur_hi) = self.x_limits();
        self.x_limits = Some((lo.unwrap_or(cur_lo), hi.unwrap_or(cur_hi)));
    }

    pub fn set_y_bounds(&mut self, lo: Option<f64>, hi: Option<f64>) {
        let (cur_lo, cur_hi) = self.y_limits();
        self.y_limits = Some((lo.unwrap_or(cur_lo), hi.unwrap_or(cur_hi)));
    }

    /// Explicit limits, or the data range padded by 5 %.
    pub fn x_limits(&self) -> (f64, f64) {
        self.x_limits.unwrap_or_else(|| {
            let sticky = self.hbars().next().is_some();
            autoscale(self.data_range(Axis::X), sticky)
        })
    }

    /// Explicit limits, or the data range padded by 5 %. Bars keep zero
    /// as a hard edge when the data starts or ends there.
    pub fn y_limits(&self) -> (f64, f64) {
        self.y_limits.unwrap_or_else(|| {
            let sticky = self.bars().next().is_some();
            autoscale(self.data_range(Axis::Y), sticky)
        })
    }

    fn data_range(&self, axis: Axis) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut take = |v: f64| {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        };
        for p in &self.primitives {
            match (p, axis) {
                (Primitive::Bar(b), Axis::X) => {
                    take(b.x);
                    take(b.x + b.width);
                }
                (Primitive::Bar(b), Axis::Y) => {
                    take(b.bottom);
                    take(b.bottom + b.height);
                }
                (Primitive::HBar(b), Axis::X) => {
                    take(b.left);
                    take(b.left + b.width);
                }
                (Primitive::HBar(b), Axis::Y) => {
                    take(b.y - b.thickness / 2.0);
                    take(b.y + b.thickness / 2.0);
                }
                (Primitive::Line(l), _) => {
                    for (x, y) in &l.points {
                        take(if axis == Axis::X { *x } else { *y });
                    }
                }
                (Primitive::Scatter(s), _) => {
                    for (x, y) in &s.points {
                        take(if axis == Axis::X { *x } else { *y });
                    }
                }
                (Primitive::HLine(h), Axis::Y) => take(h.y),
                (Primitive::HLine(h), Axis::X) => {
                    if let Some((a, b)) = h.x_range {
                        take(a);
                        take(b);
                    }
                }
                (Primitive::VLine(v), Axis::X) => take(v.x),
                (Primitive::VLine(v), Axis::Y) => {
                    if let Some((a, b)) = v.y_range {
                        take(a);
                        take(b);
                    }
                }
                (Primitive::Span(s), Axis::X) => {
                    take(s.x0);
                    take(s.x1);
                }
                _ => {}
            }
        }
        (lo <= hi).then_some((lo, hi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

fn autoscale(range: Option<(f64, f64)>, sticky_zero: bool) -> (f64, f64) {
    let Some((lo, hi)) = range else {
        return (0.0, 1.0);
    };
    if hi - lo <= f64::EPSILON {
        return (lo - 0.5, hi + 0.5);
    }
    let pad = MARGIN * (hi - lo);
    let lo = if sticky_zero && lo == 0.0 { lo } else { lo - pad };
    let hi = if sticky_zero && hi == 0.0 { hi } else { hi + pad };
    (lo, hi)
}

/// Grid of axes with a pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
    nrows: usize,
    ncols: usize,
    axes: Vec<Axes>,
}

impl Figure {
    pub fn new(width: u32, height: u32) -> Self {
        Self::grid(1, 1, width, height)
    }

    pub fn grid(nrows: usize, ncols: usize, width: u32, height: u32) -> Self {
        let nrows = nrows.max(1);
        let ncols = ncols.max(1);
        Self {
            width,
            height,
            title: None,
            nrows,
            ncols,
            axes: vec![Axes::new(); nrows * ncols],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn axes(&self) -> &[Axes] {
        &self.axes
    }

    pub fn axes_mut(&mut self) -> &mut [Axes] {
        &mut self.axes
    }

    /// First (or only) panel.
    pub fn ax(&self) -> &Axes {
        &self.axes[0]
    }

    pub fn ax_mut(&mut self) -> &mut Axes {
        &mut self.axes[0]
    }
}

/// Draw into `ax` when given, otherwise into a fresh single-panel figure
/// which is returned.
pub fn with_axes(
    ax: Option<&mut Axes>,
    size: (u32, u32),
    draw: impl FnOnce(&mut Axes),
) -> Option<Figure> {
    match ax {
        Some(ax) => {
            draw(ax);
            None
        }
        None => {
            let mut fig = Figure::new(size.0, size.1);
            draw(fig.ax_mut());
            Some(fig)
        }
    }
}

/// Position of a date on a time axis (days since 1970-01-01).
pub fn date_x(date: NaiveDate) -> f64 {
    (date - NaiveDate::default()).num_days() as f64
}

pub fn x_date(x: f64) -> NaiveDate {
    NaiveDate::default() + chrono::Duration::days(x.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(x: f64, bottom: f64, height: f64) -> Bar {
        Bar {
            x,
            width: 0.8,
            bottom,
            height,
            color: Rgb::BLACK,
            category: 0,
            series: 0,
        }
    }

    #[test]
    fn positive_bars_keep_zero_floor() {
        let mut ax = Axes::new();
        ax.push(bar(-0.4, 0.0, 1.0));
        ax.push(bar(0.6, 0.0, 2.0));
        let (lo, hi) = ax.y_limits();
        assert_eq!(lo, 0.0);
        assert!((hi - 2.1).abs() < 1e-12);
    }

    #[test]
    fn partial_bounds_keep_autoscaled_side() {
        let mut ax = Axes::new();
        ax.push(bar(0.0, 0.0, -1.0));
        ax.set_y_bounds(Some(-5.0), None);
        assert_eq!(ax.y_limits(), (-5.0, 0.0));
    }

    #[test]
    fn empty_axes_default_to_unit_box() {
        assert_eq!(Axes::new().x_limits(), (0.0, 1.0));
    }

    #[test]
    fn with_axes_returns_figure_only_when_created() {
        let fig = with_axes(None, DEFAULT_SIZE, |ax| ax.title = Some("t".into()));
        assert_eq!(fig.unwrap().ax().title.as_deref(), Some("t"));

        let mut ax = Axes::new();
        assert!(with_axes(Some(&mut ax), DEFAULT_SIZE, |ax| ax.x_grid = true).is_none());
        assert!(ax.x_grid);
    }

    #[test]
    fn legend_loc_parses_matplotlib_names() {
        assert_eq!("upper center".parse::<LegendLoc>().unwrap(), LegendLoc::UpperCenter);
        assert_eq!("lower_right".parse::<LegendLoc>().unwrap(), LegendLoc::LowerRight);
        assert!("middle".parse::<LegendLoc>().is_err());
    }

    #[test]
    fn legend_stats_skip_missing_values() {
        let label = LegendStats::AvgLast.label("p", &[0.1, f64::NAN, 0.3], NumFormat::percent(0));
        assert_eq!(label, "p: avg=20%, last=30%");
        assert_eq!(LegendStats::None.label("p", &[], NumFormat::percent(0)), "p");
    }

    #[test]
    fn dates_map_to_day_numbers() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(x_date(date_x(d)), d);
    }
}
