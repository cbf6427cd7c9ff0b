//! SVG backend: turns a finished `Figure` into an SVG document with
//! plotters.
//!
//! Inverted y axes are drawn by negating y values and tick labels, so the
//! Cartesian coordinate system always runs low-to-high. Legends and tables
//! are laid out in pixel space on the panel's drawing area.

use crate::color::Rgb;
use crate::figure::{
    x_date, Axes, Coords, Figure, HAlign, Legend, LegendLoc, LineStyle, Primitive,
    TableBlock, Ticks, VAlign,
};
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("drawing backend: {0}")]
    Backend(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn backend<E: std::fmt::Debug>(e: E) -> RenderError {
    RenderError::Backend(format!("{e:?}"))
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

/// Points to pixels at 96 dpi.
fn px(points: f64) -> i32 {
    (points * 4.0 / 3.0).round() as i32
}

/// Dash length as a fraction of the axes diagonal.
const DASH: f64 = 0.012;

/// Render every panel of `fig` into one SVG document.
pub fn render(fig: &Figure) -> Result<String, RenderError> {
    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, (fig.width, fig.height)).into_drawing_area();
        root.fill(&WHITE).map_err(backend)?;
        let root = match &fig.title {
            Some(title) => root
                .titled(title, (FontFamily::SansSerif, 18.0))
                .map_err(backend)?,
            None => root,
        };
        let panels = root.split_evenly(fig.shape());
        for (ax, area) in fig.axes().iter().zip(panels.iter()) {
            draw_axes(area, ax)?;
        }
        root.present().map_err(backend)?;
    }
    Ok(out)
}

pub fn write_svg(fig: &Figure, path: &Path) -> Result<(), RenderError> {
    let svg = render(fig)?;
    std::fs::write(path, svg).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "wrote svg");
    Ok(())
}

type TickFormatter = Box<dyn Fn(&f64) -> String>;

fn tick_formatter(ticks: &Ticks, sign: f64) -> TickFormatter {
    match ticks {
        Ticks::Auto => Box::new(move |v: &f64| format!("{:.2}", v * sign)),
        Ticks::Format(f) => {
            let f = *f;
            Box::new(move |v: &f64| f.format(v * sign))
        }
        Ticks::Dates(pattern) => {
            let pattern = pattern.clone();
            Box::new(move |v: &f64| x_date(*v).format(&pattern).to_string())
        }
        Ticks::Labels(_) | Ticks::Hidden => Box::new(|_: &f64| String::new()),
    }
}

fn left_label_area(ax: &Axes) -> u32 {
    match &ax.y_ticks {
        Ticks::Labels(labels) => {
            let longest = labels.iter().map(|(_, l)| l.chars().count()).max().unwrap_or(0);
            ((longest as f64 * ax.fontsize * 0.65) as u32 + 16).clamp(40, 260)
        }
        Ticks::Hidden => 10,
        _ => 64,
    }
}

fn text_style(fontsize: f64, bold: bool, color: Rgb, h: HAlign, v: VAlign) -> TextStyle<'static> {
    let font = if bold {
        (FontFamily::SansSerif, fontsize * 4.0 / 3.0)
            .into_font()
            .style(FontStyle::Bold)
    } else {
        (FontFamily::SansSerif, fontsize * 4.0 / 3.0).into_font()
    };
    let h = match h {
        HAlign::Left => HPos::Left,
        HAlign::Center => HPos::Center,
        HAlign::Right => HPos::Right,
    };
    let v = match v {
        VAlign::Top => VPos::Top,
        VAlign::Center => VPos::Center,
        VAlign::Bottom => VPos::Bottom,
    };
    let mut style = TextStyle::from(font).pos(Pos::new(h, v));
    style.color = rgb(color).to_backend_color();
    style
}

fn dash_segments(
    points: &[(f64, f64)],
    scale: (f64, f64),
) -> impl Iterator<Item = Vec<(f64, f64)>> + '_ {
    let lerp = |a: (f64, f64), b: (f64, f64), t: f64| (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t);
    points.windows(2).flat_map(move |w| {
        let (a, b) = (w[0], w[1]);
        let len = (((b.0 - a.0) / scale.0).powi(2) + ((b.1 - a.1) / scale.1).powi(2)).sqrt();
        let n = if len.is_finite() {
            ((len / DASH).ceil() as usize).clamp(1, 4000)
        } else {
            1
        };
        (0..n).step_by(2).map(move |k| {
            let t0 = k as f64 / n as f64;
            let t1 = ((k + 1) as f64 / n as f64).min(1.0);
            vec![lerp(a, b, t0), lerp(a, b, t1)]
        })
    })
}

fn draw_axes<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    ax: &Axes,
) -> Result<(), RenderError> {
    if let Some(block) = ax.tables().next() {
        return draw_table(area, ax.title.as_deref(), block);
    }

    let (x0, x1) = ax.x_limits();
    let (y0, y1) = ax.y_limits();
    let sign = if ax.y_inverted { -1.0 } else { 1.0 };
    let (ylo, yhi) = if ax.y_inverted { (-y1, -y0) } else { (y0, y1) };
    let fy = |y: f64| y * sign;
    let scale = ((x1 - x0).max(f64::EPSILON), (yhi - ylo).max(f64::EPSILON));

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, left_label_area(ax))
        .set_label_area_size(LabelAreaPosition::Bottom, 44);
    if let Some(title) = &ax.title {
        builder.caption(title, (FontFamily::SansSerif, ax.fontsize * 1.6));
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, ylo..yhi)
        .map_err(backend)?;

    let x_fmt = tick_formatter(&ax.x_ticks, 1.0);
    let y_fmt = tick_formatter(&ax.y_ticks, sign);
    {
        let mut mesh = chart.configure_mesh();
        mesh.x_labels(8)
            .y_labels(8)
            .x_label_formatter(&*x_fmt)
            .y_label_formatter(&*y_fmt)
            .label_style((FontFamily::SansSerif, ax.fontsize * 4.0 / 3.0));
        if !ax.x_grid {
            mesh.disable_x_mesh();
        }
        if !ax.y_grid {
            mesh.disable_y_mesh();
        }
        if let Some(label) = &ax.xlabel {
            mesh.x_desc(label.clone());
        }
        if let Some(label) = &ax.ylabel {
            mesh.y_desc(label.clone());
        }
        mesh.draw().map_err(backend)?;
    }

    for primitive in ax.primitives() {
        match primitive {
            Primitive::Span(s) => {
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(s.x0, yhi), (s.x1, ylo)],
                        rgb(s.color).mix(s.alpha).filled(),
                    )))
                    .map_err(backend)?;
            }
            Primitive::Bar(b) => {
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(b.x, fy(b.bottom)), (b.x + b.width, fy(b.bottom + b.height))],
                        rgb(b.color).filled(),
                    )))
                    .map_err(backend)?;
            }
            Primitive::HBar(b) => {
                let half = b.thickness / 2.0;
                chart
                    .draw_series(std::iter::once(Rectangle::new(
                        [(b.left, fy(b.y - half)), (b.left + b.width, fy(b.y + half))],
                        rgb(b.color).filled(),
                    )))
                    .map_err(backend)?;
            }
            Primitive::Line(l) => {
                let points: Vec<(f64, f64)> = l.points.iter().map(|(x, y)| (*x, fy(*y))).collect();
                let style = rgb(l.color).stroke_width(l.width.round().max(1.0) as u32);
                draw_path(&mut chart, &points, style, l.style, scale)?;
            }
            Primitive::HLine(h) => {
                let (a, b) = h.x_range.unwrap_or((x0, x1));
                let style = rgb(h.color).mix(h.alpha).stroke_width(h.width.round().max(1.0) as u32);
                draw_path(&mut chart, &[(a, fy(h.y)), (b, fy(h.y))], style, h.style, scale)?;
            }
            Primitive::VLine(v) => {
                let (a, b) = v
                    .y_range
                    .map(|(a, b)| (fy(a), fy(b)))
                    .unwrap_or((ylo, yhi));
                let style = rgb(v.color).mix(v.alpha).stroke_width(v.width.round().max(1.0) as u32);
                draw_path(&mut chart, &[(v.x, a), (v.x, b)], style, v.style, scale)?;
            }
            Primitive::Scatter(s) => {
                let color = rgb(s.color).mix(0.7);
                let radius = s.radius.round().max(1.0) as u32;
                chart
                    .draw_series(
                        s.points
                            .iter()
                            .map(|(x, y)| Circle::new((*x, fy(*y)), radius, color.filled())),
                    )
                    .map_err(backend)?;
            }
            Primitive::Text(t) => {
                let anchor = match t.coords {
                    Coords::Data => (t.x, fy(t.y)),
                    Coords::DataXAxesY => (t.x, ylo + t.y * (yhi - ylo)),
                    Coords::Axes => (x0 + t.x * (x1 - x0), ylo + t.y * (yhi - ylo)),
                };
                let style = text_style(t.fontsize, t.bold, t.color, t.h_align, t.v_align);
                let offset = (px(t.offset.0), -px(t.offset.1));
                chart
                    .draw_series(std::iter::once(
                        EmptyElement::at(anchor) + Text::new(t.text.clone(), offset, style),
                    ))
                    .map_err(backend)?;
            }
            Primitive::Table(_) => {}
        }
    }

    if let Ticks::Labels(labels) = &ax.x_ticks {
        let mut style = text_style(ax.fontsize, false, Rgb::BLACK, HAlign::Center, VAlign::Top);
        if ax.x_rotation.abs() >= 45.0 {
            style = style.transform(FontTransform::Rotate270).pos(Pos::new(HPos::Right, VPos::Center));
        }
        chart
            .draw_series(labels.iter().filter(|(x, _)| (x0..=x1).contains(x)).map(|(x, label)| {
                EmptyElement::at((*x, ylo)) + Text::new(label.clone(), (0, 6), style.clone())
            }))
            .map_err(backend)?;
    }
    if let Ticks::Labels(labels) = &ax.y_ticks {
        let style = text_style(ax.fontsize, false, Rgb::BLACK, HAlign::Right, VAlign::Center);
        chart
            .draw_series(
                labels
                    .iter()
                    .filter(|(y, _)| (ylo..=yhi).contains(&fy(*y)))
                    .map(|(y, label)| {
                        EmptyElement::at((x0, fy(*y))) + Text::new(label.clone(), (-6, 0), style.clone())
                    }),
            )
            .map_err(backend)?;
    }

    if let Some(legend) = &ax.legend {
        draw_legend(chart.plotting_area().strip_coord_spec(), legend)?;
    }
    Ok(())
}

fn draw_path<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
    points: &[(f64, f64)],
    style: ShapeStyle,
    line: LineStyle,
    scale: (f64, f64),
) -> Result<(), RenderError> {
    match line {
        LineStyle::Solid => {
            chart
                .draw_series(std::iter::once(PathElement::new(points.to_vec(), style)))
                .map_err(backend)?;
        }
        LineStyle::Dashed => {
            chart
                .draw_series(dash_segments(points, scale).map(|seg| PathElement::new(seg, style)))
                .map_err(backend)?;
        }
    }
    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    area: DrawingArea<DB, Shift>,
    legend: &Legend,
) -> Result<(), RenderError> {
    if legend.entries.is_empty() {
        return Ok(());
    }
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let font_px = legend.fontsize * 4.0 / 3.0;
    let row_h = (font_px * 1.5).round() as i32;
    let sample = 24;
    let longest = legend
        .entries
        .iter()
        .map(|e| e.label.chars().count())
        .max()
        .unwrap_or(0);
    let box_w = sample + 14 + (longest as f64 * font_px * 0.55) as i32;
    let box_h = row_h * legend.entries.len() as i32 + 8;
    let pad = 8;

    let left = pad;
    let center_x = (w - box_w) / 2;
    let right = w - box_w - pad;
    let top = pad;
    let middle = (h - box_h) / 2;
    let bottom = h - box_h - pad;
    let (bx, by) = match legend.loc {
        LegendLoc::UpperLeft => (left, top),
        LegendLoc::UpperCenter => (center_x, top),
        LegendLoc::UpperRight | LegendLoc::Best => (right, top),
        LegendLoc::CenterLeft => (left, middle),
        LegendLoc::CenterRight => (right, middle),
        LegendLoc::LowerLeft => (left, bottom),
        LegendLoc::LowerCenter => (center_x, bottom),
        LegendLoc::LowerRight => (right, bottom),
    };

    area.draw(&Rectangle::new(
        [(bx, by), (bx + box_w, by + box_h)],
        WHITE.mix(0.85).filled(),
    ))
    .map_err(backend)?;
    area.draw(&Rectangle::new(
        [(bx, by), (bx + box_w, by + box_h)],
        rgb(Rgb::LIGHT_GREY).stroke_width(1),
    ))
    .map_err(backend)?;

    let label_style = text_style(legend.fontsize, false, Rgb::BLACK, HAlign::Left, VAlign::Center);
    for (i, entry) in legend.entries.iter().enumerate() {
        let y = by + 4 + row_h * i as i32 + row_h / 2;
        area.draw(&PathElement::new(
            vec![(bx + 6, y), (bx + 6 + sample, y)],
            rgb(entry.color).stroke_width(px(entry.line_width).max(1) as u32),
        ))
        .map_err(backend)?;
        area.draw(&Text::new(
            entry.label.clone(),
            (bx + sample + 12, y),
            label_style.clone(),
        ))
        .map_err(backend)?;
    }
    Ok(())
}

fn draw_table<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: Option<&str>,
    block: &TableBlock,
) -> Result<(), RenderError> {
    let (w, _) = area.dim_in_pixel();
    let w = w as i32;
    let font_px = block.fontsize * 4.0 / 3.0;
    let row_h = (font_px * 1.9).round() as i32;
    let mut y = 8;

    if let Some(title) = title {
        let style = text_style(block.fontsize * 1.2, true, Rgb::BLACK, HAlign::Left, VAlign::Top);
        area.draw(&Text::new(title.to_string(), (8, y), style))
            .map_err(backend)?;
        y += row_h;
    }

    let longest = block.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let label_w = (longest as f64 * font_px * 0.6) as i32 + 16;
    let ncols = block.columns.len().max(1) as i32;
    let col_w = ((w - label_w - 16) / ncols).max(40);
    let col_x = |c: usize| label_w + 8 + col_w * c as i32;

    let header = text_style(block.fontsize, true, Rgb::BLACK, HAlign::Center, VAlign::Center);
    for (c, name) in block.columns.iter().enumerate() {
        area.draw(&Text::new(name.clone(), (col_x(c) + col_w / 2, y + row_h / 2), header.clone()))
            .map_err(backend)?;
    }
    y += row_h;
    area.draw(&PathElement::new(vec![(8, y), (w - 8, y)], BLACK.stroke_width(1)))
        .map_err(backend)?;

    let label_style = text_style(block.fontsize, false, Rgb::BLACK, HAlign::Left, VAlign::Center);
    let cell_style = text_style(block.fontsize, false, Rgb::BLACK, HAlign::Center, VAlign::Center);
    for (r, (label, cells)) in block.rows.iter().zip(block.cells.iter()).enumerate() {
        let top = y + row_h * r as i32;
        if block.row_edges.contains(&r) {
            area.draw(&PathElement::new(vec![(8, top), (w - 8, top)], BLACK.stroke_width(1)))
                .map_err(backend)?;
        }
        if let Some(colors) = block.cell_colors.as_ref().and_then(|grid| grid.get(r)) {
            for (c, color) in colors.iter().enumerate() {
                area.draw(&Rectangle::new(
                    [(col_x(c) + 1, top + 1), (col_x(c) + col_w - 1, top + row_h - 1)],
                    rgb(*color).filled(),
                ))
                .map_err(backend)?;
            }
        }
        area.draw(&Text::new(label.clone(), (12, top + row_h / 2), label_style.clone()))
            .map_err(backend)?;
        for (c, cell) in cells.iter().enumerate() {
            area.draw(&Text::new(
                cell.clone(),
                (col_x(c) + col_w / 2, top + row_h / 2),
                cell_style.clone(),
            ))
            .map_err(backend)?;
        }
    }
    Ok(())
}
