//! folioscope plots: chart panels for portfolio reports.
//!
//! - `figure`: backend-neutral scene model (`Figure`, `Axes`, primitives)
//! - `bars`: grouped/stacked bars and diverging horizontal bars
//! - `lines`, `tables`, `scatter`, `shading`: the remaining report charts
//! - `svg`: plotters-backed SVG output

pub mod bars;
pub mod color;
pub mod figure;
pub mod lines;
pub mod scatter;
pub mod shading;
pub mod svg;
pub mod tables;

pub use bars::{
    draw_bars, render_bars, render_diverging_bars, stack_segments, BarInput, BarLayout, BarOptions,
    BarValues, CategoryExtent, DivergingBarOptions, DivergingColors, StackedSegment,
};
pub use color::{heatmap_colors, n_colors, Rgb};
pub use figure::{Axes, Figure, Legend, LegendLoc, LegendStats, Ticks};
pub use lines::{render_time_series, LineOptions};
pub use scatter::{render_returns_scatter, ScatterOptions};
pub use shading::add_regime_shadows;
pub use svg::{render, write_svg, RenderError};
pub use tables::{render_table, table_block, TableOptions};
