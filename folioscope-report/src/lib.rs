//! folioscope report: multi-portfolio aggregation and report views.
//!
//! - `view`: `MultiPortfolioView`, the unified NAV table and every report view
//! - `config`: TOML report configuration
//! - `export`: render configured views to SVG files with a JSON manifest

pub mod config;
pub mod export;
pub mod view;

pub use config::{ConfigError, FigureConfig, FormatConfig, ReportConfig, ReportView};
pub use export::{ExportError, ReportExporter, ReportManifest};
pub use view::{MultiPortfolioView, PerfTable, PlotResult, ReportError};
