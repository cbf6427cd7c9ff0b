//! Report configuration, stored as TOML.
//!
//! Every field has a default so a config file only needs the settings it
//! changes:
//!
//! ```toml
//! roll_period = 130
//! regime_benchmark = "SPY"
//! views = ["nav", "drawdowns", "ra_perf_table"]
//!
//! [perf]
//! freq = "W-FRI"
//!
//! [formats]
//! costs = "{:.3%}"
//! ```

use folioscope_core::{Frequency, NumFormat, PerfParams, PerfStat, RegimeParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One report panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportView {
    Nav,
    NavWithDd,
    PeriodicReturns,
    PerformanceBars,
    CorrTable,
    Drawdowns,
    TimeUnderWater,
    RaPerfTable,
    AcRaPerfTable,
    Exposures,
    InstrumentPnlDiff,
    ExposuresDiff,
    Turnover,
    Costs,
    FactorBetas,
    ReturnsScatter,
    PerformanceAttribution,
    PerformancePeriodicTable,
    RegimeData,
}

impl ReportView {
    pub const ALL: [ReportView; 19] = [
        ReportView::Nav,
        ReportView::NavWithDd,
        ReportView::PeriodicReturns,
        ReportView::PerformanceBars,
        ReportView::CorrTable,
        ReportView::Drawdowns,
        ReportView::TimeUnderWater,
        ReportView::RaPerfTable,
        ReportView::AcRaPerfTable,
        ReportView::Exposures,
        ReportView::InstrumentPnlDiff,
        ReportView::ExposuresDiff,
        ReportView::Turnover,
        ReportView::Costs,
        ReportView::FactorBetas,
        ReportView::ReturnsScatter,
        ReportView::PerformanceAttribution,
        ReportView::PerformancePeriodicTable,
        ReportView::RegimeData,
    ];

    /// File stem used when the view is written to disk.
    pub fn slug(self) -> &'static str {
        match self {
            ReportView::Nav => "nav",
            ReportView::NavWithDd => "nav_with_dd",
            ReportView::PeriodicReturns => "periodic_returns",
            ReportView::PerformanceBars => "performance_bars",
            ReportView::CorrTable => "corr_table",
            ReportView::Drawdowns => "drawdowns",
            ReportView::TimeUnderWater => "time_under_water",
            ReportView::RaPerfTable => "ra_perf_table",
            ReportView::AcRaPerfTable => "ac_ra_perf_table",
            ReportView::Exposures => "exposures",
            ReportView::InstrumentPnlDiff => "instrument_pnl_diff",
            ReportView::ExposuresDiff => "exposures_diff",
            ReportView::Turnover => "turnover",
            ReportView::Costs => "costs",
            ReportView::FactorBetas => "factor_betas",
            ReportView::ReturnsScatter => "returns_scatter",
            ReportView::PerformanceAttribution => "performance_attribution",
            ReportView::PerformancePeriodicTable => "performance_periodic_table",
            ReportView::RegimeData => "regime_data",
        }
    }

    /// Whether the view cannot be drawn without a benchmark table.
    pub fn needs_benchmark(self) -> bool {
        matches!(
            self,
            ReportView::RaPerfTable
                | ReportView::AcRaPerfTable
                | ReportView::FactorBetas
                | ReportView::ReturnsScatter
                | ReportView::RegimeData
        )
    }

    /// Whether the view compares the first two portfolios.
    pub fn needs_pair(self) -> bool {
        matches!(self, ReportView::InstrumentPnlDiff | ReportView::ExposuresDiff)
    }
}

/// Number formats per report family.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub exposure: NumFormat,
    pub pnl: NumFormat,
    pub turnover: NumFormat,
    pub costs: NumFormat,
    pub betas: NumFormat,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            exposure: NumFormat::percent(0),
            pnl: NumFormat::percent(0),
            turnover: NumFormat::percent(0),
            costs: NumFormat::percent(2),
            betas: NumFormat::thousands(2),
        }
    }
}

/// Pixel size of single-panel figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub perf: PerfParams,
    pub regime: RegimeParams,
    /// Rolling-sum window for turnover and costs.
    pub roll_period: usize,
    /// Rolling window for factor betas.
    pub beta_window: usize,
    pub corr_freq: Frequency,
    pub scatter_freq: Frequency,
    pub periodic_freq: Frequency,
    pub perf_columns: Vec<PerfStat>,
    /// Statistic drawn by the performance bars view.
    pub bar_stat: PerfStat,
    /// Benchmark column used for regime shading; no shading when unset.
    pub regime_benchmark: Option<String>,
    pub formats: FormatConfig,
    pub figure: FigureConfig,
    pub views: Vec<ReportView>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            perf: PerfParams::default(),
            regime: RegimeParams::default(),
            roll_period: 260,
            beta_window: 52,
            corr_freq: Frequency::Weekly(chrono::Weekday::Wed),
            scatter_freq: Frequency::QuarterEnd,
            periodic_freq: Frequency::YearEnd,
            perf_columns: PerfStat::BENCHMARK_TABLE.to_vec(),
            bar_stat: PerfStat::Sharpe,
            regime_benchmark: None,
            formats: FormatConfig::default(),
            figure: FigureConfig::default(),
            views: ReportView::ALL.to_vec(),
        }
    }
}

impl ReportConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.roll_period == 0 {
            return Err(ConfigError::Invalid("roll_period must be positive".into()));
        }
        if self.beta_window < 2 {
            return Err(ConfigError::Invalid("beta_window must be at least 2".into()));
        }
        let [lo, hi] = self.regime.quantiles;
        if !(0.0 < lo && lo < hi && hi < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "regime quantiles must satisfy 0 < lo < hi < 1, got [{lo}, {hi}]"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips() {
        let config = ReportConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(ReportConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = ReportConfig::from_toml(
            r#"
            roll_period = 130
            views = ["nav", "ra_perf_table"]

            [perf]
            freq = "M"

            [formats]
            costs = "{:.3%}"
            "#,
        )
        .unwrap();
        assert_eq!(config.roll_period, 130);
        assert_eq!(config.views, vec![ReportView::Nav, ReportView::RaPerfTable]);
        assert_eq!(config.perf.freq, Frequency::MonthEnd);
        assert_eq!(config.perf.rf_rate, 0.0);
        assert_eq!(config.formats.costs, NumFormat::percent(3));
        assert_eq!(config.formats.exposure, NumFormat::percent(0));
        assert_eq!(config.regime.quantiles, [0.16, 0.84]);
    }

    #[test]
    fn invalid_quantiles_are_rejected() {
        let err = ReportConfig::from_toml("[regime]\nquantiles = [0.9, 0.1]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_view_fails_to_parse() {
        let err = ReportConfig::from_toml("views = [\"pie_chart\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn slugs_are_unique() {
        let mut slugs: Vec<&str> = ReportView::ALL.iter().map(|v| v.slug()).collect();
        slugs.sort_unstable();
        slugs.dedup();
        assert_eq!(slugs.len(), ReportView::ALL.len());
    }
}
