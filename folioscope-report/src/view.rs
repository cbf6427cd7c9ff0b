//! Aggregated view over several portfolio results.
//!
//! `MultiPortfolioView` borrows the portfolios, owns the benchmark table and
//! a unified NAV table built once at construction. Data methods return
//! tables so callers can inspect them; `plot_*` methods draw the same data
//! into a caller-supplied `Axes` (returning `None`) or into a fresh
//! `Figure`.
//!
//! Alignment is explicit per call site:
//! - NAV union: outer join of portfolio NAVs, benchmark carried forward
//! - P&L diff: outer align, missing cells zero, then subtract
//! - exposure diff: outer align, missing cells stay `NaN`

use crate::config::{ReportConfig, ReportView};
use folioscope_core::table::{align_outer, concat_columns};
use folioscope_core::{
    AttributionMetric, CategoryTable, ExposureGrouping, Fill, Frequency, NumFormat, PerfAnalytics,
    PerfError, PerfStat, PortfolioResult, Regime, RegimeData, RegimeSpan, StandardAnalytics,
    TableError, TimePeriod, TimeSeriesTable,
};
use folioscope_plots::color::regime_color;
use folioscope_plots::{
    add_regime_shadows, render_bars, render_returns_scatter, render_table, render_time_series,
    Axes, BarOptions, BarValues, Figure, LegendLoc, LegendStats, LineOptions, ScatterOptions,
    TableOptions,
};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

const REGIME_ALPHA: f64 = 0.25;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("portfolio index {index} out of range ({len} portfolios)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("nothing to plot: {0}")]
    ShapeMismatch(String),

    #[error("a view needs at least one portfolio")]
    NoPortfolios,

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Perf(#[from] PerfError),
}

/// Outcome of a plot call: `None` when drawn into a supplied surface.
pub type PlotResult = Result<Option<Figure>, ReportError>;

/// Risk-adjusted performance table plus the period it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfTable {
    pub table: CategoryTable,
    pub period: Option<TimePeriod>,
    /// Row boundaries for separator lines.
    pub row_edges: Vec<usize>,
}

pub struct MultiPortfolioView<'a> {
    portfolios: Vec<&'a dyn PortfolioResult>,
    raw_benchmark: Option<TimeSeriesTable>,
    benchmark: Option<TimeSeriesTable>,
    navs: TimeSeriesTable,
    nav_freq: Option<Frequency>,
    analytics: Box<dyn PerfAnalytics + 'a>,
    config: ReportConfig,
}

impl<'a> MultiPortfolioView<'a> {
    pub fn new(portfolios: Vec<&'a dyn PortfolioResult>) -> Result<Self, ReportError> {
        if portfolios.is_empty() {
            return Err(ReportError::NoPortfolios);
        }
        let mut view = Self {
            portfolios,
            raw_benchmark: None,
            benchmark: None,
            navs: TimeSeriesTable::empty(),
            nav_freq: None,
            analytics: Box::new(StandardAnalytics),
            config: ReportConfig::default(),
        };
        view.set_navs(None)?;
        Ok(view)
    }

    pub fn with_benchmark(mut self, prices: TimeSeriesTable) -> Result<Self, ReportError> {
        self.set_benchmark_prices(prices)?;
        Ok(self)
    }

    pub fn with_analytics(mut self, analytics: Box<dyn PerfAnalytics + 'a>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_config(mut self, config: ReportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn portfolios(&self) -> &[&'a dyn PortfolioResult] {
        &self.portfolios
    }

    pub fn portfolio(&self, index: usize) -> Result<&'a dyn PortfolioResult, ReportError> {
        self.portfolios
            .get(index)
            .copied()
            .ok_or(ReportError::IndexOutOfRange {
                index,
                len: self.portfolios.len(),
            })
    }

    // ── Unified NAVs and benchmarks ──────────────────────────────────

    /// Rebuild the unified NAV table and re-align the benchmark onto it.
    ///
    /// With `freq` the union is conformed to a regular grid (forward
    /// filled). The frequency is remembered for later rebuilds.
    pub fn set_navs(&mut self, freq: Option<Frequency>) -> Result<(), ReportError> {
        let navs: Vec<TimeSeriesTable> = self.portfolios.iter().map(|p| p.nav(None)).collect();
        let refs: Vec<&TimeSeriesTable> = navs.iter().collect();
        let mut unified = concat_columns(&refs)?;
        if let Some(freq) = freq {
            unified = unified.asfreq(freq);
        }
        self.benchmark = self
            .raw_benchmark
            .as_ref()
            .map(|b| b.reindex(unified.index(), Fill::Forward));
        debug!(
            portfolios = self.portfolios.len(),
            rows = unified.len(),
            freq = ?freq,
            with_benchmark = self.benchmark.is_some(),
            "rebuilt unified navs"
        );
        self.navs = unified;
        self.nav_freq = freq;
        Ok(())
    }

    /// Attach benchmark prices and rebuild the NAV table at the frequency
    /// last passed to [`Self::set_navs`] (raw dates if never resampled).
    pub fn set_benchmark_prices(&mut self, prices: TimeSeriesTable) -> Result<(), ReportError> {
        if prices.width() == 0 {
            return Err(ReportError::MissingDependency(
                "benchmark table has no columns".into(),
            ));
        }
        self.raw_benchmark = Some(prices);
        self.set_navs(self.nav_freq)
    }

    pub fn navs(&self) -> &TimeSeriesTable {
        &self.navs
    }

    /// Benchmark prices as attached.
    pub fn raw_benchmark_prices(&self) -> Option<&TimeSeriesTable> {
        self.raw_benchmark.as_ref()
    }

    /// Benchmark prices on the unified NAV index.
    pub fn benchmark_prices(&self) -> Option<&TimeSeriesTable> {
        self.benchmark.as_ref()
    }

    fn require_benchmark(&self) -> Result<&TimeSeriesTable, ReportError> {
        self.benchmark
            .as_ref()
            .ok_or_else(|| ReportError::MissingDependency("benchmark prices".into()))
    }

    /// Name of the first benchmark column.
    pub fn first_benchmark(&self) -> Result<String, ReportError> {
        self.require_benchmark()?
            .names()
            .first()
            .cloned()
            .ok_or_else(|| ReportError::MissingDependency("benchmark column".into()))
    }

    pub fn get_benchmark_price(
        &self,
        name: &str,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let price = self
            .require_benchmark()?
            .single(name)
            .map_err(|_| ReportError::MissingDependency(format!("benchmark column '{name}'")))?;
        Ok(price.locate_opt(period))
    }

    /// Unified NAVs, optionally led by a benchmark column.
    pub fn get_navs(
        &self,
        benchmark: Option<&str>,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let navs = match benchmark {
            Some(name) => {
                let price = self.get_benchmark_price(name, None)?;
                concat_columns(&[&price, &self.navs])?.ffill()
            }
            None => self.navs.clone(),
        };
        Ok(navs.locate_opt(period))
    }

    /// Asset-class NAVs of one portfolio, with the named benchmark appended.
    pub fn get_ac_navs(
        &self,
        index: usize,
        benchmark: Option<&str>,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let navs = self.portfolio(index)?.ac_navs(period)?;
        match benchmark {
            Some(name) => {
                let price = self
                    .get_benchmark_price(name, None)?
                    .reindex(navs.index(), Fill::Forward);
                Ok(concat_columns(&[&navs, &price])?)
            }
            None => Ok(navs),
        }
    }

    // ── Derived data ─────────────────────────────────────────────────

    /// Net exposure per portfolio, one column each.
    pub fn net_exposures(&self, period: Option<&TimePeriod>) -> Result<TimeSeriesTable, ReportError> {
        let mut columns = Vec::with_capacity(self.portfolios.len());
        for p in &self.portfolios {
            columns.push(p.exposures(ExposureGrouping::Instrument, period)?.row_sum(p.name()));
        }
        concat_owned(&columns)
    }

    /// Cumulative instrument P&L of portfolio `i` minus portfolio `j`.
    ///
    /// Grouped output sums by the asset groups of `i`, led by a total
    /// column named `"{i}-{j}"`.
    pub fn instrument_pnl_diff(
        &self,
        i: usize,
        j: usize,
        grouped: bool,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let (p1, p2) = (self.portfolio(i)?, self.portfolio(j)?);
        let (a, b) = align_outer(p1.instrument_pnl(), p2.instrument_pnl());
        let mut diff = a.fill_nan(0.0).sub(&b.fill_nan(0.0))?;
        if grouped {
            let total = format!("{}-{}", p1.name(), p2.name());
            diff = p1.asset_groups().aggregate(&diff, Some(&total))?;
        }
        Ok(diff.locate_opt(period).cumsum())
    }

    /// Grouped net exposures of `i` minus those of `j`; cells missing on
    /// either side stay `NaN`.
    pub fn exposures_diff(
        &self,
        i: usize,
        j: usize,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let grouping = ExposureGrouping::Grouped { total: false };
        let e1 = self.portfolio(i)?.exposures(grouping, period)?;
        let e2 = self.portfolio(j)?.exposures(grouping, period)?;
        Ok(e1.sub_aligned(&e2)?)
    }

    /// Rolling `window`-row sum of portfolio turnover, one column each.
    ///
    /// Portfolios are joined on the union index before rolling, so a window
    /// that spans dates a portfolio did not report is `NaN` for it.
    pub fn rolling_turnover(
        &self,
        window: usize,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let columns: Vec<TimeSeriesTable> =
            self.portfolios.iter().map(|p| p.turnover(None)).collect();
        Ok(concat_owned(&columns)?.rolling_sum(window)?.locate_opt(period))
    }

    /// Rolling `window`-row sum of trading costs, rolled on the union index
    /// like [`Self::rolling_turnover`].
    pub fn rolling_costs(
        &self,
        window: usize,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, ReportError> {
        let columns: Vec<TimeSeriesTable> =
            self.portfolios.iter().map(|p| p.costs(None)).collect();
        Ok(concat_owned(&columns)?.rolling_sum(window)?.locate_opt(period))
    }

    /// Rolling betas per factor: one table per column of `prices`, with one
    /// column per portfolio.
    pub fn factor_betas(
        &self,
        prices: &TimeSeriesTable,
        period: Option<&TimePeriod>,
    ) -> Result<Vec<(String, TimeSeriesTable)>, ReportError> {
        let mut per_portfolio = Vec::with_capacity(self.portfolios.len());
        for p in &self.portfolios {
            per_portfolio.push(p.benchmark_betas(prices, self.config.beta_window, period)?);
        }
        let mut out = Vec::with_capacity(prices.width());
        for factor in prices.names() {
            let mut columns = Vec::with_capacity(self.portfolios.len());
            for (p, betas) in self.portfolios.iter().zip(per_portfolio.iter()) {
                columns.push(betas.single(factor)?.with_names(vec![p.name().to_string()])?);
            }
            out.push((factor.clone(), concat_owned(&columns)?));
        }
        Ok(out)
    }

    /// Risk-adjusted statistics of every portfolio against the first
    /// benchmark column (which leads the table).
    pub fn ra_perf_table(
        &self,
        period: Option<&TimePeriod>,
        columns: &[PerfStat],
    ) -> Result<PerfTable, ReportError> {
        let benchmark = self.first_benchmark()?;
        let prices = self.get_navs(Some(&benchmark), period)?;
        let table = self
            .analytics
            .perf_table(&prices, Some(&benchmark), columns, &self.config.perf)?;
        Ok(PerfTable {
            table,
            period: TimePeriod::of_index(prices.index()),
            row_edges: Vec::new(),
        })
    }

    /// Prices for the per-asset-group performance table.
    ///
    /// Columns: the benchmark (carried forward onto the strategy index),
    /// every strategy NAV, then each portfolio's group NAVs named
    /// `"{portfolio}-{group}"`. Row edges mark where the strategy block and
    /// each portfolio's group block end once the benchmark row is dropped.
    pub fn ac_perf_prices(
        &self,
        benchmark_price: &TimeSeriesTable,
        period: Option<&TimePeriod>,
    ) -> Result<(TimeSeriesTable, Vec<usize>), ReportError> {
        let mut strategies = Vec::with_capacity(self.portfolios.len());
        let mut groups = Vec::with_capacity(self.portfolios.len());
        let mut row_edges = vec![self.portfolios.len()];
        for p in &self.portfolios {
            let navs = p.ac_navs(period)?;
            strategies.push(navs.single(p.name())?);
            let group_navs = navs.drop_column(p.name()).prefix_columns(p.name());
            let last = row_edges.last().copied().unwrap_or(0);
            row_edges.push(last + group_navs.width());
            groups.push(group_navs);
        }
        let strategies = concat_owned(&strategies)?;
        let groups = concat_owned(&groups)?;
        let benchmark = benchmark_price.reindex(strategies.index(), Fill::Forward);
        let prices = concat_columns(&[&benchmark, &strategies, &groups])?;
        Ok((prices, row_edges))
    }

    pub fn ac_ra_perf_table(
        &self,
        benchmark_price: &TimeSeriesTable,
        period: Option<&TimePeriod>,
        columns: &[PerfStat],
    ) -> Result<PerfTable, ReportError> {
        let benchmark = benchmark_price
            .names()
            .first()
            .cloned()
            .ok_or_else(|| ReportError::MissingDependency("benchmark column".into()))?;
        let (prices, row_edges) = self.ac_perf_prices(benchmark_price, period)?;
        let table = self
            .analytics
            .perf_table(&prices, Some(&benchmark), columns, &self.config.perf)?
            .drop_row(&benchmark);
        Ok(PerfTable {
            table,
            period: TimePeriod::of_index(prices.index()),
            row_edges,
        })
    }

    /// Per-instrument attribution of the selected portfolios, sorted
    /// descending by the first portfolio; rows with no signal are dropped.
    pub fn attribution_data(
        &self,
        ids: &[usize],
        period: Option<&TimePeriod>,
        metric: AttributionMetric,
    ) -> Result<CategoryTable, ReportError> {
        if ids.is_empty() {
            return Err(ReportError::ShapeMismatch("no portfolios selected".into()));
        }
        let mut tables = Vec::with_capacity(ids.len());
        for &id in ids {
            tables.push(self.portfolio(id)?.performance_data(metric, period));
        }
        let data = CategoryTable::concat_columns(&tables)?;
        Ok(data.sort_by_column(0, true).drop_rows_all_zero_or_nan())
    }

    /// Regime-conditioned statistic per strategy (or per asset group of
    /// portfolio `index` when `grouped`), benchmark row included.
    pub fn regime_data(
        &self,
        benchmark: &str,
        grouped: bool,
        index: usize,
        kind: RegimeData,
        period: Option<&TimePeriod>,
        conditional: bool,
    ) -> Result<CategoryTable, ReportError> {
        let prices = if grouped {
            self.get_ac_navs(index, Some(benchmark), period)?
        } else {
            self.get_navs(Some(benchmark), period)?
        };
        Ok(self
            .analytics
            .regime_stats(&prices, benchmark, kind, conditional, &self.config.regime)?)
    }

    pub fn corr_table(
        &self,
        period: Option<&TimePeriod>,
        freq: Frequency,
    ) -> Result<CategoryTable, ReportError> {
        let prices = self.get_navs(None, period)?;
        Ok(self.analytics.correlation(&prices, freq)?)
    }

    /// Strategy returns per `freq` period, one row per strategy.
    pub fn periodic_returns(
        &self,
        period: Option<&TimePeriod>,
        freq: Frequency,
    ) -> Result<CategoryTable, ReportError> {
        let prices = self.get_navs(None, period)?;
        Ok(self
            .analytics
            .periodic_returns(&prices, freq, date_format_for(freq))?
            .transpose())
    }

    /// Instrument NAVs compounded from P&L next to the strategy NAV, as
    /// periodic returns with one row per series.
    pub fn performance_periodic_data(
        &self,
        index: usize,
        period: Option<&TimePeriod>,
        freq: Frequency,
    ) -> Result<CategoryTable, ReportError> {
        let p = self.portfolio(index)?;
        let instruments = p.instrument_returns(period).compound();
        let nav = p.nav(period);
        let prices = concat_columns(&[&instruments, &nav])?.drop_any_nan_rows();
        Ok(self
            .analytics
            .periodic_returns(&prices, freq, date_format_for(freq))?
            .transpose())
    }

    /// Regime periods of a benchmark column, sampled on `index`.
    pub fn regime_spans(
        &self,
        benchmark: &str,
        index: &[NaiveDate],
    ) -> Result<Vec<RegimeSpan>, ReportError> {
        let price = self
            .get_benchmark_price(benchmark, None)?
            .reindex(index, Fill::Forward);
        let points: Vec<(NaiveDate, f64)> = price
            .index()
            .iter()
            .copied()
            .zip(price.column_at(0).iter().copied())
            .filter(|(_, v)| !v.is_nan())
            .collect();
        Ok(self.analytics.classify_regimes(&points, &self.config.regime)?)
    }

    /// Shade `ax` by the regimes of `benchmark`. Too little history to
    /// classify is logged and leaves the panel unshaded.
    pub fn add_regime_shadows(
        &self,
        ax: &mut Axes,
        benchmark: &str,
        index: &[NaiveDate],
    ) -> Result<(), ReportError> {
        match self.regime_spans(benchmark, index) {
            Ok(spans) => {
                add_regime_shadows(ax, &spans, REGIME_ALPHA);
                Ok(())
            }
            Err(ReportError::Perf(e)) => {
                warn!(benchmark, error = %e, "skipping regime shading");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    // ── Views ────────────────────────────────────────────────────────

    pub fn plot_nav(&self, period: Option<&TimePeriod>, ax: Option<&mut Axes>) -> PlotResult {
        let prices = self.get_navs(None, period)?;
        ensure_plottable(&prices, "portfolio navs")?;
        let labels = self.perf_labels(&prices)?;
        let opts = LineOptions {
            title: TimePeriod::of_index(prices.index()).map(|p| format!("NAVs: {p}")),
            ..LineOptions::default()
        };
        self.on_axes(ax, |ax| {
            render_time_series(&prices, &opts, Some(&mut *ax));
            relabel_legend(ax, labels);
            self.shade(ax, prices.index())
        })
    }

    /// NAV panel above a drawdown panel, shaded by the first benchmark
    /// column when one is attached.
    pub fn plot_nav_with_dd(
        &self,
        period: Option<&TimePeriod>,
        axs: Option<&mut [Axes]>,
    ) -> PlotResult {
        let prices = self.get_navs(None, period)?;
        ensure_plottable(&prices, "portfolio navs")?;
        let labels = self.perf_labels(&prices)?;
        let drawdowns = self.analytics.drawdowns(&prices);
        let regime_benchmark = match self.benchmark {
            Some(_) => Some(self.first_benchmark()?),
            None => None,
        };
        let nav_opts = LineOptions {
            title: TimePeriod::of_index(prices.index()).map(|p| format!("NAVs: {p}")),
            ..LineOptions::default()
        };
        let dd_opts = LineOptions {
            title: Some("Running drawdowns".into()),
            var_format: NumFormat::percent(0),
            legend_loc: None,
            ..LineOptions::default()
        };
        self.on_axes_grid(axs, 2, |axs| {
            render_time_series(&prices, &nav_opts, Some(&mut axs[0]));
            relabel_legend(&mut axs[0], labels);
            render_time_series(&drawdowns, &dd_opts, Some(&mut axs[1]));
            if let Some(b) = &regime_benchmark {
                for ax in axs.iter_mut() {
                    self.add_regime_shadows(ax, b, prices.index())?;
                }
            }
            Ok(())
        })
    }

    pub fn plot_drawdowns(&self, period: Option<&TimePeriod>, ax: Option<&mut Axes>) -> PlotResult {
        let prices = self.underwater_prices(period)?;
        let drawdowns = self.analytics.drawdowns(&prices);
        ensure_plottable(&drawdowns, "drawdowns")?;
        let opts = LineOptions {
            title: Some("Running drawdowns".into()),
            var_format: NumFormat::percent(0),
            legend_stats: LegendStats::Last,
            legend_loc: Some(LegendLoc::LowerLeft),
            ..LineOptions::default()
        };
        self.draw_lines(&drawdowns, &opts, ax)
    }

    pub fn plot_rolling_time_under_water(
        &self,
        period: Option<&TimePeriod>,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let prices = self.underwater_prices(period)?;
        let days = self.analytics.time_under_water(&prices);
        ensure_plottable(&days, "time under water")?;
        let opts = LineOptions {
            title: Some("Running time under water".into()),
            var_format: NumFormat::thousands(0),
            legend_stats: LegendStats::AvgLast,
            ylabel: Some("days".into()),
            ..LineOptions::default()
        };
        self.draw_lines(&days, &opts, ax)
    }

    pub fn plot_exposures(&self, period: Option<&TimePeriod>, ax: Option<&mut Axes>) -> PlotResult {
        let exposures = self.net_exposures(period)?;
        ensure_plottable(&exposures, "net exposures")?;
        let opts = LineOptions {
            title: Some("Portfolio net exposures".into()),
            var_format: self.config.formats.exposure,
            legend_stats: LegendStats::AvgLast,
            ..LineOptions::default()
        };
        self.draw_lines(&exposures, &opts, ax)
    }

    pub fn plot_instrument_pnl_diff(
        &self,
        i: usize,
        j: usize,
        grouped: bool,
        period: Option<&TimePeriod>,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let diff = self.instrument_pnl_diff(i, j, grouped, period)?;
        ensure_plottable(&diff, "instrument p&l diff")?;
        let opts = LineOptions {
            title: Some(format!(
                "Cumulative p&l diff {}-{}",
                self.portfolio(i)?.name(),
                self.portfolio(j)?.name()
            )),
            var_format: self.config.formats.pnl,
            legend_stats: LegendStats::Last,
            legend_loc: Some(LegendLoc::LowerLeft),
            ..LineOptions::default()
        };
        self.draw_lines(&diff, &opts, ax)
    }

    pub fn plot_exposures_diff(
        &self,
        i: usize,
        j: usize,
        period: Option<&TimePeriod>,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let diff = self.exposures_diff(i, j, period)?;
        ensure_plottable(&diff, "net exposure diff")?;
        let opts = LineOptions {
            title: Some(format!(
                "Net exposure diff {}-{}",
                self.portfolio(i)?.name(),
                self.portfolio(j)?.name()
            )),
            var_format: self.config.formats.exposure,
            legend_stats: LegendStats::AvgLast,
            ..LineOptions::default()
        };
        self.draw_lines(&diff, &opts, ax)
    }

    pub fn plot_turnover(&self, period: Option<&TimePeriod>, ax: Option<&mut Axes>) -> PlotResult {
        let turnover = self.rolling_turnover(self.config.roll_period, period)?;
        ensure_plottable(&turnover, "turnover")?;
        let opts = LineOptions {
            title: Some("Annualized daily Turnover".into()),
            var_format: self.config.formats.turnover,
            legend_stats: LegendStats::AvgLast,
            y_limits: Some((Some(0.0), None)),
            ..LineOptions::default()
        };
        self.draw_lines(&turnover, &opts, ax)
    }

    pub fn plot_costs(&self, period: Option<&TimePeriod>, ax: Option<&mut Axes>) -> PlotResult {
        let costs = self.rolling_costs(self.config.roll_period, period)?;
        ensure_plottable(&costs, "costs")?;
        let opts = LineOptions {
            title: Some("Annualized daily Costs %".into()),
            var_format: self.config.formats.costs,
            legend_stats: LegendStats::AvgLast,
            y_limits: Some((Some(0.0), None)),
            ..LineOptions::default()
        };
        self.draw_lines(&costs, &opts, ax)
    }

    /// One panel per factor column of `prices`.
    pub fn plot_factor_betas(
        &self,
        prices: &TimeSeriesTable,
        period: Option<&TimePeriod>,
        axs: Option<&mut [Axes]>,
    ) -> PlotResult {
        let betas = self.factor_betas(prices, period)?;
        if betas.is_empty() {
            return Err(ReportError::ShapeMismatch("no factor columns".into()));
        }
        for (_, table) in &betas {
            ensure_plottable(table, "factor betas")?;
        }
        self.on_axes_grid(axs, betas.len(), |axs| {
            for (ax, (factor, table)) in axs.iter_mut().zip(betas.iter()) {
                let opts = LineOptions {
                    title: Some(format!("Factor exposure to {factor}")),
                    var_format: self.config.formats.betas,
                    legend_stats: LegendStats::AvgLast,
                    ..LineOptions::default()
                };
                render_time_series(table, &opts, Some(&mut *ax));
                self.shade(ax, table.index())?;
            }
            Ok(())
        })
    }

    pub fn plot_ra_perf_table(
        &self,
        period: Option<&TimePeriod>,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let perf = self.ra_perf_table(period, &self.config.perf_columns)?;
        let title = format!("RA performance table: {}", period_label(perf.period));
        self.draw_perf_table(&perf, title, ax)
    }

    /// Per-asset-group table against `benchmark`, or the first benchmark
    /// column when `None`.
    pub fn plot_ac_ra_perf_table(
        &self,
        benchmark: Option<&str>,
        period: Option<&TimePeriod>,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let name = match benchmark {
            Some(b) => b.to_string(),
            None => self.first_benchmark()?,
        };
        let price = self.get_benchmark_price(&name, None)?;
        let perf = self.ac_ra_perf_table(&price, period, &self.config.perf_columns)?;
        let title = format!(
            "RA performance table by Asset Group: {}",
            period_label(perf.period)
        );
        self.draw_perf_table(&perf, title, ax)
    }

    pub fn plot_performance_attribution(
        &self,
        ids: &[usize],
        period: Option<&TimePeriod>,
        metric: AttributionMetric,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let data = self.attribution_data(ids, period, metric)?;
        ensure_categories(&data, "attribution")?;
        let opts = BarOptions {
            stacked: false,
            title: Some(metric.title().to_string()),
            x_rotation: 90.0,
            legend_loc: Some(LegendLoc::UpperCenter),
            var_format: self.config.formats.pnl,
            yvar_format: self.config.formats.pnl,
            ..BarOptions::default()
        };
        Ok(render_bars(&data, &opts, ax))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn plot_regime_data(
        &self,
        benchmark: &str,
        grouped: bool,
        index: usize,
        kind: RegimeData,
        period: Option<&TimePeriod>,
        conditional: bool,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let data = self.regime_data(benchmark, grouped, index, kind, period, conditional)?;
        ensure_categories(&data, "regime data")?;
        let by = if grouped { "Asset Group" } else { "Strategies" };
        let var_format = match kind {
            RegimeData::Sharpe => NumFormat::fixed(2),
            RegimeData::AvgReturn | RegimeData::PaReturn => NumFormat::percent(2),
        };
        // Conditional Sharpe contributions add up to the total Sharpe.
        let totals = (conditional && kind == RegimeData::Sharpe).then(|| data.row_totals());
        let opts = BarOptions {
            stacked: false,
            title: Some(format!(
                "Sharpe ratio decomposition by {by} to {benchmark} Bear/Normal/Bull regimes"
            )),
            bar_values: BarValues::Top,
            var_format,
            yvar_format: var_format,
            legend_loc: Some(LegendLoc::UpperCenter),
            colors: Some(Regime::ALL.iter().map(|r| regime_color(*r)).collect()),
            totals,
            ..BarOptions::default()
        };
        Ok(render_bars(&data, &opts, ax))
    }

    /// `Ok(None)` without drawing when there is a single NAV column.
    pub fn plot_corr_table(
        &self,
        period: Option<&TimePeriod>,
        freq: Frequency,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        if self.navs.width() < 2 {
            debug!("correlation table needs two or more navs");
            return Ok(None);
        }
        let corr = self.corr_table(period, freq)?;
        let opts = TableOptions {
            title: Some(format!("Correlation of {freq} returns")),
            var_format: NumFormat::fixed(2),
            heatmap_columns: Some((0..corr.width()).collect()),
            ..TableOptions::default()
        };
        Ok(render_table(&corr, &opts, ax))
    }

    pub fn plot_periodic_returns(
        &self,
        period: Option<&TimePeriod>,
        freq: Frequency,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let returns = self.periodic_returns(period, freq)?;
        ensure_categories(&returns, "periodic returns")?;
        let opts = TableOptions {
            title: Some(format!("Strategy {} returns", freq.describe())),
            var_format: NumFormat::percent(1),
            heatmap_columns: Some((0..returns.width()).collect()),
            ..TableOptions::default()
        };
        Ok(render_table(&returns, &opts, ax))
    }

    /// One statistic per strategy as bars.
    pub fn plot_performance_bars(
        &self,
        period: Option<&TimePeriod>,
        stat: PerfStat,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let prices = self.get_navs(None, period)?;
        ensure_plottable(&prices, "portfolio navs")?;
        let data = self
            .analytics
            .perf_table(&prices, None, &[stat], &self.config.perf)?;
        let format = stat_format(stat);
        let opts = BarOptions {
            title: Some(format!(
                "{stat}: {}",
                period_label(TimePeriod::of_index(prices.index()))
            )),
            bar_values: BarValues::Top,
            var_format: format,
            yvar_format: format,
            legend_loc: None,
            ..BarOptions::default()
        };
        Ok(render_bars(&data, &opts, ax))
    }

    /// `freq` returns of every strategy against `benchmark` with a
    /// quadratic fit.
    pub fn plot_returns_scatter(
        &self,
        benchmark: &str,
        period: Option<&TimePeriod>,
        freq: Frequency,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let prices = self.get_navs(Some(benchmark), period)?;
        let returns = prices.resample_last(freq).returns().drop_all_nan_rows();
        ensure_plottable(&returns, "returns scatter")?;
        let opts = ScatterOptions {
            title: Some(format!("Scatterplot of {freq}-returns vs {benchmark}")),
            ..ScatterOptions::default()
        };
        Ok(render_returns_scatter(&returns, benchmark, &opts, ax))
    }

    pub fn plot_performance_periodic_table(
        &self,
        index: usize,
        period: Option<&TimePeriod>,
        freq: Frequency,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        let data = self.performance_periodic_data(index, period, freq)?;
        ensure_categories(&data, "attribution by instrument")?;
        let name = self.portfolio(index)?.name();
        let opts = TableOptions {
            title: Some(format!("{name} Attribution by Instrument")),
            var_format: NumFormat::percent(1),
            heatmap_columns: Some((0..data.width()).collect()),
            ..TableOptions::default()
        };
        Ok(render_table(&data, &opts, ax))
    }

    /// Draw one configured view with its default arguments.
    ///
    /// Views that compare two portfolios return `Ok(None)` when there is
    /// only one.
    pub fn plot(&self, view: ReportView, period: Option<&TimePeriod>) -> PlotResult {
        if view.needs_pair() && self.portfolios.len() < 2 {
            debug!(view = view.slug(), "skipping pairwise view for a single portfolio");
            return Ok(None);
        }
        let all: Vec<usize> = (0..self.portfolios.len()).collect();
        match view {
            ReportView::Nav => self.plot_nav(period, None),
            ReportView::NavWithDd => self.plot_nav_with_dd(period, None),
            ReportView::PeriodicReturns => {
                self.plot_periodic_returns(period, self.config.periodic_freq, None)
            }
            ReportView::PerformanceBars => {
                self.plot_performance_bars(period, self.config.bar_stat, None)
            }
            ReportView::CorrTable => self.plot_corr_table(period, self.config.corr_freq, None),
            ReportView::Drawdowns => self.plot_drawdowns(period, None),
            ReportView::TimeUnderWater => self.plot_rolling_time_under_water(period, None),
            ReportView::RaPerfTable => self.plot_ra_perf_table(period, None),
            ReportView::AcRaPerfTable => self.plot_ac_ra_perf_table(None, period, None),
            ReportView::Exposures => self.plot_exposures(period, None),
            ReportView::InstrumentPnlDiff => {
                self.plot_instrument_pnl_diff(0, 1, true, period, None)
            }
            ReportView::ExposuresDiff => self.plot_exposures_diff(0, 1, period, None),
            ReportView::Turnover => self.plot_turnover(period, None),
            ReportView::Costs => self.plot_costs(period, None),
            ReportView::FactorBetas => {
                let prices = self
                    .raw_benchmark
                    .as_ref()
                    .ok_or_else(|| ReportError::MissingDependency("benchmark prices".into()))?;
                self.plot_factor_betas(prices, period, None)
            }
            ReportView::ReturnsScatter => {
                let benchmark = self.first_benchmark()?;
                self.plot_returns_scatter(&benchmark, period, self.config.scatter_freq, None)
            }
            ReportView::PerformanceAttribution => {
                self.plot_performance_attribution(&all, period, AttributionMetric::Pnl, None)
            }
            ReportView::PerformancePeriodicTable => {
                self.plot_performance_periodic_table(0, period, self.config.periodic_freq, None)
            }
            ReportView::RegimeData => {
                let benchmark = self.first_benchmark()?;
                self.plot_regime_data(&benchmark, false, 0, RegimeData::Sharpe, period, true, None)
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn size(&self) -> (u32, u32) {
        (self.config.figure.width, self.config.figure.height)
    }

    fn on_axes(
        &self,
        ax: Option<&mut Axes>,
        draw: impl FnOnce(&mut Axes) -> Result<(), ReportError>,
    ) -> PlotResult {
        match ax {
            Some(ax) => {
                draw(ax)?;
                Ok(None)
            }
            None => {
                let (w, h) = self.size();
                let mut fig = Figure::new(w, h);
                draw(fig.ax_mut())?;
                Ok(Some(fig))
            }
        }
    }

    /// Like `on_axes` for `n` stacked panels.
    fn on_axes_grid(
        &self,
        axs: Option<&mut [Axes]>,
        n: usize,
        draw: impl FnOnce(&mut [Axes]) -> Result<(), ReportError>,
    ) -> PlotResult {
        match axs {
            Some(axs) if axs.len() < n => Err(ReportError::ShapeMismatch(format!(
                "{n} panels needed, {} supplied",
                axs.len()
            ))),
            Some(axs) => {
                draw(&mut axs[..n])?;
                Ok(None)
            }
            None => {
                let (w, h) = self.size();
                let height = (h / 2).max(240) * n as u32;
                let mut fig = Figure::grid(n, 1, w, height);
                draw(fig.axes_mut())?;
                Ok(Some(fig))
            }
        }
    }

    /// Line chart with regime shading from the configured benchmark.
    fn draw_lines(
        &self,
        table: &TimeSeriesTable,
        opts: &LineOptions,
        ax: Option<&mut Axes>,
    ) -> PlotResult {
        self.on_axes(ax, |ax| {
            render_time_series(table, opts, Some(&mut *ax));
            self.shade(ax, table.index())
        })
    }

    fn shade(&self, ax: &mut Axes, index: &[NaiveDate]) -> Result<(), ReportError> {
        match self.config.regime_benchmark.as_deref() {
            Some(b) => self.add_regime_shadows(ax, b, index),
            None => Ok(()),
        }
    }

    /// Drawdown inputs; a lone portfolio is shown next to the regime
    /// benchmark when one is configured.
    fn underwater_prices(&self, period: Option<&TimePeriod>) -> Result<TimeSeriesTable, ReportError> {
        match self.config.regime_benchmark.as_deref() {
            Some(b) if self.portfolios.len() == 1 => self.get_navs(Some(b), period),
            _ => self.get_navs(None, period),
        }
    }

    /// Legend labels carrying return, vol and Sharpe per column.
    fn perf_labels(&self, prices: &TimeSeriesTable) -> Result<Vec<String>, ReportError> {
        let stats = [PerfStat::PaReturn, PerfStat::Vol, PerfStat::Sharpe];
        let table = self.analytics.perf_table(prices, None, &stats, &self.config.perf)?;
        let pct = NumFormat::percent(1);
        Ok((0..table.len())
            .map(|r| {
                format!(
                    "{}: p.a.={}, vol={}, Sharpe={}",
                    table.labels()[r],
                    pct.format(table.value(r, 0)),
                    pct.format(table.value(r, 1)),
                    NumFormat::fixed(2).format(table.value(r, 2)),
                )
            })
            .collect())
    }

    fn draw_perf_table(&self, perf: &PerfTable, title: String, ax: Option<&mut Axes>) -> PlotResult {
        ensure_categories(&perf.table, "performance table")?;
        let column_formats = self
            .config
            .perf_columns
            .iter()
            .map(|s| (s.title().to_string(), stat_format(*s)))
            .collect();
        let opts = TableOptions {
            title: Some(title),
            column_formats,
            row_edges: perf.row_edges.clone(),
            ..TableOptions::default()
        };
        Ok(render_table(&perf.table, &opts, ax))
    }
}

fn concat_owned(tables: &[TimeSeriesTable]) -> Result<TimeSeriesTable, ReportError> {
    let refs: Vec<&TimeSeriesTable> = tables.iter().collect();
    Ok(concat_columns(&refs)?)
}

fn ensure_plottable(table: &TimeSeriesTable, what: &str) -> Result<(), ReportError> {
    if table.is_degenerate() {
        warn!(what, rows = table.len(), columns = table.width(), "no finite data to plot");
        return Err(ReportError::ShapeMismatch(what.to_string()));
    }
    Ok(())
}

fn ensure_categories(table: &CategoryTable, what: &str) -> Result<(), ReportError> {
    if table.is_empty() || table.values().all(|v| v.is_nan()) {
        warn!(what, rows = table.len(), "no finite data to plot");
        return Err(ReportError::ShapeMismatch(what.to_string()));
    }
    Ok(())
}

fn relabel_legend(ax: &mut Axes, labels: Vec<String>) {
    if let Some(legend) = ax.legend.as_mut() {
        if legend.entries.len() == labels.len() {
            for (entry, label) in legend.entries.iter_mut().zip(labels) {
                entry.label = label;
            }
        }
    }
}

fn stat_format(stat: PerfStat) -> NumFormat {
    if stat.is_percent() {
        NumFormat::percent(1)
    } else {
        NumFormat::fixed(2)
    }
}

fn date_format_for(freq: Frequency) -> &'static str {
    match freq {
        Frequency::YearEnd => "%Y",
        Frequency::QuarterEnd | Frequency::MonthEnd => "%b-%y",
        _ => "%d-%b-%y",
    }
}

fn period_label(period: Option<TimePeriod>) -> String {
    period.map_or_else(|| "empty".to_string(), |p| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folioscope_core::{AssetGroups, PortfolioData};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn month_ends(n: usize) -> Vec<NaiveDate> {
        Frequency::MonthEnd.grid(d("2020-01-31"), d("2030-12-31"))[..n].to_vec()
    }

    fn portfolio(name: &str, drift: f64, dates: &[NaiveDate]) -> PortfolioData {
        let nav: Vec<f64> = (0..dates.len())
            .map(|i| (1.0 + drift).powi(i as i32) * (1.0 + 0.02 * ((i % 3) as f64 - 1.0)))
            .collect();
        let pnl = TimeSeriesTable::new(
            dates.to_vec(),
            vec![
                ("ES".into(), dates.iter().map(|_| drift * 0.6).collect()),
                ("TY".into(), dates.iter().map(|_| drift * 0.4).collect()),
            ],
        )
        .unwrap();
        let exposures = TimeSeriesTable::new(
            dates.to_vec(),
            vec![
                ("ES".into(), vec![0.5; dates.len()]),
                ("TY".into(), vec![0.25; dates.len()]),
            ],
        )
        .unwrap();
        PortfolioData::new(name, TimeSeriesTable::from_series(name, dates.to_vec(), nav).unwrap())
            .unwrap()
            .with_instrument_pnl(pnl)
            .with_exposures(exposures.clone())
            .with_turnover(exposures.map_values(|v| v * 0.1))
            .with_costs(exposures.map_values(|v| v * 0.001))
            .with_groups(AssetGroups::new(vec![
                ("Equity".into(), vec!["ES".into()]),
                ("Rates".into(), vec!["TY".into()]),
            ]))
    }

    fn benchmark(dates: &[NaiveDate]) -> TimeSeriesTable {
        let values = (0..dates.len())
            .map(|i| 100.0 * (1.0 + 0.01 * ((i * 7 % 11) as f64 - 5.0) / 5.0).powi(i as i32 % 4 + 1))
            .collect();
        TimeSeriesTable::from_series("SPY", dates.to_vec(), values).unwrap()
    }

    #[test]
    fn empty_portfolio_list_is_rejected() {
        assert!(matches!(
            MultiPortfolioView::new(Vec::new()),
            Err(ReportError::NoPortfolios)
        ));
    }

    #[test]
    fn navs_lead_with_benchmark_when_asked() {
        let dates = month_ends(24);
        let (a, b) = (portfolio("A", 0.01, &dates), portfolio("B", 0.005, &dates));
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b])
            .unwrap()
            .with_benchmark(benchmark(&dates))
            .unwrap();
        let navs = view.get_navs(Some("SPY"), None).unwrap();
        assert_eq!(navs.names(), &["SPY", "A", "B"]);
        assert_eq!(view.get_navs(None, None).unwrap().names(), &["A", "B"]);
    }

    #[test]
    fn late_benchmark_keeps_resampled_nav_frequency() {
        let dates = month_ends(12);
        let a = portfolio("A", 0.01, &dates);
        let mut view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult]).unwrap();
        view.set_navs(Some(Frequency::QuarterEnd)).unwrap();
        let quarterly = view.navs().index().to_vec();
        assert!(quarterly.len() < dates.len());

        view.set_benchmark_prices(benchmark(&dates)).unwrap();
        assert_eq!(view.navs().index(), quarterly.as_slice());
        assert_eq!(view.benchmark_prices().unwrap().index(), quarterly.as_slice());
    }

    #[test]
    fn unknown_benchmark_column_is_missing_dependency() {
        let dates = month_ends(12);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult])
            .unwrap()
            .with_benchmark(benchmark(&dates))
            .unwrap();
        assert!(matches!(
            view.get_navs(Some("QQQ"), None),
            Err(ReportError::MissingDependency(_))
        ));
    }

    #[test]
    fn ac_navs_append_benchmark() {
        let dates = month_ends(12);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult])
            .unwrap()
            .with_benchmark(benchmark(&dates))
            .unwrap();
        let navs = view.get_ac_navs(0, Some("SPY"), None).unwrap();
        assert_eq!(navs.names(), &["A", "Equity", "Rates", "SPY"]);
    }

    #[test]
    fn ac_perf_prices_mark_block_edges() {
        let dates = month_ends(24);
        let (a, b) = (portfolio("A", 0.01, &dates), portfolio("B", 0.005, &dates));
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b])
            .unwrap()
            .with_benchmark(benchmark(&dates))
            .unwrap();
        let price = view.get_benchmark_price("SPY", None).unwrap();
        let (prices, edges) = view.ac_perf_prices(&price, None).unwrap();
        assert_eq!(
            prices.names(),
            &["SPY", "A", "B", "A-Equity", "A-Rates", "B-Equity", "B-Rates"]
        );
        assert_eq!(edges, vec![2, 4, 6]);

        let perf = view
            .ac_ra_perf_table(&price, None, &PerfStat::BENCHMARK_TABLE)
            .unwrap();
        assert_eq!(perf.table.len(), 6);
        assert!(!perf.table.labels().iter().any(|l| l == "SPY"));
    }

    #[test]
    fn net_exposures_sum_instruments() {
        let dates = month_ends(6);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult]).unwrap();
        let exposures = view.net_exposures(None).unwrap();
        assert_eq!(exposures.names(), &["A"]);
        assert!(exposures.column_at(0).iter().all(|v| (v - 0.75).abs() < 1e-12));
    }

    #[test]
    fn grouped_pnl_diff_leads_with_total() {
        let dates = month_ends(6);
        let (a, b) = (portfolio("A", 0.01, &dates), portfolio("B", 0.005, &dates));
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b]).unwrap();
        let diff = view.instrument_pnl_diff(0, 1, true, None).unwrap();
        assert_eq!(diff.names(), &["A-B", "Equity", "Rates"]);
        let last = diff.len() - 1;
        assert!((diff.value(last, 0) - 6.0 * 0.005).abs() < 1e-12);
    }

    #[test]
    fn rolling_turnover_waits_for_window() {
        let dates = month_ends(6);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult]).unwrap();
        let turnover = view.rolling_turnover(3, None).unwrap();
        assert!(turnover.value(1, 0).is_nan());
        assert!((turnover.value(2, 0) - 3.0 * 0.075).abs() < 1e-12);
    }

    #[test]
    fn rolling_turnover_rolls_over_union_index() {
        let dates = month_ends(6);
        let sparse: Vec<NaiveDate> = dates.iter().step_by(2).copied().collect();
        let (a, b) = (portfolio("A", 0.01, &dates), portfolio("B", 0.01, &sparse));
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b]).unwrap();
        let turnover = view.rolling_turnover(2, None).unwrap();
        assert_eq!(turnover.index(), dates.as_slice());
        assert!((turnover.value(5, 0) - 2.0 * 0.075).abs() < 1e-12);
        // B has no turnover on every other month, so no 2-row window is full.
        assert!(turnover.column("B").unwrap().iter().all(|v| v.is_nan()));

        let costs = view.rolling_costs(2, None).unwrap();
        assert!(costs.column("B").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn attribution_sorts_descending_and_drops_empty_rows() {
        let dates = month_ends(6);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult]).unwrap();
        let data = view.attribution_data(&[0], None, AttributionMetric::Pnl).unwrap();
        assert_eq!(data.labels(), &["ES", "TY"]);
        assert!(matches!(
            view.attribution_data(&[3], None, AttributionMetric::Pnl),
            Err(ReportError::IndexOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn corr_table_is_skipped_for_one_nav() {
        let dates = month_ends(12);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult]).unwrap();
        assert!(view.plot_corr_table(None, Frequency::MonthEnd, None).unwrap().is_none());
    }

    #[test]
    fn views_draw_into_supplied_axes() {
        let dates = month_ends(36);
        let (a, b) = (portfolio("A", 0.01, &dates), portfolio("B", 0.005, &dates));
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b]).unwrap();
        let mut ax = Axes::new();
        assert!(view.plot_exposures(None, Some(&mut ax)).unwrap().is_none());
        assert_eq!(ax.title.as_deref(), Some("Portfolio net exposures"));
        assert_eq!(ax.lines().count(), 2);
    }

    #[test]
    fn regime_shading_follows_config() {
        let dates = month_ends(36);
        let a = portfolio("A", 0.01, &dates);
        let config = ReportConfig {
            regime_benchmark: Some("SPY".into()),
            ..ReportConfig::default()
        };
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult])
            .unwrap()
            .with_benchmark(benchmark(&dates))
            .unwrap()
            .with_config(config);
        let fig = view.plot_exposures(None, None).unwrap().unwrap();
        assert_eq!(fig.ax().spans().count(), dates.len() - 1);
    }

    #[test]
    fn nav_with_dd_needs_two_panels() {
        let dates = month_ends(24);
        let a = portfolio("A", 0.01, &dates);
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult]).unwrap();
        let mut one = vec![Axes::new()];
        assert!(matches!(
            view.plot_nav_with_dd(None, Some(&mut one)),
            Err(ReportError::ShapeMismatch(_))
        ));
        let fig = view.plot_nav_with_dd(None, None).unwrap().unwrap();
        assert_eq!(fig.shape(), (2, 1));
    }

    #[test]
    fn all_nan_exposures_are_not_plotted() {
        let dates = month_ends(6);
        let a = portfolio("A", 0.01, &dates);
        let b = portfolio("B", 0.01, &dates).with_exposures(
            TimeSeriesTable::from_series("ZZ", dates.clone(), vec![f64::NAN; 6]).unwrap(),
        );
        let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b]).unwrap();
        assert!(view.exposures_diff(0, 1, None).is_ok());
        assert!(matches!(
            view.plot_exposures_diff(0, 1, None, None),
            Err(ReportError::ShapeMismatch(_))
        ));
    }
}
