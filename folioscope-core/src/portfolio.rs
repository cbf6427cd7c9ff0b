//! Portfolio results as seen by the report layer.
//!
//! A backtest engine hands over a `PortfolioResult`; everything the
//! aggregator needs (grouped exposures, rolling turnover, asset-class NAVs,
//! attribution inputs) is derived from the handful of raw tables the trait
//! requires.

use crate::perf;
use crate::period::TimePeriod;
use crate::table::{concat_columns, CategoryTable, Fill, TableError, TimeSeriesTable};
use serde::{Deserialize, Serialize};

/// Ordered mapping of instruments into asset groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetGroups {
    groups: Vec<(String, Vec<String>)>,
}

/// Group used for instruments with no explicit assignment.
pub const UNGROUPED: &str = "Other";

impl AssetGroups {
    pub fn new(groups: Vec<(String, Vec<String>)>) -> Self {
        Self { groups }
    }

    /// Group names in report order.
    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|(g, _)| g.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_of(&self, instrument: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == instrument))
            .map(|(g, _)| g.as_str())
    }

    /// Sum instrument columns into one column per group (NaN-skipping).
    ///
    /// Groups appear in configured order, followed by `Other` when some
    /// instrument is unassigned. With `total` set, a leading column of the
    /// all-instrument sum is added under that name.
    pub fn aggregate(
        &self,
        table: &TimeSeriesTable,
        total: Option<&str>,
    ) -> Result<TimeSeriesTable, TableError> {
        let mut order: Vec<&str> = self.names();
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
        for (c, name) in table.names().iter().enumerate() {
            let group = self.group_of(name).unwrap_or(UNGROUPED);
            let slot = match order.iter().position(|g| *g == group) {
                Some(i) => i,
                None => {
                    order.push(group);
                    members.push(Vec::new());
                    order.len() - 1
                }
            };
            members[slot].push(c);
        }

        let mut columns = Vec::with_capacity(order.len() + 1);
        if let Some(total) = total {
            let all: Vec<usize> = (0..table.width()).collect();
            columns.push((total.to_string(), nansum_rows(table, &all)));
        }
        for (group, cols) in order.iter().zip(members.iter()) {
            if cols.is_empty() {
                continue;
            }
            columns.push((group.to_string(), nansum_rows(table, cols)));
        }
        TimeSeriesTable::new(table.index().to_vec(), columns)
    }
}

fn nansum_rows(table: &TimeSeriesTable, cols: &[usize]) -> Vec<f64> {
    (0..table.len())
        .map(|r| {
            cols.iter()
                .map(|&c| table.value(r, c))
                .filter(|v| !v.is_nan())
                .sum()
        })
        .collect()
}

/// How instrument exposures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposureGrouping {
    #[default]
    Instrument,
    /// Summed per asset group, optionally with a leading `Total` column.
    Grouped { total: bool },
}

/// Per-instrument quantity summarised by attribution views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMetric {
    #[default]
    Pnl,
    Turnover,
    Costs,
    Exposure,
}

impl AttributionMetric {
    pub fn title(self) -> &'static str {
        match self {
            AttributionMetric::Pnl => "P&L attribution",
            AttributionMetric::Turnover => "Turnover attribution",
            AttributionMetric::Costs => "Costs attribution",
            AttributionMetric::Exposure => "Average exposure",
        }
    }
}

/// Backtest output consumed by reference by report views.
///
/// Implementors supply raw instrument-level tables; aggregation is
/// provided. Instrument P&L is in return units so that group NAVs can be
/// compounded from it.
pub trait PortfolioResult {
    fn name(&self) -> &str;

    /// Single-column NAV named after the portfolio.
    fn nav_table(&self) -> &TimeSeriesTable;

    fn instrument_pnl(&self) -> &TimeSeriesTable;

    fn instrument_exposures(&self) -> &TimeSeriesTable;

    fn instrument_turnover(&self) -> &TimeSeriesTable;

    fn instrument_costs(&self) -> &TimeSeriesTable;

    fn asset_groups(&self) -> &AssetGroups;

    fn nav(&self, period: Option<&TimePeriod>) -> TimeSeriesTable {
        self.nav_table().locate_opt(period)
    }

    fn instrument_returns(&self, period: Option<&TimePeriod>) -> TimeSeriesTable {
        self.instrument_pnl().locate_opt(period)
    }

    fn exposures(
        &self,
        grouping: ExposureGrouping,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, TableError> {
        let raw = self.instrument_exposures().locate_opt(period);
        match grouping {
            ExposureGrouping::Instrument => Ok(raw),
            ExposureGrouping::Grouped { total } => self
                .asset_groups()
                .aggregate(&raw, total.then_some("Total")),
        }
    }

    /// Portfolio turnover summed across instruments, one column.
    fn turnover(&self, period: Option<&TimePeriod>) -> TimeSeriesTable {
        self.instrument_turnover()
            .locate_opt(period)
            .row_sum(self.name())
    }

    /// Portfolio costs summed across instruments, one column.
    fn costs(&self, period: Option<&TimePeriod>) -> TimeSeriesTable {
        self.instrument_costs().locate_opt(period).row_sum(self.name())
    }

    /// Portfolio NAV first, then one compounded NAV per asset group.
    fn ac_navs(&self, period: Option<&TimePeriod>) -> Result<TimeSeriesTable, TableError> {
        let nav = self.nav(period);
        let pnl = self.instrument_returns(period);
        let groups = self.asset_groups().aggregate(&pnl, None)?.compound();
        concat_columns(&[&nav, &groups])
    }

    /// Rolling beta of the portfolio to each column of `prices`.
    ///
    /// Factor prices are carried forward onto the NAV dates before returns
    /// are taken, so both return series cover the same periods.
    fn benchmark_betas(
        &self,
        prices: &TimeSeriesTable,
        window: usize,
        period: Option<&TimePeriod>,
    ) -> Result<TimeSeriesTable, TableError> {
        let nav = self.nav_table();
        let returns = nav.returns();
        let (_, portfolio) = returns.iter_columns().next().ok_or_else(|| {
            TableError::ShapeMismatch(format!("nav of '{}' has no column", self.name()))
        })?;
        let factors = prices.reindex(nav.index(), Fill::Forward).returns();
        let columns = factors
            .iter_columns()
            .map(|(name, factor)| {
                (name.to_string(), perf::rolling_beta(portfolio, factor, window))
            })
            .collect();
        Ok(TimeSeriesTable::new(nav.index().to_vec(), columns)?.locate_opt(period))
    }

    /// One value per instrument, column named after the portfolio.
    fn performance_data(
        &self,
        metric: AttributionMetric,
        period: Option<&TimePeriod>,
    ) -> CategoryTable {
        let (table, average) = match metric {
            AttributionMetric::Pnl => (self.instrument_pnl(), false),
            AttributionMetric::Turnover => (self.instrument_turnover(), false),
            AttributionMetric::Costs => (self.instrument_costs(), false),
            AttributionMetric::Exposure => (self.instrument_exposures(), true),
        };
        let table = table.locate_opt(period);
        let points = table
            .iter_columns()
            .map(|(name, values)| {
                let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
                let v = if average {
                    perf::mean(&valid)
                } else {
                    valid.iter().sum()
                };
                (name.to_string(), v)
            })
            .collect();
        CategoryTable::from_series(self.name(), points)
    }
}

/// In-memory portfolio result.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioData {
    name: String,
    nav: TimeSeriesTable,
    instrument_pnl: TimeSeriesTable,
    instrument_exposures: TimeSeriesTable,
    instrument_turnover: TimeSeriesTable,
    instrument_costs: TimeSeriesTable,
    groups: AssetGroups,
}

impl PortfolioData {
    /// Portfolio with only a NAV; instrument tables start empty.
    pub fn new(name: impl Into<String>, nav: TimeSeriesTable) -> Result<Self, TableError> {
        let name = name.into();
        if nav.width() != 1 {
            return Err(TableError::ShapeMismatch(format!(
                "nav of '{name}' must have exactly one column, found {}",
                nav.width()
            )));
        }
        let nav = nav.with_names(vec![name.clone()])?;
        Ok(Self {
            name,
            nav,
            instrument_pnl: TimeSeriesTable::empty(),
            instrument_exposures: TimeSeriesTable::empty(),
            instrument_turnover: TimeSeriesTable::empty(),
            instrument_costs: TimeSeriesTable::empty(),
            groups: AssetGroups::default(),
        })
    }

    pub fn with_instrument_pnl(mut self, table: TimeSeriesTable) -> Self {
        self.instrument_pnl = table;
        self
    }

    pub fn with_exposures(mut self, table: TimeSeriesTable) -> Self {
        self.instrument_exposures = table;
        self
    }

    pub fn with_turnover(mut self, table: TimeSeriesTable) -> Self {
        self.instrument_turnover = table;
        self
    }

    pub fn with_costs(mut self, table: TimeSeriesTable) -> Self {
        self.instrument_costs = table;
        self
    }

    pub fn with_groups(mut self, groups: AssetGroups) -> Self {
        self.groups = groups;
        self
    }
}

impl PortfolioResult for PortfolioData {
    fn name(&self) -> &str {
        &self.name
    }

    fn nav_table(&self) -> &TimeSeriesTable {
        &self.nav
    }

    fn instrument_pnl(&self) -> &TimeSeriesTable {
        &self.instrument_pnl
    }

    fn instrument_exposures(&self) -> &TimeSeriesTable {
        &self.instrument_exposures
    }

    fn instrument_turnover(&self) -> &TimeSeriesTable {
        &self.instrument_turnover
    }

    fn instrument_costs(&self) -> &TimeSeriesTable {
        &self.instrument_costs
    }

    fn asset_groups(&self) -> &AssetGroups {
        &self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dates() -> Vec<NaiveDate> {
        vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-03")]
    }

    fn groups() -> AssetGroups {
        AssetGroups::new(vec![
            ("Equities".into(), vec!["SPY".into(), "QQQ".into()]),
            ("Bonds".into(), vec!["TLT".into()]),
        ])
    }

    fn instruments(values: [[f64; 4]; 3]) -> TimeSeriesTable {
        let names = ["SPY", "TLT", "QQQ", "GLD"];
        let columns = (0..4)
            .map(|c| (names[c].to_string(), values.iter().map(|row| row[c]).collect()))
            .collect();
        TimeSeriesTable::new(dates(), columns).unwrap()
    }

    fn portfolio() -> PortfolioData {
        let nav = TimeSeriesTable::from_series("x", dates(), vec![1.0, 1.02, 1.01]).unwrap();
        PortfolioData::new("alpha", nav)
            .unwrap()
            .with_instrument_pnl(instruments([
                [0.01, 0.0, 0.01, 0.0],
                [0.01, -0.01, f64::NAN, 0.02],
                [0.0, 0.0, 0.0, 0.0],
            ]))
            .with_exposures(instruments([
                [0.5, 0.3, 0.2, 0.1],
                [0.5, 0.3, 0.2, 0.1],
                [0.4, 0.3, 0.2, 0.1],
            ]))
            .with_groups(groups())
    }

    #[test]
    fn nav_is_renamed_after_portfolio() {
        let p = portfolio();
        assert_eq!(p.nav(None).names(), &["alpha"]);
    }

    #[test]
    fn nav_must_be_single_column() {
        let nav = TimeSeriesTable::new(
            dates(),
            vec![("a".into(), vec![1.0; 3]), ("b".into(), vec![1.0; 3])],
        )
        .unwrap();
        assert!(matches!(
            PortfolioData::new("p", nav),
            Err(TableError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn aggregate_keeps_group_order_and_collects_other() {
        let grouped = groups()
            .aggregate(&portfolio().instrument_exposures, Some("Total"))
            .unwrap();
        assert_eq!(grouped.names(), &["Total", "Equities", "Bonds", "Other"]);
        assert!((grouped.value(0, 0) - 1.1).abs() < 1e-12);
        assert!((grouped.value(0, 1) - 0.7).abs() < 1e-12);
        assert!((grouped.value(2, 1) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn grouped_sum_skips_nan() {
        let p = portfolio();
        let grouped = p.asset_groups().aggregate(p.instrument_pnl(), None).unwrap();
        assert!((grouped.value(1, 0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn ac_navs_lead_with_portfolio() {
        let navs = portfolio().ac_navs(None).unwrap();
        assert_eq!(navs.names(), &["alpha", "Equities", "Bonds", "Other"]);
        assert!((navs.value(0, 1) - 1.02).abs() < 1e-12);
        assert!((navs.value(1, 1) - 1.02 * 1.01).abs() < 1e-12);
    }

    #[test]
    fn exposure_attribution_averages() {
        let t = portfolio().performance_data(AttributionMetric::Exposure, None);
        assert_eq!(t.names(), &["alpha"]);
        assert!((t.value(0, 0) - (0.5 + 0.5 + 0.4) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn turnover_of_empty_table_is_empty() {
        let t = portfolio().turnover(None);
        assert!(t.is_empty());
        assert_eq!(t.names(), &["alpha"]);
    }
}
