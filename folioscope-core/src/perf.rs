//! Performance statistics used by the report views.
//!
//! `PerfAnalytics` is the seam: report code only talks to the trait, and
//! `StandardAnalytics` is the stock implementation. Helper functions are
//! pure: slices or tables in, numbers or tables out.

use crate::frequency::Frequency;
use crate::table::{CategoryTable, TableError, TimeSeriesTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PerfError {
    #[error("not enough observations for {0}")]
    InsufficientData(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Sampling used for risk-adjusted statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfParams {
    pub freq: Frequency,
    /// Annual risk-free rate.
    pub rf_rate: f64,
}

impl Default for PerfParams {
    fn default() -> Self {
        Self {
            freq: Frequency::Weekly(chrono::Weekday::Wed),
            rf_rate: 0.0,
        }
    }
}

/// Benchmark-return quantile regime parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeParams {
    pub freq: Frequency,
    /// Lower and upper quantiles splitting bear / normal / bull periods.
    pub quantiles: [f64; 2],
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            freq: Frequency::MonthEnd,
            quantiles: [0.16, 0.84],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerfStat {
    TotalReturn,
    PaReturn,
    Vol,
    Sharpe,
    MaxDd,
    MaxDdVol,
    Skew,
    Alpha,
    Beta,
    R2,
}

impl PerfStat {
    /// Columns of the benchmark-relative performance table.
    pub const BENCHMARK_TABLE: [PerfStat; 9] = [
        PerfStat::PaReturn,
        PerfStat::Vol,
        PerfStat::Sharpe,
        PerfStat::MaxDd,
        PerfStat::MaxDdVol,
        PerfStat::Skew,
        PerfStat::Alpha,
        PerfStat::Beta,
        PerfStat::R2,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PerfStat::TotalReturn => "Total return",
            PerfStat::PaReturn => "P.a. return",
            PerfStat::Vol => "Vol",
            PerfStat::Sharpe => "Sharpe rf=0",
            PerfStat::MaxDd => "Max DD",
            PerfStat::MaxDdVol => "Max DD/Vol",
            PerfStat::Skew => "Skew",
            PerfStat::Alpha => "Alpha",
            PerfStat::Beta => "Beta",
            PerfStat::R2 => "R2",
        }
    }

    /// Whether the statistic reads naturally as a percentage.
    pub fn is_percent(self) -> bool {
        matches!(
            self,
            PerfStat::TotalReturn
                | PerfStat::PaReturn
                | PerfStat::Vol
                | PerfStat::MaxDd
                | PerfStat::Alpha
                | PerfStat::R2
        )
    }
}

impl fmt::Display for PerfStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Bear,
    Normal,
    Bull,
}

impl Regime {
    pub const ALL: [Regime; 3] = [Regime::Bear, Regime::Normal, Regime::Bull];

    pub fn label(self) -> &'static str {
        match self {
            Regime::Bear => "Bear",
            Regime::Normal => "Normal",
            Regime::Bull => "Bull",
        }
    }
}

/// One classified benchmark period `(start, end]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub regime: Regime,
}

/// What a regime-conditioned table reports per regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeData {
    Sharpe,
    AvgReturn,
    PaReturn,
}

/// Numerical capability consumed by the report layer.
pub trait PerfAnalytics {
    /// One row per column of `prices` (excluding nothing), one column per stat.
    fn perf_table(
        &self,
        prices: &TimeSeriesTable,
        benchmark: Option<&str>,
        stats: &[PerfStat],
        params: &PerfParams,
    ) -> Result<CategoryTable, PerfError>;

    /// Running drawdown from the high-water mark, per column.
    fn drawdowns(&self, prices: &TimeSeriesTable) -> TimeSeriesTable;

    /// Calendar days since the last high-water mark, per column.
    fn time_under_water(&self, prices: &TimeSeriesTable) -> TimeSeriesTable;

    /// Classify benchmark periods into bear / normal / bull.
    fn classify_regimes(
        &self,
        benchmark: &[(NaiveDate, f64)],
        params: &RegimeParams,
    ) -> Result<Vec<RegimeSpan>, PerfError>;

    /// Regime-conditioned statistic per column of `prices`; columns of the
    /// result are the regimes in `Regime::ALL` order.
    fn regime_stats(
        &self,
        prices: &TimeSeriesTable,
        benchmark: &str,
        kind: RegimeData,
        conditional: bool,
        params: &RegimeParams,
    ) -> Result<CategoryTable, PerfError>;

    /// Pairwise correlation of `freq` returns.
    fn correlation(
        &self,
        prices: &TimeSeriesTable,
        freq: Frequency,
    ) -> Result<CategoryTable, PerfError>;

    /// Returns per `freq` period, rows labelled with `date_format`.
    fn periodic_returns(
        &self,
        prices: &TimeSeriesTable,
        freq: Frequency,
        date_format: &str,
    ) -> Result<CategoryTable, PerfError>;
}

/// Default implementation backed by the functions in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalytics;

impl PerfAnalytics for StandardAnalytics {
    fn perf_table(
        &self,
        prices: &TimeSeriesTable,
        benchmark: Option<&str>,
        stats: &[PerfStat],
        params: &PerfParams,
    ) -> Result<CategoryTable, PerfError> {
        let sampled = prices.resample_last(params.freq);
        let returns = sampled.returns();
        let ppy = params.freq.periods_per_year();
        let bench_returns = match benchmark {
            Some(b) => Some(
                returns
                    .column(b)
                    .ok_or_else(|| PerfError::UnknownColumn(b.to_string()))?
                    .to_vec(),
            ),
            None => None,
        };

        let mut rows = Vec::with_capacity(prices.width());
        for (c, (name, raw)) in prices.iter_columns().enumerate() {
            let valid_prices: Vec<(NaiveDate, f64)> = prices
                .index()
                .iter()
                .zip(raw.iter())
                .filter(|(_, p)| !p.is_nan())
                .map(|(d, p)| (*d, *p))
                .collect();
            let r: Vec<f64> = returns
                .column_at(c)
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            let regression = bench_returns
                .as_ref()
                .map(|b| ols(returns.column_at(c), b));

            let values = stats
                .iter()
                .map(|stat| match stat {
                    PerfStat::TotalReturn => total_return(&valid_prices),
                    PerfStat::PaReturn => pa_return(&valid_prices),
                    PerfStat::Vol => std_dev(&r) * ppy.sqrt(),
                    PerfStat::Sharpe => sharpe(&r, params.rf_rate, ppy),
                    PerfStat::MaxDd => max_drawdown(raw),
                    PerfStat::MaxDdVol => {
                        let vol = std_dev(&r) * ppy.sqrt();
                        if vol > 0.0 {
                            max_drawdown(raw) / vol
                        } else {
                            f64::NAN
                        }
                    }
                    PerfStat::Skew => skew(&r),
                    PerfStat::Alpha => regression.map_or(f64::NAN, |f| f.intercept * ppy),
                    PerfStat::Beta => regression.map_or(f64::NAN, |f| f.slope),
                    PerfStat::R2 => regression.map_or(f64::NAN, |f| f.r2),
                })
                .collect();
            rows.push((name.to_string(), values));
        }

        let names = stats.iter().map(|s| s.title().to_string()).collect();
        Ok(CategoryTable::from_rows(names, rows)?)
    }

    fn drawdowns(&self, prices: &TimeSeriesTable) -> TimeSeriesTable {
        let columns = prices
            .iter_columns()
            .map(|(_, values)| {
                let mut peak = f64::NAN;
                values
                    .iter()
                    .map(|p| {
                        if p.is_nan() {
                            return f64::NAN;
                        }
                        if peak.is_nan() || *p > peak {
                            peak = *p;
                        }
                        p / peak - 1.0
                    })
                    .collect()
            })
            .collect();
        TimeSeriesTable::from_parts(prices.index().to_vec(), prices.names().to_vec(), columns)
    }

    fn time_under_water(&self, prices: &TimeSeriesTable) -> TimeSeriesTable {
        let index = prices.index();
        let columns = prices
            .iter_columns()
            .map(|(_, values)| {
                let mut peak = f64::NAN;
                let mut peak_date: Option<NaiveDate> = None;
                values
                    .iter()
                    .zip(index.iter())
                    .map(|(p, d)| {
                        if p.is_nan() {
                            return f64::NAN;
                        }
                        if peak.is_nan() || *p >= peak {
                            peak = *p;
                            peak_date = Some(*d);
                        }
                        peak_date.map_or(f64::NAN, |pd| (*d - pd).num_days() as f64)
                    })
                    .collect()
            })
            .collect();
        TimeSeriesTable::from_parts(index.to_vec(), prices.names().to_vec(), columns)
    }

    fn classify_regimes(
        &self,
        benchmark: &[(NaiveDate, f64)],
        params: &RegimeParams,
    ) -> Result<Vec<RegimeSpan>, PerfError> {
        let (dates, values): (Vec<NaiveDate>, Vec<f64>) = benchmark.iter().copied().unzip();
        let table = TimeSeriesTable::from_series("benchmark", dates, values)?;
        let (index, returns) = sampled_returns(&table, params.freq, 0);
        let thresholds = regime_thresholds(&returns, params)?;

        let mut spans = Vec::with_capacity(returns.len());
        for i in 1..index.len() {
            let r = returns[i];
            if r.is_nan() {
                continue;
            }
            spans.push(RegimeSpan {
                start: index[i - 1],
                end: index[i],
                regime: classify(r, thresholds),
            });
        }
        Ok(spans)
    }

    fn regime_stats(
        &self,
        prices: &TimeSeriesTable,
        benchmark: &str,
        kind: RegimeData,
        conditional: bool,
        params: &RegimeParams,
    ) -> Result<CategoryTable, PerfError> {
        let bench_col = prices
            .position(benchmark)
            .ok_or_else(|| PerfError::UnknownColumn(benchmark.to_string()))?;
        let (_, bench_returns) = sampled_returns(prices, params.freq, bench_col);
        let thresholds = regime_thresholds(&bench_returns, params)?;
        let labels: Vec<Option<Regime>> = bench_returns
            .iter()
            .map(|r| (!r.is_nan()).then(|| classify(*r, thresholds)))
            .collect();
        let ppy = params.freq.periods_per_year();

        let mut rows = Vec::with_capacity(prices.width());
        for c in 0..prices.width() {
            let (_, r) = sampled_returns(prices, params.freq, c);
            let all: Vec<f64> = r.iter().copied().filter(|v| !v.is_nan()).collect();
            let total_std = std_dev(&all);
            let values = Regime::ALL
                .iter()
                .map(|regime| {
                    let in_regime: Vec<f64> = r
                        .iter()
                        .zip(labels.iter())
                        .filter(|(v, l)| !v.is_nan() && **l == Some(*regime))
                        .map(|(v, _)| *v)
                        .collect();
                    if in_regime.is_empty() {
                        return f64::NAN;
                    }
                    match kind {
                        RegimeData::AvgReturn => mean(&in_regime),
                        RegimeData::PaReturn => mean(&in_regime) * ppy,
                        RegimeData::Sharpe if conditional => {
                            if total_std > 0.0 && !all.is_empty() {
                                let contribution = in_regime.iter().sum::<f64>() / all.len() as f64;
                                contribution * ppy.sqrt() / total_std
                            } else {
                                f64::NAN
                            }
                        }
                        RegimeData::Sharpe => sharpe(&in_regime, 0.0, ppy),
                    }
                })
                .collect();
            rows.push((prices.names()[c].clone(), values));
        }

        let names = Regime::ALL.iter().map(|r| r.label().to_string()).collect();
        Ok(CategoryTable::from_rows(names, rows)?)
    }

    fn correlation(
        &self,
        prices: &TimeSeriesTable,
        freq: Frequency,
    ) -> Result<CategoryTable, PerfError> {
        let returns = prices.resample_last(freq).returns();
        let names: Vec<String> = prices.names().to_vec();
        let rows = (0..returns.width())
            .map(|i| {
                let values = (0..returns.width())
                    .map(|j| {
                        if i == j {
                            1.0
                        } else {
                            pearson(returns.column_at(i), returns.column_at(j))
                        }
                    })
                    .collect();
                (names[i].clone(), values)
            })
            .collect();
        Ok(CategoryTable::from_rows(names.clone(), rows)?)
    }

    fn periodic_returns(
        &self,
        prices: &TimeSeriesTable,
        freq: Frequency,
        date_format: &str,
    ) -> Result<CategoryTable, PerfError> {
        let sampled = prices.resample_last(freq);
        let labels: Vec<String> = sampled
            .index()
            .iter()
            .map(|d| d.format(date_format).to_string())
            .collect();
        let columns = prices
            .iter_columns()
            .enumerate()
            .map(|(c, (name, raw))| {
                let mut prev = raw.iter().copied().find(|v| !v.is_nan()).unwrap_or(f64::NAN);
                let values = sampled
                    .column_at(c)
                    .iter()
                    .map(|v| {
                        if v.is_nan() || prev.is_nan() || prev == 0.0 {
                            return f64::NAN;
                        }
                        let r = v / prev - 1.0;
                        prev = *v;
                        r
                    })
                    .collect();
                (name.to_string(), values)
            })
            .collect();
        Ok(CategoryTable::new(labels, columns)?)
    }
}

/// Sample returns of one column at `freq`: `(period index, returns)`.
fn sampled_returns(table: &TimeSeriesTable, freq: Frequency, col: usize) -> (Vec<NaiveDate>, Vec<f64>) {
    let sampled = table.resample_last(freq);
    let returns = sampled.returns();
    (returns.index().to_vec(), returns.column_at(col).to_vec())
}

fn regime_thresholds(returns: &[f64], params: &RegimeParams) -> Result<(f64, f64), PerfError> {
    let mut valid: Vec<f64> = returns.iter().copied().filter(|v| !v.is_nan()).collect();
    if valid.len() < 2 {
        return Err(PerfError::InsufficientData(format!(
            "regime classification at {} frequency",
            params.freq.describe()
        )));
    }
    valid.sort_by(|a, b| a.total_cmp(b));
    Ok((
        quantile(&valid, params.quantiles[0]),
        quantile(&valid, params.quantiles[1]),
    ))
}

fn classify(r: f64, (lo, hi): (f64, f64)) -> Regime {
    if r < lo {
        Regime::Bear
    } else if r > hi {
        Regime::Bull
    } else {
        Regime::Normal
    }
}

// ─── Pure helpers ───────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1); `NaN` below two observations.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Annualised Sharpe ratio of periodic returns.
pub fn sharpe(returns: &[f64], rf_rate: f64, periods_per_year: f64) -> f64 {
    let std = std_dev(returns);
    if !(std > 1e-15) {
        return f64::NAN;
    }
    let excess = mean(returns) - rf_rate / periods_per_year;
    excess / std * periods_per_year.sqrt()
}

/// Adjusted Fisher–Pearson skewness.
pub fn skew(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return f64::NAN;
    }
    let m = mean(values);
    let s = std_dev(values);
    if !(s > 0.0) {
        return f64::NAN;
    }
    let nf = n as f64;
    let sum: f64 = values.iter().map(|v| ((v - m) / s).powi(3)).sum();
    nf / ((nf - 1.0) * (nf - 2.0)) * sum
}

/// Deepest peak-to-trough decline; `NaN` values are skipped.
pub fn max_drawdown(prices: &[f64]) -> f64 {
    let mut peak = f64::NAN;
    let mut worst = 0.0_f64;
    let mut seen = false;
    for p in prices.iter().filter(|p| !p.is_nan()) {
        seen = true;
        if peak.is_nan() || *p > peak {
            peak = *p;
        }
        worst = worst.min(p / peak - 1.0);
    }
    if seen {
        worst
    } else {
        f64::NAN
    }
}

fn total_return(prices: &[(NaiveDate, f64)]) -> f64 {
    match (prices.first(), prices.last()) {
        (Some((_, a)), Some((_, b))) if *a != 0.0 && prices.len() > 1 => b / a - 1.0,
        _ => f64::NAN,
    }
}

fn pa_return(prices: &[(NaiveDate, f64)]) -> f64 {
    let (Some((d0, p0)), Some((d1, p1))) = (prices.first(), prices.last()) else {
        return f64::NAN;
    };
    let years = (*d1 - *d0).num_days() as f64 / 365.25;
    if years <= 0.0 || *p0 <= 0.0 || *p1 <= 0.0 {
        return f64::NAN;
    }
    (p1 / p0).powf(1.0 / years) - 1.0
}

/// Linear-interpolated quantile of sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Pearson correlation over rows where both values are present.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b.iter())
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        sxy += (x - mx) * (y - my);
        sxx += (x - mx).powi(2);
        syy += (y - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Simple regression of `y` on `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub r2: f64,
}

/// Ordinary least squares of `y` on `x` over rows where both are present.
pub fn ols(y: &[f64], x: &[f64]) -> LinearFit {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .collect();
    let nan = LinearFit {
        intercept: f64::NAN,
        slope: f64::NAN,
        r2: f64::NAN,
    };
    if pairs.len() < 2 {
        return nan;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (a, b) in &pairs {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
    }
    if sxx == 0.0 {
        return nan;
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let corr = pearson(y, x);
    LinearFit {
        intercept,
        slope,
        r2: corr * corr,
    }
}

/// Trailing-window beta of `y` on `x`. Rows before the window fills, or
/// with fewer than two paired observations, are `NaN`.
pub fn rolling_beta(y: &[f64], x: &[f64], window: usize) -> Vec<f64> {
    let n = y.len().min(x.len());
    (0..n)
        .map(|end| {
            if window == 0 || end + 1 < window {
                return f64::NAN;
            }
            let start = end + 1 - window;
            ols(&y[start..=end], &x[start..=end]).slope
        })
        .collect()
}

/// Least-squares quadratic `c0 + c1 x + c2 x^2`.
pub fn quadratic_fit(points: &[(f64, f64)]) -> Option<[f64; 3]> {
    let pts: Vec<&(f64, f64)> = points
        .iter()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if pts.len() < 3 {
        return None;
    }
    // Normal equations: A^T A c = A^T y with A = [1, x, x^2].
    let mut m = [[0.0_f64; 4]; 3];
    for (x, y) in pts {
        let basis = [1.0, *x, x * x];
        for r in 0..3 {
            for c in 0..3 {
                m[r][c] += basis[r] * basis[c];
            }
            m[r][3] += basis[r] * y;
        }
    }
    for col in 0..3 {
        let pivot = (col..3).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        for row in 0..3 {
            if row != col {
                let factor = m[row][col] / m[col][col];
                for k in col..4 {
                    m[row][k] -= factor * m[col][k];
                }
            }
        }
    }
    Some([m[0][3] / m[0][0], m[1][3] / m[1][1], m[2][3] / m[2][2]])
}
