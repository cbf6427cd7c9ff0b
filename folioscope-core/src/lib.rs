//! folioscope core: data model and numerics for portfolio reporting.
//!
//! - Date-indexed and categorical tables with explicit alignment and fill
//! - Calendar frequencies, time periods and number formats
//! - The `PortfolioResult` trait and its in-memory implementation
//! - Performance statistics and benchmark regime classification
//! - Polars / Parquet interop

pub mod format;
pub mod frame;
pub mod frequency;
pub mod period;
pub mod perf;
pub mod portfolio;
pub mod table;

pub use format::NumFormat;
pub use frequency::Frequency;
pub use perf::{
    PerfAnalytics, PerfError, PerfParams, PerfStat, Regime, RegimeData, RegimeParams, RegimeSpan,
    StandardAnalytics,
};
pub use period::TimePeriod;
pub use portfolio::{AssetGroups, AttributionMetric, ExposureGrouping, PortfolioData, PortfolioResult};
pub use table::{CategoryTable, Fill, TableError, TimeSeriesTable};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: report inputs can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<TimeSeriesTable>();
        require_sync::<TimeSeriesTable>();
        require_send::<CategoryTable>();
        require_sync::<CategoryTable>();
        require_send::<PortfolioData>();
        require_sync::<PortfolioData>();
        require_send::<StandardAnalytics>();
        require_sync::<StandardAnalytics>();
        require_send::<PerfParams>();
        require_sync::<PerfParams>();
        require_send::<RegimeParams>();
        require_sync::<RegimeParams>();
    }

    /// `PerfAnalytics` stays object-safe so views can hold a boxed capability.
    #[test]
    fn perf_analytics_is_object_safe() {
        let analytics: Box<dyn PerfAnalytics> = Box::new(StandardAnalytics);
        let empty = TimeSeriesTable::empty();
        assert!(analytics.drawdowns(&empty).is_empty());
    }
}
