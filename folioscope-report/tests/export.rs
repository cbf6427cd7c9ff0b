use chrono::NaiveDate;
use folioscope_core::{AssetGroups, Frequency, PortfolioData, PortfolioResult, TimeSeriesTable};
use folioscope_report::{MultiPortfolioView, ReportConfig, ReportExporter, ReportView};

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn portfolio(name: &str, scale: f64, dates: &[NaiveDate]) -> PortfolioData {
    let pnl = TimeSeriesTable::new(
        dates.to_vec(),
        vec![
            (
                "ES".into(),
                (0..dates.len()).map(|i| scale * ((i % 5) as f64 - 1.5) / 100.0).collect(),
            ),
            (
                "TY".into(),
                (0..dates.len()).map(|i| scale * ((i % 3) as f64 - 0.8) / 200.0).collect(),
            ),
        ],
    )
    .unwrap();
    let nav = pnl.row_sum(name).compound();
    let exposures = pnl.map_values(|_| 0.5);
    PortfolioData::new(name, nav)
        .unwrap()
        .with_instrument_pnl(pnl)
        .with_exposures(exposures.clone())
        .with_turnover(exposures.map_values(|v| v * 0.2))
        .with_costs(exposures.map_values(|v| v * 0.0005))
        .with_groups(AssetGroups::new(vec![
            ("Equity".into(), vec!["ES".into()]),
            ("Rates".into(), vec!["TY".into()]),
        ]))
}

#[test]
fn exports_configured_views_with_manifest() {
    let dates = Frequency::MonthEnd.grid(d("2018-01-31"), d("2023-12-31"));
    let (a, b) = (portfolio("A", 1.0, &dates), portfolio("B", 0.6, &dates));
    let config = ReportConfig {
        roll_period: 12,
        views: vec![
            ReportView::Nav,
            ReportView::Exposures,
            ReportView::InstrumentPnlDiff,
            ReportView::RaPerfTable,
        ],
        ..ReportConfig::default()
    };
    let view = MultiPortfolioView::new(vec![&a as &dyn PortfolioResult, &b])
        .unwrap()
        .with_config(config);

    let dir = tempfile::tempdir().unwrap();
    let exporter = ReportExporter::new(dir.path().join("report")).unwrap();
    let manifest = exporter.export(&view, None).unwrap();

    let written: Vec<ReportView> = manifest.written.iter().map(|w| w.view).collect();
    assert_eq!(
        written,
        vec![ReportView::Nav, ReportView::Exposures, ReportView::InstrumentPnlDiff]
    );
    // No benchmark attached.
    assert_eq!(manifest.skipped.len(), 1);
    assert_eq!(manifest.skipped[0].view, ReportView::RaPerfTable);
    assert!(manifest.skipped[0].reason.contains("benchmark"));

    for w in &manifest.written {
        let svg = std::fs::read_to_string(&w.path).unwrap();
        assert!(svg.starts_with("<svg"));
    }
    let json = std::fs::read_to_string(exporter.output_dir().join("manifest.json")).unwrap();
    assert!(json.contains("instrument_pnl_diff"));
    assert_eq!(manifest.portfolios, vec!["A".to_string(), "B".to_string()]);
}
