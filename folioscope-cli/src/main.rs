//! folioscope CLI: render multi-portfolio reports to SVG.
//!
//! Commands:
//! - `render`: load portfolio directories (and optional benchmark prices),
//!   draw every configured view into an output directory
//! - `views`: list the view names accepted in a config's `views` array
//! - `default-config`: print the default report config as TOML

mod loader;
mod logging;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use folioscope_core::{Frequency, PortfolioData, PortfolioResult, TimePeriod};
use folioscope_report::{MultiPortfolioView, ReportConfig, ReportExporter, ReportView};
use logging::LogFormat;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "folioscope", about = "folioscope: multi-portfolio report renderer")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, global = true, default_value = "pretty")]
    log_format: LogFormat,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the configured report views as SVG files.
    Render {
        /// Report config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Portfolio directory; repeat for each portfolio.
        #[arg(long = "portfolio", required = true)]
        portfolios: Vec<PathBuf>,

        /// Benchmark prices (CSV or Parquet), one column per benchmark.
        #[arg(long)]
        benchmark: Option<PathBuf>,

        /// Output directory.
        #[arg(long, default_value = "report")]
        out: PathBuf,

        /// First date of the report window (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Last date of the report window (YYYY-MM-DD).
        #[arg(long)]
        end: Option<String>,

        /// Resample the unified NAVs to this frequency (e.g. B, W-FRI, M).
        #[arg(long)]
        nav_freq: Option<String>,
    },
    /// List view names.
    Views,
    /// Print the default report config.
    DefaultConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format, &cli.log_level)?;

    match cli.command {
        Commands::Render {
            config,
            portfolios,
            benchmark,
            out,
            start,
            end,
            nav_freq,
        } => run_render(config, portfolios, benchmark, out, start, end, nav_freq),
        Commands::Views => {
            for view in ReportView::ALL {
                let note = match (view.needs_benchmark(), view.needs_pair()) {
                    (true, _) => "  (needs --benchmark)",
                    (_, true) => "  (needs two portfolios)",
                    _ => "",
                };
                println!("{}{note}", view.slug());
            }
            Ok(())
        }
        Commands::DefaultConfig => {
            print!("{}", ReportConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn parse_date(s: Option<String>) -> Result<Option<NaiveDate>> {
    s.as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Dates must be YYYY-MM-DD")
}

fn run_render(
    config: Option<PathBuf>,
    portfolio_dirs: Vec<PathBuf>,
    benchmark: Option<PathBuf>,
    out: PathBuf,
    start: Option<String>,
    end: Option<String>,
    nav_freq: Option<String>,
) -> Result<()> {
    let config = match config {
        Some(path) => ReportConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    let (start, end) = (parse_date(start)?, parse_date(end)?);
    let period = (start.is_some() || end.is_some()).then(|| TimePeriod::new(start, end));
    let nav_freq = nav_freq
        .as_deref()
        .map(|f| f.parse::<Frequency>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid --nav-freq: {e}"))?;

    let portfolios: Vec<PortfolioData> = portfolio_dirs
        .iter()
        .map(|dir| loader::load_portfolio(dir))
        .collect::<Result<_>>()?;
    let refs: Vec<&dyn PortfolioResult> =
        portfolios.iter().map(|p| p as &dyn PortfolioResult).collect();

    let mut view = MultiPortfolioView::new(refs)
        .context("Failed to build portfolio view")?
        .with_config(config);
    if nav_freq.is_some() {
        view.set_navs(nav_freq).context("Failed to resample navs")?;
    }
    if let Some(path) = benchmark {
        let prices = loader::read_table(&path)?;
        view.set_benchmark_prices(prices)
            .context("Failed to attach benchmark prices")?;
    }

    let exporter = ReportExporter::new(&out)?;
    let manifest = exporter.export(&view, period.as_ref())?;
    info!(
        written = manifest.written.len(),
        skipped = manifest.skipped.len(),
        out = %out.display(),
        "render complete"
    );
    for skipped in &manifest.skipped {
        eprintln!("skipped {}: {}", skipped.view.slug(), skipped.reason);
    }
    Ok(())
}
