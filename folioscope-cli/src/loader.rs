//! Load portfolio results and benchmark prices from disk.
//!
//! A portfolio directory holds one table per file, CSV or Parquet:
//!
//! ```text
//! trend/
//!   portfolio.toml   # optional: name and asset groups
//!   nav.csv          # required: date + one column
//!   pnl.csv          # optional instrument tables, one column each
//!   exposures.csv
//!   turnover.csv
//!   costs.parquet
//! ```
//!
//! CSV files carry a `date` column in `YYYY-MM-DD` followed by numeric
//! columns; blank cells are missing observations.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use folioscope_core::frame::{read_parquet, DATE_COLUMN};
use folioscope_core::{AssetGroups, PortfolioData, TimeSeriesTable};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PortfolioManifest {
    name: Option<String>,
    groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize)]
struct GroupEntry {
    name: String,
    instruments: Vec<String>,
}

/// Read a date-indexed table from `.csv` or `.parquet`.
pub fn read_table(path: &Path) -> Result<TimeSeriesTable> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => read_csv(path),
        Some("parquet") => read_parquet(path)
            .with_context(|| format!("Failed to read parquet {}", path.display())),
        _ => bail!("unsupported table file {}", path.display()),
    }
}

pub fn read_csv(path: &Path) -> Result<TimeSeriesTable> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let date_pos = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .with_context(|| format!("{} has no '{DATE_COLUMN}' column", path.display()))?;
    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_pos)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Bad record {} in {}", line + 2, path.display()))?;
        let raw_date = record.get(date_pos).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).with_context(|| {
            format!("Bad date '{raw_date}' on line {} of {}", line + 2, path.display())
        })?;
        let mut values = Vec::with_capacity(names.len());
        for (i, cell) in record.iter().enumerate() {
            if i == date_pos {
                continue;
            }
            values.push(parse_cell(cell).with_context(|| {
                format!("Bad value '{cell}' on line {} of {}", line + 2, path.display())
            })?);
        }
        rows.push((date, values));
    }
    rows.sort_by_key(|(d, _)| *d);

    let index = rows.iter().map(|(d, _)| *d).collect();
    let columns = names
        .into_iter()
        .enumerate()
        .map(|(c, name)| (name, rows.iter().map(|(_, v)| v[c]).collect()))
        .collect();
    let table = TimeSeriesTable::new(index, columns)
        .with_context(|| format!("Invalid table in {}", path.display()))?;
    debug!(path = %path.display(), rows = table.len(), columns = table.width(), "loaded table");
    Ok(table)
}

fn parse_cell(cell: &str) -> Result<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    Ok(cell.parse::<f64>()?)
}

/// First existing `{stem}.csv` or `{stem}.parquet` in `dir`.
fn find_table(dir: &Path, stem: &str) -> Option<PathBuf> {
    ["csv", "parquet"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

fn optional_table(dir: &Path, stem: &str) -> Result<Option<TimeSeriesTable>> {
    find_table(dir, stem).map(|p| read_table(&p)).transpose()
}

/// Load one portfolio directory.
pub fn load_portfolio(dir: &Path) -> Result<PortfolioData> {
    let manifest_path = dir.join("portfolio.toml");
    let manifest: PortfolioManifest = if manifest_path.is_file() {
        let content = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", manifest_path.display()))?
    } else {
        PortfolioManifest::default()
    };
    let name = match manifest.name {
        Some(name) => name,
        None => dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .with_context(|| format!("Cannot derive a portfolio name from {}", dir.display()))?,
    };

    let nav_path = find_table(dir, "nav")
        .with_context(|| format!("{} has no nav.csv or nav.parquet", dir.display()))?;
    let nav = read_table(&nav_path)?;
    let mut portfolio = PortfolioData::new(name.as_str(), nav)
        .with_context(|| format!("Invalid nav for portfolio '{name}'"))?;

    if let Some(pnl) = optional_table(dir, "pnl")? {
        portfolio = portfolio.with_instrument_pnl(pnl);
    }
    if let Some(exposures) = optional_table(dir, "exposures")? {
        portfolio = portfolio.with_exposures(exposures);
    }
    if let Some(turnover) = optional_table(dir, "turnover")? {
        portfolio = portfolio.with_turnover(turnover);
    }
    if let Some(costs) = optional_table(dir, "costs")? {
        portfolio = portfolio.with_costs(costs);
    }
    if !manifest.groups.is_empty() {
        let groups = manifest
            .groups
            .into_iter()
            .map(|g| (g.name, g.instruments))
            .collect();
        portfolio = portfolio.with_groups(AssetGroups::new(groups));
    }

    info!(portfolio = %name, dir = %dir.display(), "loaded portfolio");
    Ok(portfolio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folioscope_core::PortfolioResult;
    use std::fs;

    fn write(dir: &Path, file: &str, content: &str) {
        fs::write(dir.join(file), content).unwrap();
    }

    #[test]
    fn csv_blank_cells_are_nan_and_rows_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "prices.csv",
            "date,SPY,TLT\n2024-01-03,101.0,\n2024-01-02,100.0,90.5\n",
        );
        let table = read_csv(&dir.path().join("prices.csv")).unwrap();
        assert_eq!(table.names(), &["SPY", "TLT"]);
        assert_eq!(
            table.index(),
            &[
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ]
        );
        assert_eq!(table.value(0, 1), 90.5);
        assert!(table.value(1, 1).is_nan());
    }

    #[test]
    fn csv_without_date_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.csv", "day,SPY\n2024-01-02,1.0\n");
        let err = read_csv(&dir.path().join("bad.csv")).unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn portfolio_directory_with_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("trend");
        fs::create_dir(&root).unwrap();
        write(&root, "nav.csv", "date,nav\n2024-01-02,1.0\n2024-01-03,1.01\n");
        write(&root, "pnl.csv", "date,ES,TY\n2024-01-02,0.0,0.0\n2024-01-03,0.006,0.004\n");
        write(
            &root,
            "portfolio.toml",
            "name = \"Trend\"\n\n[[groups]]\nname = \"Equity\"\ninstruments = [\"ES\"]\n",
        );

        let portfolio = load_portfolio(&root).unwrap();
        assert_eq!(portfolio.name(), "Trend");
        assert_eq!(portfolio.nav_table().names(), &["Trend"]);
        assert_eq!(portfolio.instrument_pnl().width(), 2);
        assert_eq!(portfolio.asset_groups().names(), vec!["Equity"]);
    }

    #[test]
    fn portfolio_name_defaults_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("carry");
        fs::create_dir(&root).unwrap();
        write(&root, "nav.csv", "date,x\n2024-01-02,1.0\n");
        assert_eq!(load_portfolio(&root).unwrap().name(), "carry");
    }

    #[test]
    fn missing_nav_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_portfolio(dir.path()).is_err());
    }
}
