//! Write configured report views to disk.
//!
//! Each view becomes `{out}/{slug}.svg`; a `manifest.json` lists what was
//! written and why anything was skipped.

use crate::config::ReportView;
use crate::view::MultiPortfolioView;
use folioscope_core::TimePeriod;
use folioscope_plots::{write_svg, RenderError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write manifest: {0}")]
    Manifest(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedView {
    pub view: ReportView,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedView {
    pub view: ReportView,
    pub reason: String,
}

/// Summary of one export run, persisted as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportManifest {
    pub portfolios: Vec<String>,
    pub period: Option<TimePeriod>,
    pub written: Vec<ExportedView>,
    pub skipped: Vec<SkippedView>,
}

#[derive(Debug, Clone)]
pub struct ReportExporter {
    output_dir: PathBuf,
}

impl ReportExporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).map_err(|source| ExportError::CreateDir {
            path: output_dir.clone(),
            source,
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Render every view in the view's config.
    ///
    /// Data problems (missing benchmark, nothing to plot) skip the view and
    /// are recorded in the manifest; I/O and backend failures abort.
    pub fn export(
        &self,
        view: &MultiPortfolioView<'_>,
        period: Option<&TimePeriod>,
    ) -> Result<ReportManifest, ExportError> {
        let mut manifest = ReportManifest {
            portfolios: view.portfolios().iter().map(|p| p.name().to_string()).collect(),
            period: period.copied(),
            written: Vec::new(),
            skipped: Vec::new(),
        };

        for &report_view in &view.config().views {
            match view.plot(report_view, period) {
                Ok(Some(fig)) => {
                    let path = self.output_dir.join(format!("{}.svg", report_view.slug()));
                    write_svg(&fig, &path)?;
                    manifest.written.push(ExportedView {
                        view: report_view,
                        path,
                    });
                }
                Ok(None) => manifest.skipped.push(SkippedView {
                    view: report_view,
                    reason: "not applicable".into(),
                }),
                Err(e) => {
                    warn!(view = report_view.slug(), error = %e, "view skipped");
                    manifest.skipped.push(SkippedView {
                        view: report_view,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let manifest_path = self.output_dir.join("manifest.json");
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| ExportError::Manifest(e.to_string()))?;
        std::fs::write(&manifest_path, json).map_err(|e| {
            ExportError::Manifest(format!("{}: {e}", manifest_path.display()))
        })?;

        info!(
            written = manifest.written.len(),
            skipped = manifest.skipped.len(),
            dir = %self.output_dir.display(),
            "report exported"
        );
        Ok(manifest)
    }
}
