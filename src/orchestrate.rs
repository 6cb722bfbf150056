//! Top-level orchestration: run the phases a [`Mode`] selects, in order,
//! wiring each phase's output into the next one's input.
//!
//! | Mode       | Phases                      |
//! |------------|-----------------------------|
//! | `Sanitize` | sanitize                    |
//! | `Pdf`      | extract → sanitize          |
//! | `Bundle`   | bundle                      |
//! | `Full`     | extract → sanitize → bundle |
//!
//! When the extract phase runs, the sanitize selection defaults to the PDF
//! output glob and so does the bundle source. An explicit selection or
//! bundle source always wins. Phases run strictly one after another; the
//! first fatal error aborts the run.

use crate::bundle::write_bundle_with_progress;
use crate::config::{BundleConfig, FileSelection, PdfConfig, SanitizeConfig};
use crate::error::PrepError;
use crate::extract::extract_pdfs;
use crate::output::{BundleSummary, PdfOutput, SanitizeOutput};
use crate::progress::ProgressCallback;
use crate::sanitize::sanitize;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Sanitize only. (default)
    #[default]
    Sanitize,
    /// Extract PDFs, then sanitize the extracted text.
    Pdf,
    /// Bundle only.
    Bundle,
    /// Extract, sanitize, then bundle the sanitized text.
    Full,
}

impl Mode {
    fn runs_extract(self) -> bool {
        matches!(self, Mode::Pdf | Mode::Full)
    }

    fn runs_sanitize(self) -> bool {
        !matches!(self, Mode::Bundle)
    }

    fn runs_bundle(self) -> bool {
        matches!(self, Mode::Bundle | Mode::Full)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Sanitize => "sanitize",
            Mode::Pdf => "pdf",
            Mode::Bundle => "bundle",
            Mode::Full => "full",
        };
        f.write_str(s)
    }
}

/// Everything one run needs. Phases the mode does not select ignore their
/// config.
#[derive(Clone, Default)]
pub struct RunPlan {
    pub mode: Mode,

    /// Files to sanitize. `None` means the PDF output glob after an extract
    /// phase, else the default extension scan.
    pub selection: Option<FileSelection>,

    /// Bundle source glob. `None` means the PDF output glob after an extract
    /// phase, else `bundle.source_glob`.
    pub bundle_source: Option<String>,

    pub sanitize: SanitizeConfig,
    pub pdf: PdfConfig,
    pub bundle: BundleConfig,

    /// Progress events for every phase whose own config has no callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for RunPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunPlan")
            .field("mode", &self.mode)
            .field("selection", &self.selection)
            .field("bundle_source", &self.bundle_source)
            .field("sanitize", &self.sanitize)
            .field("pdf", &self.pdf)
            .field("bundle", &self.bundle)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PrepProgressCallback>"),
            )
            .finish()
    }
}

impl RunPlan {
    /// A plan for `mode` with default phase configs.
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// The selection the sanitize phase will use.
    pub fn effective_selection(&self) -> FileSelection {
        match (&self.selection, self.mode.runs_extract()) {
            (Some(sel), _) => sel.clone(),
            (None, true) => FileSelection::Glob(self.pdf.output_glob()),
            (None, false) => FileSelection::default(),
        }
    }

    /// The bundle config with its source glob resolved.
    pub fn effective_bundle(&self) -> BundleConfig {
        let mut bundle = self.bundle.clone();
        match (&self.bundle_source, self.mode.runs_extract()) {
            (Some(glob), _) => bundle.source_glob = glob.clone(),
            (None, true) => bundle.source_glob = self.pdf.output_glob(),
            (None, false) => {}
        }
        bundle
    }
}

/// Results of every phase that ran.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizeOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleSummary>,
}

/// Execute `plan`.
///
/// # Errors
/// The first fatal [`PrepError`] of any phase. Phases after it do not run.
pub async fn run(plan: &RunPlan) -> Result<RunReport, PrepError> {
    info!("Run mode: {}", plan.mode);
    let mut report = RunReport {
        mode: plan.mode,
        pdf: None,
        sanitize: None,
        bundle: None,
    };

    if plan.mode.runs_extract() {
        let mut pdf = plan.pdf.clone();
        if pdf.progress_callback.is_none() {
            pdf.progress_callback = plan.progress_callback.clone();
        }
        report.pdf = Some(extract_pdfs(&pdf).await?);
    }

    if plan.mode.runs_sanitize() {
        let mut config = plan.sanitize.clone();
        if config.progress_callback.is_none() {
            config.progress_callback = plan.progress_callback.clone();
        }
        report.sanitize = Some(sanitize(&plan.effective_selection(), &config).await?);
    }

    if plan.mode.runs_bundle() {
        let bundle = plan.effective_bundle();
        let progress = plan.progress_callback.clone();
        let summary = tokio::task::spawn_blocking(move || {
            write_bundle_with_progress(&bundle, progress.as_ref())
        })
        .await
        .map_err(|e| PrepError::Internal(format!("Bundle task panicked: {e}")))??;
        report.bundle = Some(summary);
    }

    Ok(report)
}

/// Synchronous wrapper around [`run`].
pub fn run_sync(plan: &RunPlan) -> Result<RunReport, PrepError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PrepError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run(plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mode_phases() {
        assert!(Mode::Sanitize.runs_sanitize() && !Mode::Sanitize.runs_extract());
        assert!(Mode::Pdf.runs_extract() && Mode::Pdf.runs_sanitize() && !Mode::Pdf.runs_bundle());
        assert!(Mode::Bundle.runs_bundle() && !Mode::Bundle.runs_sanitize());
        assert!(Mode::Full.runs_extract() && Mode::Full.runs_sanitize() && Mode::Full.runs_bundle());
    }

    #[test]
    fn test_pdf_output_feeds_sanitize_by_default() {
        let mut plan = RunPlan::new(Mode::Pdf);
        plan.pdf.output_dir = PathBuf::from("out");
        assert_eq!(
            plan.effective_selection(),
            FileSelection::Glob(plan.pdf.output_glob())
        );

        plan.selection = Some(FileSelection::Glob("x/*.txt".into()));
        assert_eq!(plan.effective_selection(), FileSelection::Glob("x/*.txt".into()));
    }

    #[test]
    fn test_sanitize_only_uses_extension_scan() {
        assert_eq!(
            RunPlan::new(Mode::Sanitize).effective_selection(),
            FileSelection::default()
        );
    }

    #[test]
    fn test_bundle_source_resolution() {
        let mut plan = RunPlan::new(Mode::Full);
        plan.pdf.output_dir = PathBuf::from("out");
        assert_eq!(plan.effective_bundle().source_glob, plan.pdf.output_glob());

        plan.bundle_source = Some("docs/*.txt".into());
        assert_eq!(plan.effective_bundle().source_glob, "docs/*.txt");

        let plan = RunPlan::new(Mode::Bundle);
        assert_eq!(plan.effective_bundle().source_glob, "*.txt");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Full.to_string(), "full");
        assert_eq!(Mode::default(), Mode::Sanitize);
    }
}
