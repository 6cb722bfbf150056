//! Page-text extraction backend.
//!
//! [`PageExtractor`] is the seam between the extraction orchestrator and
//! whatever turns a PDF page into text. The default [`PopplerExtractor`]
//! shells out to poppler's `pdfinfo` (page count) and `pdftotext` (one page
//! at a time).
//!
//! ## Why one process per page?
//!
//! Extracting page by page lets a single unreadable page become an empty
//! page instead of losing the whole document, and lets every page be
//! preceded by its own marker line. The calls are blocking, so the
//! orchestrator runs each document inside `spawn_blocking`.

use crate::config::ExtractionMode;
use crate::error::PrepError;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const INSTALL_HINT: &str = "Install poppler (Debian/Ubuntu: `apt install poppler-utils`, \
macOS: `brew install poppler`) and make sure it is on PATH.";

/// Turns PDF pages into text. Implementations are called from blocking
/// worker threads and must be `Send + Sync`.
///
/// Errors are plain strings: they become the `reason` of a per-document
/// failure, never a fatal error.
pub trait PageExtractor: Send + Sync {
    /// Verify that the backend can run at all. Called once per phase before
    /// any document is dispatched.
    fn check_available(&self) -> Result<(), PrepError> {
        Ok(())
    }

    /// Number of pages in the document.
    fn page_count(&self, pdf: &Path) -> Result<usize, String>;

    /// Text of one page, 1-based.
    fn extract_page(&self, pdf: &Path, page: usize, mode: ExtractionMode)
        -> Result<String, String>;
}

/// [`PageExtractor`] backed by the poppler command-line tools.
#[derive(Debug, Clone)]
pub struct PopplerExtractor {
    pdftotext: PathBuf,
    pdfinfo: PathBuf,
}

impl Default for PopplerExtractor {
    fn default() -> Self {
        Self::with_programs("pdftotext", "pdfinfo")
    }
}

impl PopplerExtractor {
    /// Use explicit program names or paths instead of `pdftotext`/`pdfinfo`.
    pub fn with_programs(pdftotext: impl Into<PathBuf>, pdfinfo: impl Into<PathBuf>) -> Self {
        Self {
            pdftotext: pdftotext.into(),
            pdfinfo: pdfinfo.into(),
        }
    }
}

impl PageExtractor for PopplerExtractor {
    fn check_available(&self) -> Result<(), PrepError> {
        for program in [&self.pdftotext, &self.pdfinfo] {
            let found = which::which(program).map_err(|_| PrepError::MissingTool {
                tool: program.display().to_string(),
                hint: INSTALL_HINT.to_string(),
            })?;
            debug!("Using {}", found.display());
        }
        Ok(())
    }

    fn page_count(&self, pdf: &Path) -> Result<usize, String> {
        let output = Command::new(&self.pdfinfo)
            .arg(pdf)
            .output()
            .map_err(|e| format!("could not run {}: {e}", self.pdfinfo.display()))?;

        if !output.status.success() {
            return Err(failure_reason("pdfinfo", &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_page_count(&stdout) {
            Some(0) => Err("document reports zero pages".to_string()),
            Some(n) => Ok(n),
            None => Err("pdfinfo output has no 'Pages:' line".to_string()),
        }
    }

    fn extract_page(
        &self,
        pdf: &Path,
        page: usize,
        mode: ExtractionMode,
    ) -> Result<String, String> {
        let page_arg = page.to_string();
        let output = Command::new(&self.pdftotext)
            .arg(mode_flag(mode))
            .args(["-f", &page_arg, "-l", &page_arg])
            .args(["-enc", "UTF-8", "-q"])
            .arg(pdf)
            .arg("-")
            .output()
            .map_err(|e| format!("could not run {}: {e}", self.pdftotext.display()))?;

        if !output.status.success() {
            return Err(failure_reason("pdftotext", &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn mode_flag(mode: ExtractionMode) -> &'static str {
    match mode {
        ExtractionMode::Raw => "-raw",
        ExtractionMode::Layout => "-layout",
    }
}

fn failure_reason(tool: &str, output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("{tool} exited with {}", output.status)
    } else {
        format!("{tool}: {stderr}")
    }
}

/// Read the `Pages:` field of `pdfinfo` output.
fn parse_page_count(info: &str) -> Option<usize> {
    info.lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_count() {
        let info = "Title:          Report\nProducer:       x\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_page_count(info), Some(12));
        assert_eq!(parse_page_count("Title: none\n"), None);
        assert_eq!(parse_page_count("Pages: many\n"), None);
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(mode_flag(ExtractionMode::Raw), "-raw");
        assert_eq!(mode_flag(ExtractionMode::Layout), "-layout");
    }

    #[test]
    fn test_missing_program_is_fatal() {
        let ex = PopplerExtractor::with_programs(
            "corpus-prep-no-such-pdftotext",
            "corpus-prep-no-such-pdfinfo",
        );
        match ex.check_available() {
            Err(PrepError::MissingTool { tool, hint }) => {
                assert_eq!(tool, "corpus-prep-no-such-pdftotext");
                assert!(hint.contains("poppler"));
            }
            other => panic!("expected MissingTool, got {other:?}"),
        }
    }

    #[test]
    fn test_unrunnable_program_is_item_failure() {
        let ex = PopplerExtractor::with_programs(
            "corpus-prep-no-such-pdftotext",
            "corpus-prep-no-such-pdfinfo",
        );
        let err = ex.page_count(Path::new("missing.pdf")).unwrap_err();
        assert!(err.contains("could not run"));
    }
}
