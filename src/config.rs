//! Configuration types for the sanitize, PDF-extraction and bundle phases.
//!
//! Each phase is controlled by one struct built through its builder:
//! [`SanitizeConfig`], [`PdfConfig`] and [`BundleConfig`]. A built config is
//! immutable and is shared read-only (behind an `Arc`) by every worker of the
//! phase, so no synchronisation is ever needed while files are processed.
//!
//! Setters record values verbatim; `build()` is the single place where
//! numeric ranges are checked, so a bad CLI argument fails before any task is
//! dispatched.

use crate::error::PrepError;
use crate::pipeline::poppler::PageExtractor;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default byte ceiling for sanitizing a single file: 10 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Default number of non-whitespace characters below which a PDF is
/// considered a likely scan.
pub const DEFAULT_OCR_THRESHOLD: usize = 200;

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

// ── Sanitize ─────────────────────────────────────────────────────────────

/// How TAB characters are treated by the sanitize pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabPolicy {
    /// Expand tabs to the next multiple of the given column width.
    Expand(usize),
    /// Leave tabs in place.
    Keep,
}

impl Default for TabPolicy {
    fn default() -> Self {
        TabPolicy::Expand(4)
    }
}

/// Size gate applied before any file is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeLimit {
    /// Skip files strictly larger than this many bytes.
    Max(u64),
    /// Process files of any size.
    Unlimited,
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit::Max(DEFAULT_MAX_BYTES)
    }
}

impl SizeLimit {
    /// `true` when a file of `len` bytes must be skipped.
    pub fn exceeded_by(&self, len: u64) -> bool {
        match self {
            SizeLimit::Max(max) => len > *max,
            SizeLimit::Unlimited => false,
        }
    }
}

/// Which files the sanitize phase looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSelection {
    /// Exactly these paths, in this order.
    Files(Vec<PathBuf>),
    /// Recursive scan of `root` for files whose extension is in the list
    /// (compared case-insensitively, without the leading dot).
    Extensions {
        root: PathBuf,
        extensions: Vec<String>,
    },
    /// A glob pattern such as `notes/**/*.md`.
    Glob(String),
}

impl Default for FileSelection {
    fn default() -> Self {
        FileSelection::Extensions {
            root: PathBuf::from("."),
            extensions: vec!["txt".to_string()],
        }
    }
}

/// Configuration for the sanitize phase.
///
/// # Example
/// ```rust
/// use corpus_prep::{SanitizeConfig, TabPolicy};
///
/// let config = SanitizeConfig::builder()
///     .write(true)
///     .tabs(TabPolicy::Expand(8))
///     .concurrency(4)
///     .build()
///     .unwrap();
/// assert!(config.write);
/// ```
#[derive(Clone)]
pub struct SanitizeConfig {
    /// Replace changed files on disk. `false` is a dry run. Default: false.
    pub write: bool,

    /// Tab handling. Default: expand to 4 columns.
    pub tabs: TabPolicy,

    /// Strip trailing horizontal whitespace on every line. Default: true.
    pub trim_trailing: bool,

    /// Collapse runs of 3+ blank lines to one, drop leading blank lines and
    /// end the document with exactly one newline. Default: true.
    pub collapse_blank_lines: bool,

    /// Size gate, measured before any transformation. Default: 10 MiB.
    pub size_limit: SizeLimit,

    /// Number of files processed at once. Default: available CPUs.
    pub concurrency: usize,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SanitizeConfig {
    fn default() -> Self {
        Self {
            write: false,
            tabs: TabPolicy::default(),
            trim_trailing: true,
            collapse_blank_lines: true,
            size_limit: SizeLimit::default(),
            concurrency: default_concurrency(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SanitizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanitizeConfig")
            .field("write", &self.write)
            .field("tabs", &self.tabs)
            .field("trim_trailing", &self.trim_trailing)
            .field("collapse_blank_lines", &self.collapse_blank_lines)
            .field("size_limit", &self.size_limit)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PrepProgressCallback>"),
            )
            .finish()
    }
}

impl SanitizeConfig {
    /// Create a new builder for `SanitizeConfig`.
    pub fn builder() -> SanitizeConfigBuilder {
        SanitizeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SanitizeConfig`].
#[derive(Debug)]
pub struct SanitizeConfigBuilder {
    config: SanitizeConfig,
}

impl SanitizeConfigBuilder {
    pub fn write(mut self, v: bool) -> Self {
        self.config.write = v;
        self
    }

    pub fn tabs(mut self, policy: TabPolicy) -> Self {
        self.config.tabs = policy;
        self
    }

    pub fn trim_trailing(mut self, v: bool) -> Self {
        self.config.trim_trailing = v;
        self
    }

    pub fn collapse_blank_lines(mut self, v: bool) -> Self {
        self.config.collapse_blank_lines = v;
        self
    }

    pub fn size_limit(mut self, limit: SizeLimit) -> Self {
        self.config.size_limit = limit;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SanitizeConfig, PrepError> {
        let c = &self.config;
        if let TabPolicy::Expand(width) = c.tabs {
            if width == 0 || width > 32 {
                return Err(PrepError::InvalidConfig(format!(
                    "Tab width must be 1-32, got {width}"
                )));
            }
        }
        if let SizeLimit::Max(0) = c.size_limit {
            return Err(PrepError::InvalidConfig(
                "Maximum file size must be >= 1 byte (use SizeLimit::Unlimited to disable)".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(PrepError::InvalidConfig("Concurrency must be >= 1".into()));
        }
        Ok(self.config)
    }
}

// ── PDF extraction ───────────────────────────────────────────────────────

/// Text ordering used by the extraction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionMode {
    /// Content-stream order (`pdftotext -raw`). (default)
    #[default]
    Raw,
    /// Preserve the physical page layout (`pdftotext -layout`).
    Layout,
}

/// Configuration for the PDF extraction phase.
#[derive(Clone)]
pub struct PdfConfig {
    /// Glob selecting the PDFs. Default: `*.pdf`.
    pub source_glob: String,

    /// Directory receiving one `<stem>.txt` per PDF. Default: `pdf_text`.
    pub output_dir: PathBuf,

    /// Extraction mode. Default: raw.
    pub mode: ExtractionMode,

    /// Re-extract even when the existing output is up to date. Default: false.
    pub force: bool,

    /// Documents yielding fewer non-whitespace characters than this are
    /// flagged as OCR candidates. Default: 200.
    pub ocr_threshold: usize,

    /// Number of PDFs extracted at once. Default: available CPUs.
    pub concurrency: usize,

    /// Extraction backend. `None` uses the poppler command-line tools.
    pub extractor: Option<Arc<dyn PageExtractor>>,

    /// Optional per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            source_glob: "*.pdf".to_string(),
            output_dir: PathBuf::from("pdf_text"),
            mode: ExtractionMode::default(),
            force: false,
            ocr_threshold: DEFAULT_OCR_THRESHOLD,
            concurrency: default_concurrency(),
            extractor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PdfConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfConfig")
            .field("source_glob", &self.source_glob)
            .field("output_dir", &self.output_dir)
            .field("mode", &self.mode)
            .field("force", &self.force)
            .field("ocr_threshold", &self.ocr_threshold)
            .field("concurrency", &self.concurrency)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn PageExtractor>"))
            .finish()
    }
}

impl PdfConfig {
    /// Create a new builder for `PdfConfig`.
    pub fn builder() -> PdfConfigBuilder {
        PdfConfigBuilder {
            config: Self::default(),
        }
    }

    /// Glob matching every text file this phase writes.
    pub fn output_glob(&self) -> String {
        self.output_dir.join("*.txt").to_string_lossy().into_owned()
    }
}

/// Builder for [`PdfConfig`].
#[derive(Debug)]
pub struct PdfConfigBuilder {
    config: PdfConfig,
}

impl PdfConfigBuilder {
    pub fn source_glob(mut self, glob: impl Into<String>) -> Self {
        self.config.source_glob = glob.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn force(mut self, v: bool) -> Self {
        self.config.force = v;
        self
    }

    pub fn ocr_threshold(mut self, chars: usize) -> Self {
        self.config.ocr_threshold = chars;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PdfConfig, PrepError> {
        let c = &self.config;
        if c.source_glob.trim().is_empty() {
            return Err(PrepError::InvalidConfig("PDF source glob is empty".into()));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(PrepError::InvalidConfig("PDF output directory is empty".into()));
        }
        if c.concurrency == 0 {
            return Err(PrepError::InvalidConfig("Concurrency must be >= 1".into()));
        }
        Ok(self.config)
    }
}

// ── Bundle ───────────────────────────────────────────────────────────────

/// Sort key for bundle entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortMode {
    /// Relative path, byte-wise. (default)
    #[default]
    Name,
    /// Modification time, oldest first.
    Modified,
    /// File size, smallest first.
    Size,
}

/// Configuration for the corpus bundler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Glob selecting the files to bundle. Default: `*.txt`.
    pub source_glob: String,

    /// Path of the aggregate document. Never bundled into itself.
    /// Default: `corpus_bundle.txt`.
    pub output: PathBuf,

    /// Sort key. Default: name.
    pub sort: SortMode,

    /// Reverse the whole ordering after sorting. Default: false.
    pub reverse: bool,

    /// Emit the numbered index. Default: true.
    pub index: bool,

    /// Emit the explanatory preamble. Default: true.
    pub preamble: bool,

    /// Show modification time and size in the index and BEGIN markers.
    /// Default: false.
    pub metadata: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            source_glob: "*.txt".to_string(),
            output: PathBuf::from("corpus_bundle.txt"),
            sort: SortMode::default(),
            reverse: false,
            index: true,
            preamble: true,
            metadata: false,
        }
    }
}

impl BundleConfig {
    /// Create a new builder for `BundleConfig`.
    pub fn builder() -> BundleConfigBuilder {
        BundleConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BundleConfig`].
#[derive(Debug)]
pub struct BundleConfigBuilder {
    config: BundleConfig,
}

impl BundleConfigBuilder {
    pub fn source_glob(mut self, glob: impl Into<String>) -> Self {
        self.config.source_glob = glob.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn sort(mut self, sort: SortMode) -> Self {
        self.config.sort = sort;
        self
    }

    pub fn reverse(mut self, v: bool) -> Self {
        self.config.reverse = v;
        self
    }

    pub fn index(mut self, v: bool) -> Self {
        self.config.index = v;
        self
    }

    pub fn preamble(mut self, v: bool) -> Self {
        self.config.preamble = v;
        self
    }

    pub fn metadata(mut self, v: bool) -> Self {
        self.config.metadata = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BundleConfig, PrepError> {
        let c = &self.config;
        if c.source_glob.trim().is_empty() {
            return Err(PrepError::InvalidConfig("Bundle source glob is empty".into()));
        }
        if c.output.as_os_str().is_empty() {
            return Err(PrepError::InvalidConfig("Bundle output path is empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_defaults() {
        let c = SanitizeConfig::default();
        assert!(!c.write);
        assert_eq!(c.tabs, TabPolicy::Expand(4));
        assert!(c.trim_trailing);
        assert!(c.collapse_blank_lines);
        assert_eq!(c.size_limit, SizeLimit::Max(DEFAULT_MAX_BYTES));
        assert!(c.concurrency >= 1);
    }

    #[test]
    fn zero_tab_width_rejected() {
        let err = SanitizeConfig::builder()
            .tabs(TabPolicy::Expand(0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Tab width"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        assert!(SanitizeConfig::builder().concurrency(0).build().is_err());
        assert!(PdfConfig::builder().concurrency(0).build().is_err());
    }

    #[test]
    fn zero_max_bytes_rejected_but_unlimited_ok() {
        assert!(SanitizeConfig::builder()
            .size_limit(SizeLimit::Max(0))
            .build()
            .is_err());
        assert!(SanitizeConfig::builder()
            .size_limit(SizeLimit::Unlimited)
            .build()
            .is_ok());
    }

    #[test]
    fn validation_messages_are_plain_ascii() {
        let errors = [
            SanitizeConfig::builder().tabs(TabPolicy::Expand(33)).build(),
            SanitizeConfig::builder().size_limit(SizeLimit::Max(0)).build(),
            SanitizeConfig::builder().concurrency(0).build(),
        ];
        for err in errors.into_iter().map(Result::unwrap_err) {
            assert!(err.to_string().is_ascii(), "{err}");
        }
        let err = PdfConfig::builder().concurrency(0).build().unwrap_err();
        assert!(err.to_string().contains(">= 1"));
    }

    #[test]
    fn size_limit_is_strictly_greater() {
        assert!(!SizeLimit::Max(10).exceeded_by(10));
        assert!(SizeLimit::Max(10).exceeded_by(11));
        assert!(!SizeLimit::Unlimited.exceeded_by(u64::MAX));
    }

    #[test]
    fn pdf_output_glob_points_into_output_dir() {
        let c = PdfConfig::builder().output_dir("out/text").build().unwrap();
        assert_eq!(
            PathBuf::from(c.output_glob()),
            PathBuf::from("out/text").join("*.txt")
        );
    }

    #[test]
    fn empty_bundle_glob_rejected() {
        assert!(BundleConfig::builder().source_glob("  ").build().is_err());
    }
}
