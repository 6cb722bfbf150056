//! # corpus-prep
//!
//! Prepare text and PDF document sets for language-model tooling: sanitize
//! text to pure ASCII, extract PDFs page by page, and bundle many files into
//! one delimited corpus document.
//!
//! ## Why this crate?
//!
//! Documents gathered for an LLM corpus arrive with terminal escape codes,
//! zero-width characters, curly quotes, typewriter overstrikes and markup
//! characters that later stages misread. This crate rewrites them into a
//! deterministic ASCII form that keeps existing backslash markup intact, and
//! does it idempotently: a second run over its own output changes nothing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs ─▶ extract ─▶ <dir>/*.txt ─▶ sanitize ─▶ bundle ─▶ corpus_bundle.txt
//!          (pdftotext,            (parallel,      (index +
//!           page markers,          dry run or      BEGIN/END
//!           OCR flagging)          atomic write)   sections)
//! ```
//!
//! Each phase can run alone; [`run`] chains them according to a [`Mode`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use corpus_prep::{sanitize, FileSelection, SanitizeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SanitizeConfig::builder().write(true).build()?;
//!     let selection = FileSelection::Glob("notes/**/*.txt".into());
//!     let output = sanitize(&selection, &config).await?;
//!     eprintln!("{} of {} files changed", output.summary.changed, output.summary.scanned);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `corpus-prep` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! corpus-prep = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bundle;
pub mod config;
pub mod error;
pub mod extract;
pub mod orchestrate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod sanitize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bundle::{extract_section, write_bundle};
pub use config::{
    BundleConfig, BundleConfigBuilder, ExtractionMode, FileSelection, PdfConfig,
    PdfConfigBuilder, SanitizeConfig, SanitizeConfigBuilder, SizeLimit, SortMode, TabPolicy,
};
pub use error::PrepError;
pub use extract::{count_text_chars, extract_pdfs, extract_pdfs_sync, page_marker};
pub use orchestrate::{run, run_sync, Mode, RunPlan, RunReport};
pub use output::{
    BundleEntry, BundleSummary, PdfOutcome, PdfOutput, PdfResult, PdfRunSummary, RunSummary,
    SanitizeOutcome, SanitizeOutput, SanitizeResult,
};
pub use pipeline::cleanup::Sanitizer;
pub use pipeline::escape::escape_to_ascii;
pub use pipeline::poppler::{PageExtractor, PopplerExtractor};
pub use progress::{NoopProgressCallback, Phase, PrepProgressCallback, ProgressCallback};
pub use report::ReportFormat;
pub use sanitize::{sanitize, sanitize_files, sanitize_sync, sanitize_text};
