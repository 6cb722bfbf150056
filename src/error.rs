//! Error types for the corpus-prep library.
//!
//! Two distinct failure scopes exist:
//!
//! * [`PrepError`] is **fatal**: a whole phase cannot proceed (invalid
//!   configuration, a required external tool is missing, nothing to bundle,
//!   a worker task could not be joined). Returned as `Err(PrepError)` from the
//!   top-level phase functions.
//!
//! * Per-item failures (one file unreadable, one PDF without a page count) are
//!   never errors at this level. They become outcome values
//!   ([`crate::output::SanitizeOutcome::Failed`],
//!   [`crate::output::PdfOutcome::Failed`]) and surface only in the aggregate
//!   report, so one bad file cannot abort its siblings.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the corpus-prep library.
#[derive(Debug, Error)]
pub enum PrepError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A glob pattern could not be compiled.
    #[error("Invalid glob pattern '{pattern}': {detail}")]
    InvalidGlob { pattern: String, detail: String },

    /// An external program needed by the phase is not on `PATH`.
    #[error("Required tool '{tool}' was not found on PATH.\n{hint}")]
    MissingTool { tool: String, hint: String },

    // ── Phase errors ──────────────────────────────────────────────────────
    /// The bundle glob matched no files; there is nothing meaningful to write.
    #[error("No files matched '{pattern}'; nothing to bundle")]
    NoBundleInputs { pattern: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a phase-level output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read a path the phase depends on as a whole.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (for example a worker task panicked).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrepError {
    /// Shorthand for the common "this path failed with this io::Error" case.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PrepError::Io {
            path: path.into(),
            source,
        }
    }
}
