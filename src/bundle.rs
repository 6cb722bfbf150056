//! Corpus bundler: concatenate many text files into one self-describing
//! document.
//!
//! ## Layout
//!
//! ```text
//! <preamble>                      (optional)
//! INDEX                           (optional)
//! 1. a.txt
//! 2. b.txt
//! ------------------------------------------------
//! ===== BEGIN FILE: a.txt =====
//!
//! <exact bytes of a.txt, plus a newline if it had none>
//!
//! ===== END FILE: a.txt =====
//! ------------------------------------------------
//! ...
//! ```
//!
//! Section bodies are copied as bytes, never decoded or transformed, so
//! [`extract_section`] gives back each source file exactly (modulo the added
//! trailing newline).

use crate::config::{BundleConfig, SortMode};
use crate::error::PrepError;
use crate::output::{BundleEntry, BundleSummary};
use crate::pipeline::atomic::write_atomic;
use crate::pipeline::select::{self, display_path};
use crate::progress::{Phase, ProgressCallback};
use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const SEPARATOR_WIDTH: usize = 80;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the bundle described by `config` and write it atomically.
///
/// # Errors
/// [`PrepError::NoBundleInputs`] when nothing matches (the output file itself
/// never counts), a bad glob, an unreadable input or a failed write.
pub fn write_bundle(config: &BundleConfig) -> Result<BundleSummary, PrepError> {
    write_bundle_with_progress(config, None)
}

/// [`write_bundle`] reporting one event per bundled file.
pub fn write_bundle_with_progress(
    config: &BundleConfig,
    progress: Option<&ProgressCallback>,
) -> Result<BundleSummary, PrepError> {
    let entries = collect_entries(config)?;
    info!(
        "Bundling {} file(s) into {}",
        entries.len(),
        config.output.display()
    );
    if let Some(cb) = progress {
        cb.on_phase_start(Phase::Bundle, entries.len());
    }

    let mut doc: Vec<u8> = Vec::new();
    if config.preamble {
        doc.extend_from_slice(preamble(config, entries.len()).as_bytes());
    }
    if config.index {
        doc.extend_from_slice(b"INDEX\n");
        for (i, entry) in entries.iter().enumerate() {
            let line = format!("{}. {}{}\n", i + 1, entry.display, describe(entry, config));
            doc.extend_from_slice(line.as_bytes());
        }
    }
    if config.preamble || config.index {
        doc.extend_from_slice(separator().as_bytes());
    }

    for entry in &entries {
        let content = fs::read(&entry.path).map_err(|e| PrepError::io(&entry.path, e))?;
        let begin = format!(
            "===== BEGIN FILE: {}{} =====\n\n",
            entry.display,
            describe(entry, config)
        );
        doc.extend_from_slice(begin.as_bytes());
        doc.extend_from_slice(&content);
        if !content.is_empty() && !content.ends_with(b"\n") {
            doc.push(b'\n');
        }
        doc.extend_from_slice(format!("\n===== END FILE: {} =====\n", entry.display).as_bytes());
        doc.extend_from_slice(separator().as_bytes());

        debug!("Bundled {} ({} bytes)", entry.display, content.len());
        if let Some(cb) = progress {
            cb.on_item_complete(Phase::Bundle, &entry.path, "bundled");
        }
    }

    write_atomic(&config.output, &doc).map_err(|e| PrepError::OutputWriteFailed {
        path: config.output.clone(),
        source: e,
    })?;

    info!(
        "Wrote {} ({} bytes)",
        config.output.display(),
        doc.len()
    );
    if let Some(cb) = progress {
        cb.on_phase_complete(Phase::Bundle, entries.len());
    }

    Ok(BundleSummary {
        output: config.output.clone(),
        entries,
        bytes_written: doc.len() as u64,
    })
}

/// Body of the section for `display` in a bundle produced by this module.
pub fn extract_section<'a>(bundle: &'a str, display: &str) -> Option<&'a str> {
    let begin = format!("===== BEGIN FILE: {display}");
    let end = format!("\n===== END FILE: {display} =====\n");

    let mut search = 0;
    while let Some(found) = bundle[search..].find(&begin) {
        let at = search + found;
        let line_end = at + bundle[at..].find('\n')?;
        let suffix = &bundle[at + begin.len()..line_end];
        let is_header =
            suffix == " =====" || (suffix.starts_with(" (") && suffix.ends_with(") ====="));
        if is_header && bundle[line_end..].starts_with("\n\n") {
            let body_start = line_end + 2;
            let body_end = body_start + bundle[body_start..].find(&end)?;
            return Some(&bundle[body_start..body_end]);
        }
        search = line_end;
    }
    None
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Enumerate, exclude the output, sort and optionally reverse.
fn collect_entries(config: &BundleConfig) -> Result<Vec<BundleEntry>, PrepError> {
    let paths = select::expand_glob(&config.source_glob)?;

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        if same_file(&path, &config.output) {
            debug!("Excluding bundle output {} from its own inputs", path.display());
            continue;
        }
        let meta = fs::metadata(&path).map_err(|e| PrepError::io(&path, e))?;
        let modified = meta.modified().map_err(|e| PrepError::io(&path, e))?;
        entries.push(BundleEntry {
            display: display_path(&path),
            path,
            size: meta.len(),
            modified: DateTime::<Local>::from(modified),
        });
    }

    if entries.is_empty() {
        return Err(PrepError::NoBundleInputs {
            pattern: config.source_glob.clone(),
        });
    }

    // Enumeration order is already by path; `sort_by` is stable.
    match config.sort {
        SortMode::Name => entries.sort_by(|a, b| a.display.cmp(&b.display)),
        SortMode::Modified => entries.sort_by(|a, b| a.modified.cmp(&b.modified)),
        SortMode::Size => entries.sort_by(|a, b| a.size.cmp(&b.size)),
    }
    if config.reverse {
        entries.reverse();
    }
    Ok(entries)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => match (std::path::absolute(a), std::path::absolute(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => a == b,
        },
    }
}

fn describe(entry: &BundleEntry, config: &BundleConfig) -> String {
    if config.metadata {
        format!(
            " (modified: {}, size: {} bytes)",
            entry.modified.format(TIMESTAMP_FORMAT),
            entry.size
        )
    } else {
        String::new()
    }
}

fn separator() -> String {
    format!("{}\n", "-".repeat(SEPARATOR_WIDTH))
}

fn preamble(config: &BundleConfig, count: usize) -> String {
    format!(
        "CORPUS BUNDLE\n\
         \n\
         This document concatenates {count} file(s) matched by '{glob}'.\n\
         Each file appears between a line '===== BEGIN FILE: <path> =====' and a\n\
         line '===== END FILE: <path> ====='. The text between the blank line after\n\
         BEGIN and the blank line before END is the file's exact content.\n\
         \n",
        glob = config.source_glob
    )
}
