//! PDF extraction phase: one text file per PDF, page by page, with a marker
//! line before every page.
//!
//! ## Staleness
//!
//! A PDF is skipped when its output exists, is non-empty and is strictly
//! newer than the PDF, unless `force` is set. Skipped documents are still
//! classified: the existing output is read and its character count decides
//! between `skipped-uptodate` and `skipped-uptodate-ocr-flagged`, so a
//! re-run reports the same OCR candidates as the run that produced them.
//!
//! ## Concurrency
//!
//! Documents run in parallel (`spawn_blocking` under `buffer_unordered`);
//! the pages of one document run sequentially so markers stay in page order.
//! Output names are derived from the PDF stem, and when two PDFs share a
//! stem only the first (by path) is extracted; the others fail rather than
//! race on the same output file.

use crate::config::{ExtractionMode, PdfConfig};
use crate::error::PrepError;
use crate::output::{PdfOutcome, PdfOutput, PdfResult, PdfRunSummary};
use crate::pipeline::atomic::write_atomic;
use crate::pipeline::poppler::{PageExtractor, PopplerExtractor};
use crate::pipeline::select;
use crate::progress::Phase;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const MARKER_OPEN: &str = "=== PAGE ";
const MARKER_CLOSE: &str = " ===";

/// The line written before page `page` of `total` of the PDF named `name`.
pub fn page_marker(page: usize, total: usize, name: &str) -> String {
    format!("{MARKER_OPEN}{page}/{total} | {name}{MARKER_CLOSE}")
}

fn is_marker_line(line: &str) -> bool {
    line.starts_with(MARKER_OPEN) && line.trim_end().ends_with(MARKER_CLOSE)
}

/// Non-whitespace characters of extracted text, marker lines excluded.
pub fn count_text_chars(text: &str) -> usize {
    text.lines()
        .filter(|line| !is_marker_line(line))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .count()
}

/// Extract every PDF matched by `config.source_glob`.
///
/// # Errors
/// A bad glob, a missing extraction tool or an uncreatable output directory.
/// Per-document problems are outcomes.
pub async fn extract_pdfs(config: &PdfConfig) -> Result<PdfOutput, PrepError> {
    let start = Instant::now();
    let pdfs = select::expand_glob(&config.source_glob)?;
    let total = pdfs.len();
    info!("Extracting {} PDF(s) into {}", total, config.output_dir.display());

    let extractor: Arc<dyn PageExtractor> = match config.extractor {
        Some(ref e) => Arc::clone(e),
        None => Arc::new(PopplerExtractor::default()),
    };
    if total > 0 {
        extractor.check_available()?;
    }

    fs::create_dir_all(&config.output_dir).map_err(|e| PrepError::OutputWriteFailed {
        path: config.output_dir.clone(),
        source: e,
    })?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_phase_start(Phase::Extract, total);
    }

    let jobs = plan_jobs(&pdfs, &config.output_dir);

    let mut results: Vec<PdfResult> = stream::iter(jobs.into_iter().map(|job| {
        let extractor = Arc::clone(&extractor);
        let callback = config.progress_callback.clone();
        let (mode, force, threshold) = (config.mode, config.force, config.ocr_threshold);
        async move {
            let (pdf, output) = (job.pdf.clone(), job.output.clone());
            let result = match job.collision {
                Some(reason) => failed(pdf.clone(), output, None, reason),
                None => tokio::task::spawn_blocking(move || {
                    extract_one(&job.pdf, &job.output, extractor.as_ref(), mode, force, threshold)
                })
                .await
                .unwrap_or_else(|e| {
                    failed(pdf.clone(), output, None, format!("worker panicked: {e}"))
                }),
            };
            if let Some(ref cb) = callback {
                cb.on_item_complete(Phase::Extract, &pdf, result.outcome.label());
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    results.sort_by(|a, b| a.pdf.cmp(&b.pdf));

    let mut summary = PdfRunSummary {
        output_dir: config.output_dir.clone(),
        ..Default::default()
    };
    for r in &results {
        summary.record(r);
    }

    info!(
        "Extraction complete: {} ok, {} OCR-flagged, {} up to date, {} failed in {}ms",
        summary.ok,
        summary.ocr_flagged,
        summary.skipped_uptodate + summary.skipped_uptodate_ocr_flagged,
        summary.failed,
        start.elapsed().as_millis()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_phase_complete(Phase::Extract, total);
    }

    Ok(PdfOutput { results, summary })
}

/// Synchronous wrapper around [`extract_pdfs`].
pub fn extract_pdfs_sync(config: &PdfConfig) -> Result<PdfOutput, PrepError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PrepError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract_pdfs(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct PdfJob {
    pdf: PathBuf,
    output: PathBuf,
    collision: Option<String>,
}

/// Map each PDF to `<output_dir>/<stem>.txt`, refusing duplicate targets.
fn plan_jobs(pdfs: &[PathBuf], output_dir: &Path) -> Vec<PdfJob> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    pdfs.iter()
        .map(|pdf| {
            let stem = pdf
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let output = output_dir.join(format!("{stem}.txt"));
            let collision = match claimed.get(&output) {
                Some(first) => Some(format!(
                    "output {} already produced by {}",
                    output.display(),
                    first.display()
                )),
                None => {
                    claimed.insert(output.clone(), pdf);
                    None
                }
            };
            PdfJob {
                pdf: pdf.clone(),
                output,
                collision,
            }
        })
        .collect()
}

fn failed(pdf: PathBuf, output: PathBuf, pages: Option<usize>, reason: String) -> PdfResult {
    warn!("{}: {}", pdf.display(), reason);
    PdfResult {
        pdf,
        output,
        pages,
        chars: 0,
        outcome: PdfOutcome::Failed { reason },
    }
}

/// `true` when `output` exists, is non-empty and is newer than `pdf`.
fn is_up_to_date(pdf: &Path, output: &Path) -> bool {
    let (Ok(src), Ok(out)) = (fs::metadata(pdf), fs::metadata(output)) else {
        return false;
    };
    if out.len() == 0 {
        return false;
    }
    match (src.modified(), out.modified()) {
        (Ok(src_time), Ok(out_time)) => out_time > src_time,
        _ => false,
    }
}

/// Blocking extraction of a single document.
fn extract_one(
    pdf: &Path,
    output: &Path,
    extractor: &dyn PageExtractor,
    mode: ExtractionMode,
    force: bool,
    ocr_threshold: usize,
) -> PdfResult {
    let pdf_buf = pdf.to_path_buf();
    let out_buf = output.to_path_buf();

    if !force && is_up_to_date(pdf, output) {
        let chars = match fs::read(output) {
            Ok(bytes) => count_text_chars(&String::from_utf8_lossy(&bytes)),
            Err(e) => return failed(pdf_buf, out_buf, None, format!("cannot read output: {e}")),
        };
        debug!("{}: up to date ({} chars)", pdf.display(), chars);
        let outcome = if chars < ocr_threshold {
            PdfOutcome::SkippedUpToDateOcrFlagged
        } else {
            PdfOutcome::SkippedUpToDate
        };
        return PdfResult {
            pdf: pdf_buf,
            output: out_buf,
            pages: None,
            chars,
            outcome,
        };
    }

    let pages = match extractor.page_count(pdf) {
        Ok(n) => n,
        Err(reason) => {
            return failed(pdf_buf, out_buf, None, format!("page count unavailable: {reason}"))
        }
    };

    let name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf.display().to_string());

    let mut text = String::new();
    for page in 1..=pages {
        if page > 1 {
            text.push('\n');
        }
        text.push_str(&page_marker(page, pages, &name));
        text.push('\n');
        match extractor.extract_page(pdf, page, mode) {
            Ok(page_text) => {
                text.push_str(&page_text);
                if !page_text.is_empty() && !page_text.ends_with('\n') {
                    text.push('\n');
                }
            }
            Err(reason) => debug!("{} page {}: {}, left empty", name, page, reason),
        }
    }

    let chars = count_text_chars(&text);

    if let Err(e) = write_atomic(output, text.as_bytes()) {
        return failed(pdf_buf, out_buf, Some(pages), format!("cannot write output: {e}"));
    }

    let outcome = if chars < ocr_threshold {
        PdfOutcome::OcrFlagged
    } else {
        PdfOutcome::Ok
    };
    debug!("{}: {} pages, {} chars, {}", name, pages, chars, outcome.label());

    PdfResult {
        pdf: pdf_buf,
        output: out_buf,
        pages: Some(pages),
        chars,
        outcome,
    }
}
