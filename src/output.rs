//! Result and summary types produced by each phase.
//!
//! Workers return one tagged result per file ([`SanitizeResult`],
//! [`PdfResult`]); the orchestrator folds them into a run summary after the
//! pool has drained. Every fold operation is a counter increment, a sum or a
//! set insertion, so the summary is identical whatever order the workers
//! finished in.

use crate::pipeline::select::display_path;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

// ── Sanitize ─────────────────────────────────────────────────────────────

/// Classification of one sanitized file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum SanitizeOutcome {
    /// The printable-text probe failed; the file was not read further.
    BinarySkipped,
    /// Larger than the configured size limit.
    OversizeSkipped,
    /// The pipeline reproduced the file byte for byte.
    Unchanged,
    /// The pipeline produced different bytes (written only in write mode).
    Changed,
    /// The file could not be read or replaced.
    Failed { reason: String },
}

impl SanitizeOutcome {
    /// Stable label used in reports and progress events.
    pub fn label(&self) -> &'static str {
        match self {
            SanitizeOutcome::BinarySkipped => "binary-skipped",
            SanitizeOutcome::OversizeSkipped => "oversize-skipped",
            SanitizeOutcome::Unchanged => "unchanged",
            SanitizeOutcome::Changed => "changed",
            SanitizeOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one file plus its byte accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeResult {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: SanitizeOutcome,
    /// Size of the file before the pipeline ran.
    pub before_bytes: u64,
    /// Size of the pipeline output (equal to `before_bytes` when skipped).
    pub after_bytes: u64,
}

impl SanitizeResult {
    /// A result whose size did not change (skips and failures).
    pub fn untouched(path: PathBuf, outcome: SanitizeOutcome, bytes: u64) -> Self {
        Self {
            path,
            outcome,
            before_bytes: bytes,
            after_bytes: bytes,
        }
    }

    /// `after_bytes - before_bytes`.
    pub fn delta(&self) -> i64 {
        self.after_bytes as i64 - self.before_bytes as i64
    }

    /// Bytes this file shrank by (0 if it grew).
    pub fn removed(&self) -> u64 {
        self.before_bytes.saturating_sub(self.after_bytes)
    }

    /// Bytes this file grew by (0 if it shrank).
    pub fn added(&self) -> u64 {
        self.after_bytes.saturating_sub(self.before_bytes)
    }
}

/// Aggregate statistics of a sanitize run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub scanned: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub skipped_binary: usize,
    pub skipped_oversize: usize,
    pub failed: usize,
    /// Sum of `after - before` over every file.
    pub net_delta: i64,
    pub bytes_removed: u64,
    pub bytes_added: u64,
    /// Files classified `changed` (rewritten in write mode).
    pub modified: BTreeSet<PathBuf>,
    /// Files classified `failed`, with the reason.
    pub failures: BTreeMap<PathBuf, String>,
    /// Whether the run replaced files on disk.
    pub write: bool,
}

impl RunSummary {
    /// Fold one result into the summary.
    pub fn record(&mut self, result: &SanitizeResult) {
        self.scanned += 1;
        match &result.outcome {
            SanitizeOutcome::BinarySkipped => self.skipped_binary += 1,
            SanitizeOutcome::OversizeSkipped => self.skipped_oversize += 1,
            SanitizeOutcome::Unchanged => self.unchanged += 1,
            SanitizeOutcome::Changed => {
                self.changed += 1;
                self.modified.insert(result.path.clone());
            }
            SanitizeOutcome::Failed { reason } => {
                self.failed += 1;
                self.failures.insert(result.path.clone(), reason.clone());
            }
        }
        self.net_delta += result.delta();
        self.bytes_removed += result.removed();
        self.bytes_added += result.added();
    }

    /// Combine two partial summaries.
    pub fn merge(mut self, other: RunSummary) -> RunSummary {
        self.scanned += other.scanned;
        self.changed += other.changed;
        self.unchanged += other.unchanged;
        self.skipped_binary += other.skipped_binary;
        self.skipped_oversize += other.skipped_oversize;
        self.failed += other.failed;
        self.net_delta += other.net_delta;
        self.bytes_removed += other.bytes_removed;
        self.bytes_added += other.bytes_added;
        self.modified.extend(other.modified);
        self.failures.extend(other.failures);
        self.write |= other.write;
        self
    }

    /// Build a summary from a batch of results.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a SanitizeResult>, write: bool) -> Self {
        let mut summary = RunSummary {
            write,
            ..Default::default()
        };
        for r in results {
            summary.record(r);
        }
        summary
    }
}

/// Everything a sanitize run produced: per-file results sorted by path, and
/// their aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SanitizeOutput {
    pub results: Vec<SanitizeResult>,
    pub summary: RunSummary,
}

// ── PDF extraction ───────────────────────────────────────────────────────

/// Classification of one PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PdfOutcome {
    /// Extracted; enough text to be useful.
    Ok,
    /// Extracted, but so little text came out that the PDF is probably a scan.
    OcrFlagged,
    /// Existing output is newer than the PDF; nothing was run.
    #[serde(rename = "skipped-uptodate")]
    SkippedUpToDate,
    /// Existing output is up to date but under the OCR threshold.
    #[serde(rename = "skipped-uptodate-ocr-flagged")]
    SkippedUpToDateOcrFlagged,
    /// The page count could not be determined (or the output not written).
    Failed { reason: String },
}

impl PdfOutcome {
    /// Stable label used in reports and progress events.
    pub fn label(&self) -> &'static str {
        match self {
            PdfOutcome::Ok => "ok",
            PdfOutcome::OcrFlagged => "ocr-flagged",
            PdfOutcome::SkippedUpToDate => "skipped-uptodate",
            PdfOutcome::SkippedUpToDateOcrFlagged => "skipped-uptodate-ocr-flagged",
            PdfOutcome::Failed { .. } => "failed",
        }
    }

    /// `true` for both OCR-flagged variants.
    pub fn is_ocr_candidate(&self) -> bool {
        matches!(
            self,
            PdfOutcome::OcrFlagged | PdfOutcome::SkippedUpToDateOcrFlagged
        )
    }
}

/// Outcome of one PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfResult {
    pub pdf: PathBuf,
    pub output: PathBuf,
    /// Page count reported by the probe; `None` when skipped or failed.
    pub pages: Option<usize>,
    /// Non-whitespace characters of extracted text, page markers excluded.
    pub chars: usize,
    #[serde(flatten)]
    pub outcome: PdfOutcome,
}

/// Aggregate statistics of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfRunSummary {
    pub total: usize,
    pub ok: usize,
    pub ocr_flagged: usize,
    pub skipped_uptodate: usize,
    pub skipped_uptodate_ocr_flagged: usize,
    pub failed: usize,
    /// Display paths of every OCR candidate, fresh or skipped.
    pub ocr_candidates: BTreeSet<String>,
    /// Display path → failure reason.
    pub failures: BTreeMap<String, String>,
    pub output_dir: PathBuf,
}

impl PdfRunSummary {
    /// Fold one result into the summary.
    pub fn record(&mut self, result: &PdfResult) {
        self.total += 1;
        // Full paths: two PDFs in different directories may share a name.
        let name = display_path(&result.pdf);
        match &result.outcome {
            PdfOutcome::Ok => self.ok += 1,
            PdfOutcome::OcrFlagged => self.ocr_flagged += 1,
            PdfOutcome::SkippedUpToDate => self.skipped_uptodate += 1,
            PdfOutcome::SkippedUpToDateOcrFlagged => self.skipped_uptodate_ocr_flagged += 1,
            PdfOutcome::Failed { reason } => {
                self.failed += 1;
                self.failures.insert(name.clone(), reason.clone());
            }
        }
        if result.outcome.is_ocr_candidate() {
            self.ocr_candidates.insert(name);
        }
    }
}

/// Everything an extraction run produced: per-document results sorted by
/// PDF path, and their aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfOutput {
    pub results: Vec<PdfResult>,
    pub summary: PdfRunSummary,
}

// ── Bundle ───────────────────────────────────────────────────────────────

/// One file selected for bundling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Path as enumerated, used for reading.
    pub path: PathBuf,
    /// Path shown in the index and markers (relative to the working directory
    /// when possible).
    pub display: String,
    pub size: u64,
    pub modified: DateTime<Local>,
}

/// What the bundler wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    pub output: PathBuf,
    pub entries: Vec<BundleEntry>,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(path: &str, outcome: SanitizeOutcome, before: u64, after: u64) -> SanitizeResult {
        SanitizeResult {
            path: PathBuf::from(path),
            outcome,
            before_bytes: before,
            after_bytes: after,
        }
    }

    #[test]
    fn byte_accounting_matches_per_file_deltas() {
        let results = vec![
            result("a", SanitizeOutcome::Changed, 100, 90),
            result("b", SanitizeOutcome::Changed, 10, 14),
            result("c", SanitizeOutcome::Unchanged, 50, 50),
            result("d", SanitizeOutcome::BinarySkipped, 7, 7),
        ];
        let s = RunSummary::from_results(&results, false);
        assert_eq!(s.scanned, 4);
        assert_eq!(s.changed, 2);
        assert_eq!(s.unchanged, 1);
        assert_eq!(s.skipped_binary, 1);
        assert_eq!(s.net_delta, -6);
        assert_eq!(s.bytes_removed, 10);
        assert_eq!(s.bytes_added, 4);
        let per_file: i64 = results.iter().map(SanitizeResult::delta).sum();
        assert_eq!(per_file, s.net_delta);
        assert_eq!(s.bytes_added as i64 - s.bytes_removed as i64, s.net_delta);
    }

    #[test]
    fn fold_order_does_not_matter() {
        let results = vec![
            result("a", SanitizeOutcome::Changed, 3, 9),
            result("b", SanitizeOutcome::OversizeSkipped, 99, 99),
            result("c", SanitizeOutcome::Failed { reason: "denied".into() }, 0, 0),
            result("d", SanitizeOutcome::Changed, 12, 2),
        ];
        let forward = RunSummary::from_results(&results, true);
        let backward = RunSummary::from_results(results.iter().rev(), true);
        assert_eq!(forward, backward);

        let split = RunSummary::from_results(&results[..2], true)
            .merge(RunSummary::from_results(&results[2..], true));
        assert_eq!(forward, split);
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(SanitizeOutcome::BinarySkipped.label(), "binary-skipped");
        assert_eq!(PdfOutcome::SkippedUpToDateOcrFlagged.label(), "skipped-uptodate-ocr-flagged");
    }

    #[test]
    fn outcome_serialises_as_tag() {
        let r = result("x.txt", SanitizeOutcome::OversizeSkipped, 5, 5);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains(r#""outcome":"oversize-skipped""#), "got: {json}");

        let p = PdfResult {
            pdf: PathBuf::from("a.pdf"),
            output: PathBuf::from("out/a.txt"),
            pages: None,
            chars: 0,
            outcome: PdfOutcome::SkippedUpToDate,
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains(r#""outcome":"skipped-uptodate""#), "got: {json}");
    }

    #[test]
    fn pdf_summary_lists_both_ocr_variants() {
        let mut s = PdfRunSummary::default();
        for (name, outcome) in [
            ("a.pdf", PdfOutcome::Ok),
            ("b.pdf", PdfOutcome::OcrFlagged),
            ("c.pdf", PdfOutcome::SkippedUpToDateOcrFlagged),
            ("d.pdf", PdfOutcome::Failed { reason: "no pages".into() }),
        ] {
            s.record(&PdfResult {
                pdf: PathBuf::from("in").join(name),
                output: PathBuf::from("out"),
                pages: None,
                chars: 0,
                outcome,
            });
        }
        assert_eq!(s.total, 4);
        assert_eq!(
            s.ocr_candidates.iter().cloned().collect::<Vec<_>>(),
            vec!["in/b.pdf", "in/c.pdf"]
        );
        assert_eq!(s.failures.get("in/d.pdf").map(String::as_str), Some("no pages"));
    }

    #[test]
    fn pdf_summary_keeps_same_named_documents_apart() {
        let mut s = PdfRunSummary::default();
        for dir in ["a", "b"] {
            s.record(&PdfResult {
                pdf: PathBuf::from(dir).join("x.pdf"),
                output: PathBuf::from("out/x.txt"),
                pages: None,
                chars: 0,
                outcome: PdfOutcome::Failed { reason: format!("{dir} failed") },
            });
        }
        assert_eq!(s.failed, 2);
        assert_eq!(s.failures.len(), 2);
        assert_eq!(s.failures["b/x.pdf"], "b failed");
    }
}
