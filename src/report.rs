//! Rendering of phase summaries for the console.
//!
//! Three formats: a multi-line human report, a single `key=value` line for
//! scripts and log scrapers, and pretty JSON. Lists inside the reports come
//! from ordered sets, so output is stable across runs.

use crate::orchestrate::RunReport;
use crate::output::{BundleSummary, PdfRunSummary, RunSummary};
use serde::Serialize;
use std::fmt::Write as _;

/// Output format for summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Multi-line report. (default)
    #[default]
    Human,
    /// One line of space-separated `key=value` pairs.
    KeyValue,
    /// Pretty-printed JSON.
    Json,
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Render a sanitize summary.
pub fn render_sanitize(summary: &RunSummary, format: ReportFormat) -> String {
    match format {
        ReportFormat::Json => to_json(summary),
        ReportFormat::KeyValue => format!(
            "scanned={} changed={} unchanged={} skipped_binary={} skipped_oversize={} \
             failed={} net_delta={} bytes_removed={} bytes_added={} write={}",
            summary.scanned,
            summary.changed,
            summary.unchanged,
            summary.skipped_binary,
            summary.skipped_oversize,
            summary.failed,
            summary.net_delta,
            summary.bytes_removed,
            summary.bytes_added,
            summary.write
        ),
        ReportFormat::Human => {
            let mut out = String::new();
            let mode = if summary.write { "write" } else { "dry run" };
            let _ = writeln!(out, "Sanitize ({mode})");
            let rows: [(&str, String); 9] = [
                ("scanned", summary.scanned.to_string()),
                ("changed", summary.changed.to_string()),
                ("unchanged", summary.unchanged.to_string()),
                ("skipped (binary)", summary.skipped_binary.to_string()),
                ("skipped (oversize)", summary.skipped_oversize.to_string()),
                ("failed", summary.failed.to_string()),
                ("bytes removed", summary.bytes_removed.to_string()),
                ("bytes added", summary.bytes_added.to_string()),
                ("net delta", format!("{:+}", summary.net_delta)),
            ];
            for (label, value) in rows {
                let _ = writeln!(out, "  {label:<20}{value:>10}");
            }
            if !summary.modified.is_empty() {
                let heading = if summary.write { "Modified" } else { "Would modify" };
                let _ = writeln!(out, "{heading}:");
                for path in &summary.modified {
                    let _ = writeln!(out, "  {}", path.display());
                }
            }
            if !summary.failures.is_empty() {
                let _ = writeln!(out, "Failures:");
                for (path, reason) in &summary.failures {
                    let _ = writeln!(out, "  {}: {}", path.display(), reason);
                }
            }
            out
        }
    }
}

/// Render a PDF extraction summary.
pub fn render_pdf(summary: &PdfRunSummary, format: ReportFormat) -> String {
    match format {
        ReportFormat::Json => to_json(summary),
        ReportFormat::KeyValue => format!(
            "pdfs={} ok={} ocr_flagged={} skipped_uptodate={} skipped_uptodate_ocr_flagged={} \
             failed={} ocr_candidates={}",
            summary.total,
            summary.ok,
            summary.ocr_flagged,
            summary.skipped_uptodate,
            summary.skipped_uptodate_ocr_flagged,
            summary.failed,
            summary
                .ocr_candidates
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(",")
        ),
        ReportFormat::Human => {
            let mut out = String::new();
            let _ = writeln!(out, "PDF extraction -> {}", summary.output_dir.display());
            let _ = writeln!(
                out,
                "  {} PDF(s): {} ok, {} OCR-flagged, {} up to date ({} OCR-flagged), {} failed",
                summary.total,
                summary.ok,
                summary.ocr_flagged,
                summary.skipped_uptodate + summary.skipped_uptodate_ocr_flagged,
                summary.skipped_uptodate_ocr_flagged,
                summary.failed
            );
            if !summary.ocr_candidates.is_empty() {
                let _ = writeln!(out, "OCR candidates:");
                for name in &summary.ocr_candidates {
                    let _ = writeln!(out, "  {name}");
                }
            }
            if !summary.failures.is_empty() {
                let _ = writeln!(out, "Failures:");
                for (name, reason) in &summary.failures {
                    let _ = writeln!(out, "  {name}: {reason}");
                }
            }
            out
        }
    }
}

/// Render what the bundler wrote.
pub fn render_bundle(summary: &BundleSummary, format: ReportFormat) -> String {
    match format {
        ReportFormat::Json => to_json(summary),
        ReportFormat::KeyValue => format!(
            "bundled={} output={} bytes={}",
            summary.entries.len(),
            summary.output.display(),
            summary.bytes_written
        ),
        ReportFormat::Human => format!(
            "Bundled {} file(s) into {} ({} bytes)\n",
            summary.entries.len(),
            summary.output.display(),
            summary.bytes_written
        ),
    }
}

/// Render every phase of a run, in phase order. JSON is one document.
pub fn render_run(report: &RunReport, format: ReportFormat) -> String {
    if format == ReportFormat::Json {
        return to_json(report);
    }
    let mut parts = Vec::new();
    if let Some(ref pdf) = report.pdf {
        parts.push(render_pdf(&pdf.summary, format));
    }
    if let Some(ref sanitize) = report.sanitize {
        parts.push(render_sanitize(&sanitize.summary, format));
    }
    if let Some(ref bundle) = report.bundle {
        parts.push(render_bundle(bundle, format));
    }
    let mut out = String::new();
    for part in parts {
        out.push_str(part.trim_end_matches('\n'));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample() -> RunSummary {
        let mut s = RunSummary {
            scanned: 4,
            changed: 2,
            unchanged: 1,
            skipped_binary: 1,
            net_delta: -7,
            bytes_removed: 9,
            bytes_added: 2,
            ..Default::default()
        };
        s.modified.insert(PathBuf::from("b.txt"));
        s.modified.insert(PathBuf::from("a.txt"));
        s
    }

    #[test]
    fn key_value_is_one_line() {
        let line = render_sanitize(&sample(), ReportFormat::KeyValue);
        assert!(!line.contains('\n'));
        assert!(line.starts_with("scanned=4 changed=2 unchanged=1 skipped_binary=1"));
        assert!(line.contains("net_delta=-7 bytes_removed=9 bytes_added=2"));
    }

    #[test]
    fn human_lists_modified_files_sorted() {
        let text = render_sanitize(&sample(), ReportFormat::Human);
        assert!(text.starts_with("Sanitize (dry run)\n"));
        let a = text.find("  a.txt").unwrap();
        let b = text.find("  b.txt").unwrap();
        assert!(a < b);
        assert!(text.contains("Would modify:"));
        assert!(text.contains("-7"));
    }

    #[test]
    fn json_round_trips() {
        let json = render_sanitize(&sample(), ReportFormat::Json);
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn pdf_report_lists_ocr_candidates() {
        let mut s = PdfRunSummary {
            total: 2,
            ok: 1,
            ocr_flagged: 1,
            output_dir: PathBuf::from("pdf_text"),
            ..Default::default()
        };
        s.ocr_candidates.insert("scan.pdf".into());
        let kv = render_pdf(&s, ReportFormat::KeyValue);
        assert!(kv.ends_with("ocr_candidates=scan.pdf"));
        let human = render_pdf(&s, ReportFormat::Human);
        assert!(human.contains("OCR candidates:\n  scan.pdf"));
    }
}
