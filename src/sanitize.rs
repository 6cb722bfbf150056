//! Sanitize phase: run every selected file through the text pipeline in
//! parallel, then fold the per-file results into a [`RunSummary`].
//!
//! ## Why spawn_blocking?
//!
//! Each file is read, transformed and possibly rewritten with blocking
//! `std::fs` calls and CPU-bound regex passes. Running that on the tokio
//! worker threads would stall the runtime, so every file becomes one
//! `spawn_blocking` task and `buffer_unordered` caps how many run at once.
//!
//! ## Isolation
//!
//! Workers share only the immutable [`Sanitizer`] and never touch each
//! other's files. A failure (unreadable file, failed rename, even a panic)
//! becomes that file's [`SanitizeOutcome::Failed`] and never aborts the
//! rest of the run. Results are sorted by path before folding, so the report
//! is the same whatever order the workers finished in.

use crate::config::{FileSelection, SanitizeConfig, SizeLimit};
use crate::error::PrepError;
use crate::output::{RunSummary, SanitizeOutcome, SanitizeOutput, SanitizeResult};
use crate::pipeline::atomic::write_atomic;
use crate::pipeline::cleanup::Sanitizer;
use crate::pipeline::detect::{self, PROBE_LEN};
use crate::pipeline::select;
use crate::progress::Phase;
use futures::stream::{self, StreamExt};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resolve `selection` and sanitize every file it names.
///
/// # Errors
/// Only a bad glob is fatal. Per-file problems are outcomes.
pub async fn sanitize(
    selection: &FileSelection,
    config: &SanitizeConfig,
) -> Result<SanitizeOutput, PrepError> {
    let files = select::resolve_selection(selection)?;
    sanitize_files(&files, config).await
}

/// Sanitize an explicit list of files.
pub async fn sanitize_files(
    files: &[PathBuf],
    config: &SanitizeConfig,
) -> Result<SanitizeOutput, PrepError> {
    let start = Instant::now();
    let total = files.len();
    info!(
        "Sanitizing {} file(s) ({})",
        total,
        if config.write { "write" } else { "dry run" }
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_phase_start(Phase::Sanitize, total);
    }

    let sanitizer = Arc::new(Sanitizer::new(config));
    let size_limit = config.size_limit;
    let write = config.write;

    let mut results: Vec<SanitizeResult> = stream::iter(files.iter().cloned().map(|path| {
        let sanitizer = Arc::clone(&sanitizer);
        let callback = config.progress_callback.clone();
        async move {
            let task_path = path.clone();
            let result = tokio::task::spawn_blocking(move || {
                sanitize_file(&task_path, &sanitizer, size_limit, write)
            })
            .await
            .unwrap_or_else(|e| {
                SanitizeResult::untouched(
                    path.clone(),
                    SanitizeOutcome::Failed {
                        reason: format!("worker panicked: {e}"),
                    },
                    0,
                )
            });
            if let Some(ref cb) = callback {
                cb.on_item_complete(Phase::Sanitize, &path, result.outcome.label());
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    results.sort_by(|a, b| a.path.cmp(&b.path));
    let summary = RunSummary::from_results(&results, write);

    info!(
        "Sanitize complete: {} scanned, {} changed, {} failed in {}ms",
        summary.scanned,
        summary.changed,
        summary.failed,
        start.elapsed().as_millis()
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_phase_complete(Phase::Sanitize, total);
    }

    Ok(SanitizeOutput { results, summary })
}

/// Synchronous wrapper around [`sanitize`].
///
/// Creates a temporary tokio runtime internally.
pub fn sanitize_sync(
    selection: &FileSelection,
    config: &SanitizeConfig,
) -> Result<SanitizeOutput, PrepError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PrepError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(sanitize(selection, config))
}

/// Run the text pipeline on an in-memory string with the policy of `config`.
pub fn sanitize_text(input: &str, config: &SanitizeConfig) -> String {
    Sanitizer::new(config).apply(input)
}

/// Process one file: probe, size gate, transform, compare, maybe replace.
///
/// Blocking; never panics on I/O and never returns an error.
pub fn sanitize_file(
    path: &Path,
    sanitizer: &Sanitizer,
    size_limit: SizeLimit,
    write: bool,
) -> SanitizeResult {
    let failed = |reason: String, bytes: u64| {
        warn!("{}: {}", path.display(), reason);
        SanitizeResult::untouched(path.to_path_buf(), SanitizeOutcome::Failed { reason }, bytes)
    };

    let len = match fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => return failed("not a regular file".to_string(), 0),
        Err(e) => return failed(format!("cannot stat: {e}"), 0),
    };

    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => return failed(format!("cannot open: {e}"), len),
    };

    let mut bytes = Vec::with_capacity(PROBE_LEN.min(len as usize));
    if let Err(e) = file.by_ref().take(PROBE_LEN as u64).read_to_end(&mut bytes) {
        return failed(format!("cannot read: {e}"), len);
    }

    if detect::looks_binary(&bytes) {
        debug!("{}: binary, skipped", path.display());
        return SanitizeResult::untouched(path.to_path_buf(), SanitizeOutcome::BinarySkipped, len);
    }
    if size_limit.exceeded_by(len) {
        debug!("{}: {} bytes, over limit", path.display(), len);
        return SanitizeResult::untouched(path.to_path_buf(), SanitizeOutcome::OversizeSkipped, len);
    }

    if let Err(e) = file.read_to_end(&mut bytes) {
        return failed(format!("cannot read: {e}"), len);
    }
    let before = bytes.len() as u64;

    let Some(original) = detect::decode_text(bytes) else {
        debug!("{}: not valid UTF-8 text, skipped", path.display());
        return SanitizeResult::untouched(path.to_path_buf(), SanitizeOutcome::BinarySkipped, before);
    };

    let cleaned = sanitizer.apply(&original);
    if cleaned == original {
        return SanitizeResult::untouched(path.to_path_buf(), SanitizeOutcome::Unchanged, before);
    }

    if write {
        if let Err(e) = write_atomic(path, cleaned.as_bytes()) {
            return failed(format!("cannot replace: {e}"), before);
        }
        debug!("{}: rewritten", path.display());
    }

    SanitizeResult {
        path: path.to_path_buf(),
        outcome: SanitizeOutcome::Changed,
        before_bytes: before,
        after_bytes: cleaned.len() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(path: &Path, limit: SizeLimit, write: bool) -> SanitizeResult {
        sanitize_file(path, &Sanitizer::default(), limit, write)
    }

    #[test]
    fn test_changed_in_dry_run_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.txt");
        fs::write(&p, "caf\u{00E9}  \r\n").unwrap();

        let r = run(&p, SizeLimit::default(), false);
        assert_eq!(r.outcome, SanitizeOutcome::Changed);
        assert_eq!(r.before_bytes, 9);
        assert_eq!(r.after_bytes, 4);
        assert_eq!(fs::read_to_string(&p).unwrap(), "caf\u{00E9}  \r\n");
    }

    #[test]
    fn test_write_mode_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("a.txt");
        fs::write(&p, "100%\n").unwrap();

        let r = run(&p, SizeLimit::default(), true);
        assert_eq!(r.outcome, SanitizeOutcome::Changed);
        assert_eq!(fs::read_to_string(&p).unwrap(), "100\\%\n");
        assert_eq!(run(&p, SizeLimit::default(), true).outcome, SanitizeOutcome::Unchanged);
    }

    #[test]
    fn test_binary_wins_over_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("img.png");
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.extend(std::iter::repeat_n(b'x', 100));
        fs::write(&p, &data).unwrap();

        let r = run(&p, SizeLimit::Max(10), false);
        assert_eq!(r.outcome, SanitizeOutcome::BinarySkipped);
        assert_eq!(r.delta(), 0);
    }

    #[test]
    fn test_oversize_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("big.txt");
        fs::write(&p, "x".repeat(11)).unwrap();
        assert_eq!(run(&p, SizeLimit::Max(10), false).outcome, SanitizeOutcome::OversizeSkipped);
        assert_eq!(run(&p, SizeLimit::Unlimited, false).outcome, SanitizeOutcome::Changed);
    }

    #[test]
    fn test_late_invalid_utf8_is_binary() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("late.txt");
        let mut data = "a".repeat(PROBE_LEN + 10).into_bytes();
        data.push(0xFF);
        fs::write(&p, &data).unwrap();
        assert_eq!(run(&p, SizeLimit::Unlimited, true).outcome, SanitizeOutcome::BinarySkipped);
        assert_eq!(fs::read(&p).unwrap(), data);
    }

    #[test]
    fn test_missing_file_is_failed_not_fatal() {
        let r = run(Path::new("/definitely/not/here.txt"), SizeLimit::default(), false);
        assert!(matches!(r.outcome, SanitizeOutcome::Failed { .. }));
    }

    #[test]
    fn test_parallel_run_is_sorted_and_reports_progress() {
        use crate::progress::PrepProgressCallback;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct Count(AtomicUsize);
        impl PrepProgressCallback for Count {
            fn on_item_complete(&self, _phase: Phase, _path: &Path, _status: &str) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for i in (0..12).rev() {
            let p = dir.path().join(format!("f{i:02}.txt"));
            fs::write(&p, if i % 2 == 0 { "clean\n" } else { "tab\there\n" }).unwrap();
            files.push(p);
        }
        let counter = Arc::new(Count::default());
        let config = SanitizeConfig::builder()
            .concurrency(3)
            .progress_callback(counter.clone())
            .build()
            .unwrap();

        let output = tokio_test::block_on(sanitize_files(&files, &config)).unwrap();
        let paths: Vec<_> = output.results.iter().map(|r| r.path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
        assert_eq!(output.summary.changed, 6);
        assert_eq!(output.summary.unchanged, 6);
        assert_eq!(counter.0.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_sanitize_text() {
        let config = SanitizeConfig::default();
        assert_eq!(sanitize_text("a\u{2014}b", &config), "a---b\n");
    }
}
