//! CLI binary for corpus-prep.
//!
//! A thin shim over the library crate that maps CLI flags onto a
//! [`RunPlan`], runs it and prints the phase reports.

use anyhow::{Context, Result};
use clap::Parser;
use corpus_prep::report::render_run;
use corpus_prep::{
    run, BundleConfig, ExtractionMode, FileSelection, Mode, PdfConfig, Phase,
    PrepProgressCallback, ProgressCallback, ReportFormat, RunPlan, SanitizeConfig, SizeLimit,
    SortMode, TabPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar per phase. Items finish out of order, so the bar only counts;
/// notable outcomes are printed above it as they arrive.
struct CliProgressCallback {
    bar: Mutex<ProgressBar>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(ProgressBar::hidden()),
        })
    }

    fn current(&self) -> ProgressBar {
        self.bar.lock().map(|b| b.clone()).unwrap_or_else(|p| p.into_inner().clone())
    }
}

impl PrepProgressCallback for CliProgressCallback {
    fn on_phase_start(&self, phase: Phase, total_items: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold:>9}  [{bar:42.green/238}] {pos:>4}/{len} files  \
             {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");

        let bar = ProgressBar::new(total_items as u64);
        bar.set_style(style);
        bar.set_prefix(phase.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        match self.bar.lock() {
            Ok(mut slot) => *slot = bar,
            Err(poisoned) => *poisoned.into_inner() = bar,
        }
    }

    fn on_item_complete(&self, _phase: Phase, path: &Path, status: &str) {
        let bar = self.current();
        let mark = match status {
            "failed" => Some(red("x")),
            "ocr-flagged" | "skipped-uptodate-ocr-flagged" => Some(yellow("!")),
            "changed" => Some(green("~")),
            _ => None,
        };
        if let Some(mark) = mark {
            bar.println(format!("  {mark} {}  {}", path.display(), dim(status)));
        }
        bar.inc(1);
    }

    fn on_phase_complete(&self, phase: Phase, total_items: usize) {
        self.current().finish_and_clear();
        eprintln!(
            "{} {} {} item(s)",
            green("done"),
            bold(&phase.to_string()),
            total_items
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Preview what sanitizing every .txt file below the current directory would change
  corpus-prep

  # Rewrite the files in place
  corpus-prep --write

  # Only some files, or a glob
  corpus-prep --write notes/a.txt notes/b.txt
  corpus-prep --write --glob 'docs/**/*.md'

  # Extract PDFs into pdf_text/ and sanitize the result
  corpus-prep --mode pdf --write --pdf-glob 'scans/*.pdf'

  # Bundle text files into one document with sizes and dates
  corpus-prep --mode bundle --bundle-glob 'pdf_text/*.txt' --metadata

  # Everything, with a one-line machine-readable summary per phase
  corpus-prep --mode full --write --summary

EXTERNAL TOOLS:
  PDF modes need poppler's pdfinfo and pdftotext on PATH
  (Debian/Ubuntu: apt install poppler-utils, macOS: brew install poppler).

ENVIRONMENT VARIABLES:
  RUST_LOG                 Overrides the log filter (e.g. corpus_prep=debug)
  CORPUS_PREP_*            Every flag has an env fallback, see --help
"#;

/// Sanitize text to ASCII, extract PDFs and bundle corpora for LLM tooling.
#[derive(Parser, Debug)]
#[command(
    name = "corpus-prep",
    version,
    about = "Sanitize text to ASCII, extract PDFs and bundle corpora for LLM tooling",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Explicit files to sanitize (overrides --ext and --glob).
    files: Vec<PathBuf>,

    /// Which phases to run.
    #[arg(long, env = "CORPUS_PREP_MODE", value_enum, default_value = "sanitize")]
    mode: ModeArg,

    /// Replace changed files on disk (default is a dry run).
    #[arg(short, long, env = "CORPUS_PREP_WRITE")]
    write: bool,

    // ── Selection ────────────────────────────────────────────────────────
    /// Extensions to scan for, comma separated (default: txt).
    #[arg(long, env = "CORPUS_PREP_EXT", value_delimiter = ',', conflicts_with = "glob")]
    ext: Vec<String>,

    /// Directory scanned by --ext.
    #[arg(long, env = "CORPUS_PREP_ROOT", default_value = ".")]
    root: PathBuf,

    /// Glob selecting the files to sanitize.
    #[arg(long, env = "CORPUS_PREP_GLOB")]
    glob: Option<String>,

    /// Files processed at once (default: available CPUs).
    #[arg(short = 'j', long, env = "CORPUS_PREP_JOBS",
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    jobs: Option<u64>,

    // ── Sanitize policy ──────────────────────────────────────────────────
    /// Skip files larger than this many bytes.
    #[arg(long, env = "CORPUS_PREP_MAX_BYTES", default_value_t = corpus_prep::config::DEFAULT_MAX_BYTES,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_bytes: u64,

    /// Process files of any size.
    #[arg(long, env = "CORPUS_PREP_ALLOW_LARGE")]
    allow_large: bool,

    /// Tab stop width used when expanding tabs (1-32).
    #[arg(long, env = "CORPUS_PREP_TAB_WIDTH", default_value_t = 4,
          value_parser = clap::value_parser!(u64).range(1..=32))]
    tab_width: u64,

    /// Leave tab characters alone.
    #[arg(long, env = "CORPUS_PREP_KEEP_TABS")]
    keep_tabs: bool,

    /// Do not strip trailing whitespace.
    #[arg(long, env = "CORPUS_PREP_NO_TRIM")]
    no_trim: bool,

    /// Do not collapse blank-line runs.
    #[arg(long, env = "CORPUS_PREP_NO_COLLAPSE")]
    no_collapse: bool,

    // ── PDF extraction ───────────────────────────────────────────────────
    /// Glob selecting the PDFs.
    #[arg(long, env = "CORPUS_PREP_PDF_GLOB", default_value = "*.pdf")]
    pdf_glob: String,

    /// Directory receiving one .txt per PDF.
    #[arg(long, env = "CORPUS_PREP_PDF_OUT", default_value = "pdf_text")]
    pdf_out: PathBuf,

    /// Text ordering used by pdftotext.
    #[arg(long, env = "CORPUS_PREP_PDF_MODE", value_enum, default_value = "raw")]
    pdf_mode: PdfModeArg,

    /// Re-extract even when the output is newer than the PDF.
    #[arg(long, env = "CORPUS_PREP_FORCE")]
    force: bool,

    /// Flag documents with fewer non-whitespace characters than this.
    #[arg(long, env = "CORPUS_PREP_OCR_THRESHOLD",
          default_value_t = corpus_prep::config::DEFAULT_OCR_THRESHOLD)]
    ocr_threshold: usize,

    // ── Bundle ───────────────────────────────────────────────────────────
    /// Glob selecting the files to bundle (default: *.txt, or the PDF
    /// output after extraction).
    #[arg(long, env = "CORPUS_PREP_BUNDLE_GLOB")]
    bundle_glob: Option<String>,

    /// Path of the bundle document.
    #[arg(short = 'o', long, env = "CORPUS_PREP_BUNDLE_OUT", default_value = "corpus_bundle.txt")]
    bundle_out: PathBuf,

    /// Bundle ordering.
    #[arg(long, env = "CORPUS_PREP_SORT", value_enum, default_value = "name")]
    sort: SortArg,

    /// Reverse the bundle ordering.
    #[arg(long, env = "CORPUS_PREP_REVERSE")]
    reverse: bool,

    /// Omit the numbered index.
    #[arg(long, env = "CORPUS_PREP_NO_INDEX")]
    no_index: bool,

    /// Omit the explanatory preamble.
    #[arg(long, env = "CORPUS_PREP_NO_PREAMBLE")]
    no_preamble: bool,

    /// Show modification time and size for each bundled file.
    #[arg(long, env = "CORPUS_PREP_METADATA")]
    metadata: bool,

    // ── Output ───────────────────────────────────────────────────────────
    /// One key=value line per phase instead of the full report.
    #[arg(long, env = "CORPUS_PREP_SUMMARY", conflicts_with = "json")]
    summary: bool,

    /// Print the whole run report as JSON.
    #[arg(long, env = "CORPUS_PREP_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "CORPUS_PREP_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CORPUS_PREP_VERBOSE")]
    verbose: bool,

    /// Suppress everything except errors and the report.
    #[arg(short, long, env = "CORPUS_PREP_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Sanitize,
    Pdf,
    Bundle,
    Full,
}

impl From<ModeArg> for Mode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Sanitize => Mode::Sanitize,
            ModeArg::Pdf => Mode::Pdf,
            ModeArg::Bundle => Mode::Bundle,
            ModeArg::Full => Mode::Full,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PdfModeArg {
    Raw,
    Layout,
}

impl From<PdfModeArg> for ExtractionMode {
    fn from(v: PdfModeArg) -> Self {
        match v {
            PdfModeArg::Raw => ExtractionMode::Raw,
            PdfModeArg::Layout => ExtractionMode::Layout,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SortArg {
    Name,
    Mtime,
    Size,
}

impl From<SortArg> for SortMode {
    fn from(v: SortArg) -> Self {
        match v {
            SortArg::Name => SortMode::Name,
            SortArg::Mtime => SortMode::Modified,
            SortArg::Size => SortMode::Size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PrepProgressCallback>)
    } else {
        None
    };

    let plan = build_plan(&cli, progress)?;
    let report = run(&plan)
        .await
        .with_context(|| format!("{} run failed", plan.mode))?;

    let format = if cli.json {
        ReportFormat::Json
    } else if cli.summary {
        ReportFormat::KeyValue
    } else {
        ReportFormat::Human
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(render_run(&report, format).as_bytes())
        .context("Failed to write report to stdout")?;
    if format == ReportFormat::Json {
        handle.write_all(b"\n").ok();
    }

    if let Some(ref sanitize) = report.sanitize {
        if !cli.quiet && !cli.json && !sanitize.summary.write && sanitize.summary.changed > 0 {
            eprintln!("{}", dim("Dry run: no files were modified. Re-run with --write to apply."));
        }
    }

    Ok(())
}

/// Map CLI args to a [`RunPlan`].
fn build_plan(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunPlan> {
    let mut sanitize = SanitizeConfig::builder()
        .write(cli.write)
        .tabs(if cli.keep_tabs {
            TabPolicy::Keep
        } else {
            TabPolicy::Expand(cli.tab_width as usize)
        })
        .trim_trailing(!cli.no_trim)
        .collapse_blank_lines(!cli.no_collapse)
        .size_limit(if cli.allow_large {
            SizeLimit::Unlimited
        } else {
            SizeLimit::Max(cli.max_bytes)
        });
    let mut pdf = PdfConfig::builder()
        .source_glob(&cli.pdf_glob)
        .output_dir(&cli.pdf_out)
        .mode(cli.pdf_mode.into())
        .force(cli.force)
        .ocr_threshold(cli.ocr_threshold);
    if let Some(jobs) = cli.jobs {
        sanitize = sanitize.concurrency(jobs as usize);
        pdf = pdf.concurrency(jobs as usize);
    }

    let bundle = BundleConfig::builder()
        .output(&cli.bundle_out)
        .sort(cli.sort.into())
        .reverse(cli.reverse)
        .index(!cli.no_index)
        .preamble(!cli.no_preamble)
        .metadata(cli.metadata);
    let bundle = match cli.bundle_glob {
        Some(ref glob) => bundle.source_glob(glob),
        None => bundle,
    };

    let selection = if !cli.files.is_empty() {
        Some(FileSelection::Files(cli.files.clone()))
    } else if let Some(ref glob) = cli.glob {
        Some(FileSelection::Glob(glob.clone()))
    } else if !cli.ext.is_empty() {
        Some(FileSelection::Extensions {
            root: cli.root.clone(),
            extensions: cli.ext.clone(),
        })
    } else if cli.root != Path::new(".") {
        Some(FileSelection::Extensions {
            root: cli.root.clone(),
            extensions: vec!["txt".to_string()],
        })
    } else {
        None
    };

    Ok(RunPlan {
        mode: cli.mode.into(),
        selection,
        bundle_source: cli.bundle_glob.clone(),
        sanitize: sanitize.build().context("Invalid sanitize configuration")?,
        pdf: pdf.build().context("Invalid PDF configuration")?,
        bundle: bundle.build().context("Invalid bundle configuration")?,
        progress_callback: progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_build_a_sanitize_dry_run() {
        let cli = Cli::parse_from(["corpus-prep"]);
        let plan = build_plan(&cli, None).unwrap();
        assert_eq!(plan.mode, Mode::Sanitize);
        assert!(!plan.sanitize.write);
        assert!(plan.selection.is_none());
        assert_eq!(plan.sanitize.tabs, TabPolicy::Expand(4));
    }

    #[test]
    fn explicit_files_win() {
        let cli = Cli::parse_from(["corpus-prep", "--glob", "*.md", "a.txt"]);
        let plan = build_plan(&cli, None).unwrap();
        assert_eq!(
            plan.selection,
            Some(FileSelection::Files(vec![PathBuf::from("a.txt")]))
        );
    }

    #[test]
    fn invalid_enum_and_ranges_rejected() {
        assert!(Cli::try_parse_from(["corpus-prep", "--mode", "everything"]).is_err());
        assert!(Cli::try_parse_from(["corpus-prep", "--tab-width", "0"]).is_err());
        assert!(Cli::try_parse_from(["corpus-prep", "--jobs", "0"]).is_err());
        assert!(Cli::try_parse_from(["corpus-prep", "--sort", "random"]).is_err());
    }

    #[test]
    fn bundle_flags_map_onto_config() {
        let cli = Cli::parse_from([
            "corpus-prep", "--mode", "bundle", "--bundle-glob", "out/*.txt", "--sort", "mtime",
            "--reverse", "--metadata", "--no-index",
        ]);
        let plan = build_plan(&cli, None).unwrap();
        assert_eq!(plan.bundle.source_glob, "out/*.txt");
        assert_eq!(plan.bundle.sort, SortMode::Modified);
        assert!(plan.bundle.reverse && plan.bundle.metadata && !plan.bundle.index);
        assert_eq!(plan.bundle_source.as_deref(), Some("out/*.txt"));
    }
}
