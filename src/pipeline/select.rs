//! Candidate selection: turn a [`FileSelection`] or a glob into a sorted list
//! of regular files.
//!
//! ## Glob anchoring
//!
//! `globwalk` matches gitignore-style patterns relative to a base directory,
//! where a bare `*.txt` would match at any depth. Patterns here follow shell
//! semantics instead: the literal leading directories become the walk base
//! and the walk depth is capped at the number of remaining segments unless
//! the pattern contains `**`. `pdf_text/*.txt` therefore walks `pdf_text`
//! one level deep and never descends into subdirectories.

use crate::config::FileSelection;
use crate::error::PrepError;
use globwalk::GlobWalkerBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Resolve a sanitize selection to the files it names.
///
/// Explicit lists keep their order (duplicates dropped) and are not checked
/// for existence; a missing file is reported per item later. Extension scans
/// and globs are sorted by path.
pub fn resolve_selection(selection: &FileSelection) -> Result<Vec<PathBuf>, PrepError> {
    match selection {
        FileSelection::Files(paths) => {
            let mut seen = HashSet::new();
            Ok(paths
                .iter()
                .filter(|p| seen.insert(p.to_path_buf()))
                .cloned()
                .collect())
        }
        FileSelection::Extensions { root, extensions } => Ok(scan_extensions(root, extensions)),
        FileSelection::Glob(pattern) => expand_glob(pattern),
    }
}

/// Recursive scan below `root`, skipping hidden files and directories.
fn scan_extensions(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| wanted.contains(&x.to_ascii_lowercase()))
        })
        .map(|e| tidy(e.path()))
        .collect();

    files.sort();
    debug!("Extension scan of {} found {} file(s)", root.display(), files.len());
    files
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Expand a shell-style glob into the regular files it matches, sorted.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, PrepError> {
    let (base, rest) = split_glob(pattern);

    let mut builder = GlobWalkerBuilder::from_patterns(&base, &[rest.as_str()])
        .case_insensitive(false)
        .follow_links(false);
    if !rest.contains("**") {
        builder = builder.max_depth(rest.split('/').count());
    }

    let walker = builder.build().map_err(|e| PrepError::InvalidGlob {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = walker
        .filter_map(Result::ok)
        .map(|e| tidy(e.path()))
        .filter(|p| is_regular_file(p))
        .collect();

    paths.sort();
    debug!("Glob '{}' matched {} file(s)", pattern, paths.len());
    Ok(paths)
}

/// Regular file, not following symlinks; matches what the extension scan
/// accepts, so a link is never replaced by a copy of its target.
fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_file())
}

/// Split a pattern into its literal leading directory and the glob part.
fn split_glob(pattern: &str) -> (PathBuf, String) {
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let segments: Vec<&str> = pattern.split('/').collect();

    let literal = segments
        .iter()
        .take_while(|s| !has_glob_meta(s))
        .count()
        .min(segments.len().saturating_sub(1));

    let base = segments[..literal].join("/");
    let base = if base.is_empty() {
        if pattern.starts_with('/') { "/" } else { "." }.to_string()
    } else {
        base
    };
    (PathBuf::from(base), segments[literal..].join("/"))
}

fn has_glob_meta(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{'])
}

/// Drop a leading `./` so paths display as the user typed them.
fn tidy(path: &Path) -> PathBuf {
    path.strip_prefix(".").unwrap_or(path).to_path_buf()
}

/// Forward-slash form of a path for markers and reports.
pub fn display_path(path: &Path) -> String {
    tidy(path).to_string_lossy().replace('\\', "/")
}
