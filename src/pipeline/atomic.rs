//! Atomic file replacement.
//!
//! Content goes to a temp file in the destination directory, which is then
//! renamed over the target. Rename within one directory is atomic on every
//! platform we care about, so a reader sees either the old file or the new
//! one and a crash never leaves a half-written file behind.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::Builder;

/// Replace `path` with `contents`, creating parent directories as needed.
///
/// An existing target keeps its permission bits; a new one gets the
/// process's default file mode.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // New targets get the same mode `fs::write` would give them (0o666 less
    // the umask) instead of the temp file's private 0o600.
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
