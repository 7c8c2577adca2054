//! Keeps the generated library directory out of version control.

use std::path::Path;

use tracing::debug;

use crate::error::ManagerResult;
use crate::fsutil;

/// Comment line written above the ignore entry.
pub const IGNORE_COMMENT: &str = "# JLC component libraries (generated)";

/// Appends `<lib_dir>/` to the ignore file unless it is already listed.
///
/// A line equal to `<lib_dir>` or `<lib_dir>/` counts as listed. Returns true
/// if the file was changed.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub fn ensure_ignored(ignore_file: &Path, lib_dir: &str) -> ManagerResult<bool> {
    let lib_dir = lib_dir.trim_end_matches('/');
    let entry = format!("{lib_dir}/");
    let existing = fsutil::read_optional(ignore_file)?.unwrap_or_default();

    let listed = existing
        .lines()
        .map(str::trim)
        .any(|line| line == lib_dir || line == entry);
    if listed {
        debug!(path = %ignore_file.display(), %entry, "Ignore entry already present");
        return Ok(false);
    }

    let mut text = existing;
    if !text.is_empty() {
        if !text.ends_with('\n') {
            text.push('\n');
        }
        if !text.ends_with("\n\n") {
            text.push('\n');
        }
    }
    text.push_str(IGNORE_COMMENT);
    text.push('\n');
    text.push_str(&entry);
    text.push('\n');

    fsutil::write_atomic(ignore_file, &text)?;
    debug!(path = %ignore_file.display(), %entry, "Added ignore entry");
    Ok(true)
}
