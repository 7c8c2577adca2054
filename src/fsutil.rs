//! Small filesystem helpers shared by the manifest, table and project code.

use std::fs::Permissions;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{ManagerError, ManagerResult};

/// Replaces `path` with `contents` in a single rename.
///
/// The data is written to a temporary file in the same directory first, so
/// readers see either the old file or the new one, never a truncated mix.
/// An existing file keeps its permissions.
///
/// # Errors
///
/// Returns [`ManagerError::FileWrite`] if the temporary file cannot be
/// created, written or moved into place.
pub fn write_atomic(path: &Path, contents: &str) -> ManagerResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let permissions = std::fs::metadata(path)
        .map(|meta| meta.permissions())
        .ok()
        .or_else(new_file_permissions);

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ManagerError::file_write(path, e))?;
    if let Some(permissions) = permissions {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| ManagerError::file_write(path, e))?;
    }
    tmp.write_all(contents.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ManagerError::file_write(path, e))?;
    tmp.persist(path)
        .map_err(|e| ManagerError::file_write(path, e.error))?;

    Ok(())
}

// Temporary files are created owner-only; project files should not be.
#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
const fn new_file_permissions() -> Option<Permissions> {
    None
}

/// Reads a UTF-8 file, returning `None` if it does not exist.
///
/// # Errors
///
/// Returns [`ManagerError::FileRead`] for any failure other than absence.
pub fn read_optional(path: &Path) -> ManagerResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ManagerError::file_read(path, e)),
    }
}
