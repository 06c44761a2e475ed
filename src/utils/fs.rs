//! Filesystem helpers shared by the agent store and the scenario state files.

use crate::error::{CtlError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Atomically write `contents` to `path` (temp file in the same directory + rename).
///
/// A crash mid-write leaves either the previous file or the new one, never a
/// truncated file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        CtlError::InvalidConfig(format!("path has no parent directory: {}", path.display()))
    })?;
    fs::create_dir_all(parent).map_err(CtlError::fs("create directory", parent))?;

    let tmp_path = temp_sibling(path);
    debug!(path = %path.display(), tmp = %tmp_path.display(), "atomic write");
    fs::write(&tmp_path, contents).map_err(CtlError::fs("write", &tmp_path))?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(CtlError::fs("replace", path)(e));
    }
    Ok(())
}

/// Remove `path`, treating "already gone" as success. Returns whether a file was removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CtlError::fs("remove", path)(e)),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
