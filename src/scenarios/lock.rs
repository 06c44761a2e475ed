//! Cross-process run locks, one file per sanitized scenario name.

use crate::error::{CtlError, Result};
use crate::utils::fs::remove_if_exists;
use crate::workspace::{sanitize_key, Workspace};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct LockCoordinator<'a> {
    dir: &'a Path,
}

/// A held lock; `Drop` removes the lock file if `release` was not called.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    execution_id: String,
    released: bool,
}

impl<'a> LockCoordinator<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            dir: &workspace.lock_dir,
        }
    }

    pub fn lock_path(&self, scenario: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", sanitize_key(scenario)))
    }

    /// Take the lock for `scenario`, failing with `LockHeld` if it exists.
    ///
    /// Uses exclusive create, so two processes cannot both succeed.
    pub fn acquire(&self, scenario: &str, execution_id: &str) -> Result<LockGuard> {
        fs::create_dir_all(self.dir).map_err(CtlError::fs("create directory", self.dir))?;
        let path = self.lock_path(scenario);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = self
                    .holder(scenario)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "unknown".to_string());
                return Err(CtlError::LockHeld {
                    scenario: scenario.to_string(),
                    execution_id: holder,
                });
            }
            Err(e) => return Err(CtlError::fs("create lock", &path)(e)),
        };

        // The guard exists before the write so a failed write still cleans up.
        let guard = LockGuard {
            path,
            execution_id: execution_id.to_string(),
            released: false,
        };
        file.write_all(execution_id.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(CtlError::fs("write lock", &guard.path))?;

        debug!(scenario, execution_id, path = %guard.path.display(), "lock acquired");
        Ok(guard)
    }

    /// Execution id recorded in the lock for `scenario`, if the lock exists.
    pub fn holder(&self, scenario: &str) -> Result<Option<String>> {
        let path = self.lock_path(scenario);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CtlError::fs("read lock", &path)(e)),
        }
    }

    /// Delete the lock for `scenario`. Returns the execution id it held, if any.
    pub fn clear(&self, scenario: &str) -> Result<Option<String>> {
        let holder = self.holder(scenario)?;
        let removed = remove_if_exists(&self.lock_path(scenario))?;
        Ok(if removed {
            Some(holder.unwrap_or_default())
        } else {
            None
        })
    }

    /// All present locks as `(lock key, execution id)`, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let entries = match fs::read_dir(self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CtlError::fs("list", self.dir)(e)),
        };

        let mut locks = Vec::new();
        for entry in entries {
            let path = entry.map_err(CtlError::fs("list", self.dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("lock") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = fs::read_to_string(&path).unwrap_or_default();
            locks.push((key.to_string(), id.trim().to_string()));
        }
        locks.sort();
        Ok(locks)
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Remove the lock file now, reporting failures to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        remove_if_exists(&self.path)?;
        debug!(path = %self.path.display(), "lock released");
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_exists(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
    }
}
