//! Filesystem store for agent files across the active and disabled locations.

use crate::error::{CtlError, Result};
use crate::workspace::Workspace;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where an agent file currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Active,
    Disabled,
}

impl Location {
    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Active => "active",
            Location::Disabled => "disabled",
        }
    }
}

/// One agent file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredComponent {
    /// Filename stem, the unique storage key.
    pub slug: String,
    pub path: PathBuf,
    pub location: Location,
}

pub struct ComponentStore<'a> {
    workspace: &'a Workspace,
}

impl<'a> ComponentStore<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    pub fn workspace(&self) -> &Workspace {
        self.workspace
    }

    /// Every location in scan priority order: active first, then disabled dirs.
    pub fn locations(&self) -> Vec<(Location, &Path)> {
        let mut locations = vec![(Location::Active, self.workspace.active_dir.as_path())];
        locations.extend(
            self.workspace
                .disabled_dirs
                .iter()
                .map(|dir| (Location::Disabled, dir.as_path())),
        );
        locations
    }

    /// All agent files, location by location in priority order, sorted by slug within each.
    pub fn list(&self) -> Result<Vec<StoredComponent>> {
        let mut all = Vec::new();
        for (location, dir) in self.locations() {
            all.extend(self.list_dir(dir, location)?);
        }
        Ok(all)
    }

    fn list_dir(&self, dir: &Path, location: Location) -> Result<Vec<StoredComponent>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CtlError::fs("list", dir)(e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(CtlError::fs("list", dir))?;
            let path = entry.path();
            if !path.is_file() || path == self.workspace.dependency_map {
                continue;
            }
            let Some(slug) = self.slug_of(&path) else {
                continue;
            };
            found.push(StoredComponent {
                slug,
                path,
                location,
            });
        }
        found.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(found)
    }

    /// Slug for an agent file, or `None` if the file is not an agent.
    fn slug_of(&self, path: &Path) -> Option<String> {
        let ext = path.extension()?.to_str()?;
        if ext != self.workspace.component_extension {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        if stem.is_empty() || stem.starts_with('.') {
            return None;
        }
        Some(stem.to_string())
    }

    fn file_name(&self, slug: &str) -> String {
        format!("{}.{}", slug, self.workspace.component_extension)
    }

    /// Path the agent occupies once active.
    pub fn active_path(&self, slug: &str) -> PathBuf {
        self.workspace.active_dir.join(self.file_name(slug))
    }

    pub fn find_active(&self, slug: &str) -> Option<StoredComponent> {
        let path = self.active_path(slug);
        path.is_file().then(|| StoredComponent {
            slug: slug.to_string(),
            path,
            location: Location::Active,
        })
    }

    /// First disabled copy of `slug`, in disabled-dir priority order.
    pub fn find_disabled(&self, slug: &str) -> Option<StoredComponent> {
        self.workspace
            .disabled_dirs
            .iter()
            .map(|dir| dir.join(self.file_name(slug)))
            .find(|path| path.is_file())
            .map(|path| StoredComponent {
                slug: slug.to_string(),
                path,
                location: Location::Disabled,
            })
    }

    /// Find `slug` in any location, active first.
    pub fn find(&self, slug: &str) -> Option<StoredComponent> {
        self.find_active(slug).or_else(|| self.find_disabled(slug))
    }

    /// Move a disabled agent into the active directory.
    pub fn activate(&self, slug: &str) -> Result<PathBuf> {
        let source = self
            .find_disabled(slug)
            .ok_or_else(|| CtlError::AgentNotFound(slug.to_string()))?;
        let target = self.active_path(slug);
        move_file(&source.path, &target)?;
        self.remove_stale_disabled_copies(slug, None)?;
        debug!(slug, from = %source.path.display(), to = %target.display(), "activated");
        Ok(target)
    }

    /// Move an active agent into the primary disabled directory.
    pub fn deactivate(&self, slug: &str) -> Result<PathBuf> {
        let source = self
            .find_active(slug)
            .ok_or_else(|| CtlError::NotActive(slug.to_string()))?;
        let target = self
            .workspace
            .primary_disabled_dir()
            .join(self.file_name(slug));
        move_file(&source.path, &target)?;
        self.remove_stale_disabled_copies(slug, Some(&target))?;
        debug!(slug, from = %source.path.display(), to = %target.display(), "deactivated");
        Ok(target)
    }

    /// Delete leftover copies of `slug` in disabled dirs, except `keep`.
    fn remove_stale_disabled_copies(&self, slug: &str, keep: Option<&Path>) -> Result<()> {
        for dir in &self.workspace.disabled_dirs {
            let path = dir.join(self.file_name(slug));
            if Some(path.as_path()) == keep || !path.is_file() {
                continue;
            }
            warn!(path = %path.display(), "removing stale duplicate agent file");
            fs::remove_file(&path).map_err(CtlError::fs("remove stale copy", &path))?;
        }
        Ok(())
    }
}

/// Move `from` to `to`, atomically replacing any file already at `to`.
///
/// Falls back to copy-then-rename when the locations sit on different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(CtlError::fs("create directory", parent))?;
    }

    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    let staging = to.with_extension("moving");
    fs::copy(from, &staging).map_err(CtlError::fs("copy", from))?;
    if let Err(e) = fs::rename(&staging, to) {
        let _ = fs::remove_file(&staging);
        return Err(CtlError::fs("replace", to)(e));
    }
    fs::remove_file(from).map_err(CtlError::fs("remove", from))?;
    Ok(())
}
