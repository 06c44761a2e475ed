//! Resolved storage layout, built once per invocation and passed explicitly.

use crate::config::Config;
use crate::error::Result;
use crate::scenarios::RunMode;
use std::path::{Path, PathBuf};

/// Absolute paths of every location agentctl reads or writes.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub active_dir: PathBuf,
    /// Disabled locations in priority order.
    pub disabled_dirs: Vec<PathBuf>,
    pub scenarios_dir: PathBuf,
    pub state_dir: PathBuf,
    pub lock_dir: PathBuf,
    pub dependency_map: PathBuf,
    pub component_extension: String,
    pub max_dependency_depth: usize,
    pub default_mode: RunMode,
}

impl Workspace {
    /// Workspace with the default layout under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_config(root, &Config::default())
    }

    /// Resolve the root from `config` and lay out the workspace below it.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root = config.resolve_root()?;
        Ok(Self::with_config(root, config))
    }

    pub fn with_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        let root = root.into();
        let layout = &config.layout;
        Self {
            active_dir: root.join(&layout.active_dir),
            disabled_dirs: layout
                .disabled_dirs
                .iter()
                .map(|dir| root.join(dir))
                .collect(),
            scenarios_dir: root.join(&layout.scenarios_dir),
            state_dir: root.join(&layout.state_dir),
            lock_dir: root.join(&layout.lock_dir),
            dependency_map: root.join(&layout.dependency_map),
            component_extension: layout.component_extension.clone(),
            max_dependency_depth: config.orchestrate.max_dependency_depth,
            default_mode: config.orchestrate.default_mode,
            root,
        }
    }

    /// Where deactivated agents are moved.
    pub fn primary_disabled_dir(&self) -> &Path {
        // Config validation guarantees at least one disabled dir.
        self.disabled_dirs
            .first()
            .map(PathBuf::as_path)
            .unwrap_or(self.root.as_path())
    }
}

/// Sanitize a name for use as a file key: lowercase alphanumerics, runs of
/// anything else collapsed to a single dash, no leading or trailing dashes.
pub fn sanitize_key(name: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = false;

    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() {
            result.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            result.push('-');
            last_was_dash = true;
        }
    }

    let trimmed = result.trim_matches('-');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
