//! Persisted execution state, one JSON file per scenario run.

use super::definition::ScenarioDefinition;
use crate::error::{CtlError, Result};
use crate::utils::fs::write_atomic;
use crate::workspace::{sanitize_key, Workspace};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    /// Declared but not reached yet. Never persisted; used when reporting.
    Pending,
    Running,
    Skipped,
    Completed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Running => "running",
            PhaseStatus::Skipped => "skipped",
            PhaseStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub name: String,
    pub status: PhaseStatus,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub scenario: String,
    pub description: String,
    /// Scenario file the run was loaded from.
    pub source: String,
    pub started: DateTime<Utc>,
    pub status: RunStatus,
    pub phases: Vec<PhaseRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
}

/// A state file read back from disk.
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub path: PathBuf,
    pub state: ExecutionState,
}

impl StoredRun {
    /// Execution id encoded in the file name, `<scenario>-<id>.json`.
    pub fn execution_id(&self) -> Option<String> {
        let stem = self.path.file_stem()?.to_str()?;
        stem.strip_prefix(&format!("{}-", sanitize_key(&self.state.scenario)))
            .map(str::to_string)
    }
}

pub struct StateStore<'a> {
    dir: &'a Path,
}

impl<'a> StateStore<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self {
            dir: &workspace.state_dir,
        }
    }

    pub fn state_path(&self, scenario: &str, execution_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.json", sanitize_key(scenario), execution_id))
    }

    /// Create and persist the state for a new run with no phase entries.
    pub fn begin(
        &self,
        definition: &ScenarioDefinition,
        source: &Path,
        execution_id: &str,
    ) -> Result<ActiveRun> {
        let run = ActiveRun {
            path: self.state_path(&definition.name, execution_id),
            state: ExecutionState {
                scenario: definition.name.clone(),
                description: definition.description.clone(),
                source: source.display().to_string(),
                started: Utc::now(),
                status: RunStatus::Running,
                phases: Vec::new(),
                completed: None,
            },
        };
        run.persist()?;
        debug!(path = %run.path.display(), "execution state created");
        Ok(run)
    }

    pub fn load(path: &Path) -> Result<ExecutionState> {
        let contents =
            fs::read_to_string(path).map_err(CtlError::fs("read execution state", path))?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Every readable state file, newest run first.
    pub fn list(&self) -> Result<Vec<StoredRun>> {
        let entries = match fs::read_dir(self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CtlError::fs("list", self.dir)(e)),
        };

        let mut runs = Vec::new();
        for entry in entries {
            let path = entry.map_err(CtlError::fs("list", self.dir))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load(&path) {
                Ok(state) => runs.push(StoredRun { path, state }),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable state file"),
            }
        }
        runs.sort_by(|a, b| {
            b.state
                .started
                .cmp(&a.state.started)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(runs)
    }
}

/// The state of a run in progress. Finishing consumes it.
#[derive(Debug)]
pub struct ActiveRun {
    path: PathBuf,
    state: ExecutionState,
}

impl ActiveRun {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Append a phase entry and persist. Returns its index.
    pub fn record_phase(
        &mut self,
        name: &str,
        status: PhaseStatus,
        note: Option<String>,
    ) -> Result<usize> {
        self.state.phases.push(PhaseRecord {
            name: name.to_string(),
            status,
            updated: Utc::now(),
            note,
        });
        self.persist()?;
        Ok(self.state.phases.len() - 1)
    }

    /// Move the phase entry at `index` to `status` and persist.
    pub fn update_phase(&mut self, index: usize, status: PhaseStatus) -> Result<()> {
        if let Some(record) = self.state.phases.get_mut(index) {
            record.status = status;
            record.updated = Utc::now();
        }
        self.persist()
    }

    /// Stamp the final status and completion time. No further updates are possible.
    pub fn finish(mut self, status: RunStatus) -> Result<ExecutionState> {
        self.state.status = status;
        self.state.completed = Some(Utc::now());
        self.persist()?;
        debug!(path = %self.path.display(), status = status.as_str(), "execution state finalized");
        Ok(self.state)
    }

    fn persist(&self) -> Result<()> {
        let mut buf = serde_json::to_string_pretty(&self.state)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}
