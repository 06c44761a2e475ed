//! Drives scenario runs and the read-only reports over them.

use super::definition::{PhaseCondition, ScenarioDefinition};
use super::lock::LockCoordinator;
use super::preview;
use super::prompt::Prompter;
use super::state::{ActiveRun, ExecutionState, PhaseStatus, RunStatus, StateStore, StoredRun};
use super::RunMode;
use crate::agents::{DependencyGraph, Location, Resolver};
use crate::error::{CtlError, Result};
use crate::metadata::MetadataProvider;
use crate::workspace::{sanitize_key, Workspace};
use chrono::Utc;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SCENARIO_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Result of a successful `run`.
#[derive(Debug)]
pub enum RunOutcome {
    /// Plan mode: nothing was written.
    Planned {
        definition: ScenarioDefinition,
        preview: String,
    },
    Finished {
        execution_id: String,
        state_path: PathBuf,
        state: ExecutionState,
    },
}

/// One scenario file as seen by `list`.
#[derive(Debug, Clone)]
pub struct ScenarioEntry {
    pub path: PathBuf,
    /// `Err` carries the load error message.
    pub definition: std::result::Result<ScenarioDefinition, String>,
    /// Execution id of the lock currently held for this scenario.
    pub locked_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub name: String,
    pub path: PathBuf,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A persisted run plus the declared phases it has not recorded yet.
#[derive(Debug, Clone)]
pub struct ScenarioStatus {
    pub run: StoredRun,
    pub pending: Vec<String>,
    /// Still `running` on disk but no lock is held for this execution.
    pub abandoned: bool,
}

pub struct Orchestrator<'a, P: MetadataProvider + ?Sized> {
    workspace: &'a Workspace,
    provider: &'a P,
    resolver: Resolver<'a, P>,
    locks: LockCoordinator<'a>,
    states: StateStore<'a>,
}

impl<'a, P: MetadataProvider + ?Sized> Orchestrator<'a, P> {
    pub fn new(workspace: &'a Workspace, provider: &'a P) -> Self {
        Self {
            workspace,
            provider,
            resolver: Resolver::new(workspace, provider),
            locks: LockCoordinator::new(workspace),
            states: StateStore::new(workspace),
        }
    }

    pub fn locks(&self) -> &LockCoordinator<'a> {
        &self.locks
    }

    /// Locate the definition file for `name`.
    ///
    /// Tries `<name>.yaml`, `<name>.yml`, the sanitized variants, and finally
    /// any scenario file whose declared name matches.
    pub fn find_scenario_file(&self, name: &str) -> Result<PathBuf> {
        let dir = &self.workspace.scenarios_dir;
        let sanitized = sanitize_key(name);
        for stem in [name, sanitized.as_str()] {
            for ext in SCENARIO_EXTENSIONS {
                let candidate = dir.join(format!("{}.{}", stem, ext));
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        for path in self.scenario_files()? {
            match self.provider.parse_scenario(&path) {
                Ok(def) if def.name == name || sanitize_key(&def.name) == sanitized => {
                    return Ok(path)
                }
                Ok(_) => {}
                Err(e) => debug!(path = %path.display(), error = %e, "skipping while searching"),
            }
        }
        Err(CtlError::ScenarioNotFound(name.to_string()))
    }

    /// Find and parse the scenario called `name`.
    pub fn load(&self, name: &str) -> Result<(PathBuf, ScenarioDefinition)> {
        let path = self.find_scenario_file(name)?;
        let definition = self.provider.parse_scenario(&path)?;
        Ok((path, definition))
    }

    /// Run `name` in `mode`.
    ///
    /// Plan mode only renders the phases. Other modes take the scenario lock,
    /// create the state file, and walk the phases in order. A phase error
    /// finalizes the state as `failed` and is returned as `PhaseFailed`. A
    /// panic while walking the phases also finalizes `failed` before the
    /// unwind resumes. The lock is released on every path once acquired.
    ///
    /// A state file that cannot be finalized stays `running`; its path is
    /// logged and `status` reports it as abandoned.
    pub fn run<Q: Prompter + ?Sized>(
        &self,
        name: &str,
        mode: RunMode,
        prompter: &mut Q,
    ) -> Result<RunOutcome> {
        let (path, definition) = self.load(name)?;

        if mode == RunMode::Plan {
            return Ok(RunOutcome::Planned {
                preview: preview::render(&definition),
                definition,
            });
        }

        let execution_id = self.next_execution_id(&definition.name);
        let guard = self.locks.acquire(&definition.name, &execution_id)?;
        // From here the guard's Drop removes the lock on early returns.
        let mut run = self.states.begin(&definition, &path, &execution_id)?;
        info!(scenario = %definition.name, %execution_id, mode = mode.as_str(), "run started");
        println!(
            "Running scenario '{}' ({} mode, execution {})",
            definition.name,
            mode.as_str(),
            execution_id
        );

        let state_path = run.path().to_path_buf();
        let walked = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_phases(&definition, mode, prompter, &mut run)
        }));
        let outcome = match walked {
            Ok(Ok(())) => match run.finish(RunStatus::Completed) {
                Ok(state) => {
                    println!("Scenario '{}' completed", definition.name);
                    Ok(RunOutcome::Finished {
                        execution_id: execution_id.clone(),
                        state_path,
                        state,
                    })
                }
                Err(e) => {
                    warn_unfinalized(&state_path, &e);
                    Err(e)
                }
            },
            Ok(Err((phase, source))) => {
                info!(scenario = %definition.name, %phase, error = %source, "run failed");
                if let Err(e) = run.finish(RunStatus::Failed) {
                    warn_unfinalized(&state_path, &e);
                }
                Err(CtlError::PhaseFailed {
                    scenario: definition.name.clone(),
                    phase,
                    source: Box::new(source),
                })
            }
            Err(payload) => {
                warn!(scenario = %definition.name, "run panicked; marking it failed");
                if let Err(e) = run.finish(RunStatus::Failed) {
                    warn_unfinalized(&state_path, &e);
                }
                if let Err(e) = guard.release() {
                    warn!(scenario = %definition.name, error = %e, "failed to release lock");
                }
                panic::resume_unwind(payload);
            }
        };

        if let Err(e) = guard.release() {
            warn!(scenario = %definition.name, error = %e, "failed to release lock");
        }
        outcome
    }

    /// Walk the phases; on error returns the failing phase name with the cause.
    fn run_phases<Q: Prompter + ?Sized>(
        &self,
        definition: &ScenarioDefinition,
        mode: RunMode,
        prompter: &mut Q,
        run: &mut ActiveRun,
    ) -> std::result::Result<(), (String, CtlError)> {
        let total = definition.phases.len();
        for (index, phase) in definition.phases.iter().enumerate() {
            let fail = |e: CtlError| (phase.name.clone(), e);

            if mode == RunMode::Interactive && phase.condition != PhaseCondition::Manual {
                let proceed = prompter.confirm_phase(phase, index, total).map_err(fail)?;
                if !proceed {
                    println!("Skipping phase '{}'", phase.name);
                    run.record_phase(
                        &phase.name,
                        PhaseStatus::Skipped,
                        Some("declined by operator".to_string()),
                    )
                    .map_err(fail)?;
                    continue;
                }
            }

            println!("Phase {}/{}: {}", index + 1, total, phase.name);
            let record = run
                .record_phase(&phase.name, PhaseStatus::Running, None)
                .map_err(fail)?;
            self.execute_phase(&phase.profiles, &phase.agents)
                .map_err(fail)?;
            run.update_phase(record, PhaseStatus::Completed)
                .map_err(fail)?;
            debug!(phase = %phase.name, "phase completed");
        }
        Ok(())
    }

    fn execute_phase(&self, profiles: &[String], agents: &[String]) -> Result<()> {
        for profile in profiles {
            println!("  Profile: {}", profile);
        }

        for agent in agents {
            match self.resolver.find_in_any_location(agent)? {
                None => {
                    eprintln!("  Warning: agent '{}' not found; continuing", agent);
                    debug!(%agent, "phase agent not found");
                }
                Some(node) if node.location == Location::Active => {
                    println!("  Agent '{}' already active", node.name);
                }
                Some(node) => {
                    let report = self.resolver.activate(&node.name)?;
                    println!("  Activated: {}", report.activated.join(", "));
                    for advisory in &report.advisories {
                        println!(
                            "  Note: '{}' recommends '{}'",
                            advisory.agent, advisory.recommends
                        );
                    }
                }
            }
        }

        self.resolver.regenerate_dependency_map()
    }

    /// Clear the lock for `name`. Returns the execution id it carried, if any.
    pub fn stop(&self, name: &str) -> Result<Option<String>> {
        let key = self.lock_name(name);
        let cleared = self.locks.clear(&key)?;
        match &cleared {
            Some(id) => info!(scenario = %key, execution_id = %id, "lock cleared"),
            None => debug!(scenario = %key, "no lock to clear"),
        }
        Ok(cleared)
    }

    /// Every scenario file, parsed where possible, sorted by path.
    pub fn list(&self) -> Result<Vec<ScenarioEntry>> {
        let mut entries = Vec::new();
        for path in self.scenario_files()? {
            let definition = self
                .provider
                .parse_scenario(&path)
                .map_err(|e| e.to_string());
            let lock_name = match &definition {
                Ok(def) => def.name.clone(),
                Err(_) => file_stem(&path),
            };
            let locked_by = self.locks.holder(&lock_name)?;
            entries.push(ScenarioEntry {
                path,
                definition,
                locked_by,
            });
        }
        Ok(entries)
    }

    /// Validate one scenario. Load failures are reported, not returned.
    pub fn validate(&self, name: &str) -> Result<ValidationReport> {
        let path = self.find_scenario_file(name)?;
        let graph = self.resolver.graph()?;
        Ok(self.validate_file(&path, &graph))
    }

    pub fn validate_all(&self) -> Result<Vec<ValidationReport>> {
        let graph = self.resolver.graph()?;
        Ok(self
            .scenario_files()?
            .iter()
            .map(|path| self.validate_file(path, &graph))
            .collect())
    }

    fn validate_file(&self, path: &Path, graph: &DependencyGraph) -> ValidationReport {
        let mut report = ValidationReport {
            name: file_stem(path),
            path: path.to_path_buf(),
            ..Default::default()
        };
        let definition = match self.provider.parse_scenario(path) {
            Ok(def) => def,
            Err(e) => {
                report.errors.push(e.to_string());
                return report;
            }
        };
        report.name = definition.name.clone();
        report.errors.extend(definition.problems());
        for phase in &definition.phases {
            for agent in &phase.agents {
                if graph.find(agent).is_none() {
                    report.warnings.push(format!(
                        "phase '{}': agent '{}' not found",
                        phase.name, agent
                    ));
                }
            }
        }
        report
    }

    /// Persisted runs, newest first, optionally only those of `name`.
    pub fn status(&self, name: Option<&str>) -> Result<Vec<ScenarioStatus>> {
        let wanted = name.map(|n| sanitize_key(&self.lock_name(n)));
        let mut statuses = Vec::new();
        for run in self.states.list()? {
            if let Some(key) = &wanted {
                if sanitize_key(&run.state.scenario) != *key {
                    continue;
                }
            }
            let pending = self.pending_phases(&run.state);
            let abandoned = run.state.status == RunStatus::Running
                && match (self.locks.holder(&run.state.scenario)?, run.execution_id()) {
                    (Some(holder), Some(id)) => holder != id,
                    (Some(_), None) => false,
                    (None, _) => true,
                };
            statuses.push(ScenarioStatus {
                run,
                pending,
                abandoned,
            });
        }
        Ok(statuses)
    }

    /// Declared phases with no entry in `state`, in declaration order.
    fn pending_phases(&self, state: &ExecutionState) -> Vec<String> {
        let definition = match self.provider.parse_scenario(Path::new(&state.source)) {
            Ok(def) => def,
            Err(e) => {
                debug!(source = %state.source, error = %e, "definition unavailable for status");
                return Vec::new();
            }
        };
        definition
            .phases
            .into_iter()
            .filter(|phase| !state.phases.iter().any(|r| r.name == phase.name))
            .map(|phase| phase.name)
            .collect()
    }

    /// Lock key for `name`: the declared scenario name when it can be loaded.
    fn lock_name(&self, name: &str) -> String {
        match self.load(name) {
            Ok((_, def)) => def.name,
            Err(_) => name.to_string(),
        }
    }

    /// A fresh id: UTC timestamp to the millisecond plus the process id.
    fn next_execution_id(&self, scenario: &str) -> String {
        let base = format!(
            "{}-{}",
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            std::process::id()
        );
        let mut id = base.clone();
        let mut n = 1;
        while self.states.state_path(scenario, &id).exists() {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        id
    }

    fn scenario_files(&self) -> Result<Vec<PathBuf>> {
        let dir = &self.workspace.scenarios_dir;
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CtlError::fs("list", dir)(e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(CtlError::fs("list", dir))?.path();
            let is_scenario = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SCENARIO_EXTENSIONS.contains(&e));
            if is_scenario && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn warn_unfinalized(state_path: &Path, error: &CtlError) {
    warn!(
        path = %state_path.display(),
        %error,
        "execution state could not be finalized and is left as running"
    );
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
