//! Scenario orchestration: multi-phase runs guarded by a per-scenario lock,
//! with progress persisted as one JSON state file per run.
//!
//! A run moves through `running -> completed | failed`; each phase moves
//! through `pending -> running -> skipped | completed`. Plan mode never
//! touches the filesystem.

pub mod definition;
pub mod lock;
pub mod orchestrator;
pub mod preview;
pub mod prompt;
pub mod state;

pub use definition::{Phase, PhaseCondition, ScenarioDefinition};
pub use lock::{LockCoordinator, LockGuard};
pub use orchestrator::{Orchestrator, RunOutcome, ScenarioEntry, ScenarioStatus, ValidationReport};
pub use prompt::{Prompter, ScriptedPrompter, StdinPrompter};
pub use state::{ActiveRun, ExecutionState, PhaseRecord, PhaseStatus, RunStatus, StateStore};

use serde::{Deserialize, Serialize};

/// How `orchestrate run` treats phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Print the phases; no lock, no state, no activation
    Plan,
    /// Ask before each auto phase
    Interactive,
    /// Run every phase without asking
    Automatic,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Plan => "plan",
            RunMode::Interactive => "interactive",
            RunMode::Automatic => "automatic",
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
