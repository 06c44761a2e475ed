use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CtlError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent '{0}' is not active")]
    NotActive(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    #[error("Dependency chain starting at '{name}' is deeper than {limit} levels")]
    DepthExceeded { name: String, limit: usize },

    #[error(
        "Cannot deactivate '{name}': required by active agents: {}\nUse --force to deactivate anyway",
        dependents.join(", ")
    )]
    DependentsBlocking {
        name: String,
        dependents: Vec<String>,
    },

    #[error("Scenario '{scenario}' is already running (execution {execution_id})\nIf the previous run crashed, clear the lock with: agentctl orchestrate stop {scenario}")]
    LockHeld {
        scenario: String,
        execution_id: String,
    },

    #[error("Invalid schema in {}: {message}", path.display())]
    SchemaInvalid { path: PathBuf, message: String },

    #[error("Phase '{phase}' of scenario '{scenario}' failed: {source}")]
    PhaseFailed {
        scenario: String,
        phase: String,
        #[source]
        source: Box<CtlError>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("State file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to {action} {}: {source}", path.display())]
    Fs {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CtlError {
    /// Build a closure that wraps an `io::Error` with the failed action and path.
    pub fn fs(action: &'static str, path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| CtlError::Fs {
            action,
            path,
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CtlError>;
