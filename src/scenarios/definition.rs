//! Scenario definitions loaded from YAML.
//!
//! ```yaml
//! name: deploy
//! description: Ship the service
//! priority: high
//! type: operational
//! phases:
//!   - name: prepare
//!     condition: auto
//!     agents: [api-designer]
//!     profiles: [backend]
//!     success_criteria: [schema reviewed]
//!   - name: release
//!     condition: manual
//!     parallel: true
//! ```

use crate::error::{CtlError, Result};
use crate::metadata::StringList;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub description: String,
    pub priority: String,
    #[serde(rename = "type")]
    pub scenario_type: String,
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Phase {
    pub name: String,
    pub description: String,
    pub condition: PhaseCondition,
    /// Informational; phases always run one after another.
    pub parallel: bool,
    pub agents: Vec<String>,
    pub profiles: Vec<String>,
    pub success_criteria: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhaseCondition {
    Manual,
    #[default]
    Auto,
}

impl PhaseCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseCondition::Manual => "manual",
            PhaseCondition::Auto => "auto",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawHeader {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<Value>,
    #[serde(default, rename = "type")]
    scenario_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPhase {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    condition: PhaseCondition,
    #[serde(default)]
    parallel: bool,
    #[serde(default)]
    agents: Option<StringList>,
    #[serde(default)]
    profiles: Option<StringList>,
    #[serde(default, alias = "successCriteria")]
    success_criteria: Option<StringList>,
}

impl ScenarioDefinition {
    /// Parse a scenario document.
    ///
    /// Fails with `SchemaInvalid` when the document is not a mapping, when
    /// `phases` is not a list, or when any phase entry is not a mapping or
    /// lacks a name. The file stem stands in for a missing `name`.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self> {
        let invalid = |message: String| CtlError::SchemaInvalid {
            path: path.to_path_buf(),
            message,
        };

        let doc: Value = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;
        let Value::Mapping(mut map) = doc else {
            return Err(invalid("scenario must be a mapping".to_string()));
        };

        let raw_phases = map.remove("phases");
        let header: RawHeader = serde_yaml::from_value(Value::Mapping(map))
            .map_err(|e| invalid(e.to_string()))?;

        let entries = match raw_phases {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(entries)) => entries,
            Some(_) => return Err(invalid("'phases' must be a list".to_string())),
        };

        let mut phases = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            if !entry.is_mapping() {
                return Err(invalid(format!("phase {} must be a mapping", index + 1)));
            }
            let raw: RawPhase = serde_yaml::from_value(entry)
                .map_err(|e| invalid(format!("phase {}: {}", index + 1, e)))?;
            let name = raw
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| invalid(format!("phase {} has no name", index + 1)))?;
            phases.push(Phase {
                name,
                description: raw.description.unwrap_or_default(),
                condition: raw.condition,
                parallel: raw.parallel,
                agents: StringList::into_vec(raw.agents),
                profiles: StringList::into_vec(raw.profiles),
                success_criteria: StringList::into_vec(raw.success_criteria),
            });
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name: header
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or(stem),
            description: header.description.unwrap_or_default(),
            priority: header
                .priority
                .and_then(scalar_to_string)
                .unwrap_or_else(|| "normal".to_string()),
            scenario_type: header
                .scenario_type
                .unwrap_or_else(|| "operational".to_string()),
            phases,
        })
    }

    /// Semantic checks beyond parsing. Returns every problem found.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.phases.is_empty() {
            problems.push("scenario declares no phases".to_string());
        }
        let mut seen: Vec<&str> = Vec::new();
        for phase in &self.phases {
            if seen.contains(&phase.name.as_str()) {
                problems.push(format!("duplicate phase name '{}'", phase.name));
            } else {
                seen.push(&phase.name);
            }
        }
        problems
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
