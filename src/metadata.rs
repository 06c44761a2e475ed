//! Metadata extraction for agent and scenario files.
//!
//! The resolver and orchestrator only see the structured results; parsing
//! lives behind [`MetadataProvider`] so tests and other front ends can swap it.
//!
//! # Agent files
//!
//! Agents are Markdown files with YAML front matter:
//!
//! ```markdown
//! ---
//! name: api-designer
//! dependencies:
//!   requires: [schema-reviewer]
//!   recommends: [docs-writer]
//! ---
//! Body text is ignored.
//! ```
//!
//! Top-level `requires` / `recommends` keys are accepted as well, and each
//! may be a single string instead of a list. Names and edges may not contain
//! `:`, `,` or line breaks, which delimit the dependency map.

use crate::error::{CtlError, Result};
use crate::scenarios::definition::ScenarioDefinition;
use serde::Deserialize;
use std::path::Path;

/// Structured metadata for one agent file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMetadata {
    /// Human-readable name; `None` when the file does not declare one.
    pub name: Option<String>,
    pub requires: Vec<String>,
    pub recommends: Vec<String>,
}

/// Source of agent and scenario metadata.
pub trait MetadataProvider {
    fn parse_component(&self, path: &Path) -> Result<ComponentMetadata>;
    fn parse_scenario(&self, path: &Path) -> Result<ScenarioDefinition>;
}

/// Default provider: YAML front matter for agents, YAML documents for scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontMatterProvider;

impl MetadataProvider for FrontMatterProvider {
    fn parse_component(&self, path: &Path) -> Result<ComponentMetadata> {
        let content = std::fs::read_to_string(path).map_err(CtlError::fs("read agent", path))?;
        parse_component_text(&content, path)
    }

    fn parse_scenario(&self, path: &Path) -> Result<ScenarioDefinition> {
        let content =
            std::fs::read_to_string(path).map_err(CtlError::fs("read scenario", path))?;
        ScenarioDefinition::from_yaml(&content, path)
    }
}

/// Characters that delimit fields and lines in the dependency map.
const RESERVED_KEY_CHARS: [char; 4] = [':', ',', '\n', '\r'];

/// Whether `key` can be written to the dependency map unambiguously.
pub fn is_valid_key(key: &str) -> bool {
    !key.contains(&RESERVED_KEY_CHARS[..])
}

fn check_keys<'k>(
    path: &Path,
    field: &str,
    keys: impl IntoIterator<Item = &'k String>,
) -> Result<()> {
    match keys.into_iter().find(|key| !is_valid_key(key)) {
        Some(key) => Err(CtlError::SchemaInvalid {
            path: path.to_path_buf(),
            message: format!("{} entry '{}' may not contain ':', ',' or a line break", field, key.escape_debug()),
        }),
        None => Ok(()),
    }
}

/// A YAML field that may hold one string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringList {
    One(String),
    Many(Vec<String>),
}

impl StringList {
    /// Trimmed, non-empty, de-duplicated entries in declaration order.
    pub(crate) fn into_vec(list: Option<StringList>) -> Vec<String> {
        let raw = match list {
            None => Vec::new(),
            Some(StringList::One(s)) => vec![s],
            Some(StringList::Many(v)) => v,
        };
        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for entry in raw {
            let entry = entry.trim();
            if !entry.is_empty() && !out.iter().any(|e| e == entry) {
                out.push(entry.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawComponent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    requires: Option<StringList>,
    #[serde(default)]
    recommends: Option<StringList>,
    #[serde(default)]
    dependencies: Option<RawDependencies>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDependencies {
    #[serde(default)]
    requires: Option<StringList>,
    #[serde(default)]
    recommends: Option<StringList>,
}

/// Parse agent metadata from file content.
pub fn parse_component_text(content: &str, path: &Path) -> Result<ComponentMetadata> {
    let Some(front_matter) = extract_front_matter(content) else {
        return Ok(ComponentMetadata::default());
    };
    if front_matter.trim().is_empty() {
        return Ok(ComponentMetadata::default());
    }

    let raw: RawComponent =
        serde_yaml::from_str(front_matter).map_err(|e| CtlError::SchemaInvalid {
            path: path.to_path_buf(),
            message: format!("front matter: {}", e),
        })?;

    let (nested_requires, nested_recommends) = match raw.dependencies {
        Some(deps) => (deps.requires, deps.recommends),
        None => (None, None),
    };

    let mut requires = StringList::into_vec(raw.requires);
    for dep in StringList::into_vec(nested_requires) {
        if !requires.contains(&dep) {
            requires.push(dep);
        }
    }
    let mut recommends = StringList::into_vec(raw.recommends);
    for dep in StringList::into_vec(nested_recommends) {
        if !recommends.contains(&dep) {
            recommends.push(dep);
        }
    }

    let name = raw
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    check_keys(path, "name", &name)?;
    check_keys(path, "requires", &requires)?;
    check_keys(path, "recommends", &recommends)?;

    Ok(ComponentMetadata {
        name,
        requires,
        recommends,
    })
}

/// Return the text between a leading `---` line and the next `---` line.
fn extract_front_matter(content: &str) -> Option<&str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != "---" {
        return None;
    }

    let start = first.len();
    let mut offset = start;
    for line in lines {
        if line.trim_end() == "---" {
            return Some(&content[start..offset]);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ComponentMetadata {
        parse_component_text(text, Path::new("agent.md")).unwrap()
    }

    #[test]
    fn test_top_level_lists() {
        let meta = parse("---\nname: api\nrequires: [db, cache]\nrecommends: docs\n---\nbody\n");
        assert_eq!(meta.name.as_deref(), Some("api"));
        assert_eq!(meta.requires, vec!["db", "cache"]);
        assert_eq!(meta.recommends, vec!["docs"]);
    }

    #[test]
    fn test_nested_dependencies_block() {
        let meta = parse(
            "---\nname: web\ndependencies:\n  requires:\n    - api\n  recommends:\n    - lint\n---\n",
        );
        assert_eq!(meta.requires, vec!["api"]);
        assert_eq!(meta.recommends, vec!["lint"]);
    }

    #[test]
    fn test_no_front_matter() {
        let meta = parse("# Just markdown\n");
        assert_eq!(meta, ComponentMetadata::default());
    }

    #[test]
    fn test_unterminated_front_matter_is_ignored() {
        let meta = parse("---\nname: broken\n");
        assert_eq!(meta.name, None);
    }

    #[test]
    fn test_entries_trimmed_and_deduplicated() {
        let meta = parse("---\nrequires: [' a ', a, '', b]\n---\n");
        assert_eq!(meta.requires, vec!["a", "b"]);
    }

    #[test]
    fn test_extra_keys_tolerated() {
        let meta = parse("---\nname: x\ntools: [Read, Write]\nmodel: large\n---\n");
        assert_eq!(meta.name.as_deref(), Some("x"));
    }

    #[test]
    fn test_invalid_yaml_is_schema_error() {
        let err = parse_component_text("---\nrequires: [unclosed\n---\n", Path::new("bad.md"))
            .unwrap_err();
        assert!(matches!(err, CtlError::SchemaInvalid { .. }));
    }

    #[test]
    fn test_map_delimiters_rejected_in_names_and_edges() {
        for text in [
            "---\nname: 'api:v2'\n---\n",
            "---\nrequires: 'db,cache'\n---\n",
            "---\ndependencies:\n  recommends: ['docs:extra']\n---\n",
        ] {
            let err = parse_component_text(text, Path::new("bad.md")).unwrap_err();
            assert!(
                matches!(err, CtlError::SchemaInvalid { .. }),
                "accepted {:?}",
                text
            );
        }
        assert!(is_valid_key("api-designer"));
        assert!(!is_valid_key("a\nb"));
    }
}
