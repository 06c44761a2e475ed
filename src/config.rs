use crate::error::{CtlError, Result};
use crate::scenarios::RunMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the global config file looked up in the home directory.
pub const GLOBAL_CONFIG_FILE: &str = ".agentctl.toml";
/// Points at an additional config file layered over the global one.
pub const CONFIG_ENV: &str = "AGENTCTL_CONFIG";
/// Overrides the storage root.
pub const ROOT_ENV: &str = "AGENTCTL_ROOT";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Storage root holding agents, scenarios and state. `~` is expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub orchestrate: OrchestrateConfig,
}

/// Directory layout below the storage root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    #[serde(default = "default_active_dir")]
    pub active_dir: String,

    /// Disabled locations in priority order. Deactivated agents go to the first.
    #[serde(default = "default_disabled_dirs")]
    pub disabled_dirs: Vec<String>,

    #[serde(default = "default_scenarios_dir")]
    pub scenarios_dir: String,

    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    #[serde(default = "default_lock_dir")]
    pub lock_dir: String,

    #[serde(default = "default_dependency_map")]
    pub dependency_map: String,

    #[serde(default = "default_component_extension")]
    pub component_extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            active_dir: default_active_dir(),
            disabled_dirs: default_disabled_dirs(),
            scenarios_dir: default_scenarios_dir(),
            state_dir: default_state_dir(),
            lock_dir: default_lock_dir(),
            dependency_map: default_dependency_map(),
            component_extension: default_component_extension(),
        }
    }
}

fn default_active_dir() -> String {
    "agents".to_string()
}

fn default_disabled_dirs() -> Vec<String> {
    vec!["inactive/agents".to_string(), "agents-disabled".to_string()]
}

fn default_scenarios_dir() -> String {
    "scenarios".to_string()
}

fn default_state_dir() -> String {
    ".agentctl/state".to_string()
}

fn default_lock_dir() -> String {
    ".agentctl/locks".to_string()
}

fn default_dependency_map() -> String {
    "agents/dependencies.map".to_string()
}

fn default_component_extension() -> String {
    "md".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OrchestrateConfig {
    /// Mode used by `orchestrate run` when `--mode` is not given.
    #[serde(default = "default_mode")]
    pub default_mode: RunMode,

    /// Upper bound on requires-chain depth during activation.
    #[serde(default = "default_max_dependency_depth")]
    pub max_dependency_depth: usize,
}

impl Default for OrchestrateConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            max_dependency_depth: default_max_dependency_depth(),
        }
    }
}

fn default_mode() -> RunMode {
    RunMode::Interactive
}

fn default_max_dependency_depth() -> usize {
    64
}

impl Config {
    /// Load configuration with precedence:
    /// 1. CLI flags (applied later via `with_root_override`)
    /// 2. Environment variables (`AGENTCTL_ROOT`)
    /// 3. File named by `--config` or `AGENTCTL_CONFIG`
    /// 4. Global config (~/.agentctl.toml)
    /// 5. Built-in defaults
    pub fn load(explicit_file: Option<&Path>) -> Result<Self> {
        let env_file = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let extra = explicit_file.map(Path::to_path_buf).or(env_file);
        let env_root = std::env::var(ROOT_ENV).ok().filter(|v| !v.is_empty());

        Self::load_layers(home_dir().as_deref(), extra.as_deref(), env_root)
    }

    /// Layered load with every ambient input passed in explicitly.
    pub fn load_layers(
        home: Option<&Path>,
        extra_file: Option<&Path>,
        env_root: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        if let Some(home) = home {
            let global = home.join(GLOBAL_CONFIG_FILE);
            if global.exists() {
                config = config.merge(Self::from_file(&global)?);
            }
        }

        if let Some(path) = extra_file {
            // An explicitly named file must exist.
            config = config.merge(Self::from_file(path)?);
        }

        if let Some(root) = env_root {
            config.root = Some(root);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(CtlError::fs("read config", path))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(mut self, other: Self) -> Self {
        if other.root.is_some() {
            self.root = other.root;
        }

        let defaults = LayoutConfig::default();
        if other.layout.active_dir != defaults.active_dir {
            self.layout.active_dir = other.layout.active_dir;
        }
        // Disabled locations form an ordered set; replace rather than append.
        if other.layout.disabled_dirs != defaults.disabled_dirs {
            self.layout.disabled_dirs = other.layout.disabled_dirs;
        }
        if other.layout.scenarios_dir != defaults.scenarios_dir {
            self.layout.scenarios_dir = other.layout.scenarios_dir;
        }
        if other.layout.state_dir != defaults.state_dir {
            self.layout.state_dir = other.layout.state_dir;
        }
        if other.layout.lock_dir != defaults.lock_dir {
            self.layout.lock_dir = other.layout.lock_dir;
        }
        if other.layout.dependency_map != defaults.dependency_map {
            self.layout.dependency_map = other.layout.dependency_map;
        }
        if other.layout.component_extension != defaults.component_extension {
            self.layout.component_extension = other.layout.component_extension;
        }

        if other.orchestrate.default_mode != default_mode() {
            self.orchestrate.default_mode = other.orchestrate.default_mode;
        }
        if other.orchestrate.max_dependency_depth != default_max_dependency_depth() {
            self.orchestrate.max_dependency_depth = other.orchestrate.max_dependency_depth;
        }

        self
    }

    /// Apply the `--root` flag (highest precedence)
    pub fn with_root_override(mut self, root: Option<&Path>) -> Self {
        if let Some(root) = root {
            self.root = Some(root.to_string_lossy().into_owned());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        let named = [
            ("active_dir", &layout.active_dir),
            ("scenarios_dir", &layout.scenarios_dir),
            ("state_dir", &layout.state_dir),
            ("lock_dir", &layout.lock_dir),
            ("dependency_map", &layout.dependency_map),
            ("component_extension", &layout.component_extension),
        ];
        for (key, value) in named {
            if value.trim().is_empty() {
                return Err(CtlError::InvalidConfig(format!(
                    "layout.{} cannot be empty",
                    key
                )));
            }
        }

        if layout.disabled_dirs.is_empty() {
            return Err(CtlError::InvalidConfig(
                "layout.disabled_dirs must name at least one directory".to_string(),
            ));
        }
        for dir in &layout.disabled_dirs {
            if dir.trim().is_empty() {
                return Err(CtlError::InvalidConfig(
                    "layout.disabled_dirs cannot contain empty entries".to_string(),
                ));
            }
            if *dir == layout.active_dir {
                return Err(CtlError::InvalidConfig(format!(
                    "'{}' cannot be both the active directory and a disabled directory",
                    dir
                )));
            }
        }

        if self.orchestrate.max_dependency_depth == 0 {
            return Err(CtlError::InvalidConfig(
                "orchestrate.max_dependency_depth must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve the storage root: configured value with `~` expanded, or `~/.claude`.
    pub fn resolve_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => expand_tilde(root, home_dir().as_deref()).ok_or_else(|| {
                CtlError::InvalidConfig(format!("Cannot expand '{}': HOME is not set", root))
            }),
            None => home_dir().map(|home| home.join(".claude")).ok_or_else(|| {
                CtlError::InvalidConfig(
                    "No storage root configured and HOME is not set. Use --root or AGENTCTL_ROOT"
                        .to_string(),
                )
            }),
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CtlError::InvalidConfig(format!("Failed to render config: {}", e)))
    }
}

/// Expand a leading `~` or `~/` against `home`.
fn expand_tilde(path: &str, home: Option<&Path>) -> Option<PathBuf> {
    if path == "~" {
        return home.map(Path::to_path_buf);
    }
    match path.strip_prefix("~/") {
        Some(rest) => home.map(|h| h.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.root, None);
        assert_eq!(config.layout.active_dir, "agents");
        assert_eq!(
            config.layout.disabled_dirs,
            vec!["inactive/agents", "agents-disabled"]
        );
        assert_eq!(config.orchestrate.default_mode, RunMode::Interactive);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
root = "/srv/ctx"

[layout]
disabled_dirs = ["parked"]

[orchestrate]
default_mode = "automatic"
"#,
        )
        .unwrap();

        assert_eq!(config.root.as_deref(), Some("/srv/ctx"));
        assert_eq!(config.layout.disabled_dirs, vec!["parked"]);
        assert_eq!(config.layout.active_dir, "agents");
        assert_eq!(config.orchestrate.default_mode, RunMode::Automatic);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[layout]\nactive = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_layers() {
        let temp = tempfile::tempdir().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(
            home.join(GLOBAL_CONFIG_FILE),
            "root = \"/global\"\n[layout]\nscenarios_dir = \"plays\"\n",
        )
        .unwrap();
        let extra = temp.path().join("extra.toml");
        fs::write(&extra, "root = \"/extra\"\n").unwrap();

        let config = Config::load_layers(Some(home.as_path()), Some(extra.as_path()), None).unwrap();
        assert_eq!(config.root.as_deref(), Some("/extra"));
        assert_eq!(config.layout.scenarios_dir, "plays");

        let config =
            Config::load_layers(Some(home.as_path()), Some(extra.as_path()), Some("/from-env".to_string())).unwrap();
        assert_eq!(config.root.as_deref(), Some("/from-env"));

        let config = config.with_root_override(Some(Path::new("/from-cli")));
        assert_eq!(config.root.as_deref(), Some("/from-cli"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(Config::load_layers(None, Some(missing.as_path()), None).is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_dirs() {
        let mut config = Config::default();
        config.layout.disabled_dirs = vec!["agents".to_string()];
        assert!(matches!(config.validate(), Err(CtlError::InvalidConfig(_))));

        let mut config = Config::default();
        config.layout.disabled_dirs.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.orchestrate.max_dependency_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_expand_tilde() {
        let home = Path::new("/home/me");
        assert_eq!(
            expand_tilde("~/ctx", Some(home)),
            Some(PathBuf::from("/home/me/ctx"))
        );
        assert_eq!(expand_tilde("~", Some(home)), Some(PathBuf::from("/home/me")));
        assert_eq!(expand_tilde("/abs", None), Some(PathBuf::from("/abs")));
        assert_eq!(expand_tilde("~/ctx", None), None);
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config {
            root: Some("/srv".to_string()),
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
