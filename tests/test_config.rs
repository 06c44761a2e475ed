use agentctl::config::Config;
use agentctl::scenarios::RunMode;
use agentctl::workspace::Workspace;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Restores an environment variable when dropped.
struct EnvGuard {
    key: &'static str,
    previous: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let previous = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, previous }
    }

    fn unset(key: &'static str) -> Self {
        let previous = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, previous }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => std::env::set_var(self.key, value),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
#[serial]
fn test_env_layers_over_global_file() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join(".agentctl.toml"),
        "root = \"~/agents-root\"\n[orchestrate]\ndefault_mode = \"automatic\"\n",
    )
    .unwrap();
    let extra = home.path().join("extra.toml");
    fs::write(&extra, "[layout]\nactive_dir = \"live\"\n").unwrap();

    let _home = EnvGuard::set("HOME", home.path());
    let _config = EnvGuard::set("AGENTCTL_CONFIG", &extra);
    let _root = EnvGuard::unset("AGENTCTL_ROOT");

    let config = Config::load(None).unwrap();
    assert_eq!(config.orchestrate.default_mode, RunMode::Automatic);
    assert_eq!(config.layout.active_dir, "live");

    let ws = Workspace::from_config(&config).unwrap();
    assert_eq!(ws.root, home.path().join("agents-root"));
    assert_eq!(ws.active_dir, home.path().join("agents-root/live"));
}

#[test]
#[serial]
fn test_root_precedence() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join(".agentctl.toml"), "root = \"/from/file\"\n").unwrap();
    let _home = EnvGuard::set("HOME", home.path());
    let _config = EnvGuard::unset("AGENTCTL_CONFIG");
    let _root = EnvGuard::set("AGENTCTL_ROOT", "/from/env");

    let config = Config::load(None).unwrap();
    assert_eq!(config.resolve_root().unwrap(), PathBuf::from("/from/env"));

    let flagged = config.with_root_override(Some(std::path::Path::new("/from/flag")));
    assert_eq!(flagged.resolve_root().unwrap(), PathBuf::from("/from/flag"));
}

#[test]
#[serial]
fn test_default_root_is_under_home() {
    let home = TempDir::new().unwrap();
    let _home = EnvGuard::set("HOME", home.path());
    let _config = EnvGuard::unset("AGENTCTL_CONFIG");
    let _root = EnvGuard::unset("AGENTCTL_ROOT");

    let config = Config::load(None).unwrap();
    assert_eq!(config.resolve_root().unwrap(), home.path().join(".claude"));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    let home = TempDir::new().unwrap();
    let _home = EnvGuard::set("HOME", home.path());
    let _config = EnvGuard::unset("AGENTCTL_CONFIG");
    let absent = home.path().join("absent.toml");
    assert!(Config::load(Some(absent.as_path())).is_err());
}
