use crate::cli::ConfigCommands;
use crate::config::{Config, CONFIG_ENV, GLOBAL_CONFIG_FILE};
use crate::error::Result;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};

/// `explicit_file` and `root` are the global `--config` and `--root` flags.
pub fn execute(command: &ConfigCommands, explicit_file: Option<&Path>, root: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommands::Validate { file } => validate(file.as_deref().or(explicit_file)),
        ConfigCommands::Show => show(explicit_file, root),
    }
}

fn validate(file: Option<&Path>) -> Result<()> {
    if let Some(path) = file {
        println!("Validating {}...", path.display());
        return report(Config::from_file(path).and_then(|c| c.validate()));
    }

    let global_config = std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(GLOBAL_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from("~").join(GLOBAL_CONFIG_FILE));

    println!("Validating configuration files...\n");

    if global_config.exists() {
        println!("  Global config: {}", global_config.display());
    } else {
        println!(
            "  Global config: {} - not found (optional)",
            global_config.display()
        );
    }
    if let Some(extra) = std::env::var_os(CONFIG_ENV) {
        println!("  {}: {}", CONFIG_ENV, PathBuf::from(extra).display());
    }

    println!("\nLoading and validating configuration...");
    report(Config::load(None).map(|_| ()))
}

fn report(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => {
            println!("✓ Configuration is valid!");
            Ok(())
        }
        Err(e) => {
            println!("✗ Configuration is invalid!");
            Err(e)
        }
    }
}

fn show(explicit_file: Option<&Path>, root: Option<&Path>) -> Result<()> {
    let config = Config::load(explicit_file)?.with_root_override(root);
    let workspace = Workspace::from_config(&config)?;

    println!("Effective Configuration:");
    println!("(CLI > AGENTCTL_ROOT > AGENTCTL_CONFIG / --config > Global config > Defaults)\n");
    print!("{}", config.to_toml()?);

    println!("\nResolved paths:");
    println!("  root: {}", workspace.root.display());
    println!("  active: {}", workspace.active_dir.display());
    for dir in &workspace.disabled_dirs {
        println!("  disabled: {}", dir.display());
    }
    println!("  scenarios: {}", workspace.scenarios_dir.display());
    println!("  state: {}", workspace.state_dir.display());
    println!("  locks: {}", workspace.lock_dir.display());
    println!("  dependency map: {}", workspace.dependency_map.display());
    Ok(())
}
