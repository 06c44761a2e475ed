use crate::cli::OrchestrateCommands;
use crate::error::{CtlError, Result};
use crate::metadata::FrontMatterProvider;
use crate::scenarios::{
    Orchestrator, PhaseStatus, RunMode, RunOutcome, StdinPrompter, ValidationReport,
};
use crate::workspace::Workspace;

pub fn execute(workspace: &Workspace, command: &OrchestrateCommands) -> Result<()> {
    let provider = FrontMatterProvider;
    let orchestrator = Orchestrator::new(workspace, &provider);

    match command {
        OrchestrateCommands::Run { name, mode, plan } => {
            let mode = if *plan {
                RunMode::Plan
            } else {
                mode.unwrap_or(workspace.default_mode)
            };
            run(&orchestrator, name, mode)
        }
        OrchestrateCommands::Preview { name } => run(&orchestrator, name, RunMode::Plan),
        OrchestrateCommands::List => list(&orchestrator),
        OrchestrateCommands::Validate { name, all } => {
            if *all {
                validate_all(&orchestrator, workspace)
            } else {
                match name {
                    Some(name) => validate_one(&orchestrator, name),
                    None => validate_all(&orchestrator, workspace),
                }
            }
        }
        OrchestrateCommands::Status { name } => status(&orchestrator, name.as_deref()),
        OrchestrateCommands::Stop { name } => stop(&orchestrator, name),
    }
}

fn run(orchestrator: &Orchestrator<'_, FrontMatterProvider>, name: &str, mode: RunMode) -> Result<()> {
    let mut prompter = StdinPrompter::new();
    match orchestrator.run(name, mode, &mut prompter)? {
        RunOutcome::Planned { preview, .. } => {
            print!("{}", preview);
        }
        RunOutcome::Finished {
            state_path, state, ..
        } => {
            let skipped = state
                .phases
                .iter()
                .filter(|p| p.status == PhaseStatus::Skipped)
                .count();
            println!(
                "{} phase(s) completed, {} skipped",
                state.phases.len() - skipped,
                skipped
            );
            println!("State: {}", state_path.display());
        }
    }
    Ok(())
}

fn list(orchestrator: &Orchestrator<'_, FrontMatterProvider>) -> Result<()> {
    let entries = orchestrator.list()?;
    if entries.is_empty() {
        println!("No scenarios found");
        return Ok(());
    }

    println!("Scenarios:");
    for entry in entries {
        match &entry.definition {
            Ok(def) => {
                let running = entry
                    .locked_by
                    .as_ref()
                    .map(|id| format!("  [running: {}]", id))
                    .unwrap_or_default();
                println!(
                    "  {} ({} priority, {}, {} phases){}",
                    def.name,
                    def.priority,
                    def.scenario_type,
                    def.phases.len(),
                    running
                );
                if !def.description.is_empty() {
                    println!("      {}", def.description);
                }
            }
            Err(message) => {
                println!("  {}  [invalid: {}]", entry.path.display(), message);
            }
        }
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    let mark = if report.is_valid() { "✓" } else { "✗" };
    println!("{} {} ({})", mark, report.name, report.path.display());
    for error in &report.errors {
        println!("    error: {}", error);
    }
    for warning in &report.warnings {
        println!("    warning: {}", warning);
    }
}

fn validate_one(orchestrator: &Orchestrator<'_, FrontMatterProvider>, name: &str) -> Result<()> {
    let report = orchestrator.validate(name)?;
    print_report(&report);
    if report.is_valid() {
        Ok(())
    } else {
        Err(CtlError::SchemaInvalid {
            path: report.path.clone(),
            message: report.errors.join("; "),
        })
    }
}

fn validate_all(
    orchestrator: &Orchestrator<'_, FrontMatterProvider>,
    workspace: &Workspace,
) -> Result<()> {
    let reports = orchestrator.validate_all()?;
    if reports.is_empty() {
        println!("No scenarios found");
        return Ok(());
    }
    for report in &reports {
        print_report(report);
    }
    let invalid = reports.iter().filter(|r| !r.is_valid()).count();
    if invalid == 0 {
        Ok(())
    } else {
        Err(CtlError::SchemaInvalid {
            path: workspace.scenarios_dir.clone(),
            message: format!("{} of {} scenario(s) failed validation", invalid, reports.len()),
        })
    }
}

fn status(orchestrator: &Orchestrator<'_, FrontMatterProvider>, name: Option<&str>) -> Result<()> {
    let statuses = orchestrator.status(name)?;
    if statuses.is_empty() {
        println!("No recorded runs");
    }

    for entry in &statuses {
        let state = &entry.run.state;
        println!(
            "{}  {}{}  started {}",
            state.scenario,
            state.status.as_str(),
            if entry.abandoned { " (abandoned)" } else { "" },
            state.started.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if entry.abandoned {
            println!("  state file: {}", entry.run.path.display());
        }
        if let Some(completed) = state.completed {
            println!("  finished {}", completed.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        for phase in &state.phases {
            match &phase.note {
                Some(note) => println!("  {:<9} {} ({})", phase.status.as_str(), phase.name, note),
                None => println!("  {:<9} {}", phase.status.as_str(), phase.name),
            }
        }
        for pending in &entry.pending {
            println!("  {:<9} {}", PhaseStatus::Pending.as_str(), pending);
        }
    }

    let locks = orchestrator.locks().list()?;
    if !locks.is_empty() {
        println!("\nHeld locks:");
        for (key, id) in locks {
            println!("  {} (execution {})", key, id);
        }
    }
    Ok(())
}

fn stop(orchestrator: &Orchestrator<'_, FrontMatterProvider>, name: &str) -> Result<()> {
    match orchestrator.stop(name)? {
        Some(id) if id.is_empty() => println!("✓ Cleared lock for '{}'", name),
        Some(id) => println!("✓ Cleared lock for '{}' (execution {})", name, id),
        None => println!("No lock held for '{}'", name),
    }
    Ok(())
}
