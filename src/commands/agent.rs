use crate::agents::{depmap, tree, Location, Resolver};
use crate::cli::AgentCommands;
use crate::error::Result;
use crate::metadata::FrontMatterProvider;
use crate::workspace::Workspace;

pub fn execute(workspace: &Workspace, command: &AgentCommands) -> Result<()> {
    let provider = FrontMatterProvider;
    let resolver = Resolver::new(workspace, &provider);

    match command {
        AgentCommands::Activate { names } => activate(&resolver, names),
        AgentCommands::Deactivate { name, force } => deactivate(&resolver, name, *force),
        AgentCommands::Deps { name } => deps(&resolver, name),
        AgentCommands::Graph { map } => graph(&resolver, *map),
        AgentCommands::List => list(&resolver),
    }
}

fn activate(resolver: &Resolver<'_, FrontMatterProvider>, names: &[String]) -> Result<()> {
    for name in names {
        let report = resolver.activate(name)?;
        if report.already_active {
            println!("'{}' is already active", report.requested);
            continue;
        }

        for agent in &report.activated {
            println!("✓ Activated {}", agent);
        }
        for advisory in &report.advisories {
            if advisory.missing {
                println!(
                    "  Note: '{}' recommends '{}', which is not installed",
                    advisory.agent, advisory.recommends
                );
            } else {
                println!(
                    "  Note: '{}' recommends '{}' (agentctl agent activate {})",
                    advisory.agent, advisory.recommends, advisory.recommends
                );
            }
        }
    }
    Ok(())
}

fn deactivate(
    resolver: &Resolver<'_, FrontMatterProvider>,
    name: &str,
    force: bool,
) -> Result<()> {
    let report = resolver.deactivate(name, force)?;
    println!("✓ Deactivated {}", report.name);
    if !report.broken_dependents.is_empty() {
        eprintln!(
            "Warning: these active agents still require '{}': {}",
            report.name,
            report.broken_dependents.join(", ")
        );
    }
    Ok(())
}

fn deps(resolver: &Resolver<'_, FrontMatterProvider>, name: &str) -> Result<()> {
    let graph = resolver.graph()?;
    let node = graph
        .find(name)
        .ok_or_else(|| crate::error::CtlError::AgentNotFound(name.to_string()))?;

    println!("{} ({})", node.name, node.location.as_str());
    println!("  requires: {}", join_or_none(&node.requires));
    println!("  recommends: {}", join_or_none(&node.recommends));
    println!("  required by: {}", join_or_none(&graph.dependents(&node.name)));

    let missing = graph.missing_requirements(node);
    if !missing.is_empty() {
        println!("  missing: {}", missing.join(", "));
    }
    Ok(())
}

fn graph(resolver: &Resolver<'_, FrontMatterProvider>, map: bool) -> Result<()> {
    let graph = resolver.graph()?;
    if graph.is_empty() {
        println!("No agents found");
        return Ok(());
    }
    if map {
        print!("{}", depmap::render(graph.nodes()));
    } else {
        print!("{}", tree::render(&graph));
        println!();
        println!("* = active");
    }
    Ok(())
}

fn list(resolver: &Resolver<'_, FrontMatterProvider>) -> Result<()> {
    let graph = resolver.graph()?;
    if graph.is_empty() {
        println!("No agents found");
        return Ok(());
    }

    let active = graph
        .nodes()
        .iter()
        .filter(|n| n.location == Location::Active)
        .count();
    println!(
        "Agents ({} active, {} disabled):",
        active,
        graph.nodes().len() - active
    );
    for node in graph.nodes() {
        println!("  {:<9} {}", node.location.as_str(), node.name);
    }
    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
