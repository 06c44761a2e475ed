//! Plain-text rendering of a scenario plan.

use super::definition::ScenarioDefinition;
use std::fmt::Write;

/// Render every phase of `definition` as a human-readable plan.
pub fn render(definition: &ScenarioDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scenario: {}", definition.name);
    if !definition.description.is_empty() {
        let _ = writeln!(out, "Description: {}", definition.description);
    }
    let _ = writeln!(
        out,
        "Priority: {}  Type: {}  Phases: {}",
        definition.priority,
        definition.scenario_type,
        definition.phases.len()
    );

    for (index, phase) in definition.phases.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Phase {}: {}", index + 1, phase.name);
        if !phase.description.is_empty() {
            let _ = writeln!(out, "  {}", phase.description);
        }
        let _ = writeln!(out, "  condition: {}", phase.condition.as_str());
        let _ = writeln!(out, "  parallel: {}", if phase.parallel { "yes" } else { "no" });
        let _ = writeln!(out, "  profiles: {}", list_or_none(&phase.profiles));
        let _ = writeln!(out, "  agents: {}", list_or_none(&phase.agents));
        if phase.success_criteria.is_empty() {
            let _ = writeln!(out, "  success criteria: (none)");
        } else {
            let _ = writeln!(out, "  success criteria:");
            for criterion in &phase.success_criteria {
                let _ = writeln!(out, "    - {}", criterion);
            }
        }
    }
    out
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
