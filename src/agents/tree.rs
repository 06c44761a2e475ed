//! Indented text rendering of the requires graph.

use super::graph::{ComponentNode, DependencyGraph};
use std::collections::HashSet;
use std::fmt::Write;

/// Render every agent as a tree below the agents nothing requires.
///
/// Agents reachable only through a cycle are rendered as extra roots. Each
/// agent's subtree is printed once: a requirement already on the current
/// path is marked `(cycle)`, one printed earlier is marked `(shown above)`,
/// and one found nowhere is marked `(missing)`. None of these are
/// descended into.
pub fn render(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();

    for root in graph.roots() {
        render_node(graph, root, 0, &mut path, &mut seen, &mut out);
    }
    for node in graph.nodes() {
        if !seen.contains(node.slug.as_str()) {
            render_node(graph, node, 0, &mut path, &mut seen, &mut out);
        }
    }
    out
}

fn render_node<'g>(
    graph: &'g DependencyGraph,
    node: &'g ComponentNode,
    depth: usize,
    path: &mut Vec<&'g str>,
    seen: &mut HashSet<&'g str>,
    out: &mut String,
) {
    let marker = if node.is_active() { "*" } else { " " };
    let _ = writeln!(out, "{}{} {}", "  ".repeat(depth), marker, node.name);
    seen.insert(node.slug.as_str());

    path.push(node.slug.as_str());
    for requirement in &node.requires {
        if node.matches(requirement) {
            continue;
        }
        match graph.find(requirement) {
            None => {
                let _ = writeln!(out, "{}  {} (missing)", "  ".repeat(depth + 1), requirement);
            }
            Some(child) if path.contains(&child.slug.as_str()) => {
                let _ = writeln!(out, "{}  {} (cycle)", "  ".repeat(depth + 1), child.name);
            }
            Some(child) if seen.contains(child.slug.as_str()) => {
                let _ = writeln!(out, "{}  {} (shown above)", "  ".repeat(depth + 1), child.name);
            }
            Some(child) => render_node(graph, child, depth + 1, path, seen, out),
        }
    }
    path.pop();
}
