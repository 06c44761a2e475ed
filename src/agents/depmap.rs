//! The dependency map: a derived text file listing every agent's edges.
//!
//! One line per agent, `name:requires,csv:recommends,csv`. The file is always
//! rewritten in full from a fresh graph and removed when there are no agents.
//! Agents whose name or edges contain `:` or `,` never reach the graph, so
//! every line splits back into exactly three fields.

use super::graph::ComponentNode;
use crate::error::Result;
use crate::utils::fs::{remove_if_exists, write_atomic};
use std::path::Path;
use tracing::debug;

/// Render the map for `nodes` (already in graph order).
pub fn render(nodes: &[ComponentNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&node.name);
        out.push(':');
        out.push_str(&node.requires.join(","));
        out.push(':');
        out.push_str(&node.recommends.join(","));
        out.push('\n');
    }
    out
}

/// Replace the map at `path` with the rendering of `nodes`, or delete it when empty.
pub fn write(path: &Path, nodes: &[ComponentNode]) -> Result<()> {
    if nodes.is_empty() {
        let removed = remove_if_exists(path)?;
        debug!(path = %path.display(), removed, "dependency map cleared");
        return Ok(());
    }
    write_atomic(path, &render(nodes))?;
    debug!(path = %path.display(), entries = nodes.len(), "dependency map written");
    Ok(())
}
