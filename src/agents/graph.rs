//! In-memory dependency graph built from the agent store.

use super::store::{ComponentStore, Location, StoredComponent};
use crate::error::Result;
use crate::metadata::{is_valid_key, MetadataProvider};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// One agent with its dependency edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentNode {
    /// Declared name, falling back to the slug.
    pub name: String,
    /// Filename stem; unique storage key.
    pub slug: String,
    pub location: Location,
    pub requires: Vec<String>,
    pub recommends: Vec<String>,
    #[serde(skip)]
    pub path: PathBuf,
}

impl ComponentNode {
    pub fn is_active(&self) -> bool {
        self.location == Location::Active
    }

    /// Whether `key` names this node by name or slug.
    pub fn matches(&self, key: &str) -> bool {
        self.name == key || self.slug == key
    }
}

/// Scan every location and build the merged, sorted node list.
///
/// Files whose metadata cannot be read are skipped with a warning.
pub fn build_graph<P: MetadataProvider + ?Sized>(
    store: &ComponentStore<'_>,
    provider: &P,
) -> Result<Vec<ComponentNode>> {
    let mut scanned = Vec::new();
    for stored in store.list()? {
        match to_node(stored, provider) {
            Some(node) => scanned.push(node),
            None => continue,
        }
    }
    Ok(merge_duplicates(scanned))
}

fn to_node<P: MetadataProvider + ?Sized>(
    stored: StoredComponent,
    provider: &P,
) -> Option<ComponentNode> {
    let meta = match provider.parse_component(&stored.path) {
        Ok(meta) => meta,
        Err(e) => {
            warn!(path = %stored.path.display(), error = %e, "skipping agent with unreadable metadata");
            return None;
        }
    };
    let name = meta.name.unwrap_or_else(|| stored.slug.clone());
    if !is_valid_key(&name) {
        warn!(path = %stored.path.display(), %name, "skipping agent whose name contains ':' or ','");
        return None;
    }
    Some(ComponentNode {
        name,
        slug: stored.slug,
        location: stored.location,
        requires: meta.requires,
        recommends: meta.recommends,
        path: stored.path,
    })
}

/// Collapse nodes sharing a name: an active node wins, otherwise the first
/// scanned. Output is sorted by name, then slug.
///
/// A `requires` or `recommends` entry naming the slug of a dropped duplicate
/// is rewritten to the surviving node's name, unless some surviving node
/// already answers to that key.
pub fn merge_duplicates(scanned: Vec<ComponentNode>) -> Vec<ComponentNode> {
    let mut by_name: BTreeMap<String, Vec<ComponentNode>> = BTreeMap::new();
    for node in scanned {
        by_name.entry(node.name.clone()).or_default().push(node);
    }

    let mut dropped: BTreeMap<String, String> = BTreeMap::new();
    let mut merged: Vec<ComponentNode> = by_name
        .into_values()
        .filter_map(|mut candidates| {
            let winner = candidates
                .iter()
                .position(ComponentNode::is_active)
                .unwrap_or(0);
            if candidates.is_empty() {
                return None;
            }
            let kept = candidates.swap_remove(winner);
            for loser in candidates {
                dropped.entry(loser.slug).or_insert_with(|| kept.name.clone());
            }
            Some(kept)
        })
        .collect();

    if !dropped.is_empty() {
        let redirects: BTreeMap<String, String> = dropped
            .into_iter()
            .filter(|(slug, _)| !merged.iter().any(|n| n.matches(slug)))
            .collect();
        for node in &mut merged {
            redirect_edges(&mut node.requires, &redirects);
            redirect_edges(&mut node.recommends, &redirects);
        }
    }

    merged.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.slug.cmp(&b.slug)));
    merged
}

fn redirect_edges(edges: &mut Vec<String>, redirects: &BTreeMap<String, String>) {
    let mut kept: Vec<String> = Vec::with_capacity(edges.len());
    for edge in edges.drain(..) {
        let edge = redirects.get(&edge).cloned().unwrap_or(edge);
        if !kept.contains(&edge) {
            kept.push(edge);
        }
    }
    *edges = kept;
}

/// Read-only queries over a built node list.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: Vec<ComponentNode>,
}

impl DependencyGraph {
    pub fn new(nodes: Vec<ComponentNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ComponentNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up by name first, then by slug.
    pub fn find(&self, key: &str) -> Option<&ComponentNode> {
        self.nodes
            .iter()
            .find(|n| n.name == key)
            .or_else(|| self.nodes.iter().find(|n| n.slug == key))
    }

    /// Names of active agents whose `requires` lists `key` (by name or slug).
    pub fn dependents(&self, key: &str) -> Vec<String> {
        let target = self.find(key);
        let mut dependents: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.is_active())
            .filter(|n| target.map_or(true, |t| t.slug != n.slug))
            .filter(|n| {
                n.requires.iter().any(|req| match target {
                    Some(t) => t.matches(req),
                    None => req == key,
                })
            })
            .map(|n| n.name.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Agents no other agent requires, in graph order.
    pub fn roots(&self) -> Vec<&ComponentNode> {
        self.nodes
            .iter()
            .filter(|node| {
                !self.nodes.iter().any(|other| {
                    other.slug != node.slug && other.requires.iter().any(|r| node.matches(r))
                })
            })
            .collect()
    }

    /// Requirements of `node` that do not exist in any location.
    pub fn missing_requirements(&self, node: &ComponentNode) -> Vec<String> {
        node.requires
            .iter()
            .filter(|req| self.find(req).is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FrontMatterProvider;
    use crate::workspace::Workspace;
    use std::fs;
    use std::path::Path;

    fn node(name: &str, slug: &str, location: Location) -> ComponentNode {
        ComponentNode {
            name: name.to_string(),
            slug: slug.to_string(),
            location,
            requires: Vec::new(),
            recommends: Vec::new(),
            path: PathBuf::new(),
        }
    }

    fn write_agent(dir: &Path, slug: &str, front_matter: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(format!("{}.md", slug)),
            format!("---\n{}---\nbody\n", front_matter),
        )
        .unwrap();
    }

    #[test]
    fn test_merge_active_wins() {
        let merged = merge_duplicates(vec![
            node("api", "api-old", Location::Disabled),
            node("api", "api", Location::Active),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].slug, "api");
        assert!(merged[0].is_active());
    }

    #[test]
    fn test_merge_first_seen_wins_among_disabled() {
        let merged = merge_duplicates(vec![
            node("api", "first", Location::Disabled),
            node("api", "second", Location::Disabled),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].slug, "first");
    }

    #[test]
    fn test_merge_sorts_by_name() {
        let merged = merge_duplicates(vec![
            node("zeta", "zeta", Location::Active),
            node("alpha", "alpha", Location::Disabled),
        ]);
        let names: Vec<_> = merged.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_build_graph_reads_metadata_and_skips_broken_files() {
        let temp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(temp.path());
        write_agent(&ws.active_dir, "web", "name: web\nrequires: [api]\n");
        write_agent(&ws.disabled_dirs[0], "api", "requires: db\nrecommends: [docs]\n");
        write_agent(&ws.disabled_dirs[0], "broken", "requires: [oops\n");
        write_agent(&ws.disabled_dirs[0], "a,b", "requires: [api]\n");

        let store = ComponentStore::new(&ws);
        let nodes = build_graph(&store, &FrontMatterProvider).unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["api", "web"]);
        assert_eq!(nodes[0].requires, vec!["db"]);
        assert_eq!(nodes[0].recommends, vec!["docs"]);
        assert_eq!(nodes[0].location, Location::Disabled);
        assert!(nodes[1].is_active());
    }

    #[test]
    fn test_dependents_only_counts_active() {
        let mut web = node("web", "web", Location::Active);
        web.requires = vec!["api".to_string()];
        let mut cli = node("cli", "cli", Location::Disabled);
        cli.requires = vec!["api".to_string()];
        let api = node("api", "api", Location::Active);

        let graph = DependencyGraph::new(vec![api, cli, web]);
        assert_eq!(graph.dependents("api"), vec!["web"]);
        assert!(graph.dependents("web").is_empty());
    }

    #[test]
    fn test_roots_and_missing() {
        let mut web = node("web", "web", Location::Active);
        web.requires = vec!["api".to_string(), "ghost".to_string()];
        let api = node("api", "api", Location::Disabled);
        let graph = DependencyGraph::new(vec![api, web]);

        let roots: Vec<_> = graph.roots().iter().map(|n| n.name.clone()).collect();
        assert_eq!(roots, vec!["web"]);
        let web = graph.find("web").unwrap();
        assert_eq!(graph.missing_requirements(web), vec!["ghost"]);
    }

    #[test]
    fn test_edges_to_dropped_duplicate_follow_the_winner() {
        let mut web = node("web", "web", Location::Disabled);
        web.requires = vec!["api-legacy".to_string(), "api".to_string()];
        web.recommends = vec!["api-legacy".to_string()];
        let merged = merge_duplicates(vec![
            web,
            node("api", "api", Location::Disabled),
            node("api", "api-legacy", Location::Disabled),
        ]);

        let graph = DependencyGraph::new(merged);
        let web = graph.find("web").unwrap();
        assert_eq!(web.requires, vec!["api"]);
        assert_eq!(web.recommends, vec!["api"]);
        assert!(graph.missing_requirements(web).is_empty());
    }

    #[test]
    fn test_dropped_slug_shadowed_by_live_node_is_left_alone() {
        let mut web = node("web", "web", Location::Disabled);
        web.requires = vec!["db".to_string()];
        let merged = merge_duplicates(vec![
            web,
            node("db", "db", Location::Disabled),
            node("store", "store", Location::Active),
            node("store", "db", Location::Disabled),
        ]);

        let web = merged.iter().find(|n| n.name == "web").unwrap();
        assert_eq!(web.requires, vec!["db"]);
    }
}
