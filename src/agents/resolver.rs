//! Recursive activation and guarded deactivation over the requires graph.

use super::depmap;
use super::graph::{build_graph, ComponentNode, DependencyGraph};
use super::store::ComponentStore;
use crate::error::{CtlError, Result};
use crate::metadata::MetadataProvider;
use crate::workspace::Workspace;
use std::collections::HashSet;
use tracing::{debug, info};

/// Outcome of a successful `activate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub requested: String,
    /// The requested agent was active before the call; nothing moved.
    pub already_active: bool,
    /// Agents moved to the active directory, dependencies first.
    pub activated: Vec<String>,
    pub advisories: Vec<Advisory>,
}

/// A `recommends` entry that is still inactive after activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub agent: String,
    pub recommends: String,
    /// The recommended agent does not exist in any location.
    pub missing: bool,
}

/// Outcome of a successful `deactivate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeactivationReport {
    pub name: String,
    /// Active agents that still require the deactivated one (forced only).
    pub broken_dependents: Vec<String>,
}

pub struct Resolver<'a, P: MetadataProvider + ?Sized> {
    workspace: &'a Workspace,
    store: ComponentStore<'a>,
    provider: &'a P,
}

impl<'a, P: MetadataProvider + ?Sized> Resolver<'a, P> {
    pub fn new(workspace: &'a Workspace, provider: &'a P) -> Self {
        Self {
            workspace,
            store: ComponentStore::new(workspace),
            provider,
        }
    }

    pub fn store(&self) -> &ComponentStore<'a> {
        &self.store
    }

    /// Build a fresh graph from disk.
    pub fn graph(&self) -> Result<DependencyGraph> {
        Ok(DependencyGraph::new(build_graph(&self.store, self.provider)?))
    }

    /// Look `name` up across the active and disabled locations.
    pub fn find_in_any_location(&self, name: &str) -> Result<Option<ComponentNode>> {
        Ok(self.graph()?.find(name).cloned())
    }

    /// Activate `name` and, first, everything it transitively requires.
    ///
    /// Agents activated before a failure (cycle, missing requirement) stay active.
    pub fn activate(&self, name: &str) -> Result<ActivationReport> {
        let graph = self.graph()?;
        let node = graph
            .find(name)
            .ok_or_else(|| CtlError::AgentNotFound(name.to_string()))?;

        if node.is_active() {
            info!(agent = %node.name, "already active");
            return Ok(ActivationReport {
                requested: node.name.clone(),
                already_active: true,
                activated: Vec::new(),
                advisories: Vec::new(),
            });
        }

        let mut walk = ActivationWalk {
            resolver: self,
            graph: &graph,
            in_progress: Vec::new(),
            done: HashSet::new(),
            activated: Vec::new(),
            advisories: Vec::new(),
        };
        walk.visit(name)?;

        Ok(ActivationReport {
            requested: node.name.clone(),
            already_active: false,
            activated: walk.activated,
            advisories: walk.advisories,
        })
    }

    /// Move `name` out of the active directory.
    ///
    /// Refuses while active agents require it unless `force` is set; forced
    /// deactivation leaves those dependents active.
    pub fn deactivate(&self, name: &str, force: bool) -> Result<DeactivationReport> {
        let graph = self.graph()?;
        let node = graph
            .find(name)
            .ok_or_else(|| CtlError::AgentNotFound(name.to_string()))?;
        if !node.is_active() {
            return Err(CtlError::NotActive(node.name.clone()));
        }

        let dependents = graph.dependents(&node.name);
        if !dependents.is_empty() && !force {
            return Err(CtlError::DependentsBlocking {
                name: node.name.clone(),
                dependents,
            });
        }

        self.store.deactivate(&node.slug)?;
        self.regenerate_dependency_map()?;

        if !dependents.is_empty() {
            info!(agent = %node.name, ?dependents, "forced deactivation left dependents without a requirement");
        }
        info!(agent = %node.name, "deactivated");
        Ok(DeactivationReport {
            name: node.name.clone(),
            broken_dependents: dependents,
        })
    }

    /// Active agents whose `requires` includes `name`.
    pub fn dependents(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.graph()?.dependents(name))
    }

    /// Rewrite the dependency map from a freshly built graph.
    pub fn regenerate_dependency_map(&self) -> Result<()> {
        let graph = self.graph()?;
        depmap::write(&self.workspace.dependency_map, graph.nodes())
    }
}

/// Depth-first traversal state for one `activate` call.
///
/// Colors: a name in `in_progress` is grey, a slug in `done` is black,
/// anything else is white.
struct ActivationWalk<'r, 'a, P: MetadataProvider + ?Sized> {
    resolver: &'r Resolver<'a, P>,
    graph: &'r DependencyGraph,
    in_progress: Vec<String>,
    done: HashSet<String>,
    activated: Vec<String>,
    advisories: Vec<Advisory>,
}

impl<P: MetadataProvider + ?Sized> ActivationWalk<'_, '_, P> {
    fn visit(&mut self, name: &str) -> Result<()> {
        let graph = self.graph;
        let node = graph
            .find(name)
            .ok_or_else(|| CtlError::AgentNotFound(name.to_string()))?;

        if self.done.contains(&node.slug) {
            return Ok(());
        }
        if node.is_active() {
            self.done.insert(node.slug.clone());
            return Ok(());
        }
        if self.in_progress.iter().any(|n| node.matches(n)) {
            let mut path = self.in_progress.clone();
            path.push(node.name.clone());
            return Err(CtlError::CycleDetected { path });
        }
        let limit = self.resolver.workspace.max_dependency_depth;
        if self.in_progress.len() >= limit {
            return Err(CtlError::DepthExceeded {
                name: self
                    .in_progress
                    .first()
                    .cloned()
                    .unwrap_or_else(|| node.name.clone()),
                limit,
            });
        }

        self.in_progress.push(node.name.clone());
        for requirement in &node.requires {
            if node.matches(requirement) {
                continue;
            }
            // Listed under both: the soft edge wins.
            if node.recommends.contains(requirement) {
                continue;
            }
            debug!(agent = %node.name, %requirement, "visiting requirement");
            self.visit(requirement)?;
        }
        self.in_progress.pop();

        self.resolver.store.activate(&node.slug)?;
        self.done.insert(node.slug.clone());
        self.activated.push(node.name.clone());
        info!(agent = %node.name, "activated");
        self.resolver.regenerate_dependency_map()?;

        for recommended in &node.recommends {
            match graph.find(recommended) {
                Some(rec) if rec.is_active() || self.done.contains(&rec.slug) => {}
                found => self.advisories.push(Advisory {
                    agent: node.name.clone(),
                    recommends: recommended.clone(),
                    missing: found.is_none(),
                }),
            }
        }
        Ok(())
    }
}
