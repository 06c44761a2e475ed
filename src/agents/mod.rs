//! Agent store, dependency graph and activation resolver.
//!
//! Agents are Markdown files that live either in the active directory or in
//! one of the disabled directories. Activating an agent moves its file into
//! the active directory after every agent it `requires` has been activated;
//! deactivating moves it back out unless active agents still require it.
//!
//! # Layout
//!
//! ```text
//! <root>/agents/              active agents + dependencies.map
//! <root>/inactive/agents/     disabled agents (deactivation target)
//! <root>/agents-disabled/     legacy disabled location (read, cleaned on move)
//! ```

pub mod depmap;
pub mod graph;
pub mod resolver;
pub mod store;
pub mod tree;

pub use graph::{build_graph, ComponentNode, DependencyGraph};
pub use resolver::{ActivationReport, Advisory, DeactivationReport, Resolver};
pub use store::{ComponentStore, Location, StoredComponent};
