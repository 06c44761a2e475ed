use agentctl::agents::{build_graph, depmap, ComponentStore, Location, Resolver};
use agentctl::error::CtlError;
use agentctl::metadata::FrontMatterProvider;
use agentctl::workspace::Workspace;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_agent(dir: &Path, name: &str, requires: &[String]) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(format!("{}.md", name)),
        format!("---\nname: {}\nrequires: [{}]\n---\n", name, requires.join(", ")),
    )
    .unwrap();
}

/// A layered DAG: agent `n{i}` requires a few agents with a smaller index.
fn layered_dag(size: usize, seed: usize) -> Vec<(String, Vec<String>)> {
    (0..size)
        .map(|i| {
            let requires = (0..i)
                .filter(|j| (i * 7 + j * 3 + seed) % 4 == 0)
                .map(|j| format!("n{}", j))
                .collect();
            (format!("n{}", i), requires)
        })
        .collect()
}

fn transitive(graph: &HashMap<String, Vec<String>>, start: &str, out: &mut Vec<String>) {
    for dep in &graph[start] {
        if !out.contains(dep) {
            out.push(dep.clone());
            transitive(graph, dep, out);
        }
    }
}

#[test]
fn test_activation_closes_over_requirements_in_dependency_order() {
    for seed in 0..6 {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path());
        let dag = layered_dag(12, seed);
        for (name, requires) in &dag {
            write_agent(&ws.disabled_dirs[0], name, requires);
        }
        let edges: HashMap<String, Vec<String>> = dag.into_iter().collect();

        let resolver = Resolver::new(&ws, &FrontMatterProvider);
        let target = "n11";
        let report = resolver.activate(target).unwrap();

        let mut expected = Vec::new();
        transitive(&edges, target, &mut expected);
        for dep in &expected {
            assert!(
                ws.active_dir.join(format!("{}.md", dep)).is_file(),
                "seed {}: {} not active",
                seed,
                dep
            );
        }
        assert_eq!(report.activated.len(), expected.len() + 1);
        assert_eq!(report.activated.last().map(String::as_str), Some(target));

        for (position, name) in report.activated.iter().enumerate() {
            for dep in &edges[name] {
                let dep_position = report.activated.iter().position(|n| n == dep).unwrap();
                assert!(dep_position < position, "seed {}: {} before {}", seed, name, dep);
            }
        }
    }
}

#[test]
fn test_every_reachable_cycle_terminates_with_cycle_error() {
    for len in 1..6 {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path());
        // c0 -> c1 -> ... -> c{len-1} -> c0, entered from a root.
        write_agent(&ws.disabled_dirs[0], "root", &["c0".to_string()]);
        for i in 0..len {
            let next = format!("c{}", (i + 1) % len);
            write_agent(&ws.disabled_dirs[0], &format!("c{}", i), &[next]);
        }

        let resolver = Resolver::new(&ws, &FrontMatterProvider);
        let result = resolver.activate("root");
        if len == 1 {
            // A self-reference is ignored rather than reported.
            assert!(result.is_ok());
            continue;
        }
        match result {
            Err(CtlError::CycleDetected { path }) => {
                assert_eq!(path.first().map(String::as_str), Some("root"));
                assert_eq!(path.last().map(String::as_str), Some("c0"));
                assert_eq!(path.len(), len + 2);
            }
            other => panic!("len {}: expected CycleDetected, got {:?}", len, other),
        }
    }
}

#[test]
fn test_concrete_chain() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    write_agent(&ws.disabled_dirs[0], "A", &["B".to_string()]);
    write_agent(&ws.disabled_dirs[0], "B", &["C".to_string()]);
    write_agent(&ws.disabled_dirs[0], "C", &[]);

    let report = Resolver::new(&ws, &FrontMatterProvider)
        .activate("A")
        .unwrap();
    assert_eq!(report.activated, vec!["C", "B", "A"]);
}

#[test]
fn test_concrete_cycle_message() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    write_agent(&ws.disabled_dirs[0], "A", &["B".to_string()]);
    write_agent(&ws.disabled_dirs[0], "B", &["A".to_string()]);

    let err = Resolver::new(&ws, &FrontMatterProvider)
        .activate("A")
        .unwrap_err();
    assert!(err.to_string().contains("A -> B -> A"));
}

#[test]
fn test_deactivate_blocks_iff_dependents_exist() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    write_agent(&ws.active_dir, "base", &[]);
    write_agent(&ws.active_dir, "mid", &["base".to_string()]);
    write_agent(&ws.active_dir, "top", &["mid".to_string()]);
    write_agent(&ws.disabled_dirs[0], "idle", &["top".to_string()]);

    let resolver = Resolver::new(&ws, &FrontMatterProvider);
    // Disabled agents never count as dependents.
    assert!(resolver.dependents("top").unwrap().is_empty());
    resolver.deactivate("top", false).unwrap();

    for name in ["base", "mid"] {
        let dependents = resolver.dependents(name).unwrap();
        let result = resolver.deactivate(name, false);
        assert_eq!(
            matches!(result, Err(CtlError::DependentsBlocking { .. })),
            !dependents.is_empty()
        );
    }
    // Forced deactivation succeeds for any active agent.
    assert!(resolver.deactivate("base", true).is_ok());
}

#[test]
fn test_map_matches_fresh_graph_after_each_mutation() {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    write_agent(&ws.disabled_dirs[0], "a", &["b".to_string()]);
    write_agent(&ws.disabled_dirs[0], "b", &[]);
    write_agent(&ws.disabled_dirs[1], "c", &[]);
    let resolver = Resolver::new(&ws, &FrontMatterProvider);

    let fresh_map = || {
        let store = ComponentStore::new(&ws);
        depmap::render(&build_graph(&store, &FrontMatterProvider).unwrap())
    };

    resolver.activate("a").unwrap();
    assert_eq!(fs::read_to_string(&ws.dependency_map).unwrap(), fresh_map());
    resolver.activate("c").unwrap();
    assert_eq!(fs::read_to_string(&ws.dependency_map).unwrap(), fresh_map());
    resolver.deactivate("a", false).unwrap();
    assert_eq!(fs::read_to_string(&ws.dependency_map).unwrap(), fresh_map());

    // Deactivated agents land in the primary disabled location.
    let a = resolver.find_in_any_location("a").unwrap().unwrap();
    assert_eq!(a.location, Location::Disabled);
    assert!(ws.disabled_dirs[0].join("a.md").is_file());
}
