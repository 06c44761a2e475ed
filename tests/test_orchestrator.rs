use agentctl::error::CtlError;
use agentctl::metadata::FrontMatterProvider;
use agentctl::scenarios::{
    Orchestrator, PhaseStatus, RunMode, RunOutcome, RunStatus, ScriptedPrompter, StateStore,
};
use agentctl::workspace::Workspace;
use std::fs;
use tempfile::TempDir;

fn workspace_with(scenarios: &[(&str, &str)]) -> (TempDir, Workspace) {
    let temp = TempDir::new().unwrap();
    let ws = Workspace::new(temp.path());
    fs::create_dir_all(&ws.scenarios_dir).unwrap();
    for (file, body) in scenarios {
        fs::write(ws.scenarios_dir.join(file), body).unwrap();
    }
    (temp, ws)
}

const DEPLOY: &str = "name: deploy\nphases:\n  - name: build\n    condition: auto\n  - name: release\n    condition: auto\n";

#[test]
fn test_deploy_automatic_completes() {
    let (_temp, ws) = workspace_with(&[("deploy.yaml", DEPLOY)]);
    let orch = Orchestrator::new(&ws, &FrontMatterProvider);

    let outcome = orch
        .run("deploy", RunMode::Automatic, &mut ScriptedPrompter::default())
        .unwrap();
    let RunOutcome::Finished { state_path, .. } = outcome else {
        panic!("expected a finished run");
    };

    let state = StateStore::load(&state_path).unwrap();
    assert_eq!(state.status, RunStatus::Completed);
    assert_eq!(state.phases.len(), 2);
    assert!(state.phases.iter().all(|p| p.status == PhaseStatus::Completed));
}

#[test]
fn test_overlapping_run_leaves_existing_state_untouched() {
    let (_temp, ws) = workspace_with(&[("deploy.yaml", DEPLOY)]);
    let orch = Orchestrator::new(&ws, &FrontMatterProvider);

    // A first run that finished, then a lock from a run still "in flight".
    orch.run("deploy", RunMode::Automatic, &mut ScriptedPrompter::default())
        .unwrap();
    let before: Vec<_> = fs::read_dir(&ws.state_dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            (path.clone(), fs::read(&path).unwrap())
        })
        .collect();
    let _held = orch.locks().acquire("deploy", "in-flight").unwrap();

    let err = orch
        .run("deploy", RunMode::Automatic, &mut ScriptedPrompter::default())
        .unwrap_err();
    assert!(matches!(err, CtlError::LockHeld { .. }));

    let after: Vec<_> = fs::read_dir(&ws.state_dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            (path.clone(), fs::read(&path).unwrap())
        })
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_plan_never_creates_files() {
    let bodies = [
        DEPLOY,
        "name: empty\n",
        "name: gated\nphases:\n  - name: a\n    condition: manual\n    agents: [ghost]\n",
    ];
    for body in bodies {
        let (_temp, ws) = workspace_with(&[("s.yaml", body)]);
        let orch = Orchestrator::new(&ws, &FrontMatterProvider);
        orch.run("s", RunMode::Plan, &mut ScriptedPrompter::default())
            .unwrap();
        assert!(!ws.lock_dir.exists());
        assert!(!ws.state_dir.exists());
        assert!(!ws.dependency_map.exists());
    }
}

#[test]
fn test_lock_absent_after_every_outcome() {
    let (_temp, ws) = workspace_with(&[
        ("ok.yaml", DEPLOY),
        ("skips.yaml", "name: skips\nphases:\n  - name: a\n  - name: b\n"),
        ("fails.yaml", "name: fails\nphases:\n  - name: a\n    agents: [loop]\n"),
    ]);
    let disabled = &ws.disabled_dirs[0];
    fs::create_dir_all(disabled).unwrap();
    fs::write(disabled.join("loop.md"), "---\nname: loop\nrequires: [pool]\n---\n").unwrap();
    fs::write(disabled.join("pool.md"), "---\nname: pool\nrequires: [loop]\n---\n").unwrap();
    let orch = Orchestrator::new(&ws, &FrontMatterProvider);

    assert!(orch
        .run("ok", RunMode::Automatic, &mut ScriptedPrompter::default())
        .is_ok());
    assert!(orch
        .run("skips", RunMode::Interactive, &mut ScriptedPrompter::new([false, false]))
        .is_ok());
    assert!(matches!(
        orch.run("fails", RunMode::Automatic, &mut ScriptedPrompter::default()),
        Err(CtlError::PhaseFailed { .. })
    ));

    for name in ["ok", "skips", "fails"] {
        assert!(!orch.locks().lock_path(name).exists(), "{} left a lock", name);
    }
    assert!(orch.locks().list().unwrap().is_empty());

    let statuses = orch.status(None).unwrap();
    assert_eq!(statuses.len(), 3);
    let failed = orch.status(Some("fails")).unwrap();
    assert_eq!(failed[0].run.state.status, RunStatus::Failed);
    let skipped = orch.status(Some("skips")).unwrap();
    assert!(skipped[0]
        .run
        .state
        .phases
        .iter()
        .all(|p| p.status == PhaseStatus::Skipped));
}
