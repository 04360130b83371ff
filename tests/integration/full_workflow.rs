//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Open a vault in an empty directory
//! 2. Register an account and manage tasks
//! 3. Shut down (final save + final log drain)
//! 4. Reopen and verify the task list and the audit log

use std::time::Duration;

use agentic_tasks::{
    load_snapshot, SaveOutcome, SessionState, SnapshotSource, TaskError, TaskRecord, Vault,
    VaultConfig,
};

fn config(dir: &std::path::Path) -> VaultConfig {
    VaultConfig::in_dir(dir)
        .with_autosave_interval(Duration::from_secs(60))
        .with_flush_interval(Duration::from_secs(60))
}

#[test]
fn full_workflow_register_to_reload() {
    let dir = tempfile::tempdir().unwrap();

    // ── Step 1: Open an empty vault ─────────────────────────────────────
    let vault = Vault::open(config(dir.path())).expect("open should succeed");
    assert_eq!(vault.load_source(), &SnapshotSource::Missing);

    // ── Step 2: Register and manage tasks ───────────────────────────────
    let mut session = vault.session();
    session.register("alice", "pw1").expect("register should succeed");
    assert_eq!(session.state(), &SessionState::Authenticated("alice".into()));

    session.add_task("buy milk").unwrap();
    session.add_task("write report").unwrap();
    session.complete_task(0).unwrap();

    // ── Step 3: Orderly shutdown ────────────────────────────────────────
    let report = vault.shutdown().expect("shutdown should succeed");
    assert!(matches!(report.save, SaveOutcome::Written { .. }));

    // ── Step 4: Reload from the persisted snapshot ──────────────────────
    let loaded = load_snapshot(&dir.path().join("users_data.json")).unwrap();
    assert_eq!(
        loaded.accounts["alice"].tasks,
        vec![
            TaskRecord {
                description: "buy milk".into(),
                done: true
            },
            TaskRecord {
                description: "write report".into(),
                done: false
            },
        ]
    );

    let vault = Vault::open(config(dir.path())).unwrap();
    let mut session = vault.session();
    session.login("alice", "pw1").expect("login after reload");
    assert_eq!(session.list_tasks().unwrap().len(), 2);
    vault.shutdown().unwrap();

    // ── Step 5: Audit log contents ──────────────────────────────────────
    let log = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("[INFO] ["));
    assert!(lines[0].ends_with("[alice] - Account registered"));
    assert!(lines[1].ends_with("[alice] - Task added: buy milk"));
    assert!(lines[2].ends_with("[alice] - Task added: write report"));
    assert!(lines[3].ends_with("[alice] - Task completed: buy milk"));
    assert!(lines[4].ends_with("[alice] - Logged in"));
}

#[test]
fn snapshot_document_is_human_readable() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(config(dir.path())).unwrap();
    let mut session = vault.session();
    session.register("alice", "pw1").unwrap();
    session.add_task("buy milk").unwrap();
    vault.shutdown().unwrap();

    let text = std::fs::read_to_string(dir.path().join("users_data.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["alice"]["password"], "pw1");
    assert_eq!(value["alice"]["tasks"][0]["task"], "buy milk");
    assert_eq!(value["alice"]["tasks"][0]["done"], false);
    // Pretty-printed, one field per line.
    assert!(text.lines().count() > 5);
}

#[test]
fn duplicate_registration_leaves_original_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(config(dir.path())).unwrap();

    let mut first = vault.session();
    first.register("alice", "pw1").unwrap();
    first.add_task("original").unwrap();

    let mut second = vault.session();
    let err = second.register("alice", "pw2").unwrap_err();
    assert!(matches!(err, TaskError::AlreadyExists(_)));
    vault.shutdown().unwrap();

    let vault = Vault::open(config(dir.path())).unwrap();
    let mut session = vault.session();
    assert!(matches!(
        session.login("alice", "pw2"),
        Err(TaskError::InvalidCredentials)
    ));
    session.login("alice", "pw1").unwrap();
    assert_eq!(session.list_tasks().unwrap()[0].description, "original");
    vault.shutdown().unwrap();

    let log = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    let errors: Vec<_> = log.lines().filter(|l| l.starts_with("[ERROR]")).collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].ends_with("[alice] - Registration failed: account already exists"));
    assert!(errors[1].ends_with("[alice] - Login failed: invalid credentials"));
}

#[test]
fn out_of_range_remove_produces_one_error_line() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(config(dir.path())).unwrap();
    let mut session = vault.session();
    session.register("bob", "pw").unwrap();
    session.add_task("a").unwrap();
    session.add_task("b").unwrap();

    let before = session.list_tasks().unwrap();
    let err = session.remove_task(2).unwrap_err();
    assert!(matches!(err, TaskError::IndexOutOfRange { index: 2, len: 2 }));
    assert_eq!(session.list_tasks().unwrap(), before);
    vault.shutdown().unwrap();

    let log = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    let errors: Vec<_> = log.lines().filter(|l| l.starts_with("[ERROR]")).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].ends_with("[bob] - Failed to remove task: invalid index 2"));
}

#[test]
fn mixed_operations_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(config(dir.path())).unwrap();
    let mut session = vault.session();
    session.register("carol", "pw").unwrap();

    // Mirror every operation on a plain Vec and compare after reload.
    let mut expected: Vec<TaskRecord> = Vec::new();
    for i in 0..40usize {
        match i % 5 {
            0 | 1 | 2 => {
                let desc = format!("task {i}");
                session.add_task(&desc).unwrap();
                expected.push(TaskRecord::new(desc));
            }
            3 => {
                let index = i % expected.len();
                session.complete_task(index).unwrap();
                expected[index].done = true;
            }
            _ => {
                let index = (i * 7) % expected.len();
                session.remove_task(index).unwrap();
                expected.remove(index);
            }
        }
    }
    vault.shutdown().unwrap();

    let loaded = load_snapshot(&dir.path().join("users_data.json")).unwrap();
    assert_eq!(loaded.accounts["carol"].tasks, expected);
}

#[test]
fn multiple_accounts_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::open(config(dir.path())).unwrap();

    let mut alice = vault.session();
    alice.register("alice", "a").unwrap();
    let mut bob = vault.session();
    bob.register("bob", "b").unwrap();

    alice.add_task("alice's task").unwrap();
    bob.add_task("bob's task").unwrap();
    bob.add_task("another").unwrap();

    assert_eq!(alice.list_tasks().unwrap().len(), 1);
    assert_eq!(bob.list_tasks().unwrap().len(), 2);
    vault.shutdown().unwrap();

    let loaded = load_snapshot(&dir.path().join("users_data.json")).unwrap();
    assert_eq!(loaded.accounts.len(), 2);
    assert_eq!(loaded.accounts["alice"].tasks.len(), 1);
    assert_eq!(loaded.accounts["bob"].tasks.len(), 2);
}
