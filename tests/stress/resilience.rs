//! Resilience tests: damaged files, failing targets, and abrupt endings.
//!
//! Background I/O failures must be reported to the error channel and
//! retried on the next cycle without ever reaching the foreground caller.

use std::path::Path;
use std::time::{Duration, Instant};

use agentic_tasks::{load_snapshot, SnapshotSource, Vault, VaultConfig};

fn fast_config(dir: &Path) -> VaultConfig {
    VaultConfig::in_dir(dir)
        .with_autosave_interval(Duration::from_millis(15))
        .with_flush_interval(Duration::from_millis(10))
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn resilience_corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("users_data.json");
    std::fs::write(&data, b"\x00\xffgarbage{{{").unwrap();

    let vault = Vault::open(fast_config(dir.path())).expect("corruption must not be fatal");
    assert!(vault.store().is_empty());
    assert!(matches!(
        vault.load_source(),
        SnapshotSource::Corrupt {
            preserved_as: Some(_)
        }
    ));

    let mut session = vault.session();
    session.register("alice", "pw").unwrap();
    vault.shutdown().unwrap();

    let loaded = load_snapshot(&data).unwrap();
    assert!(loaded.accounts.contains_key("alice"));
    let preserved = std::fs::read(dir.path().join("users_data.json.corrupt")).unwrap();
    assert_eq!(preserved, b"\x00\xffgarbage{{{");
}

#[test]
fn resilience_wrong_shape_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("users_data.json"), br#"["not", "a", "map"]"#).unwrap();

    let vault = Vault::open(fast_config(dir.path())).unwrap();
    assert!(vault.store().is_empty());
    vault.shutdown().unwrap();
}

#[test]
fn resilience_stale_temp_file_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("users_data.json");
    std::fs::write(&data, br#"{"alice":{"password":"pw","tasks":[]}}"#).unwrap();
    // Left behind by a crash between write and rename.
    std::fs::write(dir.path().join("users_data.json.tmp"), b"{ half").unwrap();

    let vault = Vault::open(fast_config(dir.path())).unwrap();
    assert_eq!(vault.load_source(), &SnapshotSource::Loaded);
    let mut session = vault.session();
    session.login("alice", "pw").unwrap();
    session.add_task("after crash").unwrap();
    vault.shutdown().unwrap();

    let loaded = load_snapshot(&data).unwrap();
    assert_eq!(loaded.accounts["alice"].tasks.len(), 1);
}

#[test]
fn resilience_log_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("app.log");
    // A directory in place of the log file makes every flush fail.
    std::fs::create_dir(&log_path).unwrap();

    let vault = Vault::open(fast_config(dir.path())).unwrap();
    let mut session = vault.session();
    session.register("alice", "pw").expect("log failure never reaches the caller");
    session.add_task("one").unwrap();
    session.add_task("two").unwrap();

    assert!(wait_for(|| vault.flush_stats().failures >= 2));
    assert_eq!(vault.log().len(), 3, "failed entries stay buffered");

    std::fs::remove_dir(&log_path).unwrap();
    assert!(wait_for(|| vault.flush_stats().lines_written == 3));
    vault.shutdown().unwrap();

    let log = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<_> = log.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("Account registered"));
    assert!(lines[2].ends_with("Task added: two"));

    let errors = std::fs::read_to_string(dir.path().join("errors.log")).unwrap();
    assert!(errors.contains("[log-flusher] - Log unavailable"));
}

#[test]
fn resilience_persistence_failure_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("users_data.json");
    // A non-empty directory in place of the snapshot makes rename fail.
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("blocker"), b"x").unwrap();

    let vault = Vault::open(fast_config(dir.path()));
    // Reading a directory fails, which is a hard open error.
    assert!(vault.is_err());

    std::fs::remove_dir_all(&data).unwrap();
    let vault = Vault::open(fast_config(dir.path())).unwrap();
    let mut session = vault.session();
    session.register("bob", "pw").unwrap();
    assert!(wait_for(|| vault.save_stats().writes >= 1));

    // Break the target after a good save, then mutate.
    std::fs::remove_file(&data).unwrap();
    std::fs::create_dir(&data).unwrap();
    std::fs::write(data.join("blocker"), b"x").unwrap();
    session.add_task("survives").unwrap();
    assert!(wait_for(|| vault.save_stats().failures >= 2));
    assert!(vault.errors().count() >= 2);

    // Repair; the periodic cycle retries without a new request.
    std::fs::remove_dir_all(&data).unwrap();
    let writes = vault.save_stats().writes;
    assert!(wait_for(|| vault.save_stats().writes > writes));
    vault.shutdown().unwrap();

    let loaded = load_snapshot(&data).unwrap();
    assert_eq!(loaded.accounts["bob"].tasks[0].description, "survives");
}

#[test]
fn resilience_drop_without_shutdown_still_persists() {
    let dir = tempfile::tempdir().unwrap();
    {
        let vault = Vault::open(
            VaultConfig::in_dir(dir.path())
                .with_autosave_interval(Duration::from_secs(60))
                .with_flush_interval(Duration::from_secs(60)),
        )
        .unwrap();
        let mut session = vault.session();
        session.register("carol", "pw").unwrap();
        session.add_task("dropped, not shut down").unwrap();
    }

    let loaded = load_snapshot(&dir.path().join("users_data.json")).unwrap();
    assert_eq!(loaded.accounts["carol"].tasks.len(), 1);
    let log = std::fs::read_to_string(dir.path().join("app.log")).unwrap();
    assert_eq!(log.lines().count(), 2);
}
