//! Task Session — register an account, manage tasks, and shut down cleanly.
//!
//! Run with:
//!   cargo run --example task_session -p agentic-tasks

use std::time::Duration;

use agentic_tasks::{render_tasks, Vault, VaultConfig};

fn main() -> agentic_tasks::Result<()> {
    let dir = std::env::temp_dir().join(format!("atask-demo-{}", std::process::id()));
    let config = VaultConfig::in_dir(&dir)
        .with_autosave_interval(Duration::from_secs(2))
        .with_flush_interval(Duration::from_millis(500));
    println!("Data directory: {}", dir.display());
    println!();

    // ── 1. Open the vault and register ──────────────────────────────────────
    //
    // Opening loads users_data.json (missing here, so the store starts empty)
    // and starts the persistence worker and the log flusher.
    let vault = Vault::open(config)?;
    let mut session = vault.session();
    session.register("demo-agent", "s3cret")?;
    println!("Registered: {:?}", session.state());

    // ── 2. Manage tasks ─────────────────────────────────────────────────────
    //
    // Every successful mutation requests a save; bursts are coalesced.
    session.add_task("Collect deployment metrics")?;
    session.add_task("Summarize incident report")?;
    session.add_task("Rotate API credentials")?;
    session.complete_task(0)?;
    let removed = session.remove_task(2)?;
    println!("Removed: {}", removed.description);

    // Rejected operations leave the list untouched and log an ERROR line.
    if let Err(e) = session.complete_task(7) {
        println!("Rejected: {e}");
    }
    println!();
    println!("Tasks:");
    print!("{}", render_tasks(&session.list_tasks()?));
    println!();

    // ── 3. Orderly shutdown ─────────────────────────────────────────────────
    //
    // Final save first, then the final log drain.
    drop(session);
    let report = vault.shutdown()?;
    println!("Shutdown: {:?}, {} log lines flushed", report.save, report.lines_flushed);
    println!();

    // ── 4. Inspect what reached disk ────────────────────────────────────────
    println!("users_data.json:");
    println!("{}", std::fs::read_to_string(dir.join("users_data.json"))?);
    println!();
    println!("app.log:");
    print!("{}", std::fs::read_to_string(dir.join("app.log"))?);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
