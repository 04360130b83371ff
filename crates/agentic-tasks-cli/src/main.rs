//! AgenticTasks CLI — `atask` command.
//!
//! Each invocation opens the vault, authenticates, runs one operation and
//! then performs the orderly shutdown (final save, final log drain).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use agentic_tasks::{render_tasks, AccountSession, SaveOutcome, TaskError, Vault, VaultConfig};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_tasks_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ATASK_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").map_err(|_| anyhow!("HOME not set; pass --dir"))?;
    Ok(PathBuf::from(home).join(".agentic").join("tasks"))
}

// ── Credential helper ─────────────────────────────────────────────────────────

fn read_password(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    let mut password = String::new();
    std::io::stdin()
        .read_line(&mut password)
        .context("failed to read password")?;
    Ok(password.trim().to_string())
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// AgenticTasks CLI — per-account task lists with durable snapshots and an
/// audit log.
#[derive(Parser, Debug)]
#[command(
    name = "atask",
    about = "AgenticTasks CLI",
    version,
    long_about = "atask — AgenticTasks CLI\n\nRegister accounts, manage task lists, and inspect the audit log.\nEvery change is saved before the command exits."
)]
struct Cli {
    /// Directory holding users_data.json, app.log and errors.log
    /// (default: $ATASK_HOME or ~/.agentic/tasks)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Account identifier
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Account password (prompted on stdin when omitted)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Periodic autosave interval in seconds
    #[arg(long, global = true, default_value_t = 10)]
    autosave_secs: u64,

    /// Audit log flush interval in seconds
    #[arg(long, global = true, default_value_t = 3)]
    flush_secs: u64,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new account
    Register,

    /// Add a task
    Add {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },

    /// Remove a task by its number in `list`
    Remove {
        /// Task number (1-based)
        number: usize,
    },

    /// Mark a task as done by its number in `list`
    Complete {
        /// Task number (1-based)
        number: usize,
    },

    /// Show all tasks
    List,

    /// Print the most recent audit log lines
    ShowLog {
        /// Number of lines to show
        #[arg(long, default_value_t = 20)]
        lines: usize,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Register => cmd_register(&cli),
        Commands::Add { ref task } => cmd_add(&cli, &task.join(" ")),
        Commands::Remove { number } => cmd_remove(&cli, number),
        Commands::Complete { number } => cmd_complete(&cli, number),
        Commands::List => cmd_list(&cli),
        Commands::ShowLog { lines } => cmd_show_log(&cli, lines),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// 1 for rejected input, 2 when storage or logging failed.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TaskError>() {
        Some(task_err) if !task_err.is_user_error() => 2,
        _ => 1,
    }
}

// ── Vault helpers ─────────────────────────────────────────────────────────────

fn vault_config(cli: &Cli) -> Result<VaultConfig> {
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => default_tasks_dir()?,
    };
    Ok(VaultConfig::in_dir(dir)
        .with_autosave_interval(Duration::from_secs(cli.autosave_secs))
        .with_flush_interval(Duration::from_secs(cli.flush_secs)))
}

fn credentials(cli: &Cli) -> Result<(String, String)> {
    let user = cli
        .user
        .clone()
        .ok_or_else(|| anyhow!("--user is required for this command"))?;
    let password = match &cli.password {
        Some(p) => p.clone(),
        None => read_password("Password: ")?,
    };
    Ok((user, password))
}

/// Open the vault, authenticate, run `op`, then shut down.
///
/// Shutdown runs even when `op` fails, so the ERROR entry for a rejected
/// operation still reaches the log file.
fn with_session<T>(
    cli: &Cli,
    register: bool,
    op: impl FnOnce(&mut AccountSession) -> agentic_tasks::Result<T>,
) -> Result<T> {
    let (user, password) = credentials(cli)?;
    let config = vault_config(cli)?;
    let data_path = config.data_path.clone();
    let vault = Vault::open(config)
        .with_context(|| format!("failed to open vault in {}", data_path.display()))?;
    if cli.verbose {
        eprintln!(
            "loaded {} accounts from {}",
            vault.store().len(),
            vault.config().data_path.display()
        );
    }

    let mut session = vault.session();
    let outcome = if register {
        session.register(&user, &password)
    } else {
        session.login(&user, &password)
    }
    .and_then(|()| op(&mut session));
    drop(session);

    let report = vault.shutdown().context("failed to shut down cleanly")?;
    if cli.verbose {
        match report.save {
            SaveOutcome::Written { generation } => {
                eprintln!("saved generation {generation} to {}", data_path.display())
            }
            SaveOutcome::Unchanged { .. } => eprintln!("no changes to save"),
        }
        eprintln!("flushed {} log lines", report.lines_flushed);
    }

    outcome.map_err(anyhow::Error::from)
}

// ── Command implementations ───────────────────────────────────────────────────

/// `atask register --user NAME`
fn cmd_register(cli: &Cli) -> Result<()> {
    with_session(cli, true, |_| Ok(()))?;
    println!("Registered '{}'", cli.user.as_deref().unwrap_or_default());
    Ok(())
}

/// `atask add --user NAME TASK...`
fn cmd_add(cli: &Cli, task: &str) -> Result<()> {
    let index = with_session(cli, false, |s| s.add_task(task))?;
    println!("Added task {}: {task}", index + 1);
    Ok(())
}

/// `atask remove --user NAME N`
fn cmd_remove(cli: &Cli, number: usize) -> Result<()> {
    let removed = with_session(cli, false, |s| s.remove_task_number(number))?;
    println!("Removed task {number}: {}", removed.description);
    Ok(())
}

/// `atask complete --user NAME N`
fn cmd_complete(cli: &Cli, number: usize) -> Result<()> {
    let task = with_session(cli, false, |s| s.complete_task_number(number))?;
    println!("Completed task {number}: {}", task.description);
    Ok(())
}

/// `atask list --user NAME`
fn cmd_list(cli: &Cli) -> Result<()> {
    let tasks = with_session(cli, false, |s| s.list_tasks())?;
    if tasks.is_empty() {
        println!("No tasks");
    } else {
        print!("{}", render_tasks(&tasks));
    }
    Ok(())
}

/// `atask show-log [--lines N]`
fn cmd_show_log(cli: &Cli, lines: usize) -> Result<()> {
    let config = vault_config(cli)?;
    let text = match std::fs::read_to_string(&config.log_path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("No log yet ({})", config.log_path.display());
            return Ok(());
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read {}", config.log_path.display()))
        }
    };

    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    for line in &all[start..] {
        println!("{line}");
    }
    Ok(())
}
