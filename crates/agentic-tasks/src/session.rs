//! Account sessions — the authenticated façade over the store.
//!
//! ```text
//! Unauthenticated ──register/login ok──▶ Authenticated(id) ──logout──▶ Unauthenticated
//! ```
//!
//! Every mutating call follows the same order: take a save permit, mutate
//! under the store lock, release it, enqueue exactly one audit entry, then
//! (on success) raise one save request. Neither of the last two steps does
//! I/O. Once the vault has shut down no permit is issued and the call fails
//! before touching the store.

use std::sync::Arc;

use crate::account::TaskRecord;
use crate::audit::LogBuffer;
use crate::error::{Result, TaskError};
use crate::persistence::SaveHandle;
use crate::store::GuardedStore;

/// Authentication state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(String),
}

/// One caller's binding to an account.
pub struct AccountSession {
    store: Arc<GuardedStore>,
    log: Arc<LogBuffer>,
    saver: SaveHandle,
    state: SessionState,
}

impl AccountSession {
    pub fn new(store: Arc<GuardedStore>, log: Arc<LogBuffer>, saver: SaveHandle) -> Self {
        Self {
            store,
            log,
            saver,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Identifier of the logged-in account, if any.
    pub fn identifier(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated(id) => Some(id),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identifier().is_some()
    }

    // ── Authentication ────────────────────────────────────────────────────────

    /// Create an account and log into it.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::AlreadyExists` if the identifier is taken, or
    /// `TaskError::PersistenceUnavailable` after shutdown.
    pub fn register(&mut self, identifier: &str, credential: &str) -> Result<()> {
        let _permit = self.saver.admit()?;
        if let Err(err) = self.store.create(identifier, credential) {
            self.log.error(identifier, "Registration failed: account already exists");
            return Err(err);
        }
        self.log.info(identifier, "Account registered");
        self.saver.request_save();
        self.state = SessionState::Authenticated(identifier.to_string());
        Ok(())
    }

    /// Log into an existing account.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::InvalidCredentials` if the account is absent or
    /// the credential does not match. The session state is unchanged.
    pub fn login(&mut self, identifier: &str, credential: &str) -> Result<()> {
        if !self.store.verify_credential(identifier, credential) {
            self.log.error(identifier, "Login failed: invalid credentials");
            return Err(TaskError::InvalidCredentials);
        }
        self.log.info(identifier, "Logged in");
        self.state = SessionState::Authenticated(identifier.to_string());
        Ok(())
    }

    /// Drop the account binding. Does nothing when not logged in.
    pub fn logout(&mut self) {
        if let SessionState::Authenticated(id) =
            std::mem::replace(&mut self.state, SessionState::Unauthenticated)
        {
            self.log.info(&id, "Logged out");
        }
    }

    // ── Tasks ─────────────────────────────────────────────────────────────────

    /// Append a task; returns its index.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NotAuthenticated` without a logged-in account,
    /// or `TaskError::PersistenceUnavailable` after shutdown.
    pub fn add_task(&self, description: &str) -> Result<usize> {
        let id = self.require_identifier()?;
        let _permit = self.saver.admit()?;
        let index = self
            .store
            .mutate(id, |account| Ok(account.push_task(description)))?;
        self.log.info(id, format!("Task added: {description}"));
        self.saver.request_save();
        Ok(index)
    }

    /// Remove the task at `index`; later tasks are renumbered.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::IndexOutOfRange` (logged as ERROR, list
    /// unchanged), `TaskError::NotAuthenticated`, or
    /// `TaskError::PersistenceUnavailable` after shutdown.
    pub fn remove_task(&self, index: usize) -> Result<TaskRecord> {
        let id = self.require_identifier()?;
        let _permit = self.saver.admit()?;
        match self.store.mutate(id, |account| account.remove_task(index)) {
            Ok(task) => {
                self.log.info(id, format!("Task removed: {}", task.description));
                self.saver.request_save();
                Ok(task)
            }
            Err(err) => {
                self.log_index_failure(id, "remove", index, &err);
                Err(err)
            }
        }
    }

    /// Mark the task at `index` as done.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::IndexOutOfRange` (logged as ERROR, list
    /// unchanged), `TaskError::NotAuthenticated`, or
    /// `TaskError::PersistenceUnavailable` after shutdown.
    pub fn complete_task(&self, index: usize) -> Result<TaskRecord> {
        let id = self.require_identifier()?;
        let _permit = self.saver.admit()?;
        match self
            .store
            .mutate(id, |account| account.complete_task(index).cloned())
        {
            Ok(task) => {
                self.log.info(id, format!("Task completed: {}", task.description));
                self.saver.request_save();
                Ok(task)
            }
            Err(err) => {
                self.log_index_failure(id, "complete", index, &err);
                Err(err)
            }
        }
    }

    /// Remove by 1-based task number, as numbered by [`render_tasks`].
    ///
    /// # Errors
    ///
    /// As [`remove_task`](Self::remove_task); number 0 fails with
    /// `TaskError::InvalidTaskNumber` and is logged like any other bad
    /// position.
    pub fn remove_task_number(&self, number: usize) -> Result<TaskRecord> {
        match number.checked_sub(1) {
            Some(index) => self.remove_task(index),
            None => Err(self.reject_number_zero("remove")?),
        }
    }

    /// Complete by 1-based task number, as numbered by [`render_tasks`].
    ///
    /// # Errors
    ///
    /// As [`complete_task`](Self::complete_task); number 0 fails with
    /// `TaskError::InvalidTaskNumber`.
    pub fn complete_task_number(&self, number: usize) -> Result<TaskRecord> {
        match number.checked_sub(1) {
            Some(index) => self.complete_task(index),
            None => Err(self.reject_number_zero("complete")?),
        }
    }

    /// Current task list in insertion order. No side effects.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NotAuthenticated` without a logged-in account.
    pub fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let id = self.require_identifier()?;
        self.store
            .get(id)
            .map(|account| account.tasks)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    fn require_identifier(&self) -> Result<&str> {
        self.identifier().ok_or(TaskError::NotAuthenticated)
    }

    /// Log number 0 the way an out-of-range index is logged; it maps to
    /// index -1.
    fn reject_number_zero(&self, action: &str) -> Result<TaskError> {
        let id = self.require_identifier()?;
        let _permit = self.saver.admit()?;
        self.log.error(id, format!("Failed to {action} task: invalid index -1"));
        Ok(TaskError::InvalidTaskNumber(0))
    }

    fn log_index_failure(&self, id: &str, action: &str, index: usize, err: &TaskError) {
        if let TaskError::IndexOutOfRange { .. } = err {
            self.log.error(
                id,
                format!("Failed to {action} task: invalid index {index}"),
            );
        }
    }
}

/// Render tasks as numbered lines, 1-based: `1. [✔] buy milk`.
pub fn render_tasks(tasks: &[TaskRecord]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| format!("{}. [{}] {}\n", i + 1, task.status_mark(), task.description))
        .collect()
}
