//! Account and task records.
//!
//! Field names on disk follow the snapshot document layout:
//! `{ "password": "...", "tasks": [ { "task": "...", "done": false } ] }`.
//! The account identifier is the map key, not a field.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// Full account map, ordered by identifier so snapshots are stable.
pub type AccountMap = BTreeMap<String, AccountRecord>;

// ---------------------------------------------------------------------------
// Task Record
// ---------------------------------------------------------------------------

/// One entry in an account's task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "task")]
    pub description: String,
    #[serde(default)]
    pub done: bool,
}

impl TaskRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            done: false,
        }
    }

    /// Completion marker used when rendering a list.
    pub fn status_mark(&self) -> char {
        if self.done {
            '✔'
        } else {
            '✘'
        }
    }
}

// ---------------------------------------------------------------------------
// Account Record
// ---------------------------------------------------------------------------

/// A registered account and its ordered task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(skip)]
    identifier: String,
    #[serde(rename = "password")]
    credential: String,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl AccountRecord {
    pub fn new(identifier: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            credential: credential.into(),
            tasks: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Opaque equality check; the credential itself is never exposed.
    pub fn credential_matches(&self, credential: &str) -> bool {
        self.credential == credential
    }

    /// Restore the identifier after deserialization, where it lives in the
    /// enclosing map key.
    pub(crate) fn bind_identifier(&mut self, identifier: &str) {
        self.identifier = identifier.to_string();
    }

    /// Append a task and return its index.
    pub fn push_task(&mut self, description: impl Into<String>) -> usize {
        self.tasks.push(TaskRecord::new(description));
        self.tasks.len() - 1
    }

    /// Remove the task at `index`; later tasks shift down by one.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::IndexOutOfRange` if `index >= tasks.len()`.
    pub fn remove_task(&mut self, index: usize) -> Result<TaskRecord> {
        self.check_index(index)?;
        Ok(self.tasks.remove(index))
    }

    /// Mark the task at `index` as done. Completing a finished task is a
    /// no-op that still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::IndexOutOfRange` if `index >= tasks.len()`.
    pub fn complete_task(&mut self, index: usize) -> Result<&TaskRecord> {
        self.check_index(index)?;
        let task = &mut self.tasks[index];
        task.done = true;
        Ok(task)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.tasks.len() {
            return Err(TaskError::IndexOutOfRange {
                index,
                len: self.tasks.len(),
            });
        }
        Ok(())
    }
}
