//! Account snapshot file — load at startup, atomic overwrite on save.
//!
//! File format (pretty JSON, the account map keyed by identifier):
//! ```json
//! {
//!     "alice": {
//!         "password": "pw1",
//!         "tasks": [ { "task": "buy milk", "done": true } ]
//!     }
//! }
//! ```
//!
//! A missing file loads as an empty map. An unparseable file also loads
//! as an empty map; it is first moved aside to `<name>.corrupt` so the
//! next save does not destroy it.

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::account::AccountMap;
use crate::error::{Result, TaskError};
use crate::time::now_micros;

const TEMP_SUFFIX: &str = ".tmp";
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Where the accounts returned by [`load_snapshot`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    /// The file did not exist.
    Missing,
    /// The file was read and parsed.
    Loaded,
    /// The file could not be parsed. `preserved_as` is where it was moved,
    /// if moving it succeeded.
    Corrupt { preserved_as: Option<PathBuf> },
}

/// Result of reading the snapshot file at startup.
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub accounts: AccountMap,
    pub source: SnapshotSource,
}

/// Read the persisted account map.
///
/// # Errors
///
/// Returns `TaskError::PersistenceUnavailable` only when the file exists
/// but cannot be read (permissions, I/O failure). Absent or malformed
/// content is not an error.
pub fn load_snapshot(path: &Path) -> Result<LoadedSnapshot> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("no snapshot at {}, starting empty", path.display());
            return Ok(LoadedSnapshot {
                accounts: AccountMap::new(),
                source: SnapshotSource::Missing,
            });
        }
        Err(e) => {
            return Err(TaskError::PersistenceUnavailable(format!(
                "failed to read snapshot {}: {e}",
                path.display()
            )));
        }
    };

    match serde_json::from_slice::<AccountMap>(&bytes) {
        Ok(accounts) => Ok(LoadedSnapshot {
            accounts,
            source: SnapshotSource::Loaded,
        }),
        Err(e) => {
            log::warn!(
                "snapshot {} is unreadable ({e}), starting empty",
                path.display()
            );
            let preserved_as = preserve_corrupt(path);
            Ok(LoadedSnapshot {
                accounts: AccountMap::new(),
                source: SnapshotSource::Corrupt { preserved_as },
            })
        }
    }
}

/// Write `data` to `path` atomically using a sibling temporary file.
///
/// Creates the parent directory if it does not exist. The temp file is
/// synced before the rename, so after a crash the path holds either the
/// previous snapshot or the new one in full.
///
/// # Errors
///
/// Returns `TaskError::Io` for filesystem errors.
pub fn write_snapshot(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = sibling(path, TEMP_SUFFIX);
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    std::fs::rename(&tmp_path, path)?;

    Ok(())
}

/// `path` with `suffix` appended to its file name.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(suffix);
    path.with_file_name(name)
}

/// Move an unparseable snapshot aside. An earlier `.corrupt` file is kept;
/// the new one gets a timestamp suffix instead.
fn preserve_corrupt(path: &Path) -> Option<PathBuf> {
    let mut target = sibling(path, CORRUPT_SUFFIX);
    if target.exists() {
        target = sibling(path, &format!("{CORRUPT_SUFFIX}.{}", now_micros()));
    }
    match std::fs::rename(path, &target) {
        Ok(()) => {
            log::warn!("moved unreadable snapshot to {}", target.display());
            Some(target)
        }
        Err(e) => {
            log::warn!("could not preserve unreadable snapshot {}: {e}", path.display());
            None
        }
    }
}
