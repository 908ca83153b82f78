//! Durable client state kept in small JSON files.
//!
//! Each mutation rewrites the whole file. Reads fail soft: the stores log the
//! [`PersistenceError`] once and fall back to defaults.

use std::{fs, path::Path};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::PersistenceError;

pub mod history;
pub mod preferences;

pub use history::{HistoryStore, MAX_HISTORY};
pub use preferences::PreferenceStore;

/// Read and parse `path`. `Ok(None)` when the file does not exist yet.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| PersistenceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value = serde_json::from_str(&contents).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(value))
}

/// Serialize `value` as pretty JSON and overwrite `path`, creating parent
/// directories as needed.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PersistenceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PersistenceError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| PersistenceError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, json).map_err(|source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    })
}
