use std::path::{Path, PathBuf};

use crate::{
    error::PersistenceError,
    model::{TemperatureUnit, UserPreferences},
};

use super::{read_json, write_json};

/// Owns the persisted [`UserPreferences`]. The in-memory copy stays
/// authoritative for the session even when a save fails.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    prefs: UserPreferences,
}

impl PreferenceStore {
    /// Load from `path`; absent or unreadable files yield defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(error = %err, "preferences unavailable, using defaults");
                Self {
                    path,
                    prefs: UserPreferences::default(),
                }
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, PersistenceError> {
        Ok(Self {
            path: path.to_path_buf(),
            prefs: read_json(path)?.unwrap_or_default(),
        })
    }

    pub fn get(&self) -> &UserPreferences {
        &self.prefs
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.prefs.unit()
    }

    pub fn set_use_celsius(&mut self, use_celsius: bool) -> Result<(), PersistenceError> {
        self.prefs.use_celsius = use_celsius;
        self.save()
    }

    pub fn save(&self) -> Result<(), PersistenceError> {
        write_json(&self.path, &self.prefs)
    }
}
