use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};

use crate::{error::PersistenceError, model::SearchHistoryEntry};

use super::{read_json, write_json};

/// Upper bound on remembered searches.
pub const MAX_HISTORY: usize = 10;

/// Most-recent-first list of searched cities, unique under case-insensitive
/// comparison and never longer than [`MAX_HISTORY`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<SearchHistoryEntry>,
}

impl HistoryStore {
    /// Load history from `path`, falling back to an empty list when the file
    /// is missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::try_load(&path) {
            Ok(store) => store,
            Err(err) => {
                tracing::warn!(error = %err, "search history unavailable, starting empty");
                Self {
                    path,
                    entries: Vec::new(),
                }
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, PersistenceError> {
        let stored: Vec<SearchHistoryEntry> = read_json(path)?.unwrap_or_default();

        // hand-edited files may break the invariants; keep the first occurrence
        let mut entries: Vec<SearchHistoryEntry> = Vec::with_capacity(stored.len());
        for entry in stored {
            if entry.city.trim().is_empty() || entries.iter().any(|e| e.matches_city(&entry.city)) {
                continue;
            }
            entries.push(entry);
        }
        entries.truncate(MAX_HISTORY);

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Entries in display order, newest first.
    pub fn entries(&self) -> &[SearchHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move `city` to the front, stamped with the current time.
    pub fn record(&mut self, city: &str) -> Result<(), PersistenceError> {
        self.record_at(city, Local::now().fixed_offset())
    }

    /// Like [`record`](Self::record) with an explicit timestamp.
    ///
    /// The in-memory list is updated even when persisting fails.
    pub fn record_at(
        &mut self,
        city: &str,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<(), PersistenceError> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(());
        }

        self.entries.retain(|e| !e.matches_city(city));
        self.entries.insert(
            0,
            SearchHistoryEntry {
                city: city.to_string(),
                timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, false),
            },
        );
        self.entries.truncate(MAX_HISTORY);

        tracing::debug!(city, entries = self.entries.len(), "recorded search");
        self.persist()
    }

    /// Drop every entry for `city` (case-insensitive). Returns whether
    /// anything was removed.
    pub fn remove(&mut self, city: &str) -> Result<bool, PersistenceError> {
        let before = self.entries.len();
        self.entries.retain(|e| !e.matches_city(city));
        let removed = self.entries.len() != before;

        self.persist()?;
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), PersistenceError> {
        self.entries.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), PersistenceError> {
        write_json(&self.path, &self.entries)
    }
}
