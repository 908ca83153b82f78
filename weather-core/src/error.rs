//! Typed failures of the query engine and its stores.
//!
//! Nothing here is fatal: every variant degrades to a message shown to the
//! user while the previous snapshot and history stay valid.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a [`WeatherProvider`](crate::provider::WeatherProvider).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider confirmed that the city does not resolve.
    #[error("{0}")]
    NotFound(String),

    /// Network or service failure; the message is the provider's own.
    #[error("{0}")]
    Transport(String),

    /// The provider answered with a body that is not JSON at all.
    #[error("{0}")]
    InvalidBody(String),
}

/// Failure of a single search request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The search box was empty or whitespace-only.
    #[error("Please enter a city name")]
    Validation,

    /// No history entry at this 1-based position.
    #[error("There is no search #{0} in the history")]
    NoSuchHistoryEntry(usize),

    #[error("{0}")]
    ProviderNotFound(String),

    #[error("{0}")]
    ProviderTransport(String),

    #[error("Malformed weather payload: {0}")]
    MalformedPayload(String),

    /// A newer search was started while this one was in flight.
    #[error("Search for '{0}' was superseded by a newer search")]
    Superseded(String),
}

impl QueryError {
    /// Text for the presentation layer. Provider messages pass through verbatim.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the failure should be surfaced to the user at all.
    pub fn is_displayable(&self) -> bool {
        !matches!(self, QueryError::Superseded(_))
    }
}

impl From<ProviderError> for QueryError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => QueryError::ProviderNotFound(msg),
            ProviderError::Transport(msg) => QueryError::ProviderTransport(msg),
            ProviderError::InvalidBody(msg) => QueryError::MalformedPayload(msg),
        }
    }
}

/// History or preference file could not be read or written.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize data for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
