//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The provider boundary and its OpenWeather implementation
//! - Normalization of raw payloads into [`WeatherSnapshot`]s
//! - Alert rules and visual themes derived from a snapshot
//! - Search history and preference persistence
//! - The [`QueryOrchestrator`] that ties a search together
//!
//! It is used by `weather-cli`, but can also be reused by other front ends.

pub mod alerts;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod store;
pub mod theme;

pub use alerts::{Alert, AlertLevel};
pub use config::Config;
pub use error::{PersistenceError, ProviderError, QueryError};
pub use model::{
    DisplayModel, SearchHistoryEntry, TemperatureUnit, UserPreferences, WeatherSnapshot,
};
pub use orchestrator::{QueryOrchestrator, QueryPhase, SessionState};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use store::{HistoryStore, MAX_HISTORY, PreferenceStore};
pub use theme::{ThemeKind, ThemeProfile};
