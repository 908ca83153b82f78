//! Search flow: validate → fetch → normalize → enrich → publish.
//!
//! The orchestrator owns the session state and hands it to the presentation
//! layer through `watch` channels instead of reaching into widgets.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    Config, alerts,
    error::QueryError,
    model::{DisplayModel, SearchHistoryEntry, TemperatureUnit},
    normalize::normalize,
    provider::{WeatherProvider, provider_from_config},
    store::{HistoryStore, PreferenceStore},
    theme,
};

/// Where the most recent search request currently is.
///
/// A failed request passes through `Failed` and settles back on `Idle`,
/// with the message kept in [`SessionState::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryPhase {
    #[default]
    Idle,
    Validating,
    Fetching,
    Normalizing,
    Enriching,
    Done,
    Failed,
}

/// Snapshot of the session published to subscribers.
///
/// `display` keeps the last successful result across failures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: QueryPhase,
    pub display: Option<DisplayModel>,
    pub error: Option<String>,
}

pub struct QueryOrchestrator {
    provider: Box<dyn WeatherProvider>,
    history: Mutex<HistoryStore>,
    preferences: Mutex<PreferenceStore>,
    timeout: Duration,
    /// Token of the newest request; older responses are dropped.
    latest_request: AtomicU64,
    state_tx: watch::Sender<SessionState>,
    history_tx: watch::Sender<Vec<SearchHistoryEntry>>,
}

impl std::fmt::Debug for QueryOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryOrchestrator")
            .field("provider", &self.provider)
            .field("timeout", &self.timeout)
            .field("state", &*self.state_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl QueryOrchestrator {
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        history: HistoryStore,
        preferences: PreferenceStore,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::default());
        let (history_tx, _) = watch::channel(history.entries().to_vec());

        Self {
            provider,
            history: Mutex::new(history),
            preferences: Mutex::new(preferences),
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            latest_request: AtomicU64::new(0),
            state_tx,
            history_tx,
        }
    }

    /// Wire up the OpenWeather provider and the on-disk stores.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let provider = provider_from_config(config)?;
        let history = HistoryStore::load(config.history_path()?);
        let preferences = PreferenceStore::load(config.preferences_path()?);

        Ok(Self::new(provider, history, preferences).with_timeout(config.request_timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Receives the full history list after every change.
    pub fn subscribe_history(&self) -> watch::Receiver<Vec<SearchHistoryEntry>> {
        self.history_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Result of the last successful search, in the current unit.
    pub fn current_display(&self) -> Option<DisplayModel> {
        self.state_tx.borrow().display.clone()
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.preferences.lock().unit()
    }

    pub fn history(&self) -> Vec<SearchHistoryEntry> {
        self.history.lock().entries().to_vec()
    }

    /// Run one lookup for `input`.
    ///
    /// Every failure is published as a message and leaves the previous
    /// display and history untouched.
    pub async fn search(&self, input: &str) -> Result<DisplayModel, QueryError> {
        let token = self.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.advance(token, QueryPhase::Validating);

        let city = input.trim();
        if city.is_empty() {
            return Err(self.fail(token, QueryError::Validation));
        }

        self.advance(token, QueryPhase::Fetching);
        let fetched = tokio::time::timeout(self.timeout, self.provider.lookup(city)).await;

        if !self.is_current(token) {
            tracing::debug!(city, token, "dropping response of superseded search");
            return Err(QueryError::Superseded(city.to_string()));
        }

        let raw = match fetched {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return Err(self.fail(token, err.into())),
            Err(_) => {
                let msg = format!("Request timed out after {}", describe(self.timeout));
                return Err(self.fail(token, QueryError::ProviderTransport(msg)));
            }
        };

        self.advance(token, QueryPhase::Normalizing);
        let snapshot = normalize(&raw).map_err(|err| self.fail(token, err))?;

        self.advance(token, QueryPhase::Enriching);
        let alerts = alerts::evaluate(&snapshot);
        let theme = theme::select(&snapshot.condition_key());

        // the provider's spelling of the city wins over the raw input
        let confirmed_city = if snapshot.city.trim().is_empty() {
            city.to_string()
        } else {
            snapshot.city.clone()
        };

        let mut published = None;
        self.state_tx.send_if_modified(|state| {
            if !self.is_current(token) {
                return false;
            }
            // unit as of publish time
            let model = DisplayModel {
                snapshot,
                alerts,
                theme,
                unit: self.unit(),
            };
            state.phase = QueryPhase::Done;
            state.display = Some(model.clone());
            state.error = None;
            published = Some(model);
            true
        });

        let Some(model) = published else {
            tracing::debug!(city, token, "search superseded before publishing");
            return Err(QueryError::Superseded(city.to_string()));
        };

        self.record_history(&confirmed_city);

        tracing::info!(
            city = %confirmed_city,
            temperature_c = model.snapshot.temperature_c,
            alerts = model.alerts.len(),
            "weather lookup complete"
        );
        Ok(model)
    }

    /// Search again for the history entry at `index` (0 = newest).
    ///
    /// An index past the end is rejected before any request starts, so the
    /// session state stays as it was.
    pub async fn search_from_history(&self, index: usize) -> Result<DisplayModel, QueryError> {
        let city = self
            .history
            .lock()
            .entries()
            .get(index)
            .map(|e| e.city.clone())
            .ok_or(QueryError::NoSuchHistoryEntry(index + 1))?;

        self.search(&city).await
    }

    /// Store the unit preference and re-render the last result, if any,
    /// without contacting the provider.
    pub fn set_unit(&self, unit: TemperatureUnit) -> Option<DisplayModel> {
        if let Err(err) = self.preferences.lock().set_use_celsius(unit.is_celsius()) {
            tracing::warn!(error = %err, "failed to save preferences");
        }

        let mut rerendered = None;
        self.state_tx.send_if_modified(|state| match state.display.as_mut() {
            Some(display) => {
                display.unit = unit;
                rerendered = Some(display.clone());
                true
            }
            None => false,
        });
        rerendered
    }

    pub fn toggle_unit(&self) -> Option<DisplayModel> {
        let next = self.unit().toggled();
        self.set_unit(next)
    }

    pub fn remove_history(&self, city: &str) -> bool {
        let mut history = self.history.lock();
        let removed = match history.remove(city) {
            Ok(removed) => removed,
            Err(err) => {
                tracing::warn!(error = %err, "failed to save search history");
                // memory is already updated; report based on what is left
                !history.entries().iter().any(|e| e.matches_city(city))
            }
        };
        self.history_tx.send_replace(history.entries().to_vec());
        removed
    }

    pub fn clear_history(&self) {
        let mut history = self.history.lock();
        if let Err(err) = history.clear() {
            tracing::warn!(error = %err, "failed to save search history");
        }
        self.history_tx.send_replace(Vec::new());
    }

    fn record_history(&self, city: &str) {
        let mut history = self.history.lock();
        if let Err(err) = history.record(city) {
            tracing::warn!(error = %err, "failed to save search history");
        }
        self.history_tx.send_replace(history.entries().to_vec());
    }

    fn is_current(&self, token: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == token
    }

    fn advance(&self, token: u64, phase: QueryPhase) {
        self.state_tx.send_if_modified(|state| {
            if !self.is_current(token) {
                return false;
            }
            tracing::debug!(?phase, token, "query phase");
            state.phase = phase;
            if phase == QueryPhase::Validating {
                state.error = None;
            }
            true
        });
    }

    fn fail(&self, token: u64, err: QueryError) -> QueryError {
        tracing::debug!(error = %err, token, "search failed");
        self.state_tx.send_if_modified(|state| {
            if !self.is_current(token) {
                return false;
            }
            state.phase = QueryPhase::Failed;
            state.error = Some(err.user_message());
            true
        });
        self.advance(token, QueryPhase::Idle);
        err
    }
}

fn describe(d: Duration) -> String {
    if d.as_millis() < 1000 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}s", d.as_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{alerts::AlertLevel, error::ProviderError, theme::ThemeKind};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::{
        collections::HashMap,
        path::Path,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    /// Answers from a fixed table, optionally after a delay.
    #[derive(Debug, Default)]
    struct ScriptedProvider {
        answers: HashMap<String, (Duration, Result<Value, ProviderError>)>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn answer(mut self, city: &str, result: Result<Value, ProviderError>) -> Self {
            self.answers.insert(city.to_lowercase(), (Duration::ZERO, result));
            self
        }

        fn delayed(
            mut self,
            city: &str,
            delay: Duration,
            result: Result<Value, ProviderError>,
        ) -> Self {
            self.answers.insert(city.to_lowercase(), (delay, result));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedProvider {
        async fn lookup(&self, city: &str) -> Result<Value, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.get(&city.to_lowercase()) {
                Some((delay, result)) => {
                    tokio::time::sleep(*delay).await;
                    result.clone()
                }
                None => Err(ProviderError::NotFound("city not found".into())),
            }
        }
    }

    fn payload(name: &str, temp: f64, description: &str) -> Value {
        json!({
            "name": name,
            "sys": { "country": "XX" },
            "main": { "temp": temp, "feels_like": temp, "humidity": 40, "pressure": 1015 },
            "wind": { "speed": 2.0 },
            "clouds": { "all": 10 },
            "weather": [{ "description": description, "icon": "01d" }]
        })
    }

    fn orchestrator(dir: &Path, provider: Arc<ScriptedProvider>) -> QueryOrchestrator {
        QueryOrchestrator::new(
            Box::new(provider),
            HistoryStore::load(dir.join("search_history.json")),
            PreferenceStore::load(dir.join("user_preferences.json")),
        )
    }

    #[tokio::test]
    async fn successful_search_publishes_display_model() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::default().answer(
            "london",
            Ok(payload("London", 36.0, "thunderstorm with heavy rain")),
        ));
        let orch = orchestrator(dir.path(), provider.clone());
        let rx = orch.subscribe();

        let model = orch.search("  london ").await.unwrap();

        assert_eq!(model.snapshot.city, "London");
        assert_eq!(model.snapshot.condition_description, "Thunderstorm With Heavy Rain");
        assert_eq!(model.theme.kind, ThemeKind::Storm);
        assert_eq!(model.alerts[0].title, "Extreme Heat Warning");
        assert_eq!(model.alerts[1].title, "Thunderstorm Alert");
        assert_eq!(model.alerts[1].level, AlertLevel::Danger);
        assert_eq!(model.unit, TemperatureUnit::Celsius);

        let state = rx.borrow().clone();
        assert_eq!(state.phase, QueryPhase::Done);
        assert_eq!(state.display, Some(model));
        assert_eq!(state.error, None);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn history_records_provider_confirmed_name() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default()
                .answer("sao paulo", Ok(payload("São Paulo", 22.0, "few clouds"))),
        );
        let orch = orchestrator(dir.path(), provider);
        let history_rx = orch.subscribe_history();

        orch.search("sao paulo").await.unwrap();

        let history = orch.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].city, "São Paulo");
        assert_eq!(*history_rx.borrow(), history);

        let on_disk = HistoryStore::load(dir.path().join("search_history.json"));
        assert_eq!(on_disk.entries(), history.as_slice());
    }

    #[tokio::test]
    async fn missing_name_falls_back_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::default().answer("atlantis", Ok(json!({}))));
        let orch = orchestrator(dir.path(), provider);

        let model = orch.search("Atlantis").await.unwrap();
        assert_eq!(model.snapshot.city, "");
        assert_eq!(orch.history()[0].city, "Atlantis");
    }

    #[tokio::test]
    async fn blank_input_never_reaches_provider() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::default());
        let orch = orchestrator(dir.path(), provider.clone());

        for input in ["", "   ", "\t\n"] {
            assert_eq!(orch.search(input).await, Err(QueryError::Validation));
        }

        assert_eq!(provider.calls(), 0);
        let state = orch.state();
        assert_eq!(state.phase, QueryPhase::Idle);
        assert_eq!(state.error.as_deref(), Some("Please enter a city name"));
        assert!(orch.history().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default()
                .answer("oslo", Ok(payload("Oslo", 3.0, "light snow")))
                .answer("down", Err(ProviderError::Transport("service unavailable".into()))),
        );
        let orch = orchestrator(dir.path(), provider);

        let first = orch.search("Oslo").await.unwrap();

        let err = orch.search("Nowhere").await.unwrap_err();
        assert_eq!(err, QueryError::ProviderNotFound("city not found".into()));
        assert_eq!(orch.state().error.as_deref(), Some("city not found"));

        let err = orch.search("down").await.unwrap_err();
        assert_eq!(err.user_message(), "service unavailable");

        let state = orch.state();
        assert_eq!(state.phase, QueryPhase::Idle);
        assert_eq!(state.error.as_deref(), Some("service unavailable"));
        assert_eq!(state.display, Some(first));
        assert_eq!(orch.history().len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default().answer("weird", Ok(json!(["not", "a", "record"]))),
        );
        let orch = orchestrator(dir.path(), provider);

        let err = orch.search("weird").await.unwrap_err();
        assert!(matches!(err, QueryError::MalformedPayload(_)));
        assert!(orch.history().is_empty());
        assert_eq!(orch.state().phase, QueryPhase::Idle);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::default().delayed(
            "slow",
            Duration::from_millis(500),
            Ok(payload("Slow", 10.0, "clear sky")),
        ));
        let orch = orchestrator(dir.path(), provider).with_timeout(Duration::from_millis(20));

        let err = orch.search("slow").await.unwrap_err();
        assert_eq!(err, QueryError::ProviderTransport("Request timed out after 20ms".into()));
    }

    #[tokio::test]
    async fn stale_response_does_not_overwrite_newer_one() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default()
                .delayed("paris", Duration::from_millis(100), Ok(payload("Paris", 18.0, "mist")))
                .answer("rome", Ok(payload("Rome", 27.0, "clear sky"))),
        );
        let orch = orchestrator(dir.path(), provider.clone());

        let (paris, rome) = tokio::join!(orch.search("Paris"), orch.search("Rome"));

        assert_eq!(paris, Err(QueryError::Superseded("Paris".into())));
        assert_eq!(rome.unwrap().snapshot.city, "Rome");
        assert_eq!(provider.calls(), 2);

        let state = orch.state();
        assert_eq!(state.phase, QueryPhase::Done);
        assert_eq!(state.display.map(|d| d.snapshot.city), Some("Rome".to_string()));
        let cities: Vec<String> = orch.history().into_iter().map(|e| e.city).collect();
        assert_eq!(cities, vec!["Rome"]);
    }

    #[tokio::test]
    async fn fahrenheit_preference_converts_display() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = dir.path().join("user_preferences.json");
        std::fs::write(prefs, r#"{"use_celsius": false}"#).unwrap();
        let provider = Arc::new(
            ScriptedProvider::default().answer("reykjavik", Ok(payload("Reykjavik", 0.0, "snow"))),
        );
        let orch = orchestrator(dir.path(), provider);

        let model = orch.search("Reykjavik").await.unwrap();
        assert_eq!(model.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(model.temperature_text(), "32.0°F");
        assert_eq!(model.snapshot.temperature_c, 0.0);
    }

    #[tokio::test]
    async fn toggle_rerenders_last_snapshot_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default().answer("lima", Ok(payload("Lima", 0.0, "overcast clouds"))),
        );
        let orch = orchestrator(dir.path(), provider.clone());

        orch.search("Lima").await.unwrap();
        let model = orch.toggle_unit().expect("a snapshot exists");

        assert_eq!(model.temperature_text(), "32.0°F");
        assert_eq!(orch.current_display(), Some(model));
        assert_eq!(provider.calls(), 1);

        let prefs = PreferenceStore::load(dir.path().join("user_preferences.json"));
        assert!(!prefs.get().use_celsius);
    }

    #[tokio::test]
    async fn toggle_without_snapshot_only_updates_preference() {
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(ScriptedProvider::default()));
        let mut rx = orch.subscribe();

        assert_eq!(orch.toggle_unit(), None);

        assert_eq!(orch.unit(), TemperatureUnit::Fahrenheit);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().clone(), SessionState::default());

        let prefs = PreferenceStore::load(dir.path().join("user_preferences.json"));
        assert!(!prefs.get().use_celsius);
    }

    #[tokio::test]
    async fn search_from_history_reuses_stored_city() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default()
                .answer("berlin", Ok(payload("Berlin", 12.0, "light rain")))
                .answer("madrid", Ok(payload("Madrid", 31.0, "clear sky"))),
        );
        let orch = orchestrator(dir.path(), provider.clone());

        orch.search("berlin").await.unwrap();
        orch.search("madrid").await.unwrap();

        let model = orch.search_from_history(1).await.unwrap();
        assert_eq!(model.snapshot.city, "Berlin");
        let cities: Vec<String> = orch.history().into_iter().map(|e| e.city).collect();
        assert_eq!(cities, vec!["Berlin", "Madrid"]);

        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn out_of_range_history_index_leaves_session_alone() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            Arc::new(ScriptedProvider::default().answer("oslo", Ok(payload("Oslo", 4.0, "mist"))));
        let orch = orchestrator(dir.path(), provider.clone());

        let oslo = orch.search("oslo").await.unwrap();
        let before = orch.state();

        let err = orch.search_from_history(5).await.unwrap_err();
        assert_eq!(err, QueryError::NoSuchHistoryEntry(6));
        assert_eq!(err.user_message(), "There is no search #6 in the history");

        let state = orch.state();
        assert_eq!(state, before);
        assert_eq!(state.phase, QueryPhase::Done);
        assert_eq!(state.error, None);
        assert_eq!(state.display, Some(oslo));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn search_uses_unit_chosen_while_in_flight() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(ScriptedProvider::default().delayed(
            "cairo",
            Duration::from_millis(50),
            Ok(payload("Cairo", 100.0, "clear sky")),
        ));
        let orch = orchestrator(dir.path(), provider);

        let (model, ()) = tokio::join!(orch.search("cairo"), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert_eq!(orch.set_unit(TemperatureUnit::Fahrenheit), None);
        });

        let model = model.unwrap();
        assert_eq!(model.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(model.temperature_text(), "212.0°F");
        assert_eq!(orch.current_display(), Some(model));
    }

    #[tokio::test]
    async fn history_is_announced_after_the_display() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            Arc::new(ScriptedProvider::default().answer("nuuk", Ok(payload("Nuuk", -8.0, "snow"))));
        let orch = orchestrator(dir.path(), provider);
        let mut history_rx = orch.subscribe_history();

        let (model, state) = tokio::join!(orch.search("nuuk"), async {
            history_rx.changed().await.unwrap();
            orch.state()
        });

        assert_eq!(state.phase, QueryPhase::Done);
        assert_eq!(state.display, Some(model.unwrap()));
        assert_eq!(history_rx.borrow()[0].city, "Nuuk");
    }

    #[tokio::test]
    async fn remove_and_clear_history_notify_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Arc::new(
            ScriptedProvider::default()
                .answer("kyiv", Ok(payload("Kyiv", 8.0, "clear sky")))
                .answer("accra", Ok(payload("Accra", 29.0, "clear sky"))),
        );
        let orch = orchestrator(dir.path(), provider);
        let rx = orch.subscribe_history();

        orch.search("kyiv").await.unwrap();
        orch.search("accra").await.unwrap();

        assert!(orch.remove_history("KYIV"));
        assert!(!orch.remove_history("Kyiv"));
        assert_eq!(rx.borrow().len(), 1);

        orch.clear_history();
        assert!(rx.borrow().is_empty());
        assert!(HistoryStore::load(dir.path().join("search_history.json")).is_empty());
    }

    #[tokio::test]
    async fn unwritable_history_does_not_interrupt_search() {
        let dir = tempfile::tempdir().unwrap();
        let provider =
            Arc::new(ScriptedProvider::default().answer("doha", Ok(payload("Doha", 41.0, "haze"))));
        // history path is a directory: every write fails
        let orch = QueryOrchestrator::new(
            Box::new(provider),
            HistoryStore::load(dir.path()),
            PreferenceStore::load(dir.path().join("user_preferences.json")),
        );

        let model = orch.search("doha").await.unwrap();
        assert_eq!(model.theme.kind, ThemeKind::Fog);
        assert_eq!(orch.history()[0].city, "Doha");
    }
}
