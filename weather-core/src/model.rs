use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{alerts::Alert, theme::ThemeProfile};

/// Canonical weather reading for one city, produced by the normalizer.
///
/// Temperatures are always stored in Celsius; conversion happens only when a
/// [`DisplayModel`] is rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub pressure_hpa: i32,
    pub cloudiness_pct: u8,
    /// Title-cased for display, e.g. "Light Rain".
    pub condition_description: String,
    pub condition_icon_code: String,
}

impl WeatherSnapshot {
    /// Lower-cased description used for keyword matching.
    pub fn condition_key(&self) -> String {
        self.condition_description.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn from_celsius_flag(use_celsius: bool) -> Self {
        if use_celsius {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        }
    }

    pub fn is_celsius(self) -> bool {
        self == TemperatureUnit::Celsius
    }

    pub fn toggled(self) -> Self {
        Self::from_celsius_flag(!self.is_celsius())
    }

    pub fn symbol(self) -> &'static str {
        match self {
            TemperatureUnit::Celsius => "°C",
            TemperatureUnit::Fahrenheit => "°F",
        }
    }

    /// Convert a Celsius reading into this unit.
    pub fn convert(self, celsius: f64) -> f64 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    /// e.g. `"32.0°F"`.
    pub fn format(self, celsius: f64) -> String {
        format!("{:.1}{}", self.convert(celsius), self.symbol())
    }
}

impl std::fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemperatureUnit::Celsius => f.write_str("celsius"),
            TemperatureUnit::Fahrenheit => f.write_str("fahrenheit"),
        }
    }
}

/// One row of the recent-searches list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    #[serde(default)]
    pub city: String,
    /// ISO-8601 timestamp of the search.
    #[serde(default)]
    pub timestamp: String,
}

impl SearchHistoryEntry {
    pub fn matches_city(&self, city: &str) -> bool {
        self.city.to_lowercase() == city.to_lowercase()
    }

    /// Short human form such as `"Mar 04, 02:30 PM"`, or an empty string when
    /// the stored timestamp cannot be parsed.
    pub fn display_time(&self) -> String {
        let parsed = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.naive_local())
            .or_else(|_| NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f"));

        match parsed {
            Ok(dt) => dt.format("%b %d, %I:%M %p").to_string(),
            Err(_) => String::new(),
        }
    }
}

fn default_use_celsius() -> bool {
    true
}

/// Display preferences persisted between sessions.
///
/// Keys this version does not know about are kept and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default = "default_use_celsius")]
    pub use_celsius: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            use_celsius: default_use_celsius(),
            extra: Map::new(),
        }
    }
}

impl UserPreferences {
    pub fn unit(&self) -> TemperatureUnit {
        TemperatureUnit::from_celsius_flag(self.use_celsius)
    }
}

/// Everything the presentation layer needs to draw one completed query.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayModel {
    pub snapshot: WeatherSnapshot,
    pub alerts: Vec<Alert>,
    pub theme: ThemeProfile,
    pub unit: TemperatureUnit,
}

impl DisplayModel {
    pub fn temperature_text(&self) -> String {
        self.unit.format(self.snapshot.temperature_c)
    }

    pub fn feels_like_text(&self) -> String {
        self.unit.format(self.snapshot.feels_like_c)
    }

    /// `"City, CC"`; an empty city shows as "Unknown".
    pub fn location_line(&self) -> String {
        let city = if self.snapshot.city.is_empty() {
            "Unknown"
        } else {
            self.snapshot.city.as_str()
        };
        format!("{}, {}", city, self.snapshot.country)
    }
}
