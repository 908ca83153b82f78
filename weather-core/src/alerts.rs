//! Hazard alerts derived from a [`WeatherSnapshot`].
//!
//! Rules live in an ordered table of categories. Inside a category the first
//! matching tier wins; every category contributes at most one alert and the
//! output keeps category order.

use serde::{Deserialize, Serialize};

use crate::model::WeatherSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Danger,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "info",
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub icon: String,
    pub title: String,
    pub message: String,
    pub recommendation: String,
}

/// Condition a tier fires on.
#[derive(Debug, Clone, Copy)]
enum Trigger {
    TemperatureAtLeast(f64),
    TemperatureAtMost(f64),
    WindAtLeast(f64),
    HumidityAtLeast(u8),
    /// Any of the keywords appears in the lower-cased description.
    Keyword(&'static [&'static str]),
}

impl Trigger {
    fn fires(&self, snapshot: &WeatherSnapshot, condition: &str) -> bool {
        match *self {
            Trigger::TemperatureAtLeast(t) => snapshot.temperature_c >= t,
            Trigger::TemperatureAtMost(t) => snapshot.temperature_c <= t,
            Trigger::WindAtLeast(s) => snapshot.wind_speed_mps >= s,
            Trigger::HumidityAtLeast(h) => snapshot.humidity_pct >= h,
            Trigger::Keyword(words) => words.iter().any(|w| condition.contains(w)),
        }
    }
}

struct Tier {
    trigger: Trigger,
    level: AlertLevel,
    icon: &'static str,
    title: &'static str,
    /// May contain `{wind}` or `{humidity}`.
    message: &'static str,
    recommendation: &'static str,
}

impl Tier {
    fn build(&self, snapshot: &WeatherSnapshot) -> Alert {
        let message = self
            .message
            .replace("{wind}", &format_speed(snapshot.wind_speed_mps))
            .replace("{humidity}", &snapshot.humidity_pct.to_string());

        Alert {
            level: self.level,
            icon: self.icon.to_string(),
            title: self.title.to_string(),
            message,
            recommendation: self.recommendation.to_string(),
        }
    }
}

struct Category {
    name: &'static str,
    tiers: &'static [Tier],
}

const CATEGORIES: &[Category] = &[
    Category {
        name: "temperature",
        tiers: &[
            Tier {
                trigger: Trigger::TemperatureAtLeast(35.0),
                level: AlertLevel::Danger,
                icon: "🔥",
                title: "Extreme Heat Warning",
                message: "Very high temperature! Stay hydrated and avoid prolonged sun exposure.",
                recommendation: "Wear sunscreen, drink plenty of water, and stay in shade.",
            },
            Tier {
                trigger: Trigger::TemperatureAtLeast(30.0),
                level: AlertLevel::Warning,
                icon: "☀️",
                title: "High Temperature",
                message: "It's quite hot outside.",
                recommendation: "Wear light clothing and apply sunscreen.",
            },
            Tier {
                trigger: Trigger::TemperatureAtMost(0.0),
                level: AlertLevel::Danger,
                icon: "🥶",
                title: "Freezing Temperature",
                message: "Temperature below freezing!",
                recommendation: "Dress in layers, wear warm clothing and watch for ice.",
            },
            Tier {
                trigger: Trigger::TemperatureAtMost(5.0),
                level: AlertLevel::Warning,
                icon: "❄️",
                title: "Cold Weather",
                message: "It's quite cold outside.",
                recommendation: "Wear warm clothes and a jacket.",
            },
        ],
    },
    Category {
        name: "condition",
        tiers: &[
            Tier {
                trigger: Trigger::Keyword(&["thunder", "storm"]),
                level: AlertLevel::Danger,
                icon: "⚡",
                title: "Thunderstorm Alert",
                message: "Thunderstorm in the area!",
                recommendation: "Stay indoors and avoid open areas. Unplug electronics.",
            },
            Tier {
                trigger: Trigger::Keyword(&["rain", "drizzle"]),
                level: AlertLevel::Info,
                icon: "☔",
                title: "Rain Expected",
                message: "Rainy conditions.",
                recommendation: "Bring an umbrella and wear waterproof clothing.",
            },
            Tier {
                trigger: Trigger::Keyword(&["snow"]),
                level: AlertLevel::Warning,
                icon: "🌨️",
                title: "Snow Alert",
                message: "Snowy conditions expected.",
                recommendation: "Drive carefully and dress warmly. Watch for slippery roads.",
            },
        ],
    },
    Category {
        name: "wind",
        tiers: &[Tier {
            trigger: Trigger::WindAtLeast(15.0),
            level: AlertLevel::Warning,
            icon: "💨",
            title: "High Wind Warning",
            message: "Strong winds at {wind} m/s!",
            recommendation: "Secure loose objects and be cautious outdoors.",
        }],
    },
    Category {
        name: "humidity",
        tiers: &[Tier {
            trigger: Trigger::HumidityAtLeast(80),
            level: AlertLevel::Info,
            icon: "💧",
            title: "High Humidity",
            message: "Humidity at {humidity}%.",
            recommendation: "It may feel warmer than actual temperature. Stay hydrated.",
        }],
    },
    Category {
        name: "visibility",
        tiers: &[Tier {
            trigger: Trigger::Keyword(&["fog", "mist"]),
            level: AlertLevel::Warning,
            icon: "🌫️",
            title: "Low Visibility",
            message: "Foggy conditions reduce visibility.",
            recommendation: "Drive slowly and use fog lights if driving.",
        }],
    },
];

/// Evaluate every category against `snapshot`.
///
/// Pure and total: an empty result is normal for mild weather.
pub fn evaluate(snapshot: &WeatherSnapshot) -> Vec<Alert> {
    let condition = snapshot.condition_key();

    CATEGORIES
        .iter()
        .filter_map(|category| {
            let tier = category
                .tiers
                .iter()
                .find(|tier| tier.trigger.fires(snapshot, &condition))?;
            tracing::trace!(category = category.name, title = tier.title, "alert rule matched");
            Some(tier.build(snapshot))
        })
        .collect()
}

/// Whole speeds keep one decimal (`15.0`), others print as measured.
fn format_speed(speed: f64) -> String {
    if speed.fract() == 0.0 {
        format!("{speed:.1}")
    } else {
        format!("{speed}")
    }
}
