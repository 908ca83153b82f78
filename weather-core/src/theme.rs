//! Visual theme picked from the condition description.
//!
//! Independent from [`crate::alerts`]: it only parameterizes presentation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeKind {
    Sunny,
    LightCloud,
    Overcast,
    Rain,
    Storm,
    Snow,
    Fog,
    Rainbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThemeProfile {
    pub kind: ThemeKind,
    pub background_color_id: &'static str,
    pub card_color_id: &'static str,
    pub emoji: &'static str,
    pub accent_color_id: &'static str,
}

impl ThemeKind {
    pub fn profile(self) -> ThemeProfile {
        let (background_color_id, card_color_id, emoji, accent_color_id) = match self {
            ThemeKind::Sunny => ("amber_100", "amber_50", "☀️", "orange_700"),
            ThemeKind::LightCloud => ("blue_grey_100", "blue_grey_50", "🌤️", "blue_grey_700"),
            ThemeKind::Overcast => ("grey_300", "grey_100", "☁️", "grey_700"),
            ThemeKind::Rain => ("blue_200", "blue_50", "🌧️", "blue_800"),
            ThemeKind::Storm => ("indigo_300", "indigo_50", "⛈️", "indigo_900"),
            ThemeKind::Snow => ("cyan_100", "cyan_50", "❄️", "cyan_700"),
            ThemeKind::Fog => ("blue_grey_200", "blue_grey_50", "🌫️", "blue_grey_600"),
            ThemeKind::Rainbow => ("blue_100", "blue_50", "🌈", "blue_700"),
        };

        ThemeProfile {
            kind: self,
            background_color_id,
            card_color_id,
            emoji,
            accent_color_id,
        }
    }
}

/// `all` keywords must appear, plus at least one of `any` (if non-empty).
struct Rule {
    all: &'static [&'static str],
    any: &'static [&'static str],
    kind: ThemeKind,
}

impl Rule {
    fn matches(&self, description: &str) -> bool {
        self.all.iter().all(|w| description.contains(w))
            && (self.any.is_empty() || self.any.iter().any(|w| description.contains(w)))
    }
}

// Storm sits ahead of rain so "thunderstorm with heavy rain" is a storm.
const RULES: &[Rule] = &[
    Rule {
        all: &[],
        any: &["clear", "sun"],
        kind: ThemeKind::Sunny,
    },
    Rule {
        all: &["cloud", "few"],
        any: &[],
        kind: ThemeKind::LightCloud,
    },
    Rule {
        all: &["cloud"],
        any: &[],
        kind: ThemeKind::Overcast,
    },
    Rule {
        all: &[],
        any: &["thunder", "storm"],
        kind: ThemeKind::Storm,
    },
    Rule {
        all: &[],
        any: &["rain", "drizzle"],
        kind: ThemeKind::Rain,
    },
    Rule {
        all: &[],
        any: &["snow"],
        kind: ThemeKind::Snow,
    },
    Rule {
        all: &[],
        any: &["mist", "fog", "haze"],
        kind: ThemeKind::Fog,
    },
];

/// First matching rule wins; anything unrecognised gets the rainbow theme.
pub fn select(description: &str) -> ThemeProfile {
    let description = description.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.matches(&description))
        .map_or(ThemeKind::Rainbow, |rule| rule.kind)
        .profile()
}
