//! Plain-text rendering of display models and the history list.

use std::fmt;

use weather_core::{Alert, DisplayModel, SearchHistoryEntry};

pub fn display(model: &DisplayModel) -> String {
    Card(model).to_string()
}

/// Numbered list, newest first; indices are 1-based.
pub fn history(entries: &[SearchHistoryEntry]) -> String {
    if entries.is_empty() {
        return "No recent searches.".to_string();
    }
    HistoryList(entries).to_string()
}

pub fn error(message: &str) -> String {
    format!("❌ {message}")
}

struct Card<'a>(&'a DisplayModel);

impl fmt::Display for Card<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.0;
        let s = &model.snapshot;

        for alert in &model.alerts {
            write_banner(f, alert)?;
        }

        writeln!(f, "{}", model.theme.emoji)?;
        writeln!(f, "{}", model.location_line())?;
        if !s.condition_description.is_empty() {
            writeln!(f, "{}", s.condition_description)?;
        }
        writeln!(f, "{}", model.temperature_text())?;
        writeln!(f, "Feels like {}", model.feels_like_text())?;
        writeln!(f, "{}", "─".repeat(32))?;
        writeln!(
            f,
            "Humidity: {}%    Wind Speed: {} m/s",
            s.humidity_pct, s.wind_speed_mps
        )?;
        write!(
            f,
            "Pressure: {} hPa    Cloudiness: {}%",
            s.pressure_hpa, s.cloudiness_pct
        )
    }
}

fn write_banner(f: &mut fmt::Formatter<'_>, alert: &Alert) -> fmt::Result {
    writeln!(
        f,
        "{} {} [{}]",
        alert.icon,
        alert.title,
        alert.level.as_str().to_uppercase()
    )?;
    writeln!(f, "   {}", alert.message)?;
    writeln!(f, "   💡 {}", alert.recommendation)?;
    writeln!(f)
}

struct HistoryList<'a>(&'a [SearchHistoryEntry]);

impl fmt::Display for HistoryList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Recent Searches")?;
        for (i, entry) in self.0.iter().enumerate() {
            let time = entry.display_time();
            if time.is_empty() {
                write!(f, "\n{:>2}. {}", i + 1, entry.city)?;
            } else {
                write!(f, "\n{:>2}. {:<24} {}", i + 1, entry.city, time)?;
            }
        }
        Ok(())
    }
}
