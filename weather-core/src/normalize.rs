use serde::Deserialize;
use serde_json::Value;

use crate::{error::QueryError, model::WeatherSnapshot};

// Every field is optional: sparse payloads normalize to zeroes and empty strings.

#[derive(Debug, Default, Deserialize)]
struct OwPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sys: Option<OwSys>,
    #[serde(default)]
    main: Option<OwMain>,
    #[serde(default)]
    wind: Option<OwWind>,
    #[serde(default)]
    clouds: Option<OwClouds>,
    #[serde(default)]
    weather: Option<Vec<OwCondition>>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    #[serde(default)]
    temp: Option<f64>,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    #[serde(default)]
    all: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwCondition {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    icon: Option<String>,
}

/// Map a raw provider payload onto a [`WeatherSnapshot`].
///
/// Missing fields default to `0` / `""`. A payload that is not a JSON object,
/// or whose fields carry the wrong JSON type, is rejected as malformed.
pub fn normalize(raw: &Value) -> Result<WeatherSnapshot, QueryError> {
    if !raw.is_object() {
        return Err(QueryError::MalformedPayload(format!(
            "expected a JSON object, got {}",
            json_kind(raw)
        )));
    }

    let payload = OwPayload::deserialize(raw)
        .map_err(|e| QueryError::MalformedPayload(e.to_string()))?;

    let main = payload.main.unwrap_or_default();
    let condition = payload
        .weather
        .and_then(|list| list.into_iter().next())
        .unwrap_or_default();

    Ok(WeatherSnapshot {
        city: payload.name.unwrap_or_default(),
        country: payload.sys.and_then(|s| s.country).unwrap_or_default(),
        temperature_c: main.temp.unwrap_or_default(),
        feels_like_c: main.feels_like.unwrap_or_default(),
        humidity_pct: percentage(main.humidity),
        wind_speed_mps: payload
            .wind
            .and_then(|w| w.speed)
            .unwrap_or_default()
            .max(0.0),
        pressure_hpa: main.pressure.map_or(0, |p| p.round() as i32),
        cloudiness_pct: percentage(payload.clouds.and_then(|c| c.all)),
        condition_description: title_case(&condition.description.unwrap_or_default()),
        condition_icon_code: condition.icon.unwrap_or_default(),
    })
}

fn percentage(value: Option<f64>) -> u8 {
    value.map_or(0, |v| v.round().clamp(0.0, 100.0) as u8)
}

/// Capitalize the first letter of every word, lower-case the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;

    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }

    out
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
