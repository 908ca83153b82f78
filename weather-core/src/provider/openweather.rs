use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::error::ProviderError;

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_key,
            base_url,
            http,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn lookup(&self, city: &str) -> Result<Value, ProviderError> {
        tracing::debug!(city, url = %self.base_url, "requesting current weather");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(transport_message(&e)))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to read response: {e}")))?;

        tracing::debug!(status = %status, "received provider response");

        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(
                provider_message(&body).unwrap_or_else(|| format!("City '{city}' not found")),
            ));
        }

        if !status.is_success() {
            return Err(ProviderError::Transport(
                provider_message(&body)
                    .unwrap_or_else(|| format!("HTTP {}: {}", status, truncate_body(&body))),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidBody(format!("Failed to parse weather JSON: {e}")))
    }
}

/// OpenWeather error bodies look like `{"cod":"404","message":"city not found"}`.
fn provider_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timed out".to_string()
    } else if err.is_connect() {
        format!("Could not connect to weather service: {err}")
    } else {
        format!("Request failed: {err}")
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
