use crate::{Config, error::ProviderError, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Boundary to the remote weather data provider.
///
/// Implementations return the provider's raw JSON; shaping it into a
/// [`WeatherSnapshot`](crate::WeatherSnapshot) is the normalizer's job.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn lookup(&self, city: &str) -> Result<Value, ProviderError>;
}

#[async_trait]
impl<P: WeatherProvider + ?Sized> WeatherProvider for Arc<P> {
    async fn lookup(&self, city: &str) -> Result<Value, ProviderError> {
        (**self).lookup(city).await
    }
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured.\n\
                 Hint: run `weather configure` and enter your OpenWeather API key."
        )
    })?;

    let provider = OpenWeatherProvider::new(
        api_key,
        config.base_url().to_string(),
        config.request_timeout(),
    )?;

    Ok(Box::new(provider))
}
