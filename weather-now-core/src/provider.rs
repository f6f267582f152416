use crate::{
    Config, GeoPosition, WeatherSnapshot, error::LookupFailure,
    provider::openweather::OpenWeatherLookup,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Request/response access to current weather. One outbound request per call,
/// no retry, no caching.
#[async_trait]
pub trait WeatherLookup: Send + Sync + Debug {
    async fn by_city(&self, name: &str) -> Result<WeatherSnapshot, LookupFailure>;

    async fn by_position(&self, position: GeoPosition) -> Result<WeatherSnapshot, LookupFailure>;
}

/// Construct the OpenWeather lookup from config.
pub fn lookup_from_config(config: &Config) -> anyhow::Result<Arc<dyn WeatherLookup>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for the weather backend.\n\
                 Hint: run `weather-now configure` or set WEATHER_NOW_API_KEY."
        )
    })?;

    let lookup = OpenWeatherLookup::new(api_key, config.base_url())?;
    Ok(Arc::new(lookup))
}
