use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    cities::normalize_city_name,
    error::LookupFailure,
    model::{GeoPosition, WeatherSnapshot},
};

use super::WeatherLookup;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherLookup {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherLookup {
    pub fn new(api_key: String, base_url: &str) -> Result<Self, LookupFailure> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupFailure::Transport(e.without_url()))?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn fetch_current(
        &self,
        query: &[(&str, String)],
    ) -> Result<WeatherSnapshot, LookupFailure> {
        let url = format!("{}/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("units", "metric"), ("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| LookupFailure::Transport(e.without_url()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| LookupFailure::Transport(e.without_url()))?;

        if !status.is_success() {
            warn!(%status, "OpenWeather current request failed");
            return Err(LookupFailure::Status {
                status,
                body: truncate_body(&body),
            });
        }

        parse_current(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    icon: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    main: OwMain,
    wind: OwWind,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

fn parse_current(body: &str) -> Result<WeatherSnapshot, LookupFailure> {
    let parsed: OwCurrentResponse = serde_json::from_str(body).map_err(LookupFailure::Decode)?;

    let (weather_icon, weather_description) = parsed
        .weather
        .into_iter()
        .next()
        .map(|w| (w.icon, w.description))
        .unwrap_or_default();

    Ok(WeatherSnapshot {
        city_name: parsed.name,
        current_temp: parsed.main.temp,
        min_temp: parsed.main.temp_min,
        max_temp: parsed.main.temp_max,
        wind_speed: parsed.wind.speed,
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
        wind_direction: (parsed.wind.deg.rem_euclid(360.0) as u16) % 360,
        humidity: parsed.main.humidity.min(100),
        weather_icon,
        weather_description,
    })
}

#[async_trait]
impl WeatherLookup for OpenWeatherLookup {
    async fn by_city(&self, name: &str) -> Result<WeatherSnapshot, LookupFailure> {
        let canonical = normalize_city_name(name);
        debug!(city = name, canonical, "fetching weather by city");

        let mut snapshot = self.fetch_current(&[("q", canonical.to_string())]).await?;
        if snapshot.city_name.is_empty() {
            snapshot.city_name = canonical.to_string();
        }

        Ok(snapshot)
    }

    async fn by_position(&self, position: GeoPosition) -> Result<WeatherSnapshot, LookupFailure> {
        debug!(%position, "fetching weather by position");

        let mut snapshot = self
            .fetch_current(&[
                ("lat", position.latitude.to_string()),
                ("lon", position.longitude.to_string()),
            ])
            .await?;
        // Open water and remote areas come back unnamed.
        if snapshot.city_name.is_empty() {
            snapshot.city_name = position.to_string();
        }

        Ok(snapshot)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
