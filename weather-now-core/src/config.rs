use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    cities::{CityRegistry, DEFAULT_CITIES, DEFAULT_CITY},
    location::{
        LocationFacts,
        ip::{DEFAULT_IP_LOOKUP_URL, IpLocationProvider},
    },
    model::GeoPosition,
    provider::openweather::DEFAULT_BASE_URL,
};

/// Environment variable that overrides `api_key` from the config file.
pub const API_KEY_ENV: &str = "WEATHER_NOW_API_KEY";

/// Location settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Whether the user allows location use at all.
    pub permission_granted: bool,

    /// IP geolocation endpoint used for fresh fixes; unset disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_lookup_url: Option<String>,

    /// Optional seed for the "last known" position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            permission_granted: true,
            ip_lookup_url: Some(DEFAULT_IP_LOOKUP_URL.to_string()),
            latitude: None,
            longitude: None,
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// default_city = "Montevideo"
/// cities = ["Montevideo", "Londres"]
///
/// [location]
/// permission_granted = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    pub default_city: String,

    pub cities: Vec<String>,

    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            default_city: DEFAULT_CITY.to_string(),
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            location: LocationConfig::default(),
        }
    }
}

impl Config {
    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn city_registry(&self) -> Result<CityRegistry> {
        CityRegistry::new(self.cities.clone(), &self.default_city)
    }

    /// Configured seed position, if both coordinates are present and valid.
    pub fn location_seed(&self) -> Option<GeoPosition> {
        match (self.location.latitude, self.location.longitude) {
            (Some(lat), Some(lon)) => GeoPosition::new(lat, lon),
            _ => None,
        }
    }

    /// At least one location source is configured.
    pub fn service_enabled(&self) -> bool {
        self.location.ip_lookup_url.is_some() || self.location_seed().is_some()
    }

    pub fn location_facts(&self) -> LocationFacts {
        LocationFacts {
            permission_granted: self.location.permission_granted,
            service_enabled: self.service_enabled(),
        }
    }

    pub fn location_provider(&self) -> Result<IpLocationProvider> {
        IpLocationProvider::new(self.location.ip_lookup_url.clone(), self.location_seed())
            .context("Failed to build the location provider")
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-now", "weather-now")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
