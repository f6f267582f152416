use anyhow::{Result, anyhow};

/// Cities offered in the selector of the reference deployment.
pub const DEFAULT_CITIES: &[&str] =
    &["Montevideo", "Londres", "San Pablo", "Buenos Aires", "Munich"];

/// Fallback city used after any failure on the location path.
pub const DEFAULT_CITY: &str = "Montevideo";

/// Display name → name the weather backend understands.
const CANONICAL_NAMES: &[(&str, &str)] = &[
    ("Londres", "London"),
    ("San Pablo", "Sao Paulo"),
    ("Munich", "Munich"),
];

/// Map a locale-specific city name to the backend's canonical spelling.
/// Unknown names pass through unchanged.
pub fn normalize_city_name(name: &str) -> &str {
    CANONICAL_NAMES
        .iter()
        .find(|(local, _)| *local == name)
        .map_or(name, |(_, canonical)| *canonical)
}

/// Ordered, read-only list of selectable cities with one designated default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityRegistry {
    cities: Vec<String>,
    default_index: usize,
}

impl CityRegistry {
    pub fn new(cities: Vec<String>, default_city: &str) -> Result<Self> {
        if cities.is_empty() {
            return Err(anyhow!("City list is empty; configure at least one city."));
        }

        let default_index = cities.iter().position(|c| c == default_city).ok_or_else(|| {
            anyhow!(
                "Default city '{default_city}' is not in the city list.\n\
                 Hint: add it to `cities` or change `default_city` in the config file."
            )
        })?;

        Ok(Self {
            cities,
            default_index,
        })
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    pub fn default_city(&self) -> &str {
        &self.cities[self.default_index]
    }
}

impl Default for CityRegistry {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| c.to_string()).collect(),
            default_index: 0,
        }
    }
}
