use serde::{Deserialize, Serialize};

/// A single geographic fix, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    /// Returns `None` when either coordinate is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);

        (lat_ok && lon_ok).then_some(Self { latitude, longitude })
    }
}

impl std::fmt::Display for GeoPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Current conditions for one place, normalized from the backend payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city_name: String,
    pub current_temp: f64,
    pub min_temp: f64,
    pub max_temp: f64,
    /// Metres per second.
    pub wind_speed: f64,
    /// Degrees, `[0, 360)`.
    pub wind_direction: u16,
    /// Percent, `[0, 100]`.
    pub humidity: u8,
    pub weather_icon: String,
    pub weather_description: String,
}

/// What the presentation layer renders. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq)]
pub enum UiState {
    Loading,
    Success(WeatherSnapshot),
    Error(String),
}

impl UiState {
    pub fn is_loading(&self) -> bool {
        matches!(self, UiState::Loading)
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            UiState::Success(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UiState::Error(message) => Some(message),
            _ => None,
        }
    }
}
