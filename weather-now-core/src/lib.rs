//! Core library for `weather-now`.
//!
//! This crate defines:
//! - Location acquisition (cached fix first, then one cancellable fresh fix)
//! - Weather lookup by city name or position
//! - The controller that turns both into a single observable UI state,
//!   with fallback to a default city when the location path fails
//! - Configuration & credentials handling
//!
//! It is used by `weather-now-cli`, but any presentation layer can drive a
//! [`WeatherController`] and subscribe to its [`ObservableState`].

pub mod cities;
pub mod config;
pub mod controller;
pub mod error;
pub mod location;
pub mod model;
pub mod provider;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use cities::{CityRegistry, normalize_city_name};
pub use config::{Config, LocationConfig};
pub use controller::WeatherController;
pub use error::{LocationFailure, LookupFailure, ProviderFault};
pub use location::{LocationAcquirer, LocationFacts, LocationProvider, ip::IpLocationProvider};
pub use model::{GeoPosition, UiState, WeatherSnapshot};
pub use provider::{WeatherLookup, openweather::OpenWeatherLookup};
pub use state::{ObservableState, StateSubscription};
