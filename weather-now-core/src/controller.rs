//! Orchestrates location acquisition and weather lookups into the published
//! [`UiState`].
//!
//! Every public operation runs as its own task and starts by publishing
//! `Loading`. Overlapping operations are not serialized: whichever resolves
//! last wins, which matches a UI where the latest user intent is the one
//! that matters.
//!
//! Failures on the location path publish an `Error` and then fall back to the
//! default city. The fallback goes through the plain city path, which never
//! touches location, so recovery happens at most once per call.

use std::{any::Any, future::Future, sync::Arc};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::{sync::CancellationToken, task::AbortOnDropHandle};
use tracing::{debug, error, info, warn};

use crate::{
    cities::CityRegistry,
    error::{LocationFailure, LookupFailure},
    location::{LocationAcquirer, LocationFacts},
    model::{UiState, WeatherSnapshot},
    provider::WeatherLookup,
    state::ObservableState,
};

const CITY_UNKNOWN_ERROR: &str = "Unknown error while fetching weather for";
const CITY_UNEXPECTED_ERROR: &str = "Unexpected error while fetching weather";
const LOCATION_ERROR: &str = "Could not get your current location";
const LOCATION_WEATHER_ERROR: &str = "Could not get the weather for your location";
const LOCATION_UNEXPECTED_ERROR: &str = "Unexpected error while getting your location";

#[derive(Debug)]
struct Inner {
    lookup: Arc<dyn WeatherLookup>,
    acquirer: LocationAcquirer,
    registry: CityRegistry,
    state: ObservableState,
    cancel: CancellationToken,
}

/// Cheap to clone; clones drive the same state.
#[derive(Debug, Clone)]
pub struct WeatherController {
    inner: Arc<Inner>,
}

enum LocationPathError {
    Location(LocationFailure),
    Lookup(LookupFailure),
}

enum TaskFault {
    Panicked(String),
    Cancelled,
}

impl From<JoinError> for TaskFault {
    fn from(err: JoinError) -> Self {
        match err.try_into_panic() {
            Ok(payload) => TaskFault::Panicked(panic_message(payload.as_ref())),
            Err(_) => TaskFault::Cancelled,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown fault".to_string())
}

/// Run `work` on its own task so a panic inside it is contained. The task is
/// aborted if the caller is dropped first.
async fn contained<T, F>(work: F) -> Result<T, TaskFault>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    AbortOnDropHandle::new(tokio::spawn(work))
        .await
        .map_err(TaskFault::from)
}

impl WeatherController {
    /// The published state starts as `Loading`.
    pub fn new(
        lookup: Arc<dyn WeatherLookup>,
        acquirer: LocationAcquirer,
        registry: CityRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                lookup,
                acquirer,
                registry,
                state: ObservableState::new(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> &ObservableState {
        &self.inner.state
    }

    pub fn cities(&self) -> &[String] {
        self.inner.registry.cities()
    }

    pub fn default_city(&self) -> &str {
        self.inner.registry.default_city()
    }

    /// Initial load shown when the presentation starts.
    pub fn load_default_city(&self) -> JoinHandle<()> {
        let city = self.default_city().to_string();
        self.select_city(&city)
    }

    /// Show weather for `name`. A failure is final for this call.
    pub fn select_city(&self, name: &str) -> JoinHandle<()> {
        let this = self.clone();
        let name = name.to_string();
        self.spawn(async move { this.fetch_city(&name).await })
    }

    /// Show weather for the device position, falling back to the default
    /// city on any failure.
    pub fn use_current_location(&self, facts: LocationFacts) -> JoinHandle<()> {
        let this = self.clone();
        self.spawn(async move { this.resolve_current_location(facts).await })
    }

    /// The user just granted location permission.
    pub fn on_permission_granted(&self, service_enabled: bool) -> JoinHandle<()> {
        self.use_current_location(LocationFacts::granted(service_enabled))
    }

    /// Cancel every in-flight operation. Cancelled operations publish nothing
    /// further.
    pub fn shutdown(&self) {
        debug!("controller shutting down");
        self.inner.cancel.cancel();
    }

    fn spawn<F>(&self, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.inner.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!("operation cancelled"),
                () = work => {}
            }
        })
    }

    fn publish(&self, state: UiState) {
        self.inner.state.set(state);
    }

    async fn fetch_city(&self, name: &str) {
        self.publish(UiState::Loading);

        let lookup = Arc::clone(&self.inner.lookup);
        let city = name.to_string();
        let outcome = contained(async move { lookup.by_city(&city).await }).await;

        match outcome {
            Ok(Ok(snapshot)) => {
                info!(city = name, "weather loaded");
                self.publish(UiState::Success(snapshot));
            }
            Ok(Err(failure)) => {
                warn!(city = name, error = %failure, "weather lookup failed");
                let message = failure.message();
                let message = if message.trim().is_empty() {
                    format!("{CITY_UNKNOWN_ERROR} {name}")
                } else {
                    message
                };
                self.publish(UiState::Error(message));
            }
            Err(TaskFault::Panicked(fault)) => {
                error!(city = name, %fault, "weather lookup panicked");
                self.publish(UiState::Error(format!("{CITY_UNEXPECTED_ERROR}: {fault}")));
            }
            Err(TaskFault::Cancelled) => debug!(city = name, "weather lookup cancelled"),
        }
    }

    async fn resolve_current_location(&self, facts: LocationFacts) {
        self.publish(UiState::Loading);

        let this = self.clone();
        let outcome = contained(async move { this.locate_and_fetch(facts).await }).await;

        let message = match outcome {
            Ok(Ok(snapshot)) => {
                info!(city = %snapshot.city_name, "weather loaded for current location");
                self.publish(UiState::Success(snapshot));
                return;
            }
            Ok(Err(LocationPathError::Location(failure))) => {
                warn!(error = %failure, "location acquisition failed");
                format!("{LOCATION_ERROR}: {failure}")
            }
            Ok(Err(LocationPathError::Lookup(failure))) => {
                warn!(error = %failure, "weather lookup for current location failed");
                format!("{LOCATION_WEATHER_ERROR}: {}", failure.message())
            }
            Err(TaskFault::Panicked(fault)) => {
                error!(%fault, "current location path panicked");
                format!("{LOCATION_UNEXPECTED_ERROR}: {fault}")
            }
            Err(TaskFault::Cancelled) => {
                debug!("current location path cancelled");
                return;
            }
        };

        self.publish(UiState::Error(message));

        let fallback = self.default_city().to_string();
        info!(city = %fallback, "falling back to default city");
        self.fetch_city(&fallback).await;
    }

    async fn locate_and_fetch(
        &self,
        facts: LocationFacts,
    ) -> Result<WeatherSnapshot, LocationPathError> {
        let position = self
            .inner
            .acquirer
            .acquire(facts)
            .await
            .map_err(LocationPathError::Location)?;
        debug!(%position, "position acquired");

        self.inner
            .lookup
            .by_position(position)
            .await
            .map_err(LocationPathError::Lookup)
    }
}
