//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::{LookupFailure, ProviderFault},
    location::{ListenerId, LocationProvider, LocationSink, UpdateRequest},
    model::{GeoPosition, WeatherSnapshot},
    provider::WeatherLookup,
};

pub fn snapshot(city: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        city_name: city.to_string(),
        current_temp: 20.0,
        min_temp: 15.0,
        max_temp: 24.0,
        wind_speed: 4.0,
        wind_direction: 90,
        humidity: 60,
        weather_icon: "01d".to_string(),
        weather_description: "clear sky".to_string(),
    }
}

/// What the provider does when asked for a fresh update.
#[derive(Debug, Clone, Copy)]
pub enum FreshBehavior {
    Deliver(Option<GeoPosition>),
    SignalUnavailable,
    SecurityFault,
    DropSink,
    Hold,
}

#[derive(Debug)]
pub struct ScriptedProvider {
    last_known: Option<GeoPosition>,
    last_known_fault: bool,
    fresh: FreshBehavior,
    last_known_calls: AtomicUsize,
    requests: AtomicUsize,
    removals: AtomicUsize,
    held: Mutex<Option<LocationSink>>,
    last_request: Mutex<Option<UpdateRequest>>,
}

impl ScriptedProvider {
    pub fn new(last_known: Option<GeoPosition>, fresh: FreshBehavior) -> Self {
        Self {
            last_known,
            last_known_fault: false,
            fresh,
            last_known_calls: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            removals: AtomicUsize::new(0),
            held: Mutex::new(None),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_last_known_fault(mut self) -> Self {
        self.last_known_fault = true;
        self
    }

    pub fn last_known_calls(&self) -> usize {
        self.last_known_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    pub fn held_sink(&self) -> Option<LocationSink> {
        self.held.lock().unwrap().clone()
    }

    /// Drop the held sink without delivering anything.
    pub fn release_sink(&self) {
        self.held.lock().unwrap().take();
    }

    pub fn last_request(&self) -> Option<UpdateRequest> {
        *self.last_request.lock().unwrap()
    }
}

#[async_trait]
impl LocationProvider for ScriptedProvider {
    async fn last_known(&self) -> Result<Option<GeoPosition>, ProviderFault> {
        self.last_known_calls.fetch_add(1, Ordering::SeqCst);
        if self.last_known_fault {
            return Err(ProviderFault::Other("cache unavailable".into()));
        }
        Ok(self.last_known)
    }

    fn request_updates(
        &self,
        request: UpdateRequest,
        sink: LocationSink,
    ) -> Result<ListenerId, ProviderFault> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        match self.fresh {
            FreshBehavior::Deliver(position) => sink.on_location(position),
            FreshBehavior::SignalUnavailable => sink.on_availability(false),
            FreshBehavior::SecurityFault => {
                return Err(ProviderFault::Security("permission revoked".into()));
            }
            FreshBehavior::DropSink => drop(sink),
            FreshBehavior::Hold => *self.held.lock().unwrap() = Some(sink),
        }

        Ok(ListenerId(n as u64))
    }

    fn remove_updates(&self, _id: ListenerId) {
        self.removals.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub enum PositionBehavior {
    Succeed(WeatherSnapshot),
    Fail(String),
    Panic,
}

#[derive(Debug)]
pub struct FakeLookup {
    cities: HashMap<String, Result<WeatherSnapshot, String>>,
    position: PositionBehavior,
    city_calls: Mutex<Vec<String>>,
    position_calls: Mutex<Vec<GeoPosition>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self {
            cities: HashMap::new(),
            position: PositionBehavior::Fail("no position configured".into()),
            city_calls: Mutex::new(Vec::new()),
            position_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_city(mut self, name: &str, outcome: Result<WeatherSnapshot, String>) -> Self {
        self.cities.insert(name.to_string(), outcome);
        self
    }

    pub fn with_position(mut self, behavior: PositionBehavior) -> Self {
        self.position = behavior;
        self
    }

    pub fn city_calls(&self) -> Vec<String> {
        self.city_calls.lock().unwrap().clone()
    }

    pub fn position_calls(&self) -> Vec<GeoPosition> {
        self.position_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherLookup for FakeLookup {
    async fn by_city(&self, name: &str) -> Result<WeatherSnapshot, LookupFailure> {
        self.city_calls.lock().unwrap().push(name.to_string());
        match self.cities.get(name) {
            Some(Ok(snapshot)) => Ok(snapshot.clone()),
            Some(Err(message)) => Err(LookupFailure::Other(message.clone())),
            None => Err(LookupFailure::Other(format!("city not found: {name}"))),
        }
    }

    async fn by_position(&self, position: GeoPosition) -> Result<WeatherSnapshot, LookupFailure> {
        self.position_calls.lock().unwrap().push(position);
        match &self.position {
            PositionBehavior::Succeed(snapshot) => Ok(snapshot.clone()),
            PositionBehavior::Fail(message) => Err(LookupFailure::Other(message.clone())),
            PositionBehavior::Panic => panic!("lookup exploded"),
        }
    }
}
