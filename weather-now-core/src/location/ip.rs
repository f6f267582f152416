use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::{error::ProviderFault, model::GeoPosition};

use super::{ListenerId, LocationProvider, LocationSink, UpdateRequest};

pub const DEFAULT_IP_LOOKUP_URL: &str = "https://ipapi.co/json/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Location provider backed by an IP geolocation endpoint.
///
/// The "last known" fix is whatever this provider produced most recently,
/// or the seed it was built with. It lives in memory only.
#[derive(Debug)]
pub struct IpLocationProvider {
    http: Client,
    url: Option<String>,
    last_fix: Arc<Mutex<Option<GeoPosition>>>,
    listeners: Mutex<HashMap<ListenerId, AbortHandle>>,
    next_id: AtomicU64,
}

impl IpLocationProvider {
    pub fn new(url: Option<String>, seed: Option<GeoPosition>) -> Result<Self, ProviderFault> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("weather-now/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderFault::Other(e.to_string()))?;

        Ok(Self {
            http,
            url,
            last_fix: Arc::new(Mutex::new(seed)),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Number of listeners registered and not yet removed.
    pub fn active_listeners(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon")]
    longitude: Option<f64>,
}

async fn locate(http: &Client, url: &str) -> Result<Option<GeoPosition>, reqwest::Error> {
    let body: IpApiResponse = http.get(url).send().await?.error_for_status()?.json().await?;

    Ok(match (body.latitude, body.longitude) {
        (Some(lat), Some(lon)) => GeoPosition::new(lat, lon),
        _ => None,
    })
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    async fn last_known(&self) -> Result<Option<GeoPosition>, ProviderFault> {
        Ok(*self.last_fix.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn request_updates(
        &self,
        request: UpdateRequest,
        sink: LocationSink,
    ) -> Result<ListenerId, ProviderFault> {
        if request.max_updates == 0 {
            return Err(ProviderFault::Other("update request asks for zero fixes".into()));
        }
        if request.high_accuracy {
            debug!("IP geolocation is coarse; high accuracy cannot be honoured");
        }

        let url = self
            .url
            .clone()
            .ok_or_else(|| ProviderFault::Other("no IP geolocation endpoint configured".into()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ProviderFault::Other(e.to_string()))?;

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(listener = id.0, ?request, "starting IP geolocation request");

        let http = self.http.clone();
        let last_fix = Arc::clone(&self.last_fix);
        let task = runtime.spawn(async move {
            match locate(&http, &url).await {
                Ok(Some(position)) => {
                    *last_fix.lock().unwrap_or_else(PoisonError::into_inner) = Some(position);
                    sink.on_location(Some(position));
                }
                Ok(None) => sink.on_location(None),
                Err(e) => {
                    warn!(error = %e.without_url(), "IP geolocation endpoint unreachable");
                    sink.on_availability(false);
                }
            }
        });

        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, task.abort_handle());

        Ok(id)
    }

    fn remove_updates(&self, id: ListenerId) {
        let handle = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);

        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
