//! Location acquisition.
//!
//! The acquirer walks a short cascade: permission, service availability,
//! the provider's last known fix, then one fresh high-accuracy fix. The fresh
//! step bridges the provider's callback sink into a single awaited outcome.
//!
//! A fresh request settles exactly once. Whichever of "result delivered" and
//! "caller gave up" happens first wins; the loser is discarded. The provider
//! listener is removed exactly once in either case.

use async_trait::async_trait;
use std::{
    fmt::Debug,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::{
    error::{LocationFailure, ProviderFault},
    model::GeoPosition,
};

pub mod ip;

/// Capability facts supplied by the caller; the acquirer never queries the
/// platform for these itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationFacts {
    /// Fine or coarse location permission granted.
    pub permission_granted: bool,
    /// At least one location provider enabled.
    pub service_enabled: bool,
}

impl LocationFacts {
    pub fn granted(service_enabled: bool) -> Self {
        Self {
            permission_granted: true,
            service_enabled,
        }
    }
}

/// Parameters of a location update subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    pub high_accuracy: bool,
    pub max_updates: u32,
}

impl UpdateRequest {
    /// One high-accuracy update, then stop.
    pub fn single_fix() -> Self {
        Self {
            high_accuracy: true,
            max_updates: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Platform location source.
#[async_trait]
pub trait LocationProvider: Send + Sync + Debug {
    /// Most recent fix the platform already holds. No new sensor activity.
    async fn last_known(&self) -> Result<Option<GeoPosition>, ProviderFault>;

    /// Register `sink` for updates matching `request`.
    fn request_updates(
        &self,
        request: UpdateRequest,
        sink: LocationSink,
    ) -> Result<ListenerId, ProviderFault>;

    /// Unregister a listener. Unknown ids are ignored.
    fn remove_updates(&self, id: ListenerId);
}

type Outcome = Result<GeoPosition, LocationFailure>;

#[derive(Debug)]
struct Settle {
    settled: AtomicBool,
    tx: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl Settle {
    fn new(tx: oneshot::Sender<Outcome>) -> Self {
        Self {
            settled: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Returns false when the request had already settled.
    fn resolve(&self, outcome: Outcome) -> bool {
        if self.settled.swap(true, Ordering::AcqRel) {
            return false;
        }

        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            // The receiver may already be gone; nothing left to notify.
            let _ = tx.send(outcome);
        }
        true
    }

    fn abandon(&self) {
        self.settled.store(true, Ordering::Release);
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
struct SinkShared {
    settle: Arc<Settle>,
}

impl Drop for SinkShared {
    fn drop(&mut self) {
        // Last sink gone without a delivery: the provider will never answer.
        if self.settle.resolve(Err(LocationFailure::Unavailable)) {
            debug!("location sink dropped without a result");
        }
    }
}

/// Callback side of a fresh request, handed to the provider.
///
/// Cloning is cheap; every clone feeds the same single outcome. Dropping the
/// last clone without delivering settles the request as unavailable.
#[derive(Debug, Clone)]
pub struct LocationSink {
    shared: Arc<SinkShared>,
}

impl LocationSink {
    /// Deliver a location result. `None` means the provider had no fix.
    pub fn on_location(&self, position: Option<GeoPosition>) {
        let outcome = position.ok_or(LocationFailure::Unavailable);
        if !self.shared.settle.resolve(outcome) {
            debug!("location result arrived after the request settled; dropped");
        }
    }

    /// Deliver an availability change. Only "unavailable" settles the request.
    pub fn on_availability(&self, available: bool) {
        if available {
            return;
        }
        if !self.shared.settle.resolve(Err(LocationFailure::ProviderUnavailable)) {
            debug!("availability signal arrived after the request settled; dropped");
        }
    }

    pub fn is_settled(&self) -> bool {
        self.shared.settle.is_settled()
    }
}

#[derive(Debug)]
struct Teardown {
    provider: Arc<dyn LocationProvider>,
    id: ListenerId,
    settle: Arc<Settle>,
    done: AtomicBool,
}

impl Teardown {
    fn run(&self) {
        self.settle.abandon();
        if !self.done.swap(true, Ordering::AcqRel) {
            debug!(listener = self.id.0, "removing location listener");
            self.provider.remove_updates(self.id);
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run();
    }
}

/// An in-flight fresh location request.
///
/// Dropping it, or calling [`PendingFix::cancel`], removes the provider
/// listener; a result delivered afterwards is discarded.
#[derive(Debug)]
pub struct PendingFix {
    rx: oneshot::Receiver<Outcome>,
    teardown: Teardown,
}

impl PendingFix {
    pub fn cancel(self) {
        debug!(listener = self.teardown.id.0, "fresh location request cancelled");
        drop(self);
    }

    /// Wait for the single outcome.
    pub async fn settle(mut self) -> Result<GeoPosition, LocationFailure> {
        let outcome = (&mut self.rx).await;
        self.teardown.run();

        // Only reachable if the settle state was abandoned before delivery.
        outcome.unwrap_or(Err(LocationFailure::Unavailable))
    }
}

fn sink_pair() -> (LocationSink, Arc<Settle>, oneshot::Receiver<Outcome>) {
    let (tx, rx) = oneshot::channel();
    let settle = Arc::new(Settle::new(tx));
    let sink = LocationSink {
        shared: Arc::new(SinkShared {
            settle: Arc::clone(&settle),
        }),
    };

    (sink, settle, rx)
}

/// Produces one best-effort position per call. No internal retry.
#[derive(Debug, Clone)]
pub struct LocationAcquirer {
    provider: Arc<dyn LocationProvider>,
}

impl LocationAcquirer {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self { provider }
    }

    pub async fn acquire(&self, facts: LocationFacts) -> Result<GeoPosition, LocationFailure> {
        if !facts.permission_granted {
            info!("location permission not granted");
            return Err(LocationFailure::PermissionDenied);
        }

        if !facts.service_enabled {
            info!("location services disabled");
            return Err(LocationFailure::ServiceDisabled);
        }

        match self.provider.last_known().await {
            Ok(Some(position)) => {
                debug!(%position, "using last known position");
                return Ok(position);
            }
            Ok(None) => debug!("no last known position, requesting a fresh fix"),
            Err(fault) => {
                warn!(%fault, "last known position lookup failed, requesting a fresh fix")
            }
        }

        self.request_fresh()?.settle().await
    }

    /// Start a single high-accuracy fresh request.
    pub fn request_fresh(&self) -> Result<PendingFix, LocationFailure> {
        let (sink, settle, rx) = sink_pair();

        let id = self
            .provider
            .request_updates(UpdateRequest::single_fix(), sink)
            .map_err(|fault| {
                warn!(%fault, "fresh location request rejected");
                LocationFailure::from(fault)
            })?;
        debug!(listener = id.0, "fresh location request registered");

        Ok(PendingFix {
            rx,
            teardown: Teardown {
                provider: Arc::clone(&self.provider),
                id,
                settle,
                done: AtomicBool::new(false),
            },
        })
    }
}
