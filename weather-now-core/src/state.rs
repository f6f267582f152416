//! The single published [`UiState`].
//!
//! One writer (the controller), any number of readers. Readers either poll
//! the current value or subscribe to the stream of transitions.

use std::sync::{Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::model::UiState;

const TRANSITION_BUFFER: usize = 64;

#[derive(Debug)]
pub struct ObservableState {
    current: watch::Sender<UiState>,
    transitions: broadcast::Sender<UiState>,
    write: Mutex<()>,
}

impl ObservableState {
    pub fn new() -> Self {
        let (current, _) = watch::channel(UiState::Loading);
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);

        Self {
            current,
            transitions,
            write: Mutex::new(()),
        }
    }

    /// Latest state.
    pub fn get(&self) -> UiState {
        self.current.borrow().clone()
    }

    /// Every transition from now on, in order.
    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            rx: self.transitions.subscribe(),
        }
    }

    /// Latest-value view, for consumers that only render the newest state.
    pub fn watch(&self) -> watch::Receiver<UiState> {
        self.current.subscribe()
    }

    /// Replace the current state and notify subscribers.
    pub(crate) fn set(&self, state: UiState) {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(state = state_name(&state), "state transition");

        self.current.send_replace(state.clone());
        // No subscribers is fine.
        let _ = self.transitions.send(state);
    }
}

impl Default for ObservableState {
    fn default() -> Self {
        Self::new()
    }
}

fn state_name(state: &UiState) -> &'static str {
    match state {
        UiState::Loading => "loading",
        UiState::Success(_) => "success",
        UiState::Error(_) => "error",
    }
}

/// Ordered stream of state transitions.
#[derive(Debug)]
pub struct StateSubscription {
    rx: broadcast::Receiver<UiState>,
}

impl StateSubscription {
    /// Next transition, or `None` once the state holder is gone.
    pub async fn next(&mut self) -> Option<UiState> {
        loop {
            match self.rx.recv().await {
                Ok(state) => return Some(state),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "state subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next transition if one is already queued.
    pub fn try_next(&mut self) -> Option<UiState> {
        loop {
            match self.rx.try_recv() {
                Ok(state) => return Some(state),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "state subscriber lagged behind");
                }
                Err(_) => return None,
            }
        }
    }

    /// Every transition queued so far.
    pub fn drain(&mut self) -> Vec<UiState> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
