//! Typed failures for the two suspending collaborators: the location
//! acquirer and the weather lookup.
//!
//! Neither type ever escapes the controller; both are turned into a
//! displayable message there.

use thiserror::Error;

/// Why no position could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationFailure {
    #[error("location permission not granted")]
    PermissionDenied,

    #[error("location services are disabled")]
    ServiceDisabled,

    /// The provider answered, but without a position.
    #[error("could not obtain a location")]
    Unavailable,

    /// The provider signalled it cannot currently produce a position.
    #[error("location provider is not available right now")]
    ProviderUnavailable,

    /// Permission was lost between the initial check and the request.
    #[error("location permission error: {0}")]
    PermissionRevoked(String),

    /// Any other fault reported by the platform provider.
    #[error("location provider error: {0}")]
    Fault(String),
}

/// Why a weather lookup produced no snapshot.
#[derive(Debug, Error)]
pub enum LookupFailure {
    #[error("{0}")]
    Transport(#[source] reqwest::Error),

    #[error("weather request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse weather response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Failure raised by a non-HTTP lookup implementation.
    #[error("{0}")]
    Other(String),
}

impl LookupFailure {
    /// Message shown to the user, passed through verbatim from the cause.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// A fault raised by a platform location provider itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFault {
    #[error("security fault: {0}")]
    Security(String),

    #[error("{0}")]
    Other(String),
}

impl From<ProviderFault> for LocationFailure {
    fn from(fault: ProviderFault) -> Self {
        match fault {
            ProviderFault::Security(msg) => LocationFailure::PermissionRevoked(msg),
            ProviderFault::Other(msg) => LocationFailure::Fault(msg),
        }
    }
}
