//! Provider Discovery
//!
//! Keeps the node connected to providers of a fixed content identifier by
//! cycling through three phases:
//! 1. AwaitConnectivity - wait until the node has at least one live connection
//! 2. Discover - query the DHT and enqueue providers as they arrive
//! 3. Drain - hand each queued provider to the connection scheduler

mod connect;
mod controller;
mod phases;
mod queue;

pub use connect::{AttemptOutcome, ConnectAttempt};
pub use controller::{CycleOutcome, DiscoveryController, DiscoveryState};
pub use phases::{DiscoveryPhases, DrainSummary, SkipReason};
pub use queue::ProviderQueue;

use crate::scheduler::SchedulerClosed;
use thiserror::Error;
use warmpeer_core::MeshError;

/// Failure of a single discovery cycle. Always recoverable: the controller
/// logs it, backs off, and starts the next cycle.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("connectivity check failed: {0}")]
    ConnectedPeers(#[source] MeshError),

    #[error("provider lookup failed: {0}")]
    ProviderLookup(#[source] MeshError),

    #[error("provider stream failed after {enqueued} records: {source}")]
    ProviderStream {
        enqueued: usize,
        #[source]
        source: MeshError,
    },

    #[error(transparent)]
    SchedulerClosed(#[from] SchedulerClosed),
}

impl DiscoveryError {
    /// Phase the error originated in, for logs and metrics
    pub fn phase(&self) -> &'static str {
        match self {
            DiscoveryError::ConnectedPeers(_) => "await_connectivity",
            DiscoveryError::ProviderLookup(_) | DiscoveryError::ProviderStream { .. } => "discover",
            DiscoveryError::SchedulerClosed(_) => "drain",
        }
    }
}
