//! Discovery Controller
//!
//! Orchestrates the discovery state machine:
//! AwaitConnectivity -> Discover -> Drain -> AwaitConnectivity ...
//!
//! The queue is checked at the top of every cycle: a non-empty queue is
//! drained before any new lookup is started, which also covers records left
//! behind by a lookup that failed mid-stream.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use warmpeer_core::{MeshNode, PeerIdentifier};

use super::phases::{DiscoveryPhases, DrainSummary};
use super::queue::ProviderQueue;
use super::DiscoveryError;
use crate::config::DiscoveryConfig;
use crate::observability::{events, metrics};
use crate::scheduler::{SchedulerStats, TaskScheduler};

/// Discovery controller state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Waiting for at least one live mesh connection
    AwaitConnectivity,
    /// Running the DHT provider lookup
    Discover,
    /// Handing queued providers to the connection scheduler
    Drain,
}

/// Result of one successful cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No live connections; backed off
    NoPeers,
    /// Lookup completed without providers; backed off
    NoProviders,
    /// Lookup enqueued providers; the next cycle drains them
    Discovered { enqueued: usize },
    /// The queue was drained
    Drained(DrainSummary),
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::NoPeers => "no_peers",
            CycleOutcome::NoProviders => "no_providers",
            CycleOutcome::Discovered { .. } => "discovered",
            CycleOutcome::Drained(_) => "drained",
        }
    }
}

pub struct DiscoveryController<M> {
    /// Phase manager
    phases: DiscoveryPhases<M>,
    /// Providers awaiting a connection attempt
    queue: ProviderQueue,
    /// Connected peers sampled by the most recent lookup
    snapshot: HashSet<PeerIdentifier>,
    /// Lane running connection attempts
    scheduler: TaskScheduler,
    /// Current state
    state: DiscoveryState,
}

impl<M: MeshNode> DiscoveryController<M> {
    /// Must be called from within a tokio runtime.
    pub fn new(mesh: Arc<M>, config: DiscoveryConfig) -> Self {
        let scheduler = TaskScheduler::new("connect", config.scheduler_concurrency);
        Self {
            phases: DiscoveryPhases::new(mesh, config),
            queue: ProviderQueue::new(),
            snapshot: HashSet::new(),
            scheduler,
            state: DiscoveryState::AwaitConnectivity,
        }
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    pub fn queue(&self) -> &ProviderQueue {
        &self.queue
    }

    pub fn snapshot(&self) -> &HashSet<PeerIdentifier> {
        &self.snapshot
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Run one pass of the outer loop.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, DiscoveryError> {
        let retry_interval = self.phases.config().retry_interval;

        if !self.queue.is_empty() {
            self.state = DiscoveryState::Drain;
            let result = self
                .phases
                .drain(&mut self.queue, &self.snapshot, &self.scheduler)
                .await;
            self.state = DiscoveryState::AwaitConnectivity;
            return result.map(CycleOutcome::Drained);
        }

        self.state = DiscoveryState::AwaitConnectivity;
        let Some(snapshot) = self.phases.await_connectivity().await? else {
            info!(
                retry_in_secs = retry_interval.as_secs(),
                "No mesh peers yet, waiting"
            );
            tokio::time::sleep(retry_interval).await;
            return Ok(CycleOutcome::NoPeers);
        };

        self.state = DiscoveryState::Discover;
        self.snapshot = snapshot;
        let enqueued = self.phases.discover(&mut self.queue).await?;

        if enqueued == 0 {
            info!(
                retry_in_secs = retry_interval.as_secs(),
                "No providers found, waiting"
            );
            tokio::time::sleep(retry_interval).await;
            return Ok(CycleOutcome::NoProviders);
        }

        Ok(CycleOutcome::Discovered { enqueued })
    }

    /// Run the discovery loop forever. A failed cycle is logged and followed
    /// by a `retry_interval` back-off; nothing here is fatal.
    pub async fn run(&mut self) {
        let retry_interval = self.phases.config().retry_interval;
        info!(
            local_peer_id = %self.phases.local_peer_id(),
            content_id = %self.phases.config().content_id,
            concurrency = self.scheduler.limit().get(),
            "Discovery loop started"
        );

        loop {
            match self.run_cycle().await {
                Ok(outcome) => {
                    metrics::record_cycle(outcome.as_str());
                    debug!(outcome = ?outcome, "Discovery cycle finished");
                }
                Err(e) => {
                    metrics::record_cycle("error");
                    events::discovery_failed(e.phase(), &e.to_string(), retry_interval.as_secs());
                    tokio::time::sleep(retry_interval).await;
                }
            }
        }
    }

    /// Stop scheduling and wait for in-flight connection attempts.
    pub async fn shutdown(self) -> SchedulerStats {
        info!(queued = self.queue.len(), "Discovery loop stopping");
        self.scheduler.close().await
    }
}
