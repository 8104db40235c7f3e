//! Discovery Phases
//!
//! Each phase takes the state it works on as an explicit argument; the
//! controller owns the queue and the connected-peer snapshot.

use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use warmpeer_core::{MeshNode, PeerIdentifier};

use super::connect::ConnectAttempt;
use super::queue::ProviderQueue;
use super::DiscoveryError;
use crate::config::{DiscoveryConfig, SnapshotPolicy};
use crate::observability::{events, metrics};
use crate::scheduler::TaskScheduler;

/// Why a dequeued provider was not handed to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The provider is the local node
    SelfPeer,
    /// The provider already has a live connection
    AlreadyConnected,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::SelfPeer => "self",
            SkipReason::AlreadyConnected => "already_connected",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub submitted: usize,
    pub skipped: usize,
}

pub struct DiscoveryPhases<M> {
    mesh: Arc<M>,
    local_peer_id: PeerIdentifier,
    config: DiscoveryConfig,
}

impl<M: MeshNode> DiscoveryPhases<M> {
    pub fn new(mesh: Arc<M>, config: DiscoveryConfig) -> Self {
        let local_peer_id = mesh.local_peer_id();
        Self {
            mesh,
            local_peer_id,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn local_peer_id(&self) -> &PeerIdentifier {
        &self.local_peer_id
    }

    /// Phase 1: sample the live connection set.
    ///
    /// Returns `None` while the node has no connections at all.
    pub async fn await_connectivity(
        &self,
    ) -> Result<Option<HashSet<PeerIdentifier>>, DiscoveryError> {
        let peers = self
            .mesh
            .connected_peers()
            .await
            .map_err(DiscoveryError::ConnectedPeers)?;

        metrics::set_connected_peers(peers.len());

        if peers.is_empty() {
            return Ok(None);
        }

        debug!(peer_count = peers.len(), "Mesh connectivity confirmed");
        Ok(Some(peers.into_iter().map(|p| p.peer).collect()))
    }

    /// Phase 2: run the provider lookup, enqueueing records as they arrive.
    ///
    /// On a mid-stream failure the records already enqueued stay queued.
    pub async fn discover(&self, queue: &mut ProviderQueue) -> Result<usize, DiscoveryError> {
        let content_id = self.config.content_id;
        info!(content_id = %content_id, "Looking up providers");

        let mut providers = self
            .mesh
            .find_providers(&content_id)
            .await
            .map_err(DiscoveryError::ProviderLookup)?;

        let mut enqueued = 0;
        while let Some(item) = providers.next().await {
            match item {
                Ok(record) => {
                    events::provider_discovered(
                        record.peer_id.as_str(),
                        &content_id.to_string(),
                        queue.len() + 1,
                    );
                    metrics::record_provider_discovered();
                    queue.push(record);
                    enqueued += 1;
                }
                Err(source) => {
                    metrics::set_queue_depth(queue.len());
                    return Err(DiscoveryError::ProviderStream { enqueued, source });
                }
            }
        }

        metrics::set_queue_depth(queue.len());
        info!(content_id = %content_id, enqueued, "Provider lookup complete");
        Ok(enqueued)
    }

    /// Phase 3: submit a connection attempt for every queued provider that is
    /// neither the local node nor already connected.
    ///
    /// Submissions are not awaited. `drain_throttle` is slept after every
    /// dequeued record, skipped or submitted.
    pub async fn drain(
        &self,
        queue: &mut ProviderQueue,
        snapshot: &HashSet<PeerIdentifier>,
        scheduler: &TaskScheduler,
    ) -> Result<DrainSummary, DiscoveryError> {
        let mut summary = DrainSummary::default();

        while let Some(record) = queue.pop() {
            metrics::set_queue_depth(queue.len());
            let peer = record.peer_id;

            match self.skip_reason(&peer, snapshot).await {
                Some(reason) => {
                    events::provider_skipped(peer.as_str(), reason.as_str());
                    metrics::record_provider_skipped(reason.as_str());
                    summary.skipped += 1;
                }
                None => {
                    debug!(peer_id_short = peer.short(), "Scheduling connection attempt");
                    let attempt =
                        ConnectAttempt::new(self.mesh.clone(), peer, self.config.dial_timeout);
                    scheduler.submit(attempt.into_task())?;
                    summary.submitted += 1;
                }
            }

            tokio::time::sleep(self.config.drain_throttle).await;
        }

        info!(
            submitted = summary.submitted,
            skipped = summary.skipped,
            "Provider queue drained"
        );
        Ok(summary)
    }

    async fn skip_reason(
        &self,
        peer: &PeerIdentifier,
        snapshot: &HashSet<PeerIdentifier>,
    ) -> Option<SkipReason> {
        if *peer == self.local_peer_id {
            return Some(SkipReason::SelfPeer);
        }

        let connected = match self.config.snapshot_policy {
            SnapshotPolicy::PerCycle => snapshot.contains(peer),
            SnapshotPolicy::PerProvider => match self.mesh.connected_peers().await {
                Ok(peers) => peers.iter().any(|p| p.peer == *peer),
                Err(e) => {
                    debug!(error = %e, "Live peer check failed, using cycle snapshot");
                    snapshot.contains(peer)
                }
            },
        };

        connected.then_some(SkipReason::AlreadyConnected)
    }
}
