//! Connection Attempt
//!
//! Body of the task submitted to the connection scheduler for one provider:
//! try each dial candidate in priority order and stop at the first success.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};
use warmpeer_core::{candidates_for, CandidateKind, MeshNode, PeerIdentifier};

use crate::observability::{events, metrics};
use crate::scheduler::TaskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A candidate dial succeeded; later candidates were not tried
    Connected {
        candidate: CandidateKind,
        attempts: usize,
    },
    /// Every candidate failed
    Exhausted { attempts: usize },
    /// The identity could not be turned into dial candidates
    InvalidPeer,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Connected { .. } => "connected",
            AttemptOutcome::Exhausted { .. } => "exhausted",
            AttemptOutcome::InvalidPeer => "invalid_peer",
        }
    }
}

pub struct ConnectAttempt<M> {
    mesh: Arc<M>,
    peer: PeerIdentifier,
    dial_timeout: Duration,
}

impl<M: MeshNode> ConnectAttempt<M> {
    pub fn new(mesh: Arc<M>, peer: PeerIdentifier, dial_timeout: Duration) -> Self {
        Self {
            mesh,
            peer,
            dial_timeout,
        }
    }

    pub async fn run(self) -> AttemptOutcome {
        let candidates = match candidates_for(&self.peer) {
            Ok(candidates) => candidates,
            Err(e) => {
                debug!(peer_id = %self.peer, error = %e, "Cannot derive dial candidates");
                return AttemptOutcome::InvalidPeer;
            }
        };

        let mut attempts = 0;
        for candidate in candidates {
            attempts += 1;
            let started = Instant::now();
            let result = self.mesh.dial(&candidate.addr, self.dial_timeout).await;
            metrics::record_dial_duration(candidate.kind.as_str(), started.elapsed());

            match result {
                Ok(()) => {
                    events::peer_connected(
                        self.peer.as_str(),
                        &candidate.addr.to_string(),
                        candidate.kind.as_str(),
                        attempts,
                    );
                    return AttemptOutcome::Connected {
                        candidate: candidate.kind,
                        attempts,
                    };
                }
                Err(e) => {
                    trace!(
                        peer_id_short = self.peer.short(),
                        candidate = %candidate.kind,
                        error = %e,
                        "Dial candidate failed"
                    );
                }
            }
        }

        events::candidates_exhausted(self.peer.as_str(), attempts);
        AttemptOutcome::Exhausted { attempts }
    }

    /// Scheduler entry point. Dial failures are expected and never reported
    /// as task errors.
    pub async fn into_task(self) -> Result<(), TaskError> {
        let outcome = self.run().await;
        metrics::record_attempt(outcome.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMesh;
    use libp2p::PeerId;

    fn peer() -> PeerIdentifier {
        PeerIdentifier::from(PeerId::random())
    }

    #[tokio::test]
    async fn test_relay_fallback_after_direct_failure() {
        let target = peer();
        let mesh = Arc::new(MockMesh::new(peer()));
        let candidates = candidates_for(&target).unwrap();
        mesh.make_reachable(&candidates[1].addr);

        let outcome = ConnectAttempt::new(mesh.clone(), target, Duration::from_secs(15))
            .run()
            .await;

        assert_eq!(
            outcome,
            AttemptOutcome::Connected {
                candidate: CandidateKind::Relay,
                attempts: 2
            }
        );
        let log = mesh.dial_log();
        assert_eq!(log.len(), 2);
        assert!(!log[0].succeeded);
        assert!(log[1].succeeded);
        assert_eq!(log[0].addr, candidates[0].addr);
        assert_eq!(log[1].addr, candidates[1].addr);
    }

    #[tokio::test]
    async fn test_direct_success_skips_relay() {
        let target = peer();
        let mesh = Arc::new(MockMesh::new(peer()));
        let candidates = candidates_for(&target).unwrap();
        mesh.make_reachable(&candidates[0].addr);
        mesh.make_reachable(&candidates[1].addr);

        let outcome = ConnectAttempt::new(mesh.clone(), target, Duration::from_secs(15))
            .run()
            .await;

        assert_eq!(
            outcome,
            AttemptOutcome::Connected {
                candidate: CandidateKind::Direct,
                attempts: 1
            }
        );
        assert_eq!(mesh.dialed(), vec![candidates[0].addr.clone()]);
    }

    #[tokio::test]
    async fn test_all_candidates_failing_is_not_an_error() {
        let target = peer();
        let mesh = Arc::new(MockMesh::new(peer()));

        let attempt = ConnectAttempt::new(mesh.clone(), target.clone(), Duration::from_secs(15));
        assert!(attempt.into_task().await.is_ok());
        assert_eq!(mesh.dialed().len(), 2);

        let outcome = ConnectAttempt::new(mesh.clone(), target, Duration::from_secs(15))
            .run()
            .await;
        assert_eq!(outcome, AttemptOutcome::Exhausted { attempts: 2 });
    }

    #[tokio::test]
    async fn test_invalid_peer_never_dials() {
        let mesh = Arc::new(MockMesh::new(peer()));

        let outcome = ConnectAttempt::new(
            mesh.clone(),
            PeerIdentifier::new("not-a-peer-id"),
            Duration::from_secs(15),
        )
        .run()
        .await;

        assert_eq!(outcome, AttemptOutcome::InvalidPeer);
        assert!(mesh.dialed().is_empty());
    }
}
