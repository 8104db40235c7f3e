//! Mesh Node Boundary
//!
//! The discovery loop only ever talks to the network through `MeshNode`.
//! The production implementation is backed by a libp2p swarm; tests use an
//! in-memory double.

use async_trait::async_trait;
use futures::stream::BoxStream;
use libp2p::Multiaddr;
use std::time::Duration;
use thiserror::Error;

use crate::content::ContentId;
use crate::peer::{ConnectedPeer, PeerIdentifier, ProviderRecord};

/// Lazy, finite sequence of provider records produced by a DHT lookup.
///
/// An `Err` item ends the lookup; records yielded before it remain valid.
pub type ProviderStream = BoxStream<'static, Result<ProviderRecord, MeshError>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("failed to list connected peers: {0}")]
    ConnectedPeers(String),

    #[error("provider lookup failed: {0}")]
    ProviderLookup(String),

    #[error("dial {addr} failed: {reason}")]
    Dial { addr: String, reason: String },

    #[error("dial {addr} timed out after {timeout:?}")]
    DialTimeout { addr: String, timeout: Duration },

    #[error("no relay configured to reach {addr}")]
    NoRelay { addr: String },

    #[error("invalid peer id: {0}")]
    InvalidPeerId(String),

    #[error("invalid content id {input}: {reason}")]
    InvalidContentId { input: String, reason: String },

    #[error("mesh node stopped")]
    NodeStopped,
}

/// Peer-to-peer node exposing the primitives the discovery loop needs.
#[async_trait]
pub trait MeshNode: Send + Sync + 'static {
    /// Identity of the local node
    fn local_peer_id(&self) -> PeerIdentifier;

    /// Peers with at least one live connection right now
    async fn connected_peers(&self) -> Result<Vec<ConnectedPeer>, MeshError>;

    /// Start a DHT provider lookup for `content`.
    async fn find_providers(&self, content: &ContentId) -> Result<ProviderStream, MeshError>;

    /// Dial `addr`, giving up after `timeout`.
    async fn dial(&self, addr: &Multiaddr, timeout: Duration) -> Result<(), MeshError>;
}
