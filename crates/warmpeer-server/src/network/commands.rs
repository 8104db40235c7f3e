//! Requests handled by the swarm event loop. Each carries the channel its
//! answer is delivered on.

use futures::channel::mpsc as stream_mpsc;
use libp2p::{kad::RecordKey, Multiaddr, PeerId};
use tokio::sync::oneshot;
use warmpeer_core::{MeshError, ProviderRecord};

pub type ProviderSender = stream_mpsc::UnboundedSender<Result<ProviderRecord, MeshError>>;

#[derive(Debug)]
pub enum MeshCommand {
    /// Snapshot of peers with at least one live connection
    ConnectedPeers {
        resp: oneshot::Sender<Vec<PeerId>>,
    },
    /// Start a provider lookup; records are streamed on `tx` until the query
    /// finishes, at which point `tx` is dropped
    FindProviders { key: RecordKey, tx: ProviderSender },
    /// Dial `addr` and report when the connection is established or fails
    Dial {
        addr: Multiaddr,
        resp: oneshot::Sender<Result<(), MeshError>>,
    },
}
