//! Dial Candidates
//!
//! Derives the ordered set of addresses through which a provider may be
//! reachable. Candidates are derived from the peer identity alone; the mesh
//! resolves them against its own address book and relay reservations.

use libp2p::multiaddr::Protocol;
use libp2p::{Multiaddr, PeerId};
use std::fmt;

use crate::mesh::MeshError;
use crate::peer::PeerIdentifier;

/// How a candidate reaches the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    /// `/p2p/<id>`: dial the peer on any address the mesh knows for it
    Direct,
    /// `/p2p-circuit/p2p/<id>`: dial through a circuit relay
    Relay,
}

impl CandidateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateKind::Direct => "direct",
            CandidateKind::Relay => "relay",
        }
    }
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressCandidate {
    pub kind: CandidateKind,
    pub addr: Multiaddr,
}

/// Build the dial candidates for a peer, highest priority first.
pub fn candidates_for(peer: &PeerIdentifier) -> Result<Vec<AddressCandidate>, MeshError> {
    let peer_id = peer.to_peer_id()?;

    Ok(vec![
        AddressCandidate {
            kind: CandidateKind::Direct,
            addr: Multiaddr::empty().with(Protocol::P2p(peer_id)),
        },
        AddressCandidate {
            kind: CandidateKind::Relay,
            addr: Multiaddr::empty()
                .with(Protocol::P2pCircuit)
                .with(Protocol::P2p(peer_id)),
        },
    ])
}

/// The peer a multiaddr ultimately points at (its trailing `/p2p` component).
pub fn target_peer(addr: &Multiaddr) -> Option<PeerId> {
    match addr.iter().last() {
        Some(Protocol::P2p(peer_id)) => Some(peer_id),
        _ => None,
    }
}

/// Whether the address routes through a circuit relay.
pub fn is_relayed(addr: &Multiaddr) -> bool {
    addr.iter().any(|p| matches!(p, Protocol::P2pCircuit))
}
