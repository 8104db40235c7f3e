//! Dial Target Resolution
//!
//! Dial candidates are written without transport addresses: `/p2p/<id>` for a
//! direct dial and `/p2p-circuit/p2p/<id>` for a relayed one. This turns them
//! into something the swarm can act on.

use libp2p::{multiaddr::Protocol, Multiaddr, PeerId};
use warmpeer_core::MeshError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialTarget {
    /// Dial by identity using addresses the swarm already knows
    Peer(PeerId),
    /// Dial a concrete address
    Address(Multiaddr),
}

pub fn resolve(addr: &Multiaddr, relays: &[Multiaddr]) -> Result<DialTarget, MeshError> {
    let mut components = addr.iter();
    match (components.next(), components.next()) {
        (Some(Protocol::P2p(peer_id)), None) => Ok(DialTarget::Peer(peer_id)),
        (Some(Protocol::P2pCircuit), _) => {
            let relay = relays.first().ok_or_else(|| MeshError::NoRelay {
                addr: addr.to_string(),
            })?;
            let mut relayed = relay.clone();
            for protocol in addr.iter() {
                relayed.push(protocol);
            }
            Ok(DialTarget::Address(relayed))
        }
        _ => Ok(DialTarget::Address(addr.clone())),
    }
}
