//! Swarm Builder
//!
//! Handles libp2p swarm creation with TCP/QUIC transports, DNS resolution,
//! noise encryption, yamux multiplexing and a circuit relay client.

use super::super::behaviour::WarmpeerBehaviour;
use crate::config::NetworkConfig;
use anyhow::Result;
use libp2p::{multiaddr::Protocol, noise, swarm::Swarm, tcp, yamux, Multiaddr};
use tracing::{debug, info, trace, warn};
use warmpeer_core::address::target_peer;

/// Creates the swarm, starts listening and seeds the routing table.
pub fn build_swarm(config: &NetworkConfig) -> Result<Swarm<WarmpeerBehaviour>> {
    let config_for_behaviour = config.clone();
    let idle_timeout = config.connection_idle_timeout;

    let mut swarm = libp2p::SwarmBuilder::with_new_identity()
        .with_tokio()
        .with_tcp(
            tcp::Config::default(),
            noise::Config::new,
            yamux::Config::default,
        )?
        .with_quic()
        .with_dns()?
        .with_relay_client(noise::Config::new, yamux::Config::default)?
        .with_behaviour(move |key, relay_client| {
            debug!(
                peer_id = %key.public().to_peer_id(),
                "Created swarm identity"
            );
            WarmpeerBehaviour::new(key, relay_client, &config_for_behaviour)
        })?
        .with_swarm_config(move |c| c.with_idle_connection_timeout(idle_timeout))
        .build();

    for addr in &config.listen_addrs {
        swarm.listen_on(addr.clone())?;
        debug!(address = %addr, "Configured listen address");
    }

    bootstrap(&mut swarm, &config.bootstrap_peers);

    Ok(swarm)
}

/// Add the bootstrap peers to Kademlia, dial them and start a bootstrap query.
fn bootstrap(swarm: &mut Swarm<WarmpeerBehaviour>, peers: &[Multiaddr]) {
    let mut seeded = 0;
    for addr in peers {
        let Some(peer_id) = target_peer(addr) else {
            warn!(address = %addr, "Bootstrap address has no /p2p component, skipping");
            continue;
        };

        swarm
            .behaviour_mut()
            .kademlia
            .add_address(&peer_id, transport_part(addr));
        seeded += 1;

        if let Err(e) = swarm.dial(addr.clone()) {
            trace!(address = %addr, error = %e, "Bootstrap dial failed");
        }
    }

    match swarm.behaviour_mut().kademlia.bootstrap() {
        Ok(query_id) => info!(peers = seeded, query_id = ?query_id, "Kademlia bootstrap started"),
        Err(e) => warn!(error = %e, "Kademlia bootstrap skipped"),
    }
}

/// The address without its trailing `/p2p/<id>`.
fn transport_part(addr: &Multiaddr) -> Multiaddr {
    let mut addr = addr.clone();
    if matches!(addr.iter().last(), Some(Protocol::P2p(_))) {
        addr.pop();
    }
    addr
}
