//! libp2p NetworkBehaviour Configuration
//!
//! Combines the protocols the mesh node needs:
//! - Relay client: dialing peers through circuit relays
//! - Identify: peer information exchange (protocol version, listen addresses)
//! - Kademlia: the public IPFS DHT, used for provider lookups

use libp2p::{identify, identity, kad, relay, swarm::NetworkBehaviour, StreamProtocol};

use crate::config::NetworkConfig;
use crate::version;

/// Protocol name of the public IPFS DHT
pub const KADEMLIA_PROTOCOL: StreamProtocol = StreamProtocol::new("/ipfs/kad/1.0.0");

/// Combined network behaviour for the mesh node.
#[derive(NetworkBehaviour)]
pub struct WarmpeerBehaviour {
    pub relay_client: relay::client::Behaviour,
    pub identify: identify::Behaviour,
    pub kademlia: kad::Behaviour<kad::store::MemoryStore>,
}

impl WarmpeerBehaviour {
    pub fn new(
        keypair: &identity::Keypair,
        relay_client: relay::client::Behaviour,
        config: &NetworkConfig,
    ) -> Self {
        let local_peer_id = keypair.public().to_peer_id();

        let identify = identify::Behaviour::new(
            identify::Config::new(version::PROTOCOL_VERSION.to_string(), keypair.public())
                .with_agent_version(version::agent_version()),
        );

        let store = kad::store::MemoryStore::new(local_peer_id);
        let mut kad_config = kad::Config::new(KADEMLIA_PROTOCOL);
        kad_config.set_query_timeout(config.kademlia_query_timeout);

        // Lookups only; never serve DHT records.
        let mut kademlia = kad::Behaviour::with_config(local_peer_id, store, kad_config);
        kademlia.set_mode(Some(kad::Mode::Client));

        Self {
            relay_client,
            identify,
            kademlia,
        }
    }
}
