//! Swarm Event Loop
//!
//! Owns the swarm. Commands from `Libp2pMeshNode` are answered from here, and
//! swarm events complete the lookups and dials those commands started.

use super::super::behaviour::{WarmpeerBehaviour, WarmpeerBehaviourEvent};
use super::super::commands::{MeshCommand, ProviderSender};
use super::super::dial::{resolve, DialTarget};
use futures::StreamExt;
use libp2p::{
    identify,
    kad::{self, GetProvidersOk, QueryId, QueryResult},
    swarm::{
        dial_opts::{DialOpts, PeerCondition},
        ConnectionId, SwarmEvent,
    },
    Multiaddr, PeerId, Swarm,
};
use std::collections::{HashMap, HashSet};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace};
use warmpeer_core::{MeshError, PeerIdentifier, ProviderRecord};

struct PendingDial {
    addr: Multiaddr,
    resp: oneshot::Sender<Result<(), MeshError>>,
}

pub struct MeshEventLoop {
    swarm: Swarm<WarmpeerBehaviour>,
    commands: mpsc::Receiver<MeshCommand>,
    relays: Vec<Multiaddr>,
    connected: HashSet<PeerId>,
    provider_queries: HashMap<QueryId, ProviderSender>,
    pending_dials: HashMap<ConnectionId, PendingDial>,
}

/// Spawns the event loop. It stops once every command sender is dropped.
pub fn spawn_event_loop(
    swarm: Swarm<WarmpeerBehaviour>,
    commands: mpsc::Receiver<MeshCommand>,
    relays: Vec<Multiaddr>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(MeshEventLoop::new(swarm, commands, relays).run())
}

impl MeshEventLoop {
    pub fn new(
        swarm: Swarm<WarmpeerBehaviour>,
        commands: mpsc::Receiver<MeshCommand>,
        relays: Vec<Multiaddr>,
    ) -> Self {
        Self {
            swarm,
            commands,
            relays,
            connected: HashSet::new(),
            provider_queries: HashMap::new(),
            pending_dials: HashMap::new(),
        }
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => {
                    self.handle_swarm_event(event);
                }

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        info!("Mesh node handle dropped, stopping swarm event loop");
                        break;
                    }
                },
            }
        }
    }

    fn handle_command(&mut self, cmd: MeshCommand) {
        match cmd {
            MeshCommand::ConnectedPeers { resp } => {
                let _ = resp.send(self.connected.iter().copied().collect());
            }
            MeshCommand::FindProviders { key, tx } => {
                let query_id = self.swarm.behaviour_mut().kademlia.get_providers(key);
                debug!(query_id = ?query_id, "Provider lookup started");
                self.provider_queries.insert(query_id, tx);
            }
            MeshCommand::Dial { addr, resp } => self.start_dial(addr, resp),
        }
    }

    fn start_dial(&mut self, addr: Multiaddr, resp: oneshot::Sender<Result<(), MeshError>>) {
        let opts = match resolve(&addr, &self.relays) {
            Ok(DialTarget::Peer(peer_id)) => DialOpts::peer_id(peer_id)
                .condition(PeerCondition::Always)
                .build(),
            Ok(DialTarget::Address(target)) => DialOpts::unknown_peer_id().address(target).build(),
            Err(e) => {
                let _ = resp.send(Err(e));
                return;
            }
        };

        let connection_id = opts.connection_id();
        match self.swarm.dial(opts) {
            Ok(()) => {
                trace!(address = %addr, connection_id = ?connection_id, "Dial started");
                self.pending_dials
                    .insert(connection_id, PendingDial { addr, resp });
            }
            Err(e) => {
                let _ = resp.send(Err(MeshError::Dial {
                    addr: addr.to_string(),
                    reason: e.to_string(),
                }));
            }
        }
    }

    fn handle_swarm_event(&mut self, event: SwarmEvent<WarmpeerBehaviourEvent>) {
        match event {
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(address = %address, "P2P network listening");
            }
            SwarmEvent::ConnectionEstablished {
                peer_id,
                connection_id,
                endpoint,
                ..
            } => {
                debug!(
                    peer_id_short = PeerIdentifier::from(peer_id).short(),
                    remote_addr = %endpoint.get_remote_address(),
                    "Peer connected"
                );
                self.connected.insert(peer_id);

                if let Some(pending) = self.pending_dials.remove(&connection_id) {
                    let _ = pending.resp.send(Ok(()));
                }
            }
            SwarmEvent::ConnectionClosed {
                peer_id,
                num_established,
                cause,
                ..
            } => {
                if num_established == 0 {
                    trace!(
                        peer_id_short = PeerIdentifier::from(peer_id).short(),
                        cause = ?cause,
                        "Peer disconnected"
                    );
                    self.connected.remove(&peer_id);
                }
            }
            SwarmEvent::OutgoingConnectionError {
                connection_id,
                peer_id,
                error,
            } => {
                trace!(
                    peer_id = ?peer_id,
                    error = %error,
                    "Outgoing connection failed"
                );
                if let Some(pending) = self.pending_dials.remove(&connection_id) {
                    let _ = pending.resp.send(Err(MeshError::Dial {
                        addr: pending.addr.to_string(),
                        reason: error.to_string(),
                    }));
                }
            }
            SwarmEvent::Behaviour(WarmpeerBehaviourEvent::Identify(
                identify::Event::Received { peer_id, info, .. },
            )) => {
                trace!(
                    peer_id_short = PeerIdentifier::from(peer_id).short(),
                    agent_version = %info.agent_version,
                    listen_addrs = info.listen_addrs.len(),
                    "Identify: received peer info"
                );
                for addr in info.listen_addrs {
                    self.swarm.behaviour_mut().kademlia.add_address(&peer_id, addr);
                }
            }
            SwarmEvent::Behaviour(WarmpeerBehaviourEvent::Kademlia(
                kad::Event::OutboundQueryProgressed {
                    id,
                    result: QueryResult::GetProviders(result),
                    step,
                    ..
                },
            )) => {
                self.handle_provider_progress(id, result, step.last);
            }
            SwarmEvent::Behaviour(WarmpeerBehaviourEvent::Kademlia(event)) => {
                trace!(event = ?event, "Kademlia: DHT event");
            }
            SwarmEvent::Behaviour(WarmpeerBehaviourEvent::RelayClient(event)) => {
                trace!(event = ?event, "Relay client event");
            }
            _ => {}
        }
    }

    fn handle_provider_progress(
        &mut self,
        id: QueryId,
        result: Result<GetProvidersOk, kad::GetProvidersError>,
        last: bool,
    ) {
        let Some(tx) = self.provider_queries.get(&id) else {
            return;
        };

        let mut finished = last;
        match result {
            Ok(GetProvidersOk::FoundProviders { providers, .. }) => {
                for provider in providers {
                    if tx.unbounded_send(Ok(ProviderRecord::new(provider))).is_err() {
                        // Consumer went away; stop the query.
                        let kademlia = &mut self.swarm.behaviour_mut().kademlia;
                        if let Some(mut query) = kademlia.query_mut(&id) {
                            query.finish();
                        }
                        finished = true;
                        break;
                    }
                }
            }
            Ok(GetProvidersOk::FinishedWithNoAdditionalRecord { .. }) => {
                finished = true;
            }
            Err(e) => {
                let _ = tx.unbounded_send(Err(MeshError::ProviderLookup(e.to_string())));
                finished = true;
            }
        }

        if finished {
            self.provider_queries.remove(&id);
            debug!(query_id = ?id, "Provider lookup finished");
        }
    }
}
