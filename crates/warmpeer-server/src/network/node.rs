//! libp2p Mesh Node
//!
//! Cloneable handle over the swarm task. Every `MeshNode` call becomes a
//! `MeshCommand`; answers come back on oneshot or stream channels.

use anyhow::Result;
use async_trait::async_trait;
use futures::channel::mpsc as stream_mpsc;
use libp2p::{kad::RecordKey, Multiaddr, PeerId};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use warmpeer_core::{ConnectedPeer, ContentId, MeshError, MeshNode, PeerIdentifier, ProviderStream};

use super::commands::MeshCommand;
use super::swarm::{build_swarm, spawn_event_loop};
use crate::config::NetworkConfig;

#[derive(Clone)]
pub struct Libp2pMeshNode {
    local_peer_id: PeerId,
    commands: mpsc::Sender<MeshCommand>,
}

impl Libp2pMeshNode {
    /// Build the swarm and spawn its event loop. Must be called from within a
    /// tokio runtime.
    pub fn start(config: &NetworkConfig) -> Result<Self> {
        let swarm = build_swarm(config)?;
        let local_peer_id = *swarm.local_peer_id();

        let (commands, rx) = mpsc::channel(config.command_buffer);
        spawn_event_loop(swarm, rx, config.relay_addrs.clone());

        info!(
            peer_id = %local_peer_id,
            relays = config.relay_addrs.len(),
            bootstrap_peers = config.bootstrap_peers.len(),
            "Mesh node started"
        );

        Ok(Self {
            local_peer_id,
            commands,
        })
    }

    async fn send(&self, cmd: MeshCommand) -> Result<(), MeshError> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| MeshError::NodeStopped)
    }
}

#[async_trait]
impl MeshNode for Libp2pMeshNode {
    fn local_peer_id(&self) -> PeerIdentifier {
        PeerIdentifier::from(self.local_peer_id)
    }

    async fn connected_peers(&self) -> Result<Vec<ConnectedPeer>, MeshError> {
        let (resp, rx) = oneshot::channel();
        self.send(MeshCommand::ConnectedPeers { resp }).await?;
        let peers = rx.await.map_err(|_| MeshError::NodeStopped)?;
        Ok(peers.into_iter().map(ConnectedPeer::new).collect())
    }

    async fn find_providers(&self, content: &ContentId) -> Result<ProviderStream, MeshError> {
        let (tx, rx) = stream_mpsc::unbounded();
        let key = RecordKey::new(&content.dht_key());
        self.send(MeshCommand::FindProviders { key, tx }).await?;
        Ok(Box::pin(rx))
    }

    async fn dial(&self, addr: &Multiaddr, timeout: Duration) -> Result<(), MeshError> {
        let (resp, rx) = oneshot::channel();
        self.send(MeshCommand::Dial {
            addr: addr.clone(),
            resp,
        })
        .await?;

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MeshError::NodeStopped),
            Err(_) => Err(MeshError::DialTimeout {
                addr: addr.to_string(),
                timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn isolated_config() -> NetworkConfig {
        NetworkConfig {
            listen_addrs: vec!["/ip4/127.0.0.1/tcp/0".parse().unwrap()],
            bootstrap_peers: Vec::new(),
            relay_addrs: Vec::new(),
            ..NetworkConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fresh_node_has_no_peers() {
        let node = Libp2pMeshNode::start(&isolated_config()).unwrap();
        assert!(node.connected_peers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relay_dial_without_relay_fails() {
        let node = Libp2pMeshNode::start(&isolated_config()).unwrap();
        let target = PeerIdentifier::from(PeerId::random());
        let candidates = warmpeer_core::candidates_for(&target).unwrap();

        let err = node
            .dial(&candidates[1].addr, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, MeshError::NoRelay { .. }));
    }

    #[tokio::test]
    async fn test_unknown_peer_dial_fails() {
        let node = Libp2pMeshNode::start(&isolated_config()).unwrap();
        let target = PeerIdentifier::from(PeerId::random());
        let candidates = warmpeer_core::candidates_for(&target).unwrap();

        let result = node.dial(&candidates[0].addr, Duration::from_secs(5)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dial_closed_port_fails() {
        let node = Libp2pMeshNode::start(&isolated_config()).unwrap();
        let closed: Multiaddr = format!("/ip4/127.0.0.1/tcp/1/p2p/{}", PeerId::random())
            .parse()
            .unwrap();

        let err = node.dial(&closed, Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(
            err,
            MeshError::Dial { .. } | MeshError::DialTimeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_lookup_without_peers_ends() {
        let node = Libp2pMeshNode::start(&isolated_config()).unwrap();
        let mut stream = node.find_providers(&ContentId::default()).await.unwrap();

        let items = tokio::time::timeout(Duration::from_secs(30), async {
            let mut items = Vec::new();
            while let Some(item) = stream.next().await {
                items.push(item);
            }
            items
        })
        .await
        .unwrap();
        assert!(items.iter().all(|item| item.is_err()));
    }
}
