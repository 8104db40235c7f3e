//! In-memory `MeshNode` for exercising the discovery loop without a swarm.

use async_trait::async_trait;
use futures::stream;
use libp2p::Multiaddr;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use warmpeer_core::{
    ConnectedPeer, ContentId, MeshError, MeshNode, PeerIdentifier, ProviderRecord, ProviderStream,
};

type PeersResponse = Result<Vec<ConnectedPeer>, MeshError>;
type LookupResponse = Result<Vec<Result<ProviderRecord, MeshError>>, MeshError>;

#[derive(Debug, Clone)]
pub struct DialRecord {
    pub addr: Multiaddr,
    pub started: Instant,
    pub finished: Instant,
    pub succeeded: bool,
}

pub struct MockMesh {
    local: PeerIdentifier,
    scripted_peers: Mutex<VecDeque<PeersResponse>>,
    connected: Mutex<Vec<ConnectedPeer>>,
    scripted_lookups: Mutex<VecDeque<LookupResponse>>,
    reachable: Mutex<HashSet<Multiaddr>>,
    dial_delay: Duration,
    dial_log: Mutex<Vec<DialRecord>>,
    peer_queries: AtomicUsize,
    lookups: AtomicUsize,
}

impl MockMesh {
    pub fn new(local: impl Into<PeerIdentifier>) -> Self {
        Self {
            local: local.into(),
            scripted_peers: Mutex::new(VecDeque::new()),
            connected: Mutex::new(Vec::new()),
            scripted_lookups: Mutex::new(VecDeque::new()),
            reachable: Mutex::new(HashSet::new()),
            dial_delay: Duration::ZERO,
            dial_log: Mutex::new(Vec::new()),
            peer_queries: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = delay;
        self
    }

    /// Peers reported once the scripted responses run out.
    pub fn set_connected(&self, peers: &[&PeerIdentifier]) {
        *self.connected.lock().unwrap() = peers
            .iter()
            .map(|p| ConnectedPeer::new((*p).clone()))
            .collect();
    }

    pub fn script_connected(&self, response: PeersResponse) {
        self.scripted_peers.lock().unwrap().push_back(response);
    }

    pub fn script_lookup(&self, providers: &[&PeerIdentifier]) {
        let items = providers
            .iter()
            .map(|p| Ok(ProviderRecord::new((*p).clone())))
            .collect();
        self.scripted_lookups.lock().unwrap().push_back(Ok(items));
    }

    pub fn script_lookup_items(&self, items: Vec<Result<ProviderRecord, MeshError>>) {
        self.scripted_lookups.lock().unwrap().push_back(Ok(items));
    }

    pub fn script_lookup_error(&self, err: MeshError) {
        self.scripted_lookups.lock().unwrap().push_back(Err(err));
    }

    /// Make dials to `addr` succeed; every other address fails.
    pub fn make_reachable(&self, addr: &Multiaddr) {
        self.reachable.lock().unwrap().insert(addr.clone());
    }

    pub fn dial_log(&self) -> Vec<DialRecord> {
        self.dial_log.lock().unwrap().clone()
    }

    pub fn dialed(&self) -> Vec<Multiaddr> {
        self.dial_log().into_iter().map(|r| r.addr).collect()
    }

    pub fn peer_queries(&self) -> usize {
        self.peer_queries.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeshNode for MockMesh {
    fn local_peer_id(&self) -> PeerIdentifier {
        self.local.clone()
    }

    async fn connected_peers(&self) -> Result<Vec<ConnectedPeer>, MeshError> {
        self.peer_queries.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.scripted_peers.lock().unwrap().pop_front() {
            return response;
        }
        Ok(self.connected.lock().unwrap().clone())
    }

    async fn find_providers(&self, _content: &ContentId) -> Result<ProviderStream, MeshError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let scripted = self.scripted_lookups.lock().unwrap().pop_front();
        let items = scripted.unwrap_or_else(|| Ok(Vec::new()))?;
        Ok(Box::pin(stream::iter(items)))
    }

    async fn dial(&self, addr: &Multiaddr, _timeout: Duration) -> Result<(), MeshError> {
        let started = Instant::now();
        if !self.dial_delay.is_zero() {
            tokio::time::sleep(self.dial_delay).await;
        }
        let succeeded = self.reachable.lock().unwrap().contains(addr);
        self.dial_log.lock().unwrap().push(DialRecord {
            addr: addr.clone(),
            started,
            finished: Instant::now(),
            succeeded,
        });

        if succeeded {
            Ok(())
        } else {
            Err(MeshError::Dial {
                addr: addr.to_string(),
                reason: "unreachable".to_string(),
            })
        }
    }
}
