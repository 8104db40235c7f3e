//! Configuration
//!
//! Centralized configuration for the mesh node and the discovery loop, with
//! environment variable overrides. CLI flags in `main` are applied on top.

use libp2p::Multiaddr;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use warmpeer_core::ContentId;

/// Public libp2p bootstrap nodes
const DEFAULT_BOOTSTRAP: &[&str] = &[
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmNnooDu7bfjPFoTZYxMNLWUQJyrVwtbZg5gBMjTezGAJN",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmQCU2EcMqAqQPR2i9bChDtGNJchTbq5TbXJJ16u19uLTa",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmbLHAnMoJPWSCR5Zhtx6BHJX9KiKNN6tpvbUcqanj75Nb",
    "/dnsaddr/bootstrap.libp2p.io/p2p/QmcZf59bWwK5XFi76CZX8cbJ4BhTzzA3gU1ZjYZcYW3dwt",
    "/ip4/104.131.131.82/tcp/4001/p2p/QmaCpDMGvV2BGHeYERUEnRQAwe3N8SzbUtfsmvsqQLuvuJ",
];

/// Mesh node configuration with sensible defaults
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Addresses to listen on (env: WARMPEER_LISTEN_ADDRS, comma-separated)
    pub listen_addrs: Vec<Multiaddr>,

    /// Peers dialed and added to the routing table at startup (env: WARMPEER_BOOTSTRAP)
    pub bootstrap_peers: Vec<Multiaddr>,

    /// Circuit relays used for relay-assisted dials (env: WARMPEER_RELAYS)
    pub relay_addrs: Vec<Multiaddr>,

    /// Idle connection timeout before closing
    pub connection_idle_timeout: Duration,

    /// Query timeout for Kademlia lookups
    pub kademlia_query_timeout: Duration,

    /// Capacity of the command channel into the swarm event loop
    pub command_buffer: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addrs: parse_addrs(["/ip4/0.0.0.0/tcp/4001", "/ip4/0.0.0.0/udp/4001/quic-v1"]),
            bootstrap_peers: parse_addrs(DEFAULT_BOOTSTRAP.iter().copied()),
            relay_addrs: Vec::new(),
            connection_idle_timeout: Duration::from_secs(300),
            kademlia_query_timeout: Duration::from_secs(60),
            command_buffer: 256,
        }
    }
}

impl NetworkConfig {
    /// Create configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addrs) = std::env::var("WARMPEER_LISTEN_ADDRS") {
            config.listen_addrs = parse_addrs(split_list(&addrs));
        }

        if let Ok(addrs) = std::env::var("WARMPEER_BOOTSTRAP") {
            config.bootstrap_peers = parse_addrs(split_list(&addrs));
        }

        if let Ok(addrs) = std::env::var("WARMPEER_RELAYS") {
            config.relay_addrs = parse_addrs(split_list(&addrs));
        }

        config
    }
}

/// When the connected-peer set used to skip providers is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// One snapshot per discovery cycle, taken at DHT-lookup time
    #[default]
    PerCycle,
    /// Re-query the mesh before checking each dequeued provider
    PerProvider,
}

impl FromStr for SnapshotPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-cycle" | "cycle" => Ok(SnapshotPolicy::PerCycle),
            "per-provider" | "provider" => Ok(SnapshotPolicy::PerProvider),
            other => Err(format!("unknown snapshot policy: {other}")),
        }
    }
}

/// Discovery loop configuration
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Content whose providers are kept connected (env: WARMPEER_CONTENT_ID)
    pub content_id: ContentId,

    /// Back-off after a failed or empty cycle (env: WARMPEER_RETRY_INTERVAL_SECS)
    pub retry_interval: Duration,

    /// Pause between submitted connection attempts (env: WARMPEER_DRAIN_THROTTLE_SECS)
    pub drain_throttle: Duration,

    /// Per-candidate dial timeout (env: WARMPEER_DIAL_TIMEOUT_SECS)
    pub dial_timeout: Duration,

    /// Connection attempts allowed in flight at once
    pub scheduler_concurrency: NonZeroUsize,

    /// Snapshot sampling (env: WARMPEER_SNAPSHOT_POLICY)
    pub snapshot_policy: SnapshotPolicy,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            content_id: ContentId::default(),
            retry_interval: Duration::from_secs(30),
            drain_throttle: Duration::from_secs(30),
            dial_timeout: Duration::from_secs(15),
            scheduler_concurrency: NonZeroUsize::MIN,
            snapshot_policy: SnapshotPolicy::PerCycle,
        }
    }
}

impl DiscoveryConfig {
    /// Create configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("WARMPEER_CONTENT_ID") {
            match raw.parse::<ContentId>() {
                Ok(content_id) => config.content_id = content_id,
                Err(e) => warn!(error = %e, "Ignoring invalid WARMPEER_CONTENT_ID"),
            }
        }

        if let Some(secs) = env_secs("WARMPEER_RETRY_INTERVAL_SECS") {
            config.retry_interval = secs;
        }

        if let Some(secs) = env_secs("WARMPEER_DRAIN_THROTTLE_SECS") {
            config.drain_throttle = secs;
        }

        if let Some(secs) = env_secs("WARMPEER_DIAL_TIMEOUT_SECS") {
            config.dial_timeout = secs;
        }

        if let Ok(raw) = std::env::var("WARMPEER_SNAPSHOT_POLICY") {
            match raw.parse::<SnapshotPolicy>() {
                Ok(policy) => config.snapshot_policy = policy,
                Err(e) => warn!(error = %e, "Ignoring invalid WARMPEER_SNAPSHOT_POLICY"),
            }
        }

        config
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Parse multiaddrs, dropping (and logging) any that are malformed.
pub fn parse_addrs<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<Multiaddr> {
    raw.into_iter()
        .filter_map(|s| match s.parse::<Multiaddr>() {
            Ok(addr) => Some(addr),
            Err(e) => {
                warn!(addr = %s, error = %e, "Ignoring invalid multiaddr");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.retry_interval, Duration::from_secs(30));
        assert_eq!(config.drain_throttle, Duration::from_secs(30));
        assert_eq!(config.dial_timeout, Duration::from_secs(15));
        assert_eq!(config.scheduler_concurrency.get(), 1);
        assert_eq!(config.snapshot_policy, SnapshotPolicy::PerCycle);
    }

    #[test]
    fn test_network_defaults_parse() {
        let config = NetworkConfig::default();
        assert_eq!(config.listen_addrs.len(), 2);
        assert_eq!(config.bootstrap_peers.len(), DEFAULT_BOOTSTRAP.len());
        assert!(config.relay_addrs.is_empty());
    }

    #[test]
    fn test_parse_addrs_skips_invalid() {
        let addrs = parse_addrs(split_list(
            "/ip4/1.2.3.4/tcp/1, garbage ,,/dns4/relay.example/tcp/4001",
        ));
        assert_eq!(addrs.len(), 2);
    }

    #[test]
    fn test_snapshot_policy_parse() {
        assert_eq!("per-cycle".parse::<SnapshotPolicy>(), Ok(SnapshotPolicy::PerCycle));
        assert_eq!("Per-Provider".parse::<SnapshotPolicy>(), Ok(SnapshotPolicy::PerProvider));
        assert!("sometimes".parse::<SnapshotPolicy>().is_err());
    }
}
