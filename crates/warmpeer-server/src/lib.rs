//! Warmpeer Server
//!
//! Keeps a libp2p node connected to the DHT providers of one content
//! identifier.
//!
//! - `discovery`: the AwaitConnectivity -> Discover -> Drain loop
//! - `scheduler`: bounded-concurrency task lane for connection attempts
//! - `network`: libp2p implementation of `MeshNode`
//! - `config`: network and discovery configuration
//! - `observability`: tracing, metrics and structured events

pub mod config;
pub mod discovery;
pub mod network;
pub mod observability;
pub mod scheduler;
pub mod version;

#[cfg(test)]
pub mod testing;
