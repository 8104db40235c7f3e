//! Mesh Network Module
//!
//! libp2p-backed implementation of `MeshNode`.
//!
//! This module contains:
//! - `behaviour`: identify + Kademlia + relay client behaviour
//! - `commands`: requests sent from `Libp2pMeshNode` into the swarm task
//! - `dial`: mapping of dial candidates onto concrete dial targets
//! - `swarm`: swarm construction and the event loop that owns it
//! - `node`: the `MeshNode` handle

pub mod behaviour;
pub mod commands;
pub mod dial;
pub mod node;
pub mod swarm;

pub use behaviour::WarmpeerBehaviour;
pub use node::Libp2pMeshNode;
