//! Core shared types for warmpeer
//!
//! This crate holds the domain types shared between the discovery loop and the
//! mesh implementations:
//! - `peer`: canonical peer identities and provider records
//! - `content`: the content identifier used as the DHT lookup key
//! - `address`: ordered dial candidates derived from a peer identity
//! - `mesh`: the `MeshNode` seam the discovery loop drives

pub mod address;
pub mod content;
pub mod mesh;
pub mod peer;

pub use address::{candidates_for, AddressCandidate, CandidateKind};
pub use content::{ContentId, DEFAULT_CONTENT_ID};
pub use mesh::{MeshError, MeshNode, ProviderStream};
pub use peer::{ConnectedPeer, PeerIdentifier, ProviderRecord};
