//! Peer Identity Types

use libp2p::PeerId;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::mesh::MeshError;

/// Canonical, comparable peer identity.
///
/// The mesh may hand out either a structured `PeerId` or its string encoding.
/// Both are normalized here so that equality and hashing always operate on the
/// canonical base58 form. Strings that do not parse as a `PeerId` are kept
/// verbatim (trimmed) so they can still be compared and logged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerIdentifier(String);

impl PeerIdentifier {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        match trimmed.parse::<PeerId>() {
            Ok(peer_id) => Self(peer_id.to_base58()),
            Err(_) => Self(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse back into a structured `PeerId`.
    pub fn to_peer_id(&self) -> Result<PeerId, MeshError> {
        self.0
            .parse::<PeerId>()
            .map_err(|_| MeshError::InvalidPeerId(self.0.clone()))
    }

    /// Trailing characters of the identity, for compact log fields.
    pub fn short(&self) -> &str {
        match self.0.char_indices().rev().nth(5) {
            Some((idx, _)) => &self.0[idx..],
            None => &self.0,
        }
    }
}

impl From<PeerId> for PeerIdentifier {
    fn from(peer_id: PeerId) -> Self {
        Self(peer_id.to_base58())
    }
}

impl From<&PeerId> for PeerIdentifier {
    fn from(peer_id: &PeerId) -> Self {
        Self(peer_id.to_base58())
    }
}

impl From<&str> for PeerIdentifier {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for PeerIdentifier {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl FromStr for PeerIdentifier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl fmt::Display for PeerIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A peer the DHT reports as able to serve the target content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub peer_id: PeerIdentifier,
}

impl ProviderRecord {
    pub fn new(peer_id: impl Into<PeerIdentifier>) -> Self {
        Self {
            peer_id: peer_id.into(),
        }
    }
}

/// Entry of the mesh's live connection listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedPeer {
    pub peer: PeerIdentifier,
}

impl ConnectedPeer {
    pub fn new(peer: impl Into<PeerIdentifier>) -> Self {
        Self { peer: peer.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_and_string_forms_normalize_equal() {
        let peer_id = PeerId::random();
        let structured = PeerIdentifier::from(peer_id);
        let textual = PeerIdentifier::new(format!("  {}\n", peer_id.to_base58()));

        assert_eq!(structured, textual);
        assert_eq!(structured.as_str(), peer_id.to_base58());
    }

    #[test]
    fn test_unparseable_identity_kept_verbatim() {
        let id = PeerIdentifier::new(" not-a-peer ");
        assert_eq!(id.as_str(), "not-a-peer");
        assert!(matches!(id.to_peer_id(), Err(MeshError::InvalidPeerId(_))));
    }

    #[test]
    fn test_round_trip_to_peer_id() {
        let peer_id = PeerId::random();
        let id = PeerIdentifier::from(&peer_id);
        assert_eq!(id.to_peer_id().unwrap(), peer_id);
    }

    #[test]
    fn test_short_handles_short_and_long_ids() {
        assert_eq!(PeerIdentifier::new("abc").short(), "abc");
        assert_eq!(PeerIdentifier::new("0123456789").short(), "456789");
    }
}
