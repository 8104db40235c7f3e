//! Content Identifier
//!
//! The content identifier is the DHT lookup key. It is fixed for the lifetime
//! of the process.

use cid::Cid;
use std::fmt;
use std::str::FromStr;

use crate::mesh::MeshError;

/// Content identifier watched when none is configured.
pub const DEFAULT_CONTENT_ID: &str = "zdpuAmm8YdN9eHmQ2WHNShrdLF58SYEsqzDRFsx5GrCDVmNLr";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentId(Cid);

impl ContentId {
    pub fn new(cid: Cid) -> Self {
        Self(cid)
    }

    pub fn cid(&self) -> &Cid {
        &self.0
    }

    /// Key under which providers are announced on the DHT.
    ///
    /// Provider records are keyed by the multihash, not the full CID, so that
    /// CIDv0 and CIDv1 encodings of the same content share providers.
    pub fn dht_key(&self) -> Vec<u8> {
        self.0.hash().to_bytes()
    }
}

impl Default for ContentId {
    fn default() -> Self {
        DEFAULT_CONTENT_ID
            .parse()
            .expect("DEFAULT_CONTENT_ID is a valid CID")
    }
}

impl FromStr for ContentId {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cid::from_str(s.trim())
            .map(Self)
            .map_err(|e| MeshError::InvalidContentId {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_content_id_parses() {
        let content = ContentId::default();
        assert_eq!(content, DEFAULT_CONTENT_ID.parse().unwrap());
        // Displayed in the canonical multibase encoding, which may differ from the input.
        assert_eq!(content.to_string().parse::<ContentId>().unwrap(), content);
    }

    #[test]
    fn test_dht_key_is_multihash() {
        let content = ContentId::default();
        assert_eq!(content.dht_key(), content.cid().hash().to_bytes());
        assert_ne!(content.dht_key(), content.cid().to_bytes());
    }

    #[test]
    fn test_invalid_content_id_rejected() {
        let err = "not a cid".parse::<ContentId>().unwrap_err();
        assert!(matches!(err, MeshError::InvalidContentId { .. }));
    }
}
