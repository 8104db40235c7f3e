//! Structured Events
//!
//! One function per event type so field names stay consistent across the
//! discovery loop and the connection tasks.
//!
//! Event types:
//! - `provider_discovered` - DHT lookup yielded a provider
//! - `provider_skipped` - dequeued provider not dialed (self or already connected)
//! - `peer_connected` - a connection attempt succeeded
//! - `candidates_exhausted` - every dial candidate for a provider failed
//! - `discovery_failed` - a discovery cycle ended with an error

use tracing::{debug, info, warn};

pub fn provider_discovered(peer_id: &str, content_id: &str, queue_depth: usize) {
    debug!(
        event_type = "provider_discovered",
        peer_id = %peer_id,
        content_id = %content_id,
        queue_depth = queue_depth,
        "Provider discovered"
    );
}

pub fn provider_skipped(peer_id: &str, reason: &str) {
    debug!(
        event_type = "provider_skipped",
        peer_id = %peer_id,
        reason = %reason,
        "Provider skipped"
    );
}

pub fn peer_connected(peer_id: &str, address: &str, candidate: &str, attempts: usize) {
    info!(
        event_type = "peer_connected",
        peer_id = %peer_id,
        address = %address,
        candidate = %candidate,
        attempts = attempts,
        "Connected to provider"
    );
}

pub fn candidates_exhausted(peer_id: &str, attempts: usize) {
    debug!(
        event_type = "candidates_exhausted",
        peer_id = %peer_id,
        attempts = attempts,
        "All dial candidates failed"
    );
}

pub fn discovery_failed(phase: &str, error: &str, retry_in_secs: u64) {
    warn!(
        event_type = "discovery_failed",
        phase = %phase,
        error = %error,
        retry_in_secs = retry_in_secs,
        "Discovery cycle failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_functions_dont_panic() {
        provider_discovered("12D3KooWpeer", "zdpuA", 1);
        provider_skipped("12D3KooWpeer", "already_connected");
        peer_connected("12D3KooWpeer", "/p2p/12D3KooWpeer", "direct", 1);
        candidates_exhausted("12D3KooWpeer", 2);
        discovery_failed("discover", "lookup failed", 30);
    }
}
