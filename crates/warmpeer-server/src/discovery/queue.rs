//! Provider Queue
//!
//! FIFO buffer of discovered providers awaiting a connection attempt. Owned by
//! the discovery controller and handed to each phase explicitly.

use std::collections::VecDeque;
use warmpeer_core::ProviderRecord;

/// Providers in discovery order. Duplicates are allowed: the same peer may be
/// reported by several lookups and is deduplicated at drain time.
#[derive(Debug, Default)]
pub struct ProviderQueue {
    records: VecDeque<ProviderRecord>,
}

impl ProviderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ProviderRecord) {
        self.records.push_back(record);
    }

    pub fn pop(&mut self) -> Option<ProviderRecord> {
        self.records.pop_front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Extend<ProviderRecord> for ProviderQueue {
    fn extend<T: IntoIterator<Item = ProviderRecord>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}
