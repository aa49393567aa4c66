//! Bookkeeping for established streams.

use std::{collections::HashSet, sync::Arc};

use parking_lot::RwLock;

use crate::core::id::Id;

#[derive(Debug, Default)]
struct Streams {
    inbound: HashSet<Id>,
    outbound: HashSet<Id>,
}

/// Tracks the peers we hold inbound and outbound streams with.
///
/// Capacities are targets rather than hard limits: adding a stream never fails because of them,
/// and nothing here evicts streams to get back under capacity.
#[derive(Debug, Clone)]
pub struct StreamStore {
    inbound_capacity: usize,
    outbound_capacity: usize,
    streams: Arc<RwLock<Streams>>,
}

impl StreamStore {
    pub fn new(inbound_capacity: usize, outbound_capacity: usize) -> Self {
        Self {
            inbound_capacity,
            outbound_capacity,
            streams: Default::default(),
        }
    }

    /// Returns `true` if the peer wasn't already tracked as outbound.
    pub fn add_outbound(&self, id: Id) -> bool {
        self.streams.write().outbound.insert(id)
    }

    /// Returns `true` if the peer wasn't already tracked as inbound.
    pub fn add_inbound(&self, id: Id) -> bool {
        self.streams.write().inbound.insert(id)
    }

    pub fn remove_outbound(&self, id: &Id) -> bool {
        self.streams.write().outbound.remove(id)
    }

    pub fn remove_inbound(&self, id: &Id) -> bool {
        self.streams.write().inbound.remove(id)
    }

    pub fn outbound_peers(&self) -> Vec<Id> {
        self.streams.read().outbound.iter().copied().collect()
    }

    pub fn inbound_peers(&self) -> Vec<Id> {
        self.streams.read().inbound.iter().copied().collect()
    }

    pub fn outbound_size(&self) -> usize {
        self.streams.read().outbound.len()
    }

    pub fn inbound_size(&self) -> usize {
        self.streams.read().inbound.len()
    }

    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    pub fn inbound_capacity(&self) -> usize {
        self.inbound_capacity
    }

    /// Returns `true` while outbound occupancy is below capacity.
    pub fn has_outbound_space(&self) -> bool {
        self.outbound_size() < self.outbound_capacity
    }
}
