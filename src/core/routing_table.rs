//! Distance-ordered routing table.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;

use crate::core::id::Id;

/// The default maximum number of identifiers in a bucket.
pub const K: u8 = 20;

/// The core routing table data structure.
///
/// Peers are grouped into buckets by the log2 of their XOR distance to the local identifier. The
/// table only offers the minimal insertion needed to populate it; how buckets are filled or
/// evicted beyond that is left to the caller.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    // The node's local identifier.
    local_id: Id,
    // The maximum number of identifiers that can be contained in a bucket.
    max_bucket_size: u8,
    // Maps bucket indexes to identifiers in insertion order (empty buckets are removed).
    buckets: BTreeMap<u32, Vec<Id>>,
}

impl RoutingTable {
    /// Creates a new routing table.
    pub fn new(local_id: Id, max_bucket_size: u8) -> Self {
        Self {
            local_id,
            max_bucket_size,
            buckets: BTreeMap::new(),
        }
    }

    /// Returns the table's local identifier.
    pub fn local_id(&self) -> Id {
        self.local_id
    }

    /// Returns `true` if the identifier was inserted or is already present, `false` if it is our
    /// local identifier or its bucket is full.
    pub fn insert(&mut self, id: Id) -> bool {
        let i = match self.local_id.log2_distance(&id) {
            Some(i) => i,
            None => return false,
        };

        let bucket = self.buckets.entry(i).or_default();
        if bucket.contains(&id) {
            return true;
        }

        if bucket.len() >= self.max_bucket_size.into() {
            // Don't leave an empty bucket behind if the size is 0.
            if bucket.is_empty() {
                self.buckets.remove(&i);
            }

            return false;
        }

        bucket.push(id);

        true
    }

    /// Removes the identifier, returning `true` if it was present.
    pub fn remove(&mut self, id: &Id) -> bool {
        let i = match self.local_id.log2_distance(id) {
            Some(i) => i,
            None => return false,
        };

        let Some(bucket) = self.buckets.get_mut(&i) else {
            return false;
        };

        let len = bucket.len();
        bucket.retain(|candidate| candidate != id);
        let removed = bucket.len() < len;

        if bucket.is_empty() {
            self.buckets.remove(&i);
        }

        removed
    }

    /// Returns `true` if the identifier is in the table.
    pub fn contains(&self, id: &Id) -> bool {
        self.local_id
            .log2_distance(id)
            .and_then(|i| self.buckets.get(&i))
            .map_or(false, |bucket| bucket.contains(id))
    }

    /// Returns the number of identifiers in the table.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Returns `true` if the table holds no identifiers.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns the non-empty buckets, farthest first. Identifiers within a bucket are in insertion
    /// order.
    pub fn buckets(&self) -> Vec<Vec<Id>> {
        self.buckets.values().rev().cloned().collect()
    }

    /// Sorts the identifiers by ascending XOR distance to the local identifier.
    pub fn sort_closest(&self, mut ids: Vec<Id>) -> Vec<Id> {
        ids.sort_unstable_by_key(|id| id.distance(&self.local_id));
        ids
    }
}

/// A routing table handle that can be shared across tasks.
///
/// Every operation takes the lock only for its own duration.
#[derive(Debug, Clone)]
pub struct SyncRoutingTable {
    routing_table: Arc<RwLock<RoutingTable>>,
}

impl SyncRoutingTable {
    pub fn new(local_id: Id, max_bucket_size: u8) -> Self {
        Self {
            routing_table: Arc::new(RwLock::new(RoutingTable::new(local_id, max_bucket_size))),
        }
    }

    pub fn local_id(&self) -> Id {
        self.routing_table.read().local_id()
    }

    pub fn insert(&self, id: Id) -> bool {
        self.routing_table.write().insert(id)
    }

    pub fn remove(&self, id: &Id) -> bool {
        self.routing_table.write().remove(id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.routing_table.read().contains(id)
    }

    pub fn len(&self) -> usize {
        self.routing_table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routing_table.read().is_empty()
    }

    pub fn buckets(&self) -> Vec<Vec<Id>> {
        self.routing_table.read().buckets()
    }

    pub fn sort_closest(&self, ids: Vec<Id>) -> Vec<Id> {
        self.routing_table.read().sort_closest(ids)
    }

    /// Returns a copy of the table as it currently stands.
    pub fn snapshot(&self) -> RoutingTable {
        self.routing_table.read().clone()
    }
}
