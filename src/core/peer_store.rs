//! Peer metadata shared between the discovery and probing services.

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use parking_lot::RwLock;
use time::OffsetDateTime;

use crate::core::id::Id;

/// Number of latency samples kept per peer.
pub const LATENCY_WINDOW: usize = 16;

/// The attribute key behind [`PeerStore::set_authorized`] and [`PeerStore::is_authorized`].
pub const AUTHORIZED: &str = "AUTHORIZED";

/// The attribute key behind [`PeerStore::set_pinged_at`] and [`PeerStore::pinged_at`].
pub const PINGED_AT: &str = "PINGED_AT";

// Weight of the newest sample in the moving average.
const LATENCY_SMOOTHING: f64 = 0.1;

/// Round-trip latency observations for a peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyHistory {
    samples: VecDeque<Duration>,
    ewma: Option<Duration>,
}

impl LatencyHistory {
    /// Records a sample, evicting the oldest one if the window is full.
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == LATENCY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);

        self.ewma = Some(match self.ewma {
            None => sample,
            Some(avg) => avg.mul_f64(1.0 - LATENCY_SMOOTHING) + sample.mul_f64(LATENCY_SMOOTHING),
        });
    }

    /// The exponentially weighted moving average of the samples.
    pub fn average(&self) -> Option<Duration> {
        self.ewma
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<Duration> {
        self.samples.back().copied()
    }

    /// The samples in the window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &Duration> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The metadata known about a peer.
#[derive(Debug, Clone, Default)]
pub struct PeerRecord {
    /// Known network addresses.
    pub addrs: Vec<SocketAddr>,
    /// Whether the peer may use services restricted to known peers (`AUTHORIZED`), absent means
    /// unauthorized.
    pub authorized: Option<bool>,
    /// When the peer last answered a probe (`PINGED_AT`).
    pub pinged_at: Option<OffsetDateTime>,
    /// Observed round-trip latencies.
    pub latency: LatencyHistory,
    /// Free-form attributes.
    pub attributes: HashMap<String, Bytes>,
}

/// A peer store handle that can be shared across tasks.
///
/// Locks are held only for the duration of each call, never across I/O.
#[derive(Debug, Clone, Default)]
pub struct PeerStore {
    peers: Arc<RwLock<HashMap<Id, PeerRecord>>>,
}

impl PeerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds addresses for the peer, skipping the ones already known.
    pub fn add_addrs(&self, id: Id, addrs: impl IntoIterator<Item = SocketAddr>) {
        let mut peers_g = self.peers.write();
        let record = peers_g.entry(id).or_default();

        for addr in addrs {
            if !record.addrs.contains(&addr) {
                record.addrs.push(addr);
            }
        }
    }

    /// Returns the peer's known addresses.
    pub fn addrs(&self, id: &Id) -> Vec<SocketAddr> {
        self.peers
            .read()
            .get(id)
            .map(|record| record.addrs.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if at least one address is known for the peer.
    pub fn has_addrs(&self, id: &Id) -> bool {
        self.peers
            .read()
            .get(id)
            .map_or(false, |record| !record.addrs.is_empty())
    }

    /// Forgets the peer's addresses, keeping the rest of its record.
    pub fn clear_addrs(&self, id: &Id) {
        if let Some(record) = self.peers.write().get_mut(id) {
            record.addrs.clear();
        }
    }

    pub fn set_authorized(&self, id: Id, authorized: bool) {
        self.peers.write().entry(id).or_default().authorized = Some(authorized);
    }

    /// Returns `true` only if the peer has been explicitly authorized.
    pub fn is_authorized(&self, id: &Id) -> bool {
        self.peers
            .read()
            .get(id)
            .and_then(|record| record.authorized)
            .unwrap_or(false)
    }

    pub fn record_latency(&self, id: Id, sample: Duration) {
        self.peers.write().entry(id).or_default().latency.record(sample);
    }

    /// Returns the peer's average latency, if any was recorded.
    pub fn latency(&self, id: &Id) -> Option<Duration> {
        self.peers
            .read()
            .get(id)
            .and_then(|record| record.latency.average())
    }

    pub fn set_pinged_at(&self, id: Id, at: OffsetDateTime) {
        self.peers.write().entry(id).or_default().pinged_at = Some(at);
    }

    pub fn pinged_at(&self, id: &Id) -> Option<OffsetDateTime> {
        self.peers.read().get(id).and_then(|record| record.pinged_at)
    }

    /// Stores a free-form attribute.
    ///
    /// Returns `false` and stores nothing for [`AUTHORIZED`] and [`PINGED_AT`], those only go
    /// through their typed accessors.
    pub fn put(&self, id: Id, key: impl Into<String>, value: Bytes) -> bool {
        let key = key.into();
        if is_typed_key(&key) {
            return false;
        }

        self.peers
            .write()
            .entry(id)
            .or_default()
            .attributes
            .insert(key, value);

        true
    }

    /// Returns a free-form attribute, never one of the typed ones.
    pub fn get(&self, id: &Id, key: &str) -> Option<Bytes> {
        if is_typed_key(key) {
            return None;
        }

        // Cheap as the backing storage is shared amongst instances.
        self.peers
            .read()
            .get(id)
            .and_then(|record| record.attributes.get(key).cloned())
    }

    /// Returns a copy of the peer's record.
    pub fn record(&self, id: &Id) -> Option<PeerRecord> {
        self.peers.read().get(id).cloned()
    }

    /// Returns the identifiers of every known peer.
    pub fn peers(&self) -> Vec<Id> {
        self.peers.read().keys().copied().collect()
    }

    /// Removes the peer's record entirely.
    pub fn remove(&self, id: &Id) -> Option<PeerRecord> {
        self.peers.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

fn is_typed_key(key: &str) -> bool {
    key == AUTHORIZED || key == PINGED_AT
}
