//! Outbound stream discovery.
//!
//! Every tick, if outbound occupancy is below capacity, the routing table is walked bucket by
//! bucket to pick new peers to pair with. Capacity is dealt evenly across the buckets, and within
//! a bucket candidates are drawn with a bias towards the peers nearest to us (see
//! [`sampler`](crate::sampler)).

use std::{sync::Arc, time::Duration};

use rand::{thread_rng, Rng};
use tokio::{sync::oneshot, task::JoinHandle, time::sleep};
use tracing::*;

use crate::core::{
    id::Id,
    peer_store::PeerStore,
    routing_table::{RoutingTable, SyncRoutingTable},
    sampler,
    set::{partition, relative_complement},
    stream_store::StreamStore,
    traits::Host,
};

/// Selects the peers to pair with in a single replenishment pass.
///
/// - `capacity` is dealt across the table's buckets, farthest bucket first.
/// - Peers already in `streams` count towards their bucket's share.
/// - Candidates that are our own identifier or for which `has_addrs` is `false` are discarded
///   without counting towards the share.
/// - No more than `capacity - streams.len()` peers are selected overall.
///
/// The selection is deterministic for a given `rng` state.
pub fn select_candidates<R: Rng + ?Sized>(
    table: &RoutingTable,
    streams: &[Id],
    capacity: usize,
    has_addrs: impl Fn(&Id) -> bool,
    rng: &mut R,
) -> Vec<Id> {
    let local_id = table.local_id();
    let buckets = table.buckets();
    let targets = partition(capacity, buckets.len());

    // Shares are computed per bucket, this keeps the pass as a whole within capacity when
    // occupancy is unevenly spread.
    let mut budget = capacity.saturating_sub(streams.len());
    let mut selected = Vec::with_capacity(budget);

    for (peers, target) in buckets.iter().zip(targets) {
        if budget == 0 {
            break;
        }

        let mut delta = table.sort_closest(relative_complement(peers, streams));
        let present = streams.len() - relative_complement(streams, peers).len();
        let mut quota = target.saturating_sub(present);

        while quota > 0 && budget > 0 {
            let Some(candidate) = sampler::draw(&mut delta, rng) else {
                break;
            };

            if candidate == local_id || !has_addrs(&candidate) {
                trace!("skipping candidate {candidate}");
                continue;
            }

            selected.push(candidate);
            quota -= 1;
            budget -= 1;
        }
    }

    selected
}

/// The periodic outbound stream discovery task.
pub struct Discovery<H: Host> {
    host: Arc<H>,
    routing_table: SyncRoutingTable,
    peers: PeerStore,
    streams: StreamStore,
    interval: Duration,
}

impl<H: Host> Discovery<H> {
    pub fn new(
        host: Arc<H>,
        routing_table: SyncRoutingTable,
        peers: PeerStore,
        streams: StreamStore,
        interval: Duration,
    ) -> Self {
        Self {
            host,
            routing_table,
            peers,
            streams,
            interval,
        }
    }

    /// Runs a single replenishment pass, returning the number of pairings attempted.
    ///
    /// Failed pairings aren't retried within the pass and the peer stays in the routing table,
    /// it may be picked again on a later pass.
    pub async fn replenish(&self) -> usize {
        // Scope the snapshot and the rng, neither is held across the pairing attempts.
        let candidates = {
            let table = self.routing_table.snapshot();
            let streams = self.streams.outbound_peers();

            select_candidates(
                &table,
                &streams,
                self.streams.outbound_capacity(),
                |id| self.peers.has_addrs(id),
                &mut thread_rng(),
            )
        };

        for &candidate in &candidates {
            match self.host.pair(candidate).await {
                Ok(()) => {
                    self.streams.add_outbound(candidate);
                    debug!("paired with {candidate}");
                }
                Err(e) => debug!("cannot pair with {candidate}: {e}"),
            }
        }

        candidates.len()
    }

    /// Spawns the discovery task onto the current runtime.
    ///
    /// The task only checks for shutdown between ticks, a pass that has started always runs to
    /// completion.
    pub fn spawn(self) -> DiscoveryHandle {
        let (shutdown, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            debug!("starting stream discovery");

            loop {
                tokio::select! {
                    // Also resolves if the handle was dropped.
                    _ = &mut shutdown_rx => break,
                    _ = sleep(self.interval) => {
                        if self.streams.has_outbound_space() {
                            let attempts = self.replenish().await;
                            trace!("replenishment pass made {attempts} attempts");
                        }
                    }
                }
            }

            debug!("stopped stream discovery");
        });

        DiscoveryHandle { shutdown, task }
    }
}

/// A handle to a running discovery task. Dropping it stops the task before its next tick.
pub struct DiscoveryHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl DiscoveryHandle {
    /// Signals the task to stop and waits for it to do so.
    pub async fn shutdown(self) {
        // The task may already be gone if the runtime is shutting down.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            warn!("stream discovery task failed: {e}");
        }
    }

    /// Returns `true` once the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
