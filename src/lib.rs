//! Peer topology maintenance for peer-to-peer overlays.
//!
//! This crate keeps a bounded set of outbound streams populated with peers drawn from a
//! distance-ordered routing table, and checks that established peers are still reachable.
//!
//! ## Discovery
//!
//! A background task wakes up on a fixed interval and, if outbound occupancy is below capacity,
//! deals the capacity across the routing table's buckets and pairs with new peers from each
//! bucket. Peers nearer to the local identifier are favoured without ever fully excluding the
//! farther ones.
//!
//! ## Probing
//!
//! A probe sends 32 random bytes over a dedicated stream and expects them echoed back. Peers that
//! can't be reached at all lose their addresses and their routing table entry; slow or
//! misbehaving peers are only reported.
//!
//! Transport, handshakes and encryption are left to the [`Host`] implementation the services run
//! on, and the stores are shared handles the rest of the node can hold on to.

#![cfg_attr(doc_cfg, feature(doc_cfg))]

pub mod codec;
pub mod discovery;
pub mod overlay;
pub mod probe;
#[cfg(feature = "report")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "report")))]
pub mod report;

mod core;

pub use crate::core::{
    config::{Config, DEFAULT_PROTOCOL},
    error::ProbeError,
    id::{Distance, Id},
    peer_store::{self, LatencyHistory, PeerRecord, PeerStore},
    routing_table::{self, RoutingTable, SyncRoutingTable},
    sampler, set,
    stream_store::StreamStore,
    traits::{Host, PeerStream},
};
#[cfg(feature = "report")]
pub use overlay::ReportInfo;
pub use overlay::Overlay;
