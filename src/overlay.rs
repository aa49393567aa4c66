//! The node-level handle tying the topology services together.

use std::{sync::Arc, time::Duration};

use crate::{
    core::{
        config::Config,
        error::ProbeError,
        id::Id,
        peer_store::PeerStore,
        routing_table::SyncRoutingTable,
        stream_store::StreamStore,
        traits::{Host, PeerStream},
    },
    discovery::{Discovery, DiscoveryHandle},
    probe::Prober,
};

/// A node's view of the overlay: its routing table, peer and stream stores, and the services that
/// keep them current.
///
/// The stores are shared handles, clones of them observe and mutate the same state.
pub struct Overlay<H: Host> {
    config: Config,
    host: Arc<H>,
    routing_table: SyncRoutingTable,
    peers: PeerStore,
    streams: StreamStore,
    prober: Prober<H>,
}

impl<H: Host> Overlay<H> {
    /// Creates an overlay with empty stores.
    pub fn new(local_id: Id, host: H, config: Config) -> Self {
        let routing_table = SyncRoutingTable::new(local_id, config.max_bucket_size);
        let peers = PeerStore::new();
        let streams = StreamStore::new(config.inbound_capacity, config.outbound_capacity);

        Self::with_stores(host, config, routing_table, peers, streams)
    }

    /// Creates an overlay over existing stores.
    pub fn with_stores(
        host: H,
        config: Config,
        routing_table: SyncRoutingTable,
        peers: PeerStore,
        streams: StreamStore,
    ) -> Self {
        let host = Arc::new(host);
        let prober = Prober::new(host.clone(), peers.clone(), routing_table.clone(), &config);

        Self {
            config,
            host,
            routing_table,
            peers,
            streams,
            prober,
        }
    }

    pub fn local_id(&self) -> Id {
        self.routing_table.local_id()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn routing_table(&self) -> &SyncRoutingTable {
        &self.routing_table
    }

    pub fn peers(&self) -> &PeerStore {
        &self.peers
    }

    pub fn streams(&self) -> &StreamStore {
        &self.streams
    }

    /// The protocol identifier under which inbound streams should be routed to
    /// [`handle_probe`](Self::handle_probe).
    pub fn probe_protocol(&self) -> &str {
        self.prober.protocol()
    }

    /// Starts the periodic outbound stream discovery task.
    pub fn discover_streams(&self) -> DiscoveryHandle {
        self.discovery().spawn()
    }

    /// Runs a single replenishment pass outside of the periodic task.
    pub async fn replenish(&self) -> usize {
        self.discovery().replenish().await
    }

    /// Probes the peer, see [`Prober::probe`].
    pub async fn probe(&self, peer: Id) -> Result<Duration, ProbeError> {
        self.prober.probe(peer).await
    }

    /// Answers an inbound probe, see [`Prober::echo`].
    pub async fn handle_probe<S: PeerStream>(&self, stream: S) {
        self.prober.echo(stream).await
    }

    fn discovery(&self) -> Discovery<H> {
        Discovery::new(
            self.host.clone(),
            self.routing_table.clone(),
            self.peers.clone(),
            self.streams.clone(),
            self.config.discovery_interval,
        )
    }
}

#[cfg(feature = "report")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "report")))]
mod report {
    use std::net::SocketAddr;

    use time::OffsetDateTime;

    use super::*;
    use crate::report::Report;

    /// Node details a report carries which the overlay doesn't track itself.
    #[derive(Debug, Clone, Default)]
    pub struct ReportInfo {
        pub addrs: Vec<SocketAddr>,
        pub cluster_id: i32,
        pub network: String,
        pub user_data: String,
        pub version: String,
    }

    impl<H: Host> Overlay<H> {
        /// Produces a snapshot of the node's current topology.
        pub fn report(&self, info: ReportInfo) -> Report {
            let to_strings =
                |ids: Vec<Id>| -> Vec<String> { ids.iter().map(Id::to_string).collect() };

            Report {
                addrs: info.addrs.iter().map(SocketAddr::to_string).collect(),
                cluster_id: info.cluster_id,
                network: info.network,
                node_id: self.local_id().to_string(),
                peers: self.routing_table.len(),
                process_id: std::process::id(),
                inbound_streams: to_strings(self.streams.inbound_peers()),
                outbound_streams: to_strings(self.streams.outbound_peers()),
                timestamp: OffsetDateTime::now_utc().unix_timestamp(),
                user_data: info.user_data,
                version: info.version,
            }
        }
    }
}

#[cfg(feature = "report")]
pub use report::ReportInfo;
