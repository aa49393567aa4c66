//! Topology snapshots for an external monitoring sink.
//!
//! Reports are plain JSON documents with PascalCase keys. The sink is expected to stamp them on
//! arrival and discard the ones older than its retention window.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// How long a sink keeps a report by default.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(90);

/// A snapshot of a node's view of the overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    /// The node's listening addresses.
    pub addrs: Vec<String>,
    #[serde(rename = "ClusterID")]
    pub cluster_id: i32,
    pub network: String,
    #[serde(rename = "NodeID")]
    pub node_id: String,
    /// The number of peers in the routing table.
    pub peers: usize,
    #[serde(rename = "ProcessID")]
    pub process_id: u32,
    /// Identifiers of the peers holding inbound streams with the node.
    pub inbound_streams: Vec<String>,
    /// Identifiers of the peers the node holds outbound streams with.
    pub outbound_streams: Vec<String>,
    /// Unix timestamp in seconds.
    pub timestamp: i64,
    pub user_data: String,
    pub version: String,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns `true` if the report is older than `retention` at `now`.
    pub fn is_expired(&self, now: OffsetDateTime, retention: Duration) -> bool {
        let threshold = now.unix_timestamp() - retention.as_secs() as i64;
        self.timestamp < threshold
    }

    /// The edges the report contributes to the topology graph, one per stream.
    pub fn links(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inbound_streams
            .iter()
            .chain(self.outbound_streams.iter())
            .map(|peer| (self.node_id.as_str(), peer.as_str()))
    }
}
