//! Tunables for the topology services.

use std::time::Duration;

use crate::core::routing_table::K;

/// The default protocol prefix, probes are served under `<prefix>/ping`.
pub const DEFAULT_PROTOCOL: &str = "/topos/0.1.0";

const PROBE_SUFFIX: &str = "/ping";

/// Configuration shared by discovery and probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The number of outbound streams discovery maintains.
    pub outbound_capacity: usize,
    /// The number of inbound streams the node accepts.
    pub inbound_capacity: usize,
    /// How long discovery waits between occupancy checks.
    pub discovery_interval: Duration,
    /// Bound applied to every probe read and write.
    pub probe_timeout: Duration,
    /// Prefix of every protocol identifier.
    pub protocol: String,
    /// The maximum number of identifiers in a routing table bucket.
    pub max_bucket_size: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            outbound_capacity: 8,
            inbound_capacity: 8,
            discovery_interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(10),
            protocol: DEFAULT_PROTOCOL.to_owned(),
            max_bucket_size: K,
        }
    }
}

impl Config {
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    pub fn with_discovery_interval(mut self, interval: Duration) -> Self {
        self.discovery_interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_max_bucket_size(mut self, size: u8) -> Self {
        self.max_bucket_size = size;
        self
    }

    /// The protocol identifier probes are exchanged under.
    pub fn probe_protocol(&self) -> String {
        format!("{}{PROBE_SUFFIX}", self.protocol)
    }
}
