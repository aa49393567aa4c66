//! Reachability probing.
//!
//! A probe opens a dedicated stream under `<protocol>/ping`, writes [`PAYLOAD_LEN`] random bytes
//! and expects the exact same bytes back. Reads and writes are each bounded by the configured
//! timeout.
//!
//! Failing to open the stream is taken to mean the peer's addresses are stale: they are cleared
//! and the peer is dropped from the routing table. Any later failure (a timeout, a reset, a
//! corrupt echo) only gets reported, the peer was reachable enough to accept the stream.

use std::{future::Future, io, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use rand::{rngs::OsRng, RngCore};
use time::OffsetDateTime;
use tokio::time::{timeout, Instant};
use tokio_util::codec::Framed;
use tracing::*;

use crate::{
    codec::{ProbeCodec, PAYLOAD_LEN},
    core::{
        config::Config,
        error::ProbeError,
        id::Id,
        peer_store::PeerStore,
        routing_table::SyncRoutingTable,
        traits::{Host, PeerStream},
    },
};

/// Sends probes to peers and answers the probes peers send us.
pub struct Prober<H: Host> {
    host: Arc<H>,
    peers: PeerStore,
    routing_table: SyncRoutingTable,
    protocol: String,
    timeout: Duration,
}

impl<H: Host> Prober<H> {
    pub fn new(
        host: Arc<H>,
        peers: PeerStore,
        routing_table: SyncRoutingTable,
        config: &Config,
    ) -> Self {
        Self {
            host,
            peers,
            routing_table,
            protocol: config.probe_protocol(),
            timeout: config.probe_timeout,
        }
    }

    /// The protocol identifier probes are exchanged under.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Probes the peer, returning the observed round-trip latency.
    ///
    /// On success the latency is recorded in the peer store along with the time of the probe.
    pub async fn probe(&self, peer: Id) -> Result<Duration, ProbeError> {
        debug!("probing {peer}");

        let stream = match with_timeout(
            self.timeout,
            self.host.new_stream(peer, &self.protocol),
        )
        .await
        {
            Ok(stream) => stream,
            Err(e) => {
                let addrs = self.peers.addrs(&peer);
                debug!("cannot connect to {peer} at {addrs:?}: {e}");

                self.peers.clear_addrs(&peer);
                self.routing_table.remove(&peer);

                return Err(ProbeError::Connect(e));
            }
        };

        let mut payload = [0u8; PAYLOAD_LEN];
        if let Err(e) = OsRng.try_fill_bytes(&mut payload) {
            warn!("cannot generate probe payload: {e}");
            return Err(ProbeError::Randomness(e));
        }
        let payload = Bytes::copy_from_slice(&payload);

        let mut framed = Framed::new(stream, ProbeCodec::new());
        let before = Instant::now();

        if let Err(e) = with_timeout(self.timeout, framed.send(payload.clone())).await {
            warn!("cannot send probe to {peer}: {e}");
            return Err(ProbeError::Send(e));
        }

        let echo = match with_timeout(self.timeout, next_frame(&mut framed)).await {
            Ok(echo) => echo,
            Err(e) => {
                warn!("cannot receive echo from {peer}: {e}");
                return Err(ProbeError::Receive(e));
            }
        };

        if echo != payload {
            warn!("cannot verify echo from {peer}: corrupt data");
            return Err(ProbeError::Corrupt);
        }

        let latency = before.elapsed();
        self.peers.record_latency(peer, latency);
        self.peers.set_pinged_at(peer, OffsetDateTime::now_utc());

        trace!("probed {peer} in {latency:?}");

        // The stream is dropped, and so closed, on every return path.
        Ok(latency)
    }

    /// Answers a probe received on an inbound stream.
    ///
    /// Probes from peers that aren't authorized are dropped without a response. Failures are
    /// logged and never surfaced to the remote peer.
    pub async fn echo<S: PeerStream>(&self, stream: S) {
        let peer = stream.remote_peer();
        debug!("echoing probe from {peer}");

        if !self.peers.is_authorized(&peer) {
            warn!("unauthorized probe from {peer}");
            return;
        }

        // Echo whatever arrives before the peer closes its side, up to a full payload.
        let mut framed = Framed::new(stream, ProbeCodec::accepting_short());

        let frame = match with_timeout(self.timeout, next_frame(&mut framed)).await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("cannot receive probe from {peer}: {e}");
                return;
            }
        };

        if let Err(e) = with_timeout(self.timeout, framed.send(frame)).await {
            warn!("cannot send echo to {peer}: {e}");
        }
    }
}

// Reads a single frame, a stream closed before any byte arrived is an unexpected EOF.
async fn next_frame<S: PeerStream>(framed: &mut Framed<S, ProbeCodec>) -> io::Result<Bytes> {
    framed
        .next()
        .await
        .unwrap_or_else(|| Err(io::ErrorKind::UnexpectedEof.into()))
}

// Bounds an I/O future, mapping an elapsed deadline to `io::ErrorKind::TimedOut`.
async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match timeout(duration, future).await {
        Ok(res) => res,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("timed out after {duration:?}"),
        )),
    }
}
