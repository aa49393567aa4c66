//! The seams between the topology services and the network.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::core::id::Id;

/// An established bidirectional stream to a remote peer.
pub trait PeerStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// Returns the identifier of the peer at the other end.
    fn remote_peer(&self) -> Id;
}

/// The network host the topology services run on.
///
/// Transport, handshakes and encryption are the implementor's concern; this crate only opens
/// streams and asks for peers to be paired.
#[async_trait::async_trait]
pub trait Host: Send + Sync + 'static {
    type Stream: PeerStream + 'static;

    /// Opens a dedicated stream to the peer for the given protocol identifier.
    async fn new_stream(&self, peer: Id, protocol: &str) -> io::Result<Self::Stream>;

    /// Establishes a long-lived outbound stream to the peer.
    ///
    /// Successful pairings are recorded in the stream store by the caller, the host is
    /// expected to remove the peer from it once the stream closes.
    async fn pair(&self, peer: Id) -> io::Result<()>;
}
