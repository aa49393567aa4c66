//! Probe failure types.

use std::io;

use thiserror::Error;

/// The ways an outbound probe can fail.
///
/// Only [`ProbeError::Connect`] is taken as evidence the peer is gone; every other failure is
/// reported without touching the routing table.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No stream could be opened to the peer.
    #[error("cannot connect: {0}")]
    Connect(#[source] io::Error),
    /// The probe payload couldn't be generated.
    #[error("cannot generate probe payload: {0}")]
    Randomness(#[source] rand::Error),
    /// Writing the payload failed or timed out.
    #[error("cannot send probe: {0}")]
    Send(#[source] io::Error),
    /// Reading the echo failed or timed out.
    #[error("cannot receive echo: {0}")]
    Receive(#[source] io::Error),
    /// The echo didn't match the payload.
    #[error("corrupt echo")]
    Corrupt,
}

impl ProbeError {
    /// Returns `true` if the probe ran out of time while sending or receiving.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Send(e) | Self::Receive(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Returns `true` if the failure should evict the peer.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connect(_))
    }
}
