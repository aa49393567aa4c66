//! Framing for the probe protocol.
//!
//! A probe is a single fixed-size frame of [`PAYLOAD_LEN`] bytes, echoed back verbatim. There is
//! no length prefix and no versioning.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// The size of a probe payload in bytes.
pub const PAYLOAD_LEN: usize = 32;

/// Splits a byte stream into probe frames, meant to be driven through
/// [`Framed`](tokio_util::codec::Framed).
///
/// `decode` only yields complete frames. When the remote closes its side early, the leftover bytes
/// are yielded as a short frame if the codec was created with [`ProbeCodec::accepting_short`],
/// and are an [`io::ErrorKind::UnexpectedEof`] error otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProbeCodec {
    short_frames: bool,
}

impl ProbeCodec {
    /// A codec that only yields full frames.
    pub fn new() -> Self {
        Self::default()
    }

    /// A codec that also yields the bytes received before the remote closed its side, which lets
    /// the responder echo short payloads.
    pub fn accepting_short() -> Self {
        Self { short_frames: true }
    }
}

impl Decoder for ProbeCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < PAYLOAD_LEN {
            src.reserve(PAYLOAD_LEN - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(PAYLOAD_LEN).freeze()))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        if src.is_empty() {
            Ok(None)
        } else if self.short_frames {
            Ok(Some(src.split().freeze()))
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream closed after {} of {PAYLOAD_LEN} bytes", src.len()),
            ))
        }
    }
}

impl Encoder<Bytes> for ProbeCodec {
    type Error = io::Error;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if frame.len() > PAYLOAD_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("probe frame exceeds {PAYLOAD_LEN} bytes"),
            ));
        }

        dst.reserve(frame.len());
        dst.put(frame);

        Ok(())
    }
}
