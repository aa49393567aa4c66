//! Node identifier types.

use std::{cmp::Ordering, fmt};

/// A 256-bit identifier that implements a non-euclidian XOR-based distance metric.
///
/// The bytes are little-endian: the last byte is the most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id {
    bytes: [u8; Self::BYTES],
}

impl Id {
    /// The size of the identifier in bytes.
    pub const BYTES: usize = 32;

    /// The size of the identifier in bits.
    pub const BITS: usize = 32 * 8;

    /// Creates a new identifier from the supplied bytes.
    pub fn new(bytes: [u8; Self::BYTES]) -> Self {
        Id { bytes }
    }

    /// Returns the bytes backing the identifier.
    pub fn bytes(&self) -> [u8; Self::BYTES] {
        self.bytes
    }

    #[cfg(test)]
    /// Convenience function for working with small identifiers during testing.
    pub fn from_u16(raw: u16) -> Self {
        let mut bytes = [0u8; Self::BYTES];
        bytes[..2].copy_from_slice(&raw.to_le_bytes());

        Self { bytes }
    }

    /// Generates a random identifier.
    pub fn rand() -> Self {
        use rand::{thread_rng, Fill};

        let mut rng = thread_rng();
        let mut bytes = [0u8; Self::BYTES];
        assert!(bytes.try_fill(&mut rng).is_ok());

        Self { bytes }
    }

    /// Returns the XOR distance between two identifiers.
    pub fn distance(&self, other: &Id) -> Distance {
        let mut bytes = [0u8; Self::BYTES];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self.bytes[i] ^ other.bytes[i];
        }

        Distance(bytes)
    }

    /// Computes the log2 of the XOR-based distance between two identifiers. This is the index of
    /// the bucket the other identifier belongs in, `None` if the identifiers are equal.
    pub fn log2_distance(&self, other: &Id) -> Option<u32> {
        // Search process:
        //
        // [2, 1, 0, 0] <- array bytes in LE
        //  0  1  2  3  <- i
        //
        // The most-significant byte is the last non-zero one when reading left to right, so we
        // walk the array in reverse while keeping the original index, then add the position of
        // the most-significant bit within that byte.
        self.distance(other)
            .0
            .iter()
            .enumerate()
            .rev()
            .find(|(_, byte)| byte != &&0b0)
            // The left shift multiplies the index by 8 to get its value in bits.
            .map(|(i, byte)| Self::msb(*byte) + ((i as u32) << 3))
    }

    // Returns the position of the most-significant bit set in a byte (0-indexed).
    fn msb(n: u8) -> u32 {
        debug_assert_ne!(n, 0);
        // Safety: can't be 0 - 1.
        u8::BITS - n.leading_zeros() - 1
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Most-significant byte first, so the printed form sorts like the distance does.
        for byte in self.bytes.iter().rev() {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

/// The XOR distance between two identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Distance([u8; Id::BYTES]);

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        // Compare from the most-significant byte down.
        self.0.iter().rev().cmp(other.0.iter().rev())
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
