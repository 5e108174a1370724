//! Checksum computation utilities.
//!
//! This module provides CRC-32 computation for verifying entry data
//! integrity, plus [`RunningCrc`], the incremental accumulator shared by the
//! seekable filters.
//!
//! # CRC-32
//!
//! ZIP stores one CRC-32 (IEEE 802.3 polynomial) per entry, computed over
//! the decompressed data.
//!
//! # Example
//!
//! ```rust
//! use arcstream::checksum::{Checksum, Crc32};
//!
//! let mut crc32 = Crc32::new();
//! crc32.update(b"Hello, ");
//! crc32.update(b"World!");
//! assert_eq!(crc32.finalize(), Crc32::compute(b"Hello, World!"));
//! ```

use std::io::{self, Read};

use crate::READ_BUFFER_SIZE;

/// Common trait for checksum computation.
pub trait Checksum: Default + Clone {
    /// The output type of this checksum.
    type Output: Copy + Eq + std::fmt::Debug;

    /// Creates a new checksum calculator.
    fn new() -> Self;

    /// Updates the checksum with additional data.
    fn update(&mut self, data: &[u8]);

    /// Finishes the checksum computation and returns the value.
    fn finalize(&self) -> Self::Output;

    /// Resets the checksum to its initial state.
    fn reset(&mut self);

    /// Computes the checksum of a single slice in one call.
    fn compute(data: &[u8]) -> Self::Output {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }

    /// Computes the checksum by reading from a reader.
    fn compute_reader<R: Read>(reader: &mut R) -> io::Result<Self::Output> {
        let mut hasher = Self::new();
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hasher.finalize())
    }
}

/// CRC-32 checksum calculator.
///
/// Uses the IEEE 802.3 polynomial (standard for Ethernet, ZIP, gzip, etc.).
///
/// ```rust
/// use arcstream::checksum::{Crc32, Checksum};
///
/// let crc = Crc32::compute(b"Hello, World!");
/// assert_eq!(crc, 0xEC4AC3D0);
/// ```
#[derive(Clone)]
pub struct Crc32 {
    hasher: crc32fast::Hasher,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Crc32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crc32")
            .field("current", &self.hasher.clone().finalize())
            .finish()
    }
}

impl Checksum for Crc32 {
    type Output = u32;

    fn new() -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn finalize(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn reset(&mut self) {
        self.hasher.reset();
    }
}

/// Incremental CRC-32 over a stream that may be read out of order.
///
/// Bytes are folded in only when they extend the contiguous hashed prefix
/// (the high-water mark), so re-reading data that was already hashed never
/// hashes it twice, and data reached by skipping ahead is never hashed
/// until the gap before it has been read.
#[derive(Debug, Clone, Default)]
pub struct RunningCrc {
    crc: Crc32,
    hashed: u64,
}

impl RunningCrc {
    /// Creates an accumulator with nothing hashed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `data`, which was read at stream offset `offset`, into the CRC.
    ///
    /// Only the part of `data` past the high-water mark is hashed, and only
    /// if `data` starts at or before it.
    pub fn fold(&mut self, offset: u64, data: &[u8]) {
        let end = offset + data.len() as u64;
        if offset <= self.hashed && end > self.hashed {
            let skip = (self.hashed - offset) as usize;
            self.crc.update(&data[skip..]);
            self.hashed = end;
        }
    }

    /// Number of leading stream bytes covered by the CRC.
    pub fn hashed(&self) -> u64 {
        self.hashed
    }

    /// Current CRC value over the hashed prefix.
    pub fn value(&self) -> u32 {
        self.crc.finalize()
    }

    /// Forgets everything hashed so far.
    pub fn reset(&mut self) {
        self.crc.reset();
        self.hashed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_crc32_basic() {
        let crc = Crc32::compute(b"Hello, World!");
        // CRC-32 IEEE 802.3 (ISO 3309) value
        assert_eq!(crc, 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_empty() {
        let crc = Crc32::compute(b"");
        assert_eq!(crc, 0);
    }

    #[test]
    fn test_crc32_incremental() {
        let mut hasher = Crc32::new();
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_reset() {
        let mut hasher = Crc32::new();
        hasher.update(b"test");
        hasher.reset();
        hasher.update(b"Hello, World!");
        assert_eq!(hasher.finalize(), 0xEC4AC3D0);
    }

    #[test]
    fn test_crc32_reader() {
        let mut cursor = Cursor::new(b"Hello, World!".to_vec());
        let crc = Crc32::compute_reader(&mut cursor).unwrap();
        assert_eq!(crc, 0xEC4AC3D0);
    }

    #[test]
    fn test_running_crc_rereads_not_double_hashed() {
        let data = b"Hello, World!";
        let mut running = RunningCrc::new();
        running.fold(0, &data[..5]);
        // Overlapping re-read of the first bytes plus new ones
        running.fold(2, &data[2..9]);
        running.fold(0, &data[..9]);
        running.fold(9, &data[9..]);
        assert_eq!(running.hashed(), data.len() as u64);
        assert_eq!(running.value(), 0xEC4AC3D0);
    }

    #[test]
    fn test_running_crc_gap_is_ignored() {
        let mut running = RunningCrc::new();
        running.fold(4, b"later");
        assert_eq!(running.hashed(), 0);
        assert_eq!(running.value(), 0);
    }

    #[test]
    fn test_running_crc_reset() {
        let mut running = RunningCrc::new();
        running.fold(0, b"junk");
        running.reset();
        running.fold(0, b"Hello, World!");
        assert_eq!(running.value(), 0xEC4AC3D0);
    }
}
