//! Options for opening archives.

use crate::{Error, Result};

/// Default ceiling on Central Directory entries.
pub const DEFAULT_MAX_ENTRIES: u64 = 65_535;

/// Default ceiling on an entry's compressed or uncompressed size (2^48 − 1).
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = (1 << 48) - 1;

/// Configuration for opening a ZIP archive.
///
/// The limits bound how much memory and work a hostile archive can demand
/// before any entry is read.
///
/// # Example
///
/// ```rust
/// use arcstream::read::ReadOptions;
///
/// // Default configuration (65535 entries, 2^48 - 1 byte entries, CRC checked)
/// let options = ReadOptions::default();
///
/// // Tighter limits for untrusted input
/// let options = ReadOptions::new()
///     .max_entries(1_000)
///     .max_entry_size(1 << 32)
///     .verify_crc(true);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum number of Central Directory entries.
    ///
    /// Default: 65535.
    pub max_entries: u64,

    /// Maximum compressed or uncompressed size of a single entry.
    ///
    /// Default: 2^48 − 1.
    pub max_entry_size: u64,

    /// Verify each entry's CRC-32 once it has been read in full.
    ///
    /// Default: true.
    pub verify_crc: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            verify_crc: true,
        }
    }
}

impl ReadOptions {
    /// Creates options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of entries.
    pub fn max_entries(mut self, count: u64) -> Self {
        self.max_entries = count;
        self
    }

    /// Sets the maximum entry size.
    pub fn max_entry_size(mut self, bytes: u64) -> Self {
        self.max_entry_size = bytes;
        self
    }

    /// Sets whether to verify CRC checksums.
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Validates the options.
    pub fn validate(&self) -> Result<()> {
        if self.max_entry_size > DEFAULT_MAX_ENTRY_SIZE {
            return Err(Error::InvalidOptions(format!(
                "max_entry_size {} exceeds the 2^48 - 1 ceiling",
                self.max_entry_size
            )));
        }
        if self.max_entries > DEFAULT_MAX_ENTRIES {
            return Err(Error::InvalidOptions(format!(
                "max_entries {} exceeds {}",
                self.max_entries, DEFAULT_MAX_ENTRIES
            )));
        }
        Ok(())
    }
}
