//! Archive entry metadata.

use crate::codec::CompressionMethod;

/// One file recorded in the Central Directory.
///
/// Sizes, CRC and method come from the Central Directory (with ZIP64
/// overrides applied); the Local File Header's copies are never used for
/// sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Canonical path, unique within the archive.
    pub name: String,
    /// MS-DOS modification time, not interpreted.
    pub mod_time: u16,
    /// MS-DOS modification date, not interpreted.
    pub mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size in bytes.
    pub compressed_size: u64,
    /// Uncompressed size in bytes.
    pub uncompressed_size: u64,
    /// Offset of the Local File Header.
    pub lh_reloffs: u64,
    /// Compression method code.
    pub method: u16,
    /// Next disambiguation prefix to try when another entry has this name.
    pub(crate) counter: u32,
}

impl FileEntry {
    /// Classified compression method.
    pub fn compression_method(&self) -> CompressionMethod {
        CompressionMethod::from_code(self.method)
    }
}
