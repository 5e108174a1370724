//! Shared test utilities for integration tests.
//!
//! [`ZipBuilder`] writes small ZIP archives in memory so tests can exercise
//! every reader path without fixture files: stored, deflate and zstd
//! entries, ZIP64 records, encryption flags, duplicate names, archive
//! comments and arbitrary method codes.
//!
//! Note: `#![allow(dead_code)]` is required because each integration test file
//! compiles as a separate crate and may only use a subset of these helpers.

#![allow(dead_code)]

use std::io::Write;

use arcstream::checksum::{Checksum, Crc32};
use arcstream::stream::IoStream;
use arcstream::{ReadOptions, ZipReader};
use flate2::Compression;
use flate2::write::DeflateEncoder;

pub const STORED: u16 = 0;
pub const DEFLATE: u16 = 8;
pub const ZSTD: u16 = 93;
pub const ZSTD_DEPRECATED: u16 = 20;

/// Raw deflate, as stored in method-8 entries.
pub fn deflate_raw(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn zstd_compress(data: &[u8]) -> Vec<u8> {
    zstd::encode_all(data, 3).unwrap()
}

/// Deterministic pseudo-random bytes that still compress a little.
pub fn patterned(len: usize, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            if i % 7 < 3 { b'a' + (i % 26) as u8 } else { state as u8 }
        })
        .collect()
}

/// One entry to be written.
#[derive(Debug, Clone)]
pub struct TestEntry {
    pub name: String,
    /// Uncompressed contents.
    pub data: Vec<u8>,
    /// Bytes written after the local header.
    pub payload: Vec<u8>,
    pub method: u16,
    /// Method recorded in the local header.
    pub local_method: u16,
    pub flags: u16,
    pub crc: u32,
}

/// Offsets of the records written by [`ZipBuilder::build_with_layout`].
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub local_offsets: Vec<u64>,
    pub data_offsets: Vec<u64>,
    pub central_offsets: Vec<u64>,
    pub cd_offset: u64,
    pub eocdr_offset: u64,
}

/// In-memory ZIP writer for tests.
#[derive(Debug, Clone, Default)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    zip64: bool,
    comment: Vec<u8>,
    prefix: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, method: u16, data: &[u8], payload: Vec<u8>) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            data: data.to_vec(),
            payload,
            method,
            local_method: method,
            flags: 0,
            crc: Crc32::compute(data),
        });
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.push(name, STORED, data, data.to_vec())
    }

    pub fn deflate(self, name: &str, data: &[u8]) -> Self {
        self.push(name, DEFLATE, data, deflate_raw(data))
    }

    pub fn zstd(self, name: &str, data: &[u8]) -> Self {
        self.push(name, ZSTD, data, zstd_compress(data))
    }

    /// Zstandard under the older method code 20.
    pub fn zstd_deprecated(self, name: &str, data: &[u8]) -> Self {
        self.push(name, ZSTD_DEPRECATED, data, zstd_compress(data))
    }

    /// An entry with an arbitrary method code; `payload` doubles as its
    /// uncompressed contents.
    pub fn raw_method(self, name: &str, method: u16, payload: &[u8]) -> Self {
        self.push(name, method, payload, payload.to_vec())
    }

    /// A stored entry with the encryption flag set.
    pub fn encrypted(mut self, name: &str, data: &[u8]) -> Self {
        self = self.stored(name, data);
        self.last().flags |= 1;
        self
    }

    /// Records a different method in the last entry's local header.
    pub fn local_method(mut self, method: u16) -> Self {
        self.last().local_method = method;
        self
    }

    /// Overrides the CRC recorded for the last entry.
    pub fn crc(mut self, crc: u32) -> Self {
        self.last().crc = crc;
        self
    }

    /// Writes sizes and offsets through ZIP64 records.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Bytes placed before the first local header.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    fn last(&mut self) -> &mut TestEntry {
        self.entries.last_mut().expect("builder has no entries")
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_with_layout().0
    }

    pub fn build_with_layout(&self) -> (Vec<u8>, Layout) {
        let mut out = self.prefix.clone();
        let mut layout = Layout::default();
        let u32_or_sentinel = |v: u64| if self.zip64 { 0xFFFF_FFFF } else { v as u32 };

        for entry in &self.entries {
            layout.local_offsets.push(out.len() as u64);
            let mut extra = Vec::new();
            if self.zip64 {
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&16u16.to_le_bytes());
                extra.extend_from_slice(&(entry.data.len() as u64).to_le_bytes());
                extra.extend_from_slice(&(entry.payload.len() as u64).to_le_bytes());
            }
            out.extend_from_slice(&0x0403_4B50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&entry.flags.to_le_bytes());
            out.extend_from_slice(&entry.local_method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&0x21u16.to_le_bytes());
            out.extend_from_slice(&entry.crc.to_le_bytes());
            out.extend_from_slice(&u32_or_sentinel(entry.payload.len() as u64).to_le_bytes());
            out.extend_from_slice(&u32_or_sentinel(entry.data.len() as u64).to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&extra);
            layout.data_offsets.push(out.len() as u64);
            out.extend_from_slice(&entry.payload);
        }

        let cd_offset = out.len() as u64;
        layout.cd_offset = cd_offset;
        for (entry, &local) in self.entries.iter().zip(&layout.local_offsets) {
            layout.central_offsets.push(out.len() as u64);
            let mut extra = Vec::new();
            if self.zip64 {
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&24u16.to_le_bytes());
                extra.extend_from_slice(&(entry.data.len() as u64).to_le_bytes());
                extra.extend_from_slice(&(entry.payload.len() as u64).to_le_bytes());
                extra.extend_from_slice(&local.to_le_bytes());
            }
            out.extend_from_slice(&0x0201_4B50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&entry.flags.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&0x21u16.to_le_bytes());
            out.extend_from_slice(&entry.crc.to_le_bytes());
            out.extend_from_slice(&u32_or_sentinel(entry.payload.len() as u64).to_le_bytes());
            out.extend_from_slice(&u32_or_sentinel(entry.data.len() as u64).to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&u32_or_sentinel(local).to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&extra);
        }
        let cd_size = out.len() as u64 - cd_offset;
        let count = self.entries.len() as u64;

        if self.zip64 {
            let eocdr64_offset = out.len() as u64;
            out.extend_from_slice(&0x0606_4B50u32.to_le_bytes());
            out.extend_from_slice(&44u64.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&45u16.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&cd_size.to_le_bytes());
            out.extend_from_slice(&cd_offset.to_le_bytes());

            out.extend_from_slice(&0x0706_4B50u32.to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&eocdr64_offset.to_le_bytes());
            out.extend_from_slice(&1u32.to_le_bytes());
        }

        layout.eocdr_offset = out.len() as u64;
        let count16 = if self.zip64 { 0xFFFF } else { count as u16 };
        out.extend_from_slice(&0x0605_4B50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count16.to_le_bytes());
        out.extend_from_slice(&count16.to_le_bytes());
        out.extend_from_slice(&u32_or_sentinel(cd_size).to_le_bytes());
        out.extend_from_slice(&u32_or_sentinel(cd_offset).to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        (out, layout)
    }

    /// Builds the archive and opens it.
    pub fn open(&self) -> arcstream::Result<ZipReader> {
        open_bytes(self.build())
    }
}

pub fn open_bytes(bytes: Vec<u8>) -> arcstream::Result<ZipReader> {
    ZipReader::new(Box::new(IoStream::from_bytes(bytes)), "test.zip")
}

pub fn open_bytes_with(bytes: Vec<u8>, options: ReadOptions) -> arcstream::Result<ZipReader> {
    ZipReader::with_options(Box::new(IoStream::from_bytes(bytes)), "test.zip", options)
}

/// The three-entry archive used across tests: a stored `a.txt` holding
/// "hello world", a deflated `b.bin` of 100000 zeros, and a second stored
/// `a.txt` holding "again".
pub fn example_archive() -> ZipBuilder {
    ZipBuilder::new()
        .stored("a.txt", b"hello world")
        .deflate("b.bin", &vec![0u8; 100_000])
        .stored("a.txt", b"again")
}

/// Writes a 16-bit little-endian value into `bytes` at `offset`.
pub fn patch_u16(bytes: &mut [u8], offset: u64, value: u16) {
    let at = offset as usize;
    bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

/// Writes a 32-bit little-endian value into `bytes` at `offset`.
pub fn patch_u32(bytes: &mut [u8], offset: u64, value: u32) {
    let at = offset as usize;
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Builds the archive with the Central Directory uncompressed size of entry
/// `index` replaced by `size`.
pub fn patched_size(builder: ZipBuilder, index: usize, size: u32) -> Vec<u8> {
    let (mut bytes, layout) = builder.build_with_layout();
    patch_u32(&mut bytes, layout.central_offsets[index] + 24, size);
    bytes
}
