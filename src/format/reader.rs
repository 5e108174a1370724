//! Low-level binary reading utilities for ZIP record parsing.
//!
//! All multi-byte ZIP fields are little-endian. Record parsers read whole
//! fixed-size records from the archive stream first and then decode fields
//! from the byte slice with these helpers (`&[u8]` implements `Read`).

use std::io::{self, Read};

/// Reads an unsigned 16-bit little-endian integer.
pub fn read_u16_le<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Reads an unsigned 32-bit little-endian integer.
pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Reads an unsigned 64-bit little-endian integer.
pub fn read_u64_le<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Decodes a little-endian u16 at `offset` of a fixed-size record.
///
/// # Panics
///
/// Panics if the record is shorter than `offset + 2`; callers index
/// records whose length is checked by type.
pub fn u16_at(record: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

/// Decodes a little-endian u32 at `offset` of a fixed-size record.
pub fn u32_at(record: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    ])
}

/// Decodes a little-endian u64 at `offset` of a fixed-size record.
pub fn u64_at(record: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&record[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}
