//! Fixed-size ZIP records.
//!
//! Each record type knows its on-disk size and decodes itself from a byte
//! array of exactly that size. Signatures are validated here; semantic checks
//! (split archives, offsets within the file) belong to the reader.

use super::reader::{read_u32_le, read_u64_le, u16_at, u32_at, u64_at};
use super::{
    CENTRAL_HEADER_SIGNATURE, EOCDR_SIGNATURE, LOCAL_HEADER_SIGNATURE, ZIP64_EOCDR_SIGNATURE,
    ZIP64_LOCATOR_SIGNATURE, sentinel,
};
use crate::{Error, Result};

fn expect_signature(record: &[u8], signature: u32, offset: u64, what: &str) -> Result<()> {
    let found = u32_at(record, 0);
    if found != signature {
        return Err(Error::CorruptHeader {
            offset,
            reason: format!(
                "bad {} signature {:#010x} (expected {:#010x})",
                what, found, signature
            ),
        });
    }
    Ok(())
}

/// End of Central Directory Record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u16,
    /// Disk where the Central Directory starts.
    pub cd_start_disk: u16,
    /// Central Directory entries on this disk.
    pub disk_entries: u16,
    /// Total Central Directory entries.
    pub total_entries: u16,
    /// Central Directory size in bytes.
    pub cd_size: u32,
    /// Central Directory offset from the start of the archive.
    pub cd_offset: u32,
    /// Length of the trailing archive comment.
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    /// On-disk size without the comment.
    pub const SIZE: usize = 22;

    /// Decodes a record whose signature was located by scanning.
    pub fn parse(record: &[u8; Self::SIZE], offset: u64) -> Result<Self> {
        expect_signature(record, EOCDR_SIGNATURE, offset, "end of central directory")?;
        Ok(Self {
            disk_number: u16_at(record, 4),
            cd_start_disk: u16_at(record, 6),
            disk_entries: u16_at(record, 8),
            total_entries: u16_at(record, 10),
            cd_size: u32_at(record, 12),
            cd_offset: u32_at(record, 16),
            comment_len: u16_at(record, 20),
        })
    }

    /// Returns true if any field holds its ZIP64 sentinel.
    pub fn needs_zip64(&self) -> bool {
        [
            self.disk_number,
            self.cd_start_disk,
            self.disk_entries,
            self.total_entries,
        ]
        .contains(&sentinel::U16)
            || self.cd_size == sentinel::U32
            || self.cd_offset == sentinel::U32
    }
}

/// ZIP64 End of Central Directory Locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64Locator {
    /// Disk holding the ZIP64 EOCDR.
    pub eocdr64_disk: u32,
    /// Offset of the ZIP64 EOCDR.
    pub eocdr64_offset: u64,
    /// Total number of disks.
    pub total_disks: u32,
}

impl Zip64Locator {
    /// On-disk size.
    pub const SIZE: usize = 20;

    /// Decodes a locator read at `offset`.
    pub fn parse(record: &[u8; Self::SIZE], offset: u64) -> Result<Self> {
        expect_signature(record, ZIP64_LOCATOR_SIGNATURE, offset, "ZIP64 locator")?;
        Ok(Self {
            eocdr64_disk: u32_at(record, 4),
            eocdr64_offset: u64_at(record, 8),
            total_disks: u32_at(record, 16),
        })
    }
}

/// ZIP64 End of Central Directory Record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zip64EndOfCentralDirectory {
    /// Number of this disk.
    pub disk_number: u32,
    /// Disk where the Central Directory starts.
    pub cd_start_disk: u32,
    /// Central Directory entries on this disk.
    pub disk_entries: u64,
    /// Total Central Directory entries.
    pub total_entries: u64,
    /// Central Directory size in bytes.
    pub cd_size: u64,
    /// Central Directory offset from the start of the archive.
    pub cd_offset: u64,
}

impl Zip64EndOfCentralDirectory {
    /// On-disk size of the fixed part.
    pub const SIZE: usize = 56;

    /// Decodes a record read at `offset`.
    pub fn parse(record: &[u8; Self::SIZE], offset: u64) -> Result<Self> {
        expect_signature(record, ZIP64_EOCDR_SIGNATURE, offset, "ZIP64 end of central directory")?;
        Ok(Self {
            disk_number: u32_at(record, 16),
            cd_start_disk: u32_at(record, 20),
            disk_entries: u64_at(record, 24),
            total_entries: u64_at(record, 32),
            cd_size: u64_at(record, 40),
            cd_offset: u64_at(record, 48),
        })
    }
}

/// Central Directory File Header (fixed part).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralHeader {
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method code.
    pub method: u16,
    /// MS-DOS modification time.
    pub mod_time: u16,
    /// MS-DOS modification date.
    pub mod_date: u16,
    /// CRC-32 of the uncompressed data.
    pub crc32: u32,
    /// Compressed size, or the ZIP64 sentinel.
    pub compressed_size: u32,
    /// Uncompressed size, or the ZIP64 sentinel.
    pub uncompressed_size: u32,
    /// Length of the file name that follows.
    pub name_len: u16,
    /// Length of the extra field area.
    pub extra_len: u16,
    /// Length of the file comment.
    pub comment_len: u16,
    /// Disk where the entry starts, or the ZIP64 sentinel.
    pub disk_start: u16,
    /// Offset of the Local File Header, or the ZIP64 sentinel.
    pub lh_reloffs: u32,
}

impl CentralHeader {
    /// On-disk size of the fixed part.
    pub const SIZE: usize = 46;

    /// Decodes a header read at `offset`.
    pub fn parse(record: &[u8; Self::SIZE], offset: u64) -> Result<Self> {
        expect_signature(record, CENTRAL_HEADER_SIGNATURE, offset, "central directory header")?;
        Ok(Self {
            flags: u16_at(record, 8),
            method: u16_at(record, 10),
            mod_time: u16_at(record, 12),
            mod_date: u16_at(record, 14),
            crc32: u32_at(record, 16),
            compressed_size: u32_at(record, 20),
            uncompressed_size: u32_at(record, 24),
            name_len: u16_at(record, 28),
            extra_len: u16_at(record, 30),
            comment_len: u16_at(record, 32),
            disk_start: u16_at(record, 34),
            lh_reloffs: u32_at(record, 42),
        })
    }

    /// Length of the variable part (name, extra, comment).
    pub fn variable_len(&self) -> usize {
        self.name_len as usize + self.extra_len as usize + self.comment_len as usize
    }
}

/// Local File Header (fixed part).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHeader {
    /// General purpose bit flags.
    pub flags: u16,
    /// Compression method code.
    pub method: u16,
    /// Length of the file name that follows.
    pub name_len: u16,
    /// Length of the extra field area.
    pub extra_len: u16,
}

impl LocalHeader {
    /// On-disk size of the fixed part.
    pub const SIZE: usize = 30;

    /// Decodes a header read at `offset`.
    pub fn parse(record: &[u8; Self::SIZE], offset: u64) -> Result<Self> {
        expect_signature(record, LOCAL_HEADER_SIGNATURE, offset, "local file header")?;
        Ok(Self {
            flags: u16_at(record, 6),
            method: u16_at(record, 8),
            name_len: u16_at(record, 26),
            extra_len: u16_at(record, 28),
        })
    }

    /// Bytes between the end of the fixed header and the entry data.
    pub fn variable_len(&self) -> u64 {
        u64::from(self.name_len) + u64::from(self.extra_len)
    }
}

/// One `(id, data)` record of an extra field area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraField<'a> {
    /// Header ID.
    pub id: u16,
    /// Record payload.
    pub data: &'a [u8],
}

/// An extra field record that does not fit in its area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraFieldOverrun {
    /// Offset of the bad record within the extra area.
    pub at: usize,
}

/// Iterates the records of an extra field area.
///
/// Yields an [`ExtraFieldOverrun`] (and stops) if a record header or its
/// payload runs past the end of the area.
pub fn extra_fields(area: &[u8]) -> ExtraFields<'_> {
    ExtraFields { area, pos: 0 }
}

/// Iterator returned by [`extra_fields`].
#[derive(Debug, Clone)]
pub struct ExtraFields<'a> {
    area: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for ExtraFields<'a> {
    type Item = std::result::Result<ExtraField<'a>, ExtraFieldOverrun>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.area.len() {
            return None;
        }
        let at = self.pos;
        let rest = &self.area[at..];
        if rest.len() < 4 {
            self.pos = self.area.len();
            return Some(Err(ExtraFieldOverrun { at }));
        }
        let id = u16_at(rest, 0);
        let len = u16_at(rest, 2) as usize;
        if rest.len() - 4 < len {
            self.pos = self.area.len();
            return Some(Err(ExtraFieldOverrun { at }));
        }
        self.pos = at + 4 + len;
        Some(Ok(ExtraField {
            id,
            data: &rest[4..4 + len],
        }))
    }
}

/// Values a ZIP64 extended information field may carry.
///
/// Only the fields whose Central Directory counterpart holds a sentinel are
/// present, always in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Zip64Extra {
    /// Uncompressed size.
    pub uncompressed_size: Option<u64>,
    /// Compressed size.
    pub compressed_size: Option<u64>,
    /// Local File Header offset.
    pub lh_reloffs: Option<u64>,
    /// Starting disk number.
    pub disk_start: Option<u32>,
}

impl Zip64Extra {
    /// Reads the sentinel-flagged subset described by `header` from `data`.
    ///
    /// Returns `None` if `data` is too short for the fields it must hold.
    pub fn parse(data: &[u8], header: &CentralHeader) -> Option<Self> {
        let mut r = data;
        let mut extra = Zip64Extra::default();
        if header.uncompressed_size == sentinel::U32 {
            extra.uncompressed_size = Some(read_u64_le(&mut r).ok()?);
        }
        if header.compressed_size == sentinel::U32 {
            extra.compressed_size = Some(read_u64_le(&mut r).ok()?);
        }
        if header.lh_reloffs == sentinel::U32 {
            extra.lh_reloffs = Some(read_u64_le(&mut r).ok()?);
        }
        if header.disk_start == sentinel::U16 {
            extra.disk_start = Some(read_u32_le(&mut r).ok()?);
        }
        Some(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eocdr(total: u16, cd_size: u32, cd_offset: u32) -> [u8; 22] {
        let mut r = [0u8; 22];
        r[..4].copy_from_slice(&EOCDR_SIGNATURE.to_le_bytes());
        r[8..10].copy_from_slice(&total.to_le_bytes());
        r[10..12].copy_from_slice(&total.to_le_bytes());
        r[12..16].copy_from_slice(&cd_size.to_le_bytes());
        r[16..20].copy_from_slice(&cd_offset.to_le_bytes());
        r
    }

    #[test]
    fn test_eocdr_parse() {
        let rec = EndOfCentralDirectory::parse(&eocdr(3, 150, 400), 550).unwrap();
        assert_eq!(rec.total_entries, 3);
        assert_eq!(rec.disk_entries, 3);
        assert_eq!(rec.cd_size, 150);
        assert_eq!(rec.cd_offset, 400);
        assert!(!rec.needs_zip64());
    }

    #[test]
    fn test_eocdr_sentinels() {
        assert!(EndOfCentralDirectory::parse(&eocdr(0xFFFF, 1, 1), 0).unwrap().needs_zip64());
        assert!(EndOfCentralDirectory::parse(&eocdr(1, 1, 0xFFFF_FFFF), 0).unwrap().needs_zip64());
    }

    #[test]
    fn test_bad_signature_reports_offset() {
        let mut rec = [0u8; 20];
        rec[..4].copy_from_slice(b"PK\x01\x02");
        let err = Zip64Locator::parse(&rec, 0x1234).unwrap_err();
        assert!(matches!(err, Error::CorruptHeader { offset: 0x1234, .. }));
    }

    #[test]
    fn test_central_header_fields() {
        let mut rec = [0u8; 46];
        rec[..4].copy_from_slice(&CENTRAL_HEADER_SIGNATURE.to_le_bytes());
        rec[8..10].copy_from_slice(&1u16.to_le_bytes());
        rec[10..12].copy_from_slice(&8u16.to_le_bytes());
        rec[16..20].copy_from_slice(&0xCAFE_BABEu32.to_le_bytes());
        rec[28..30].copy_from_slice(&5u16.to_le_bytes());
        rec[30..32].copy_from_slice(&12u16.to_le_bytes());
        rec[32..34].copy_from_slice(&2u16.to_le_bytes());
        rec[42..46].copy_from_slice(&0x100u32.to_le_bytes());
        let h = CentralHeader::parse(&rec, 0).unwrap();
        assert_eq!(h.flags, 1);
        assert_eq!(h.method, 8);
        assert_eq!(h.crc32, 0xCAFE_BABE);
        assert_eq!(h.variable_len(), 19);
        assert_eq!(h.lh_reloffs, 0x100);
    }

    #[test]
    fn test_extra_field_walk() {
        let area = [
            0x55, 0x54, 0x01, 0x00, 0xAA, // id 0x5455, 1 byte
            0x01, 0x00, 0x08, 0x00, 1, 2, 3, 4, 5, 6, 7, 8, // id 1, 8 bytes
        ];
        let fields: Vec<_> = extra_fields(&area).collect::<std::result::Result<_, _>>().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].id, 0x5455);
        assert_eq!(fields[1].id, 0x0001);
        assert_eq!(fields[1].data.len(), 8);
    }

    #[test]
    fn test_extra_field_overrun() {
        let area = [0x01, 0x00, 0x10, 0x00, 1, 2];
        let mut iter = extra_fields(&area);
        assert_eq!(iter.next(), Some(Err(ExtraFieldOverrun { at: 0 })));
        assert_eq!(iter.next(), None);

        let partial = [0x55, 0x54, 0x00, 0x00, 0x01];
        let results: Vec<_> = extra_fields(&partial).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1], Err(ExtraFieldOverrun { at: 4 }));
    }

    #[test]
    fn test_zip64_extra_subset_order() {
        let header = CentralHeader {
            flags: 0,
            method: 0,
            mod_time: 0,
            mod_date: 0,
            crc32: 0,
            compressed_size: 100,
            uncompressed_size: sentinel::U32,
            name_len: 0,
            extra_len: 0,
            comment_len: 0,
            disk_start: 0,
            lh_reloffs: sentinel::U32,
        };
        let mut data = Vec::new();
        data.extend_from_slice(&0x1_0000_0000u64.to_le_bytes());
        data.extend_from_slice(&0x42u64.to_le_bytes());
        let extra = Zip64Extra::parse(&data, &header).unwrap();
        assert_eq!(extra.uncompressed_size, Some(0x1_0000_0000));
        assert_eq!(extra.compressed_size, None);
        assert_eq!(extra.lh_reloffs, Some(0x42));
        assert_eq!(extra.disk_start, None);

        assert!(Zip64Extra::parse(&data[..12], &header).is_none());
    }
}
