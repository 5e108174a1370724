//! ZIP archive format constants, record layouts, and low-level parsing
//! utilities.
//!
//! An archive is read from the back: the End of Central Directory Record
//! (optionally redirected through the ZIP64 locator and record) names the
//! Central Directory, which holds one header per entry pointing at that
//! entry's Local File Header and data.
//!
//! ```text
//! [LFH][data] [LFH][data] ... [CDFH]... [ZIP64 EOCDR][ZIP64 locator][EOCDR][comment]
//! ```

pub mod reader;
pub mod records;

/// Local File Header signature (`PK\x03\x04`).
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;

/// Central Directory File Header signature (`PK\x01\x02`).
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4B50;

/// End of Central Directory Record signature (`PK\x05\x06`).
pub const EOCDR_SIGNATURE: u32 = 0x0605_4B50;

/// ZIP64 End of Central Directory Locator signature (`PK\x06\x07`).
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4B50;

/// ZIP64 End of Central Directory Record signature (`PK\x06\x06`).
pub const ZIP64_EOCDR_SIGNATURE: u32 = 0x0606_4B50;

/// Extra field header ID of the ZIP64 extended information record.
pub const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Longest possible archive comment.
pub const MAX_COMMENT_LEN: usize = 0xFFFF;

/// General purpose flag bits.
pub mod flags {
    /// The entry is encrypted.
    pub const ENCRYPTED: u16 = 1 << 0;
}

/// Field values meaning "see the ZIP64 record".
pub mod sentinel {
    /// 16-bit sentinel.
    pub const U16: u16 = 0xFFFF;
    /// 32-bit sentinel.
    pub const U32: u32 = 0xFFFF_FFFF;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signatures_spell_pk() {
        assert_eq!(&LOCAL_HEADER_SIGNATURE.to_le_bytes(), b"PK\x03\x04");
        assert_eq!(&CENTRAL_HEADER_SIGNATURE.to_le_bytes(), b"PK\x01\x02");
        assert_eq!(&EOCDR_SIGNATURE.to_le_bytes(), b"PK\x05\x06");
        assert_eq!(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes(), b"PK\x06\x07");
        assert_eq!(&ZIP64_EOCDR_SIGNATURE.to_le_bytes(), b"PK\x06\x06");
    }
}
