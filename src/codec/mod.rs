//! Compression codecs for ZIP entries.
//!
//! This module maps ZIP compression method codes onto the decoders this
//! crate can drive, and names the ones it cannot.
//!
//! | Code | Method | Decoder |
//! |------|--------|---------|
//! | 0 | Stored | [`StreamViewFilter`](crate::filter::StreamViewFilter) |
//! | 8 | Deflate | [`deflate::ZlInflateFilter`] (feature `deflate`) |
//! | 20, 93 | Zstandard | [`zstd::ZstdDecompressFilter`] (feature `zstd`) |

#[cfg(feature = "deflate")]
pub mod deflate;

#[cfg(feature = "zstd")]
pub mod zstd;

use std::fmt;

/// ZIP compression method codes.
pub mod method {
    /// Stored (no compression).
    pub const STORED: u16 = 0;
    /// Deflate compression.
    pub const DEFLATE: u16 = 8;
    /// Zstandard, as assigned by early APPNOTE revisions.
    pub const ZSTD_DEPRECATED: u16 = 20;
    /// Zstandard.
    pub const ZSTD: u16 = 93;

    /// Registered method names, sorted by code.
    static NAMES: &[(u16, &str)] = &[
        (0, "Stored"),
        (1, "Shrink"),
        (2, "Reduce (factor 1)"),
        (3, "Reduce (factor 2)"),
        (4, "Reduce (factor 3)"),
        (5, "Reduce (factor 4)"),
        (6, "Implode"),
        (8, "Deflate"),
        (9, "Deflate64"),
        (10, "PKWARE DCL Implode"),
        (12, "BZIP2"),
        (14, "LZMA"),
        (16, "IBM z/OS CMPSC"),
        (18, "IBM TERSE"),
        (19, "IBM LZ77 z"),
        (20, "Zstandard (deprecated)"),
        (93, "Zstandard"),
        (94, "MP3"),
        (95, "XZ"),
        (96, "JPEG"),
        (97, "WavPack"),
        (98, "PPMd"),
        (99, "AES"),
    ];

    /// Returns the registered name for a method code.
    pub fn name(code: u16) -> Option<&'static str> {
        NAMES
            .binary_search_by_key(&code, |&(c, _)| c)
            .ok()
            .map(|i| NAMES[i].1)
    }
}

/// A ZIP compression method, classified by what this crate can do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Method 0.
    Stored,
    /// Method 8.
    Deflate,
    /// Method 93, or the older assignment 20.
    Zstd,
    /// A registered method with no decoder here.
    Unsupported {
        /// Method code.
        code: u16,
        /// Registered name.
        name: &'static str,
    },
    /// A code with no registered meaning.
    Unknown(u16),
}

impl CompressionMethod {
    /// Classifies a method code.
    pub fn from_code(code: u16) -> Self {
        match code {
            method::STORED => CompressionMethod::Stored,
            method::DEFLATE => CompressionMethod::Deflate,
            method::ZSTD | method::ZSTD_DEPRECATED => CompressionMethod::Zstd,
            _ => match method::name(code) {
                Some(name) => CompressionMethod::Unsupported { code, name },
                None => CompressionMethod::Unknown(code),
            },
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            CompressionMethod::Stored => "Stored",
            CompressionMethod::Deflate => "Deflate",
            CompressionMethod::Zstd => "Zstandard",
            CompressionMethod::Unsupported { name, .. } => name,
            CompressionMethod::Unknown(_) => "Unknown",
        }
    }

    /// Returns true if this build can decode the method.
    pub fn is_supported(&self) -> bool {
        match self {
            CompressionMethod::Stored => true,
            CompressionMethod::Deflate => cfg!(feature = "deflate"),
            CompressionMethod::Zstd => cfg!(feature = "zstd"),
            _ => false,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMethod::Unknown(code) => write!(f, "unknown method {}", code),
            other => f.write_str(other.name()),
        }
    }
}
