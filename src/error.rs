//! Error types for archive and stream operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when opening archives and reading entry streams, along with
//! a convenient [`Result<T>`] type alias.
//!
//! # Error Categories
//!
//! | Category | Variants | Scope |
//! |----------|----------|-------|
//! | Structural | [`InvalidFormat`][Error::InvalidFormat], [`CorruptHeader`][Error::CorruptHeader], [`UnsupportedFeature`][Error::UnsupportedFeature], [`ResourceLimitExceeded`][Error::ResourceLimitExceeded] | Whole archive fails to open |
//! | Per-entry | [`MethodMismatch`][Error::MethodMismatch], [`Encrypted`][Error::Encrypted], [`UnsupportedMethod`][Error::UnsupportedMethod] | Only that entry fails to open |
//! | Integrity | [`CrcMismatch`][Error::CrcMismatch], [`UnexpectedEof`][Error::UnexpectedEof], [`SeekReplayEof`][Error::SeekReplayEof] | Raised lazily by `read`/`seek`/`size` |
//! | Capability | [`NotImplemented`][Error::NotImplemented] | Write-side operations on read-only objects |
//!
//! ```rust,no_run
//! use arcstream::{Error, ZipReader, stream::IoStream};
//!
//! fn open(path: &str) -> arcstream::Result<ZipReader> {
//!     let stream = IoStream::from_path(path)?;
//!     match ZipReader::new(Box::new(stream), path) {
//!         Err(e) if e.is_structural() => {
//!             eprintln!("not a usable ZIP archive: {}", e);
//!             Err(e)
//!         }
//!         other => other,
//!     }
//! }
//! ```

use std::io;

/// The main error type for archive and stream operations.
///
/// Every message that originates from an archive carries the archive path
/// (or the `archive/entry` label of a stream) so that errors surfacing far
/// from the open call remain attributable.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred in the underlying byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive structure is invalid or not recognized.
    ///
    /// Returned for missing records, bad signatures found while scanning,
    /// malformed extra fields and out-of-range offsets.
    #[error("Invalid ZIP format: {0}")]
    InvalidFormat(String),

    /// A fixed-size record at a known offset did not carry its signature.
    #[error("Corrupt header at offset {offset:#x}: {reason}")]
    CorruptHeader {
        /// The byte offset of the record.
        offset: u64,
        /// A description of the corruption.
        reason: String,
    },

    /// A feature required by the archive or stream is not supported.
    ///
    /// Split archives and non-seekable sources end up here.
    #[error("Unsupported feature in {context}: {feature}")]
    UnsupportedFeature {
        /// Archive path or stream label.
        context: String,
        /// The name of the unsupported feature.
        feature: &'static str,
    },

    /// The entry uses a registered compression method this build cannot decode.
    #[error("Compression method {name} ({method}) not implemented for {context}")]
    UnsupportedMethod {
        /// The ZIP method code.
        method: u16,
        /// Registered human-readable codec name.
        name: &'static str,
        /// Archive path and entry name.
        context: String,
    },

    /// The operation is not implemented for this object.
    ///
    /// Entry streams and archive readers are read-only; writes, truncation,
    /// directory creation, unlinking and renaming all fail with this error.
    /// Unknown compression method codes are reported here as well.
    #[error("{operation} not implemented for {context}")]
    NotImplemented {
        /// The operation that was attempted.
        operation: String,
        /// Archive path or stream label.
        context: String,
    },

    /// The entry is encrypted.
    #[error("Entry {path}: decryption not implemented")]
    Encrypted {
        /// Archive path and entry name.
        path: String,
    },

    /// The Local File Header disagrees with the Central Directory.
    #[error(
        "Entry {path}: local header method {local} does not match central directory method {central}"
    )]
    MethodMismatch {
        /// Archive path and entry name.
        path: String,
        /// Method recorded in the Local File Header.
        local: u16,
        /// Method recorded in the Central Directory.
        central: u16,
    },

    /// The CRC checksum of produced data does not match the expected value.
    #[error("CRC mismatch for {context}: expected {expected:#010x}, got {actual:#010x}")]
    CrcMismatch {
        /// Stream label.
        context: String,
        /// The expected CRC value from the archive.
        expected: u32,
        /// The actual CRC value of the produced data.
        actual: u32,
    },

    /// The compressed data could not be decoded.
    #[error("Corrupt compressed data in {context}: {reason}")]
    CorruptData {
        /// Stream label.
        context: String,
        /// Decoder message.
        reason: String,
    },

    /// A read that required an exact length ended early.
    #[error("Unexpected EOF in {context}: wanted {wanted} bytes, got {got}")]
    UnexpectedEof {
        /// Stream label.
        context: String,
        /// Bytes requested.
        wanted: u64,
        /// Bytes produced.
        got: u64,
    },

    /// The compressed data ended while replaying forward to a seek target.
    #[error("Ran out of data while seeking in {context}: reached {reached} of {target}")]
    SeekReplayEof {
        /// Stream label.
        context: String,
        /// Decompressed offset reached before the data ran out.
        reached: u64,
        /// Requested seek target.
        target: u64,
    },

    /// A seek would move before the start of the stream or overflow.
    #[error("Invalid seek in {context}: {reason}")]
    InvalidSeek {
        /// Stream label.
        context: String,
        /// Description of the problem.
        reason: String,
    },

    /// A resource limit was exceeded.
    ///
    /// Entry-count and entry-size ceilings bound the memory and work a
    /// hostile archive can demand.
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// An entry was not found in the archive.
    #[error("Entry not found: {path}")]
    EntryNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Reader options failed validation.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl Error {
    /// Shorthand for [`Error::NotImplemented`].
    pub(crate) fn not_implemented(
        operation: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Error::NotImplemented {
            operation: operation.into(),
            context: context.into(),
        }
    }

    /// Returns `true` if this is a data corruption error.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::CrcMismatch { .. } | Error::CorruptHeader { .. } | Error::CorruptData { .. }
        )
    }

    /// Returns `true` if this error is about unsupported methods or operations.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedMethod { .. }
                | Error::UnsupportedFeature { .. }
                | Error::NotImplemented { .. }
                | Error::Encrypted { .. }
        )
    }

    /// Returns `true` if this error describes a broken archive structure.
    ///
    /// Apart from a damaged Local File Header, which fails only that entry's
    /// `open_entry`, structural errors are produced while an archive is
    /// being opened and no reader object exists.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_)
                | Error::CorruptHeader { .. }
                | Error::UnsupportedFeature { .. }
                | Error::ResourceLimitExceeded(_)
        )
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::UnexpectedEof { .. } | Error::SeekReplayEof { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, err)
            }
            Error::InvalidSeek { .. } => io::Error::new(io::ErrorKind::InvalidInput, err),
            Error::NotImplemented { .. } => io::Error::new(io::ErrorKind::Unsupported, err),
            Error::EntryNotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A specialized Result type for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_mismatch_display() {
        let err = Error::CrcMismatch {
            context: "roms.zip/game.bin".into(),
            expected: 0x1234_5678,
            actual: 0xDEAD_BEEF,
        };
        let msg = err.to_string();
        assert!(msg.contains("roms.zip/game.bin"));
        assert!(msg.contains("0x12345678"));
        assert!(msg.contains("0xdeadbeef"));
        assert!(err.is_corruption());
        assert!(!err.is_structural());
    }

    #[test]
    fn test_unsupported_method_display() {
        let err = Error::UnsupportedMethod {
            method: 12,
            name: "BZIP2",
            context: "a.zip/x".into(),
        };
        assert_eq!(
            err.to_string(),
            "Compression method BZIP2 (12) not implemented for a.zip/x"
        );
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_structural_classification() {
        assert!(Error::InvalidFormat("x".into()).is_structural());
        assert!(Error::ResourceLimitExceeded("x".into()).is_structural());
        assert!(
            !Error::Encrypted {
                path: "a.zip/b".into()
            }
            .is_structural()
        );
    }

    #[test]
    fn test_into_io_error_kinds() {
        let eof: io::Error = Error::UnexpectedEof {
            context: "s".into(),
            wanted: 4,
            got: 1,
        }
        .into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let ni: io::Error = Error::not_implemented("write", "s").into();
        assert_eq!(ni.kind(), io::ErrorKind::Unsupported);

        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let back: io::Error = Error::Io(inner).into();
        assert_eq!(back.kind(), io::ErrorKind::PermissionDenied);
    }
}
