//! # arcstream
//!
//! Read-only access to ZIP archives through seekable entry streams.
//!
//! An archive is opened once: the End of Central Directory Record is located,
//! ZIP64 records are followed when present, and the Central Directory is
//! parsed into a table of entries with canonical, unique paths. Each entry
//! then opens as an independent [`Stream`] that supports random access even
//! when the data is compressed: backward seeks restart the decoder and
//! replay forward.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arcstream::{ArchiveReader, Result, ZipReader};
//! use arcstream::stream::{IoStream, Stream};
//! use std::io::SeekFrom;
//!
//! fn main() -> Result<()> {
//!     let archive = ZipReader::new(Box::new(IoStream::from_path("game.zip")?), "game.zip")?;
//!
//!     for i in 0..archive.num_files() {
//!         println!("{:?}: {:?} bytes", archive.get_file_path(i), archive.get_file_size(i));
//!     }
//!
//!     if let Some(index) = archive.find_by_path("track01.bin") {
//!         let mut stream = archive.open_entry(index)?;
//!         let mut sector = [0u8; 2352];
//!         stream.seek(SeekFrom::Start(16 * 2352))?;
//!         stream.read(&mut sector, true)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Layers
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`stream`] | The [`Stream`] trait, std adapters, shared and borrowed sources |
//! | [`filter`] | Windowed views and the generic seekable decompress filter |
//! | [`codec`] | Method table, raw/zlib/gzip inflate and Zstandard decoders |
//! | [`format`] | On-disk record layouts |
//! | [`read`] | [`ZipReader`], [`ArchiveReader`] and [`open_archive`] |
//! | [`fs`] | The [`VirtualFs`](fs::VirtualFs) interface and the native filesystem |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `deflate` | Yes | Deflate entries and zlib/gzip streams (flate2, zlib-rs backend) |
//! | `zstd` | Yes | Zstandard entries |
//!
//! With a codec feature disabled, entries using that method fail to open
//! with [`Error::UnsupportedMethod`]; the rest of the archive stays usable.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T>`]. Structural problems fail the open;
//! per-entry problems fail only [`open_entry`](ArchiveReader::open_entry);
//! integrity problems surface from `read`, `seek` or `size` on the entry
//! stream.
//!
//! ```rust,no_run
//! use arcstream::{ArchiveReader, Error, ZipReader};
//! use arcstream::stream::{IoStream, Stream};
//!
//! fn checked_read(archive: &ZipReader, index: usize) -> arcstream::Result<Vec<u8>> {
//!     let mut stream = archive.open_entry(index)?;
//!     match stream.read_to_end() {
//!         Err(e @ Error::CrcMismatch { .. }) => {
//!             eprintln!("damaged entry: {}", e);
//!             Err(e)
//!         }
//!         other => other,
//!     }
//! }
//! # fn main() {}
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never
//! installs a logger: archive structure at `debug`, duplicate entry renames
//! at `warn`, and decoder resets at `trace`.
//!
//! ## Minimum Supported Rust Version (MSRV)
//!
//! This crate requires **Rust 1.85** or later.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

/// Default buffer size for read operations (8 KiB).
pub(crate) const READ_BUFFER_SIZE: usize = 8192;

pub mod archive_path;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod filter;
pub mod format;
pub mod fs;
pub mod read;
pub mod stream;

pub use error::{Error, Result};

// Re-export reading API at crate root for convenience
pub use read::{ArchiveReader, FileEntry, ReadOptions, ZipReader, open_archive, test_ext};

pub use codec::CompressionMethod;
pub use filter::{DecompressFilter, Decompressor, FilterState, StreamViewFilter};
pub use fs::{NativeFs, VirtualFs};
pub use stream::{IoStream, Stream};

#[cfg(feature = "deflate")]
pub use codec::deflate::{InflateFormat, ZlInflateFilter};

#[cfg(feature = "zstd")]
pub use codec::zstd::ZstdDecompressFilter;
