//! Archive reading API.
//!
//! [`ArchiveReader`] is the format-independent view of an opened archive:
//! a fixed table of entries, each of which opens as a seekable
//! [`Stream`]. [`ZipReader`] is the ZIP implementation, and
//! [`open_archive`] picks a reader by file extension.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcstream::fs::NativeFs;
//! use arcstream::read::{ArchiveReader, open_archive};
//!
//! let fs = NativeFs::new();
//! if let Some(archive) = open_archive(&fs, "roms.zip")? {
//!     for i in 0..archive.num_files() {
//!         println!("{:?} {:?}", archive.get_file_path(i), archive.get_file_size(i));
//!     }
//!     let index = archive.find_by_path("game.bin").expect("entry present");
//!     let mut stream = archive.open_entry(index)?;
//!     let data = stream.read_to_end()?;
//! }
//! # Ok::<(), arcstream::Error>(())
//! ```

mod central;
mod entry;
mod options;
mod zip;

pub use entry::FileEntry;
pub use options::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_ENTRY_SIZE, ReadOptions};
pub use zip::ZipReader;

use crate::Result;
use crate::fs::{OpenMode, VirtualFs};
use crate::stream::Stream;

/// File extensions (with their dot) handled by [`open_archive`].
pub const ZIP_EXTENSIONS: &[&str] = &[".zip", ".zipx"];

/// An opened archive.
///
/// Entries are addressed by index in `0..num_files()`. Archive readers are
/// read-only filesystems: `mkdir`, `unlink` and `rename` always fail with
/// [`Error::NotImplemented`](crate::Error::NotImplemented).
pub trait ArchiveReader: VirtualFs {
    /// Number of entries.
    fn num_files(&self) -> usize;

    /// Canonical path of an entry.
    fn get_file_path(&self, which: usize) -> Option<&str>;

    /// Uncompressed size of an entry.
    fn get_file_size(&self, which: usize) -> Option<u64>;

    /// Opens an entry for reading.
    fn open_entry(&self, which: usize) -> Result<Box<dyn Stream>>;

    /// Finds an entry by path. The path is canonicalized first.
    fn find_by_path(&self, path: &str) -> Option<usize>;
}

/// Returns true if `path` has an extension an archive reader handles.
pub fn test_ext(fs: &dyn VirtualFs, path: &str) -> bool {
    ZIP_EXTENSIONS.iter().any(|ext| fs.test_ext(path, ext))
}

/// Opens `path` on `fs` as an archive.
///
/// Returns `Ok(None)` exactly when [`test_ext`] is false. Otherwise the file
/// is opened and parsed, and any failure is returned as an error.
pub fn open_archive(fs: &dyn VirtualFs, path: &str) -> Result<Option<Box<dyn ArchiveReader>>> {
    open_archive_with_options(fs, path, ReadOptions::default())
}

/// Like [`open_archive`], with explicit [`ReadOptions`].
pub fn open_archive_with_options(
    fs: &dyn VirtualFs,
    path: &str,
    options: ReadOptions,
) -> Result<Option<Box<dyn ArchiveReader>>> {
    if !test_ext(fs, path) {
        return Ok(None);
    }
    let stream = fs.open(path, OpenMode::Read)?;
    let reader = ZipReader::with_options(stream, path, options)?;
    Ok(Some(Box::new(reader)))
}
