//! Filesystem-style API shared by native directories and archives.
//!
//! [`VirtualFs`] is the interface an application opens files through. The
//! native implementation, [`NativeFs`], forwards to `std::fs`; archive
//! readers implement it too, which is how a file inside a ZIP can be opened
//! with the same call as a file on disk.
//!
//! # Example
//!
//! ```rust,no_run
//! use arcstream::fs::{NativeFs, OpenMode, VirtualFs};
//! use arcstream::stream::Stream;
//!
//! let fs = NativeFs::new();
//! let mut stream = fs.open("games/disc.cue", OpenMode::Read)?;
//! let contents = stream.read_to_end()?;
//! # Ok::<(), arcstream::Error>(())
//! ```

use std::time::UNIX_EPOCH;

use crate::archive_path::PathComponents;
use crate::stream::{IoStream, Stream};
use crate::{Error, Result};

/// How a file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read-only.
    Read,
    /// Create or truncate, write-only.
    Write,
    /// Create, failing if the file exists.
    WriteSafe,
    /// Existing file, overwritten in place.
    WriteInplace,
    /// Existing file, read and write.
    ReadWrite,
}

/// Metadata reported by [`VirtualFs::finfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileInfo {
    /// Size in bytes.
    pub size: u64,
    /// A value that changes when the contents do: the CRC-32 for archive
    /// entries, the modification time for native files.
    pub check_value: u64,
    /// The path names a regular file.
    pub is_regular: bool,
    /// The path names a directory.
    pub is_directory: bool,
}

/// A filesystem that hands out [`Stream`]s.
pub trait VirtualFs {
    /// Opens a file.
    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn Stream>>;

    /// Creates a directory.
    fn mkdir(&self, path: &str) -> Result<()>;

    /// Removes a file.
    fn unlink(&self, path: &str) -> Result<()>;

    /// Renames a file.
    fn rename(&self, old_path: &str, new_path: &str) -> Result<()>;

    /// Returns metadata for a path.
    fn finfo(&self, path: &str) -> Result<FileInfo>;

    /// Calls `callback` with the name of each entry directly inside `path`
    /// until it returns false.
    fn readdirentries(&self, path: &str, callback: &mut dyn FnMut(&str) -> bool) -> Result<()>;

    /// Returns true if `c` separates path components.
    fn is_path_separator(&self, c: char) -> bool {
        c == '/'
    }

    /// The separator used when building paths.
    fn preferred_path_separator(&self) -> char {
        '/'
    }

    /// Splits a path into directory, base name and extension.
    fn get_file_path_components<'p>(&self, path: &'p str) -> PathComponents<'p> {
        PathComponents::split(path, |c| self.is_path_separator(c))
    }

    /// Returns true if the extension of `path` is `ext` (with its dot),
    /// ignoring ASCII case.
    fn test_ext(&self, path: &str, ext: &str) -> bool {
        self.get_file_path_components(path)
            .ext
            .eq_ignore_ascii_case(ext)
    }
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl NativeFs {
    /// Creates a handle to the host filesystem.
    pub fn new() -> Self {
        NativeFs
    }
}

impl VirtualFs for NativeFs {
    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn Stream>> {
        match mode {
            OpenMode::Read => Ok(Box::new(IoStream::from_path(path)?)),
            other => Err(Error::not_implemented(format!("open({:?})", other), path)),
        }
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        Ok(std::fs::create_dir(path)?)
    }

    fn unlink(&self, path: &str) -> Result<()> {
        Ok(std::fs::remove_file(path)?)
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        Ok(std::fs::rename(old_path, new_path)?)
    }

    fn finfo(&self, path: &str) -> Result<FileInfo> {
        let meta = std::fs::metadata(path)?;
        let check_value = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_secs());
        Ok(FileInfo {
            size: meta.len(),
            check_value,
            is_regular: meta.is_file(),
            is_directory: meta.is_dir(),
        })
    }

    fn readdirentries(&self, path: &str, callback: &mut dyn FnMut(&str) -> bool) -> Result<()> {
        for entry in std::fs::read_dir(path)? {
            let name = entry?.file_name();
            if !callback(&name.to_string_lossy()) {
                break;
            }
        }
        Ok(())
    }

    fn is_path_separator(&self, c: char) -> bool {
        std::path::is_separator(c)
    }

    fn preferred_path_separator(&self) -> char {
        std::path::MAIN_SEPARATOR
    }
}
