//! ZIP archive reader.

use std::collections::HashMap;
use std::fmt;
use std::io::SeekFrom;

use super::ArchiveReader;
use super::central::{Directory, read_directory};
use super::entry::FileEntry;
use super::options::ReadOptions;
use crate::archive_path::canonicalize;
use crate::codec::CompressionMethod;
use crate::filter::StreamViewFilter;
use crate::format::flags;
use crate::format::records::LocalHeader;
use crate::fs::{FileInfo, OpenMode, VirtualFs};
use crate::stream::{SharedStream, Source, Stream};
use crate::{Error, Result};

/// A ZIP archive opened for reading.
///
/// The Central Directory is parsed once, at construction. Each call to
/// [`open_entry`](ArchiveReader::open_entry) returns an independent stream
/// that shares the archive's byte stream; entry streams may outlive the
/// reader and are read on the same thread.
///
/// # Example
///
/// ```rust,no_run
/// use arcstream::read::{ArchiveReader, ZipReader};
/// use arcstream::stream::IoStream;
///
/// let stream = IoStream::from_path("bios.zip")?;
/// let archive = ZipReader::new(Box::new(stream), "bios.zip")?;
/// for entry in archive.entries() {
///     println!("{} ({} bytes, method {})", entry.name, entry.uncompressed_size, entry.method);
/// }
/// # Ok::<(), arcstream::Error>(())
/// ```
pub struct ZipReader {
    archive: SharedStream,
    label: String,
    entries: Vec<FileEntry>,
    entries_map: HashMap<String, usize>,
    archive_size: u64,
    options: ReadOptions,
}

impl ZipReader {
    /// Opens an archive with default options.
    ///
    /// `label` names the archive in error messages and entry stream labels,
    /// usually its path.
    pub fn new(stream: Box<dyn Stream>, label: impl Into<String>) -> Result<Self> {
        Self::with_options(stream, label, ReadOptions::default())
    }

    /// Opens an archive with the given options.
    ///
    /// The stream must be seekable with a cheap size query. Structural
    /// problems anywhere in the Central Directory fail the whole open.
    pub fn with_options(
        stream: Box<dyn Stream>,
        label: impl Into<String>,
        options: ReadOptions,
    ) -> Result<Self> {
        options.validate()?;
        let label = label.into();
        let mut archive = SharedStream::new(stream);
        let Directory {
            entries,
            entries_map,
            archive_size,
        } = read_directory(&mut archive, &label, &options).inspect_err(|e| {
            log::debug!("{}: open failed: {}", label, e);
        })?;
        Ok(Self {
            archive,
            label,
            entries,
            entries_map,
            archive_size,
            options,
        })
    }

    /// All entries in Central Directory order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// One entry by index.
    pub fn entry(&self, which: usize) -> Option<&FileEntry> {
        self.entries.get(which)
    }

    /// The archive label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Size of the archive stream in bytes.
    pub fn archive_size(&self) -> u64 {
        self.archive_size
    }

    /// Options the archive was opened with.
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    fn make_stream(
        &self,
        archive: SharedStream,
        context: String,
        entry: &FileEntry,
        data_start: u64,
    ) -> Result<Box<dyn Stream>> {
        let crc = self.options.verify_crc.then_some(entry.crc32);
        match entry.compression_method() {
            CompressionMethod::Stored => Ok(Box::new(StreamViewFilter::new(
                Source::owned(archive),
                context,
                data_start,
                data_start + entry.uncompressed_size,
                crc,
            )?)),
            CompressionMethod::Deflate => inflate_stream(archive, context, entry, crc),
            CompressionMethod::Zstd => zstd_stream(archive, context, entry, crc),
            CompressionMethod::Unsupported { code, name } => Err(Error::UnsupportedMethod {
                method: code,
                name,
                context,
            }),
            CompressionMethod::Unknown(code) => Err(Error::not_implemented(
                format!("compression method {}", code),
                context,
            )),
        }
    }
}

#[cfg(feature = "deflate")]
fn inflate_stream(
    archive: SharedStream,
    context: String,
    entry: &FileEntry,
    crc: Option<u32>,
) -> Result<Box<dyn Stream>> {
    use crate::codec::deflate::{InflateFormat, ZlInflateFilter};
    Ok(Box::new(ZlInflateFilter::new_inflate(
        Source::owned(archive),
        context,
        InflateFormat::Raw,
        entry.compressed_size,
        Some(entry.uncompressed_size),
        crc,
    )?))
}

#[cfg(not(feature = "deflate"))]
fn inflate_stream(
    _archive: SharedStream,
    context: String,
    entry: &FileEntry,
    _crc: Option<u32>,
) -> Result<Box<dyn Stream>> {
    Err(Error::UnsupportedMethod {
        method: entry.method,
        name: "Deflate",
        context,
    })
}

#[cfg(feature = "zstd")]
fn zstd_stream(
    archive: SharedStream,
    context: String,
    entry: &FileEntry,
    crc: Option<u32>,
) -> Result<Box<dyn Stream>> {
    use crate::codec::zstd::ZstdDecompressFilter;
    Ok(Box::new(ZstdDecompressFilter::new_zstd(
        Source::owned(archive),
        context,
        entry.compressed_size,
        Some(entry.uncompressed_size),
        crc,
    )?))
}

#[cfg(not(feature = "zstd"))]
fn zstd_stream(
    _archive: SharedStream,
    context: String,
    entry: &FileEntry,
    _crc: Option<u32>,
) -> Result<Box<dyn Stream>> {
    Err(Error::UnsupportedMethod {
        method: entry.method,
        name: "Zstandard",
        context,
    })
}

impl fmt::Debug for ZipReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipReader")
            .field("label", &self.label)
            .field("entries", &self.entries.len())
            .field("archive_size", &self.archive_size)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ArchiveReader for ZipReader {
    fn num_files(&self) -> usize {
        self.entries.len()
    }

    fn get_file_path(&self, which: usize) -> Option<&str> {
        self.entries.get(which).map(|e| e.name.as_str())
    }

    fn get_file_size(&self, which: usize) -> Option<u64> {
        self.entries.get(which).map(|e| e.uncompressed_size)
    }

    fn open_entry(&self, which: usize) -> Result<Box<dyn Stream>> {
        let entry = self.entries.get(which).ok_or_else(|| Error::EntryNotFound {
            path: format!("{}#{}", self.label, which),
        })?;
        let context = format!("{}{}", self.label, entry.name);

        let mut archive = self.archive.clone();
        let mut record = [0u8; LocalHeader::SIZE];
        archive.seek(SeekFrom::Start(entry.lh_reloffs))?;
        archive.read(&mut record, true)?;
        let header = LocalHeader::parse(&record, entry.lh_reloffs)?;

        if header.method != entry.method {
            return Err(Error::MethodMismatch {
                path: context,
                local: header.method,
                central: entry.method,
            });
        }
        if header.flags & flags::ENCRYPTED != 0 {
            return Err(Error::Encrypted { path: context });
        }

        let data_start = entry.lh_reloffs + LocalHeader::SIZE as u64 + header.variable_len();
        let data_len = match entry.compression_method() {
            CompressionMethod::Stored => entry.uncompressed_size,
            _ => entry.compressed_size,
        };
        if data_start.saturating_add(data_len) > self.archive_size {
            return Err(Error::CorruptHeader {
                offset: entry.lh_reloffs,
                reason: format!("data of {} extends past the end of the archive", context),
            });
        }

        archive.seek(SeekFrom::Start(data_start))?;
        log::debug!(
            "{}: opening {} bytes at {:#x} ({})",
            context,
            data_len,
            data_start,
            entry.compression_method()
        );
        self.make_stream(archive, context, entry, data_start)
    }

    fn find_by_path(&self, path: &str) -> Option<usize> {
        self.entries_map.get(&canonicalize(path)).copied()
    }
}

impl VirtualFs for ZipReader {
    fn open(&self, path: &str, mode: OpenMode) -> Result<Box<dyn Stream>> {
        if mode != OpenMode::Read {
            return Err(Error::not_implemented(
                format!("open({:?})", mode),
                format!("{}{}", self.label, canonicalize(path)),
            ));
        }
        let which = self.find_by_path(path).ok_or_else(|| Error::EntryNotFound {
            path: path.to_string(),
        })?;
        self.open_entry(which)
    }

    fn mkdir(&self, path: &str) -> Result<()> {
        Err(Error::not_implemented(format!("mkdir({})", path), &self.label))
    }

    fn unlink(&self, path: &str) -> Result<()> {
        Err(Error::not_implemented(format!("unlink({})", path), &self.label))
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        Err(Error::not_implemented(
            format!("rename({}, {})", old_path, new_path),
            &self.label,
        ))
    }

    fn finfo(&self, path: &str) -> Result<FileInfo> {
        let entry = self
            .find_by_path(path)
            .map(|which| &self.entries[which])
            .ok_or_else(|| Error::EntryNotFound {
                path: path.to_string(),
            })?;
        Ok(FileInfo {
            size: entry.uncompressed_size,
            check_value: u64::from(entry.crc32),
            is_regular: true,
            is_directory: false,
        })
    }

    fn readdirentries(&self, path: &str, callback: &mut dyn FnMut(&str) -> bool) -> Result<()> {
        let mut prefix = canonicalize(path);
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        for entry in &self.entries {
            let Some(leaf) = entry.name.strip_prefix(&prefix) else {
                continue;
            };
            if leaf.is_empty() || leaf.contains('/') {
                continue;
            }
            if !callback(leaf) {
                break;
            }
        }
        Ok(())
    }
}
