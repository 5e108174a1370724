//! Central Directory parsing.
//!
//! Opening walks these states, logging each at debug level:
//!
//! ```text
//! ParsingEocdr -> (ParsingZip64Locator) -> ParsingCentralDirectory -> ResolvingDuplicates -> Ready
//! ```
//!
//! Any failure aborts the whole open; nothing partially parsed escapes.

use std::collections::HashMap;
use std::io::SeekFrom;

use super::entry::FileEntry;
use super::options::ReadOptions;
use crate::archive_path::{PathComponents, canonicalize};
use crate::format::records::{
    CentralHeader, EndOfCentralDirectory, Zip64EndOfCentralDirectory, Zip64Extra, Zip64Locator,
    extra_fields,
};
use crate::format::{EOCDR_SIGNATURE, MAX_COMMENT_LEN, ZIP64_EXTRA_ID};
use crate::stream::{Attributes, Stream};
use crate::{Error, Result};

/// Where the Central Directory is, after ZIP64 overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirectorySummary {
    disk_number: u32,
    cd_start_disk: u32,
    disk_entries: u64,
    total_entries: u64,
    cd_offset: u64,
}

impl From<&EndOfCentralDirectory> for DirectorySummary {
    fn from(eocdr: &EndOfCentralDirectory) -> Self {
        Self {
            disk_number: u32::from(eocdr.disk_number),
            cd_start_disk: u32::from(eocdr.cd_start_disk),
            disk_entries: u64::from(eocdr.disk_entries),
            total_entries: u64::from(eocdr.total_entries),
            cd_offset: u64::from(eocdr.cd_offset),
        }
    }
}

impl From<&Zip64EndOfCentralDirectory> for DirectorySummary {
    fn from(eocdr: &Zip64EndOfCentralDirectory) -> Self {
        Self {
            disk_number: eocdr.disk_number,
            cd_start_disk: eocdr.cd_start_disk,
            disk_entries: eocdr.disk_entries,
            total_entries: eocdr.total_entries,
            cd_offset: eocdr.cd_offset,
        }
    }
}

/// The parsed entry table.
pub(super) struct Directory {
    pub entries: Vec<FileEntry>,
    pub entries_map: HashMap<String, usize>,
    pub archive_size: u64,
}

/// Reads exactly `buf.len()` bytes; running out is a format error.
fn read_record(
    stream: &mut dyn Stream,
    buf: &mut [u8],
    label: &str,
    what: &str,
    offset: u64,
) -> Result<()> {
    match stream.read(buf, true) {
        Ok(_) => Ok(()),
        Err(Error::UnexpectedEof { .. }) => Err(Error::InvalidFormat(format!(
            "{}: truncated {} at offset {:#x}",
            label, what, offset
        ))),
        Err(e) => Err(e),
    }
}

fn require_random_access(stream: &dyn Stream, label: &str) -> Result<()> {
    let attributes = stream.attributes();
    if !attributes.contains(Attributes::SEEKABLE)
        || attributes.contains(Attributes::SLOW_SEEK)
        || attributes.contains(Attributes::SLOW_SIZE)
    {
        return Err(Error::UnsupportedFeature {
            context: label.to_string(),
            feature: "archive stream without fast seeking and size queries",
        });
    }
    Ok(())
}

/// Finds the EOCDR by scanning the archive tail backwards.
///
/// The first signature found from the end wins, even if it lies inside the
/// archive comment of the real record.
fn find_eocdr(
    stream: &mut dyn Stream,
    label: &str,
    size: u64,
) -> Result<(u64, EndOfCentralDirectory)> {
    const LEN: usize = EndOfCentralDirectory::SIZE;
    if size < LEN as u64 {
        return Err(Error::InvalidFormat(format!(
            "{}: {} bytes is too small for a ZIP archive",
            label, size
        )));
    }
    let tail_len = size.min((MAX_COMMENT_LEN + LEN) as u64) as usize;
    let tail_start = size - tail_len as u64;
    let mut tail = vec![0u8; tail_len];
    stream.seek(SeekFrom::Start(tail_start))?;
    read_record(stream, &mut tail, label, "archive tail", tail_start)?;

    let signature = EOCDR_SIGNATURE.to_le_bytes();
    let found = (0..=tail_len - LEN)
        .rev()
        .find(|&i| tail[i..i + 4] == signature)
        .ok_or_else(|| {
            Error::InvalidFormat(format!("{}: end of central directory record not found", label))
        })?;

    let offset = tail_start + found as u64;
    let mut record = [0u8; LEN];
    record.copy_from_slice(&tail[found..found + LEN]);
    Ok((offset, EndOfCentralDirectory::parse(&record, offset)?))
}

fn read_zip64_summary(
    stream: &mut dyn Stream,
    label: &str,
    eocdr_offset: u64,
) -> Result<DirectorySummary> {
    let locator_offset = eocdr_offset - Zip64Locator::SIZE as u64;
    log::debug!("{}: reading ZIP64 locator at {:#x}", label, locator_offset);
    let mut record = [0u8; Zip64Locator::SIZE];
    stream.seek(SeekFrom::Start(locator_offset))?;
    read_record(stream, &mut record, label, "ZIP64 locator", locator_offset)?;
    let locator = Zip64Locator::parse(&record, locator_offset)?;

    if locator.eocdr64_disk != 0 || locator.total_disks != 1 {
        return Err(Error::UnsupportedFeature {
            context: label.to_string(),
            feature: "split archives",
        });
    }
    let eocdr64_offset = locator.eocdr64_offset;
    let fits = eocdr64_offset
        .checked_add(Zip64EndOfCentralDirectory::SIZE as u64)
        .is_some_and(|end| end <= locator_offset);
    if !fits {
        return Err(Error::InvalidFormat(format!(
            "{}: ZIP64 end of central directory offset {:#x} out of range",
            label, eocdr64_offset
        )));
    }

    let mut record = [0u8; Zip64EndOfCentralDirectory::SIZE];
    stream.seek(SeekFrom::Start(eocdr64_offset))?;
    read_record(
        stream,
        &mut record,
        label,
        "ZIP64 end of central directory",
        eocdr64_offset,
    )?;
    let eocdr64 = Zip64EndOfCentralDirectory::parse(&record, eocdr64_offset)?;
    log::debug!(
        "{}: using ZIP64 end of central directory at {:#x}",
        label,
        eocdr64_offset
    );
    Ok(DirectorySummary::from(&eocdr64))
}

/// Reads one Central Directory header and its variable fields.
fn read_entry(
    stream: &mut dyn Stream,
    label: &str,
    offset: u64,
    archive_size: u64,
    options: &ReadOptions,
) -> Result<(FileEntry, u64)> {
    let mut record = [0u8; CentralHeader::SIZE];
    read_record(stream, &mut record, label, "central directory header", offset)?;
    let header = CentralHeader::parse(&record, offset)?;

    let mut variable = vec![0u8; header.variable_len()];
    read_record(
        stream,
        &mut variable,
        label,
        "central directory name and extra fields",
        offset,
    )?;
    let (name, rest) = variable.split_at(header.name_len as usize);
    let extra = &rest[..header.extra_len as usize];
    let name = canonicalize(&String::from_utf8_lossy(name));

    let mut uncompressed_size = u64::from(header.uncompressed_size);
    let mut compressed_size = u64::from(header.compressed_size);
    let mut lh_reloffs = u64::from(header.lh_reloffs);
    let mut disk_start = u32::from(header.disk_start);

    for field in extra_fields(extra) {
        let field = field.map_err(|overrun| {
            Error::InvalidFormat(format!(
                "{}: malformed extra field in {} at +{}",
                label, name, overrun.at
            ))
        })?;
        if field.id != ZIP64_EXTRA_ID {
            continue;
        }
        let zip64 = Zip64Extra::parse(field.data, &header).ok_or_else(|| {
            Error::InvalidFormat(format!("{}: ZIP64 extra field of {} is too short", label, name))
        })?;
        uncompressed_size = zip64.uncompressed_size.unwrap_or(uncompressed_size);
        compressed_size = zip64.compressed_size.unwrap_or(compressed_size);
        lh_reloffs = zip64.lh_reloffs.unwrap_or(lh_reloffs);
        disk_start = zip64.disk_start.unwrap_or(disk_start);
    }

    if disk_start != 0 {
        return Err(Error::UnsupportedFeature {
            context: label.to_string(),
            feature: "split archives",
        });
    }
    if lh_reloffs >= archive_size {
        return Err(Error::InvalidFormat(format!(
            "{}: local header offset {:#x} of {} is past the end of the archive",
            label, lh_reloffs, name
        )));
    }
    let largest = compressed_size.max(uncompressed_size);
    if largest > options.max_entry_size {
        return Err(Error::ResourceLimitExceeded(format!(
            "{}: entry {} size {} exceeds {}",
            label, name, largest, options.max_entry_size
        )));
    }

    let next = offset + CentralHeader::SIZE as u64 + variable.len() as u64;
    let entry = FileEntry {
        name,
        mod_time: header.mod_time,
        mod_date: header.mod_date,
        crc32: header.crc32,
        compressed_size,
        uncompressed_size,
        lh_reloffs,
        method: header.method,
        counter: 0,
    };
    Ok((entry, next))
}

/// Gives every entry whose name is already taken a `dir/N:base.ext` name.
///
/// Runs after the whole directory is read so a renamed duplicate can never
/// take a name that a later entry carries verbatim.
fn resolve_duplicates(
    label: &str,
    entries: &mut [FileEntry],
    entries_map: &mut HashMap<String, usize>,
) {
    for i in 0..entries.len() {
        let original = match entries_map.get(&entries[i].name) {
            Some(&index) if index != i => index,
            _ => continue,
        };
        loop {
            entries[original].counter += 1;
            let counter = entries[original].counter;
            let candidate = PathComponents::of_archive_path(&entries[i].name).with_counter(counter);
            if !entries_map.contains_key(&candidate) {
                log::warn!(
                    "{}: duplicate entry {} renamed to {}",
                    label,
                    entries[i].name,
                    candidate
                );
                entries_map.insert(candidate.clone(), i);
                entries[i].name = candidate;
                break;
            }
        }
    }
}

/// Parses the archive structure.
pub(super) fn read_directory(
    stream: &mut dyn Stream,
    label: &str,
    options: &ReadOptions,
) -> Result<Directory> {
    require_random_access(stream, label)?;
    let archive_size = stream.size()?;

    log::debug!("{}: parsing end of central directory", label);
    let (eocdr_offset, eocdr) = find_eocdr(stream, label, archive_size)?;
    log::debug!("{}: end of central directory at {:#x}", label, eocdr_offset);

    let summary = if eocdr.needs_zip64() && eocdr_offset >= Zip64Locator::SIZE as u64 {
        read_zip64_summary(stream, label, eocdr_offset)?
    } else {
        DirectorySummary::from(&eocdr)
    };

    if summary.disk_number != 0
        || summary.cd_start_disk != 0
        || summary.disk_entries != summary.total_entries
    {
        return Err(Error::UnsupportedFeature {
            context: label.to_string(),
            feature: "split archives",
        });
    }
    if summary.total_entries > options.max_entries {
        return Err(Error::ResourceLimitExceeded(format!(
            "{}: {} entries exceeds limit of {}",
            label, summary.total_entries, options.max_entries
        )));
    }
    if summary.cd_offset > archive_size {
        return Err(Error::InvalidFormat(format!(
            "{}: central directory offset {:#x} is past the end of the archive",
            label, summary.cd_offset
        )));
    }

    log::debug!(
        "{}: parsing central directory ({} entries at {:#x})",
        label,
        summary.total_entries,
        summary.cd_offset
    );
    let count = summary.total_entries as usize;
    let mut entries = Vec::with_capacity(count);
    let mut entries_map = HashMap::with_capacity(count);
    let mut offset = summary.cd_offset;
    stream.seek(SeekFrom::Start(offset))?;
    for index in 0..count {
        let (entry, next) = read_entry(stream, label, offset, archive_size, options)?;
        entries_map.entry(entry.name.clone()).or_insert(index);
        entries.push(entry);
        offset = next;
    }

    log::debug!("{}: resolving duplicate names", label);
    resolve_duplicates(label, &mut entries, &mut entries_map);

    log::debug!("{}: ready with {} entries", label, entries.len());
    Ok(Directory {
        entries,
        entries_map,
        archive_size,
    })
}
