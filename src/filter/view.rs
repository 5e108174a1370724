//! Byte-range window over another stream.

use std::io::SeekFrom;

use crate::checksum::RunningCrc;
use crate::stream::{Attributes, Source, Stream, resolve_seek};
use crate::{Error, Result};

/// A read-only `[start, bound)` window onto a source stream.
///
/// This is how stored (uncompressed) ZIP entries are exposed. Reads are
/// clamped to the window, the source is repositioned only when its cursor
/// has drifted (another stream sharing the source may have moved it), and
/// the optional CRC-32 is verified once every byte of the window has been
/// hashed.
pub struct StreamViewFilter<'a> {
    source: Source<'a>,
    label: String,
    start: u64,
    len: u64,
    position: u64,
    expected_crc: Option<u32>,
    crc: RunningCrc,
    crc_verified: bool,
}

impl<'a> StreamViewFilter<'a> {
    /// Creates a view of `source` covering absolute offsets `[start, bound)`.
    pub fn new(
        source: Source<'a>,
        label: impl Into<String>,
        start: u64,
        bound: u64,
        expected_crc: Option<u32>,
    ) -> Result<Self> {
        let label = label.into();
        if bound < start {
            return Err(Error::InvalidSeek {
                context: label,
                reason: format!("window end {:#x} precedes start {:#x}", bound, start),
            });
        }
        Ok(Self {
            source,
            label,
            start,
            len: bound - start,
            position: 0,
            expected_crc,
            crc: RunningCrc::new(),
            crc_verified: false,
        })
    }

    /// Length of the window in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The label used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn check_crc(&mut self) -> Result<()> {
        let Some(expected) = self.expected_crc else {
            return Ok(());
        };
        if self.crc_verified || self.crc.hashed() != self.len {
            return Ok(());
        }
        let actual = self.crc.value();
        if actual != expected {
            return Err(Error::CrcMismatch {
                context: self.label.clone(),
                expected,
                actual,
            });
        }
        self.crc_verified = true;
        Ok(())
    }
}

impl Stream for StreamViewFilter<'_> {
    fn read(&mut self, buf: &mut [u8], error_on_eos: bool) -> Result<usize> {
        let remaining = self.len.saturating_sub(self.position);
        let want = remaining.min(buf.len() as u64) as usize;

        if want > 0 {
            let absolute = self.start + self.position;
            if self.source.tell()? != absolute {
                self.source.seek(SeekFrom::Start(absolute))?;
            }
            let n = self.source.read(&mut buf[..want], true)?;
            self.crc.fold(self.position, &buf[..n]);
            self.position += n as u64;
        }
        self.check_crc()?;

        if want < buf.len() && error_on_eos {
            return Err(Error::UnexpectedEof {
                context: self.label.clone(),
                wanted: buf.len() as u64,
                got: want as u64,
            });
        }
        Ok(want)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::not_implemented("write", &self.label))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let len = self.len;
        self.position = resolve_seek(&self.label, self.position, pos, || Ok(len))?;
        Ok(self.position)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.position)
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.len)
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::READABLE;
        if self.source.attributes().contains(Attributes::SEEKABLE) {
            attributes |= Attributes::SEEKABLE;
        }
        attributes
    }

    fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(Error::not_implemented("truncate", &self.label))
    }

    fn flush(&mut self) -> Result<()> {
        Err(Error::not_implemented("flush", &self.label))
    }

    fn close(&mut self) -> Result<()> {
        self.source.close()
    }
}
