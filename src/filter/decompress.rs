//! Seekable stream over a forward-only decompressor.
//!
//! Inflate and Zstandard decoders can only run front to back. A
//! [`DecompressFilter`] hides that behind the [`Stream`] contract by keeping
//! two cursors: `position`, the number of decompressed bytes the codec has
//! actually produced, and `target`, where the caller last asked to be. A
//! forward seek is satisfied by decompressing and discarding up to the
//! target; a backward seek restarts the codec from the beginning of the
//! compressed range and replays.
//!
//! ```text
//!            reset (backward seek / after error)
//!   ┌──────────────────────────────────────────────┐
//!   ▼                                              │
//! Fresh ── read ──▶ Streaming { position } ── error ──▶ Poisoned
//!                     ▲          │
//!                     └── read ──┘
//! ```

use std::io::SeekFrom;

use crate::checksum::RunningCrc;
use crate::stream::{Attributes, Source, Stream, resolve_seek};
use crate::{Error, Result};

/// Size of the discard buffer used while replaying towards a seek target.
const SCRATCH_SIZE: usize = 4096;

/// A forward-only decoder that a [`DecompressFilter`] drives.
pub trait Decompressor {
    /// Decompresses into `buf`, pulling compressed bytes from `input` as
    /// needed, and returns how many bytes were produced.
    ///
    /// Producing fewer than `buf.len()` bytes means the compressed input is
    /// exhausted. That is not an error at this level; the filter decides
    /// what a short production means.
    fn read_decompress(&mut self, input: &mut CompressedInput<'_>, buf: &mut [u8]) -> Result<usize>;

    /// Returns the decoder to its initial state, discarding buffered input.
    fn reset_decompress(&mut self) -> Result<()>;

    /// Releases decoder resources.
    fn close_decompress(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The compressed byte range a [`Decompressor`] reads from.
///
/// Reads are clamped to the range and keep the filter's cached source
/// cursor up to date.
pub struct CompressedInput<'s> {
    stream: &'s mut dyn Stream,
    cursor: &'s mut u64,
    bound: u64,
    context: &'s str,
}

impl CompressedInput<'_> {
    /// Reads up to `buf.len()` compressed bytes. Returns 0 once the range
    /// (or the underlying stream) is exhausted.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let want = self.remaining().min(buf.len() as u64) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = self.stream.read(&mut buf[..want], false)?;
        *self.cursor += n as u64;
        Ok(n)
    }

    /// Compressed bytes left in the range.
    pub fn remaining(&self) -> u64 {
        self.bound.saturating_sub(*self.cursor)
    }

    /// Label of the stream being decoded, for error messages.
    pub fn context(&self) -> &str {
        self.context
    }
}

/// Where a [`DecompressFilter`]'s codec stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    /// Nothing decoded since construction or the last reset.
    Fresh,
    /// The codec has produced `position` bytes.
    Streaming {
        /// Decompressed bytes produced since the last reset.
        position: u64,
    },
    /// A previous operation failed; the next one restarts from scratch.
    Poisoned,
}

/// Presents a [`Decompressor`] as a read-only seekable [`Stream`].
///
/// The compressed range starts at the source's position when the filter is
/// built and spans `compressed_size` bytes. The expected CRC-32, when given,
/// is checked once the whole decompressed length has been produced.
pub struct DecompressFilter<'a, D> {
    source: Source<'a>,
    codec: D,
    label: String,
    source_start: u64,
    source_bound: u64,
    source_cursor: u64,
    expected_size: Option<u64>,
    discovered_size: Option<u64>,
    expected_crc: Option<u32>,
    state: FilterState,
    target: u64,
    crc: RunningCrc,
    crc_checked: bool,
    scratch: Box<[u8]>,
}

impl<'a, D: Decompressor> DecompressFilter<'a, D> {
    /// Builds a filter decoding `compressed_size` bytes of `source` from its
    /// current position.
    pub fn new(
        mut source: Source<'a>,
        label: impl Into<String>,
        compressed_size: u64,
        expected_size: Option<u64>,
        expected_crc: Option<u32>,
        codec: D,
    ) -> Result<Self> {
        let label = label.into();
        let source_start = source.tell()?;
        let source_bound = source_start
            .checked_add(compressed_size)
            .ok_or_else(|| Error::InvalidSeek {
                context: label.clone(),
                reason: format!(
                    "compressed range {:#x}+{:#x} overflows",
                    source_start, compressed_size
                ),
            })?;
        Ok(Self {
            source,
            codec,
            label,
            source_start,
            source_bound,
            source_cursor: source_start,
            expected_size,
            discovered_size: None,
            expected_crc,
            state: FilterState::Fresh,
            target: 0,
            crc: RunningCrc::new(),
            crc_checked: false,
            scratch: vec![0u8; SCRATCH_SIZE].into_boxed_slice(),
        })
    }

    /// Current codec state.
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// The label used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Decompressed size, if declared up front or already discovered.
    pub fn known_size(&self) -> Option<u64> {
        self.expected_size.or(self.discovered_size)
    }

    /// Returns a reference to the codec.
    pub fn codec(&self) -> &D {
        &self.codec
    }

    fn reset(&mut self, from: u64) -> Result<()> {
        log::trace!(
            "{}: restarting decoder (at {}, target {})",
            self.label,
            from,
            self.target
        );
        self.state = FilterState::Poisoned;
        self.source.seek(SeekFrom::Start(self.source_start))?;
        self.source_cursor = self.source_start;
        self.crc.reset();
        self.codec.reset_decompress()?;
        self.state = FilterState::Fresh;
        Ok(())
    }

    /// Runs one codec call into `self.scratch[..len]` or the caller's buffer.
    fn decompress(&mut self, buf: Option<&mut [u8]>, len: usize) -> Result<usize> {
        let mut input = CompressedInput {
            stream: &mut *self.source,
            cursor: &mut self.source_cursor,
            bound: self.source_bound,
            context: &self.label,
        };
        match buf {
            Some(buf) => self.codec.read_decompress(&mut input, &mut buf[..len]),
            None => self.codec.read_decompress(&mut input, &mut self.scratch[..len]),
        }
    }

    /// Recovers from a poisoned state and repositions the source at the
    /// codec's input cursor. Returns the codec position.
    fn resume(&mut self, rewind: bool) -> Result<u64> {
        let position = match self.state {
            FilterState::Fresh => 0,
            FilterState::Streaming { position } if !rewind || position <= self.target => position,
            FilterState::Streaming { position } => {
                self.reset(position)?;
                0
            }
            FilterState::Poisoned => {
                self.reset(0)?;
                0
            }
        };
        if self.source.tell()? != self.source_cursor {
            self.source.seek(SeekFrom::Start(self.source_cursor))?;
        }
        Ok(position)
    }

    /// Brings the codec to `self.target` and returns the position reached.
    fn prepare(&mut self) -> Result<u64> {
        let mut position = self.resume(true)?;

        let limit = self
            .known_size()
            .map_or(self.target, |size| size.min(self.target));
        if limit > position {
            log::trace!("{}: replaying {} bytes", self.label, limit - position);
        }
        while position < limit {
            let step = (limit - position).min(SCRATCH_SIZE as u64) as usize;
            let n = self.decompress(None, step)?;
            self.crc.fold(position, &self.scratch[..n]);
            position += n as u64;
            self.state = FilterState::Streaming { position };
            if n < step {
                break;
            }
        }
        if position < self.target {
            return Err(Error::SeekReplayEof {
                context: self.label.clone(),
                reached: position,
                target: self.target,
            });
        }
        self.state = FilterState::Streaming { position };
        Ok(position)
    }

    fn check_crc(&mut self, position: u64) -> Result<()> {
        let (Some(expected), Some(total)) = (self.expected_crc, self.known_size()) else {
            return Ok(());
        };
        if self.crc_checked || position != total || self.crc.hashed() != total {
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
        self.crc_checked = true;
        Ok(())
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut position = self.prepare()?;

        let want = match self.known_size() {
            Some(size) => size.saturating_sub(position).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        let produced = if want > 0 {
            self.decompress(Some(buf), want)?
        } else {
            0
        };
        self.crc.fold(position, &buf[..produced]);
        position += produced as u64;
        self.state = FilterState::Streaming { position };

        if produced < want && self.known_size().is_none() {
            self.discovered_size = Some(position);
        }
        self.check_crc(position)?;
        self.target = position;
        Ok(produced)
    }

    /// Decodes forward from wherever the codec stands until the input runs
    /// out. The seek target is left alone and may lie past the end.
    fn discover_size(&mut self) -> Result<u64> {
        let mut position = self.resume(false)?;
        loop {
            let n = self.decompress(None, SCRATCH_SIZE)?;
            self.crc.fold(position, &self.scratch[..n]);
            position += n as u64;
            self.state = FilterState::Streaming { position };
            if n < SCRATCH_SIZE {
                break;
            }
        }
        self.discovered_size = Some(position);
        self.check_crc(position)?;
        Ok(position)
    }
}

impl<D: Decompressor> Stream for DecompressFilter<'_, D> {
    fn read(&mut self, buf: &mut [u8], error_on_eos: bool) -> Result<usize> {
        let produced = match self.read_inner(buf) {
            Ok(n) => n,
            Err(e) => {
                self.state = FilterState::Poisoned;
                return Err(e);
            }
        };
        if produced < buf.len() && error_on_eos {
            return Err(Error::UnexpectedEof {
                context: self.label.clone(),
                wanted: buf.len() as u64,
                got: produced as u64,
            });
        }
        Ok(produced)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::not_implemented("write", &self.label))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let size = match pos {
            SeekFrom::End(_) => Some(self.size()?),
            _ => None,
        };
        self.target = resolve_seek(&self.label, self.target, pos, || Ok(size.unwrap_or(0)))?;
        Ok(self.target)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.target)
    }

    fn size(&mut self) -> Result<u64> {
        if let Some(size) = self.known_size() {
            return Ok(size);
        }
        self.discover_size().inspect_err(|_| {
            self.state = FilterState::Poisoned;
        })
    }

    fn attributes(&self) -> Attributes {
        let mut attributes = Attributes::READABLE;
        if self.source.attributes().contains(Attributes::SEEKABLE) {
            attributes |= Attributes::SEEKABLE | Attributes::SLOW_SEEK;
        }
        if self.known_size().is_none() {
            attributes |= Attributes::SLOW_SIZE;
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
        self.codec.close_decompress()?;
        self.source.close()
    }
}
