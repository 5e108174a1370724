//! Seekable byte-stream abstraction.
//!
//! Every object this crate hands out, from a plain file to a decompressing
//! view of a ZIP entry, implements [`Stream`]. The trait mirrors a classic
//! file handle: `read`, `write`, `seek`, `tell`, `size`, `attributes` and
//! `close`, with an `error_on_eos` switch on reads so callers can choose
//! between exact-length and best-effort semantics.
//!
//! # Example
//!
//! ```rust
//! use arcstream::stream::{IoStream, Stream};
//! use std::io::SeekFrom;
//!
//! let mut stream = IoStream::from_bytes(b"Hello, World!".to_vec());
//! stream.seek(SeekFrom::Start(7)).unwrap();
//!
//! let mut buf = [0u8; 5];
//! stream.read(&mut buf, true).unwrap();
//! assert_eq!(&buf, b"World");
//! ```

mod io;
mod source;

pub use self::io::{IoStream, StreamReader};
pub use source::{SharedStream, Source};

use std::fmt;
use std::io::SeekFrom;
use std::ops::{BitOr, BitOrAssign};

use crate::{READ_BUFFER_SIZE, Result};

/// Capability bits reported by [`Stream::attributes`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Attributes(u32);

impl Attributes {
    /// The stream can be read.
    pub const READABLE: Attributes = Attributes(1 << 0);
    /// The stream can be written.
    pub const WRITABLE: Attributes = Attributes(1 << 1);
    /// The stream supports seeking.
    pub const SEEKABLE: Attributes = Attributes(1 << 2);
    /// Seeking costs time proportional to the distance moved.
    pub const SLOW_SEEK: Attributes = Attributes(1 << 3);
    /// Querying the size may require consuming the whole stream.
    pub const SLOW_SIZE: Attributes = Attributes(1 << 4);

    /// No capabilities.
    pub const fn empty() -> Self {
        Attributes(0)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit in `other` is set in `self`.
    pub const fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` without the bits in `other`.
    pub const fn without(self, other: Attributes) -> Attributes {
        Attributes(self.0 & !other.0)
    }
}

impl BitOr for Attributes {
    type Output = Attributes;

    fn bitor(self, rhs: Attributes) -> Attributes {
        Attributes(self.0 | rhs.0)
    }
}

impl BitOrAssign for Attributes {
    fn bitor_assign(&mut self, rhs: Attributes) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Attributes, &str); 5] = [
            (Attributes::READABLE, "READABLE"),
            (Attributes::WRITABLE, "WRITABLE"),
            (Attributes::SEEKABLE, "SEEKABLE"),
            (Attributes::SLOW_SEEK, "SLOW_SEEK"),
            (Attributes::SLOW_SIZE, "SLOW_SIZE"),
        ];
        let mut list = f.debug_set();
        for (bit, name) in NAMES {
            if self.contains(bit) {
                list.entry(&format_args!("{}", name));
            }
        }
        list.finish()
    }
}

/// A seekable byte stream.
///
/// Implementations are single-threaded and synchronous. Read-only streams
/// return [`Error::NotImplemented`](crate::Error::NotImplemented) from
/// `write`, `truncate` and, where flushing is meaningless, `flush`.
pub trait Stream {
    /// Reads up to `buf.len()` bytes, returning how many were read.
    ///
    /// A return value smaller than `buf.len()` means the end of the stream
    /// was reached. With `error_on_eos` set, such a short read is reported
    /// as [`Error::UnexpectedEof`](crate::Error::UnexpectedEof) instead.
    fn read(&mut self, buf: &mut [u8], error_on_eos: bool) -> Result<usize>;

    /// Writes all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Moves the stream cursor and returns the new absolute position.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Returns the current cursor position.
    fn tell(&mut self) -> Result<u64>;

    /// Returns the total stream size in bytes.
    fn size(&mut self) -> Result<u64>;

    /// Returns the capability bits of this stream.
    fn attributes(&self) -> Attributes;

    /// Truncates the stream to `len` bytes.
    fn truncate(&mut self, len: u64) -> Result<()>;

    /// Flushes buffered writes.
    fn flush(&mut self) -> Result<()>;

    /// Releases resources held by the stream.
    ///
    /// Closing is idempotent; dropping a stream without closing it is fine.
    fn close(&mut self) -> Result<()>;

    /// Reads from the current position to the end of the stream.
    fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut chunk = [0u8; READ_BUFFER_SIZE];
        loop {
            let n = self.read(&mut chunk, false)?;
            out.extend_from_slice(&chunk[..n]);
            if n < chunk.len() {
                return Ok(out);
            }
        }
    }
}

impl<S: Stream + ?Sized> Stream for Box<S> {
    fn read(&mut self, buf: &mut [u8], error_on_eos: bool) -> Result<usize> {
        (**self).read(buf, error_on_eos)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        (**self).write(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        (**self).seek(pos)
    }

    fn tell(&mut self) -> Result<u64> {
        (**self).tell()
    }

    fn size(&mut self) -> Result<u64> {
        (**self).size()
    }

    fn attributes(&self) -> Attributes {
        (**self).attributes()
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        (**self).truncate(len)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Applies a [`SeekFrom`] to a cursor for streams that track position
/// themselves.
///
/// `size` is only invoked for [`SeekFrom::End`].
pub(crate) fn resolve_seek(
    context: &str,
    current: u64,
    pos: SeekFrom,
    size: impl FnOnce() -> Result<u64>,
) -> Result<u64> {
    let (base, delta) = match pos {
        SeekFrom::Start(offset) => return Ok(offset),
        SeekFrom::Current(delta) => (current, delta),
        SeekFrom::End(delta) => (size()?, delta),
    };
    base.checked_add_signed(delta)
        .ok_or_else(|| crate::Error::InvalidSeek {
            context: context.to_string(),
            reason: format!("offset {} from {} is out of range", delta, base),
        })
}
