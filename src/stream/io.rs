//! Adapters between [`Stream`] and `std::io`.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use super::{Attributes, Stream};
use crate::{Error, Result};

/// A read-only [`Stream`] over any `Read + Seek` value.
///
/// This is the plain-file end of the stream stack: archives opened from
/// disk or memory are wrapped in an `IoStream` before a reader parses them.
#[derive(Debug)]
pub struct IoStream<R> {
    inner: R,
    label: String,
    attributes: Attributes,
}

impl<R: Read + Seek> IoStream<R> {
    /// Wraps a reader; the stream reports itself readable and seekable.
    pub fn new(inner: R, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            attributes: Attributes::READABLE | Attributes::SEEKABLE,
        }
    }

    /// Overrides the reported capability bits.
    ///
    /// Useful for presenting a network- or pipe-backed reader honestly as
    /// `SLOW_SEEK` so archive readers refuse it.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// The label used in error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consumes the stream and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl IoStream<BufReader<File>> {
    /// Opens a file on disk for reading.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl IoStream<Cursor<Vec<u8>>> {
    /// Wraps an in-memory buffer.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(Cursor::new(data), "<memory>")
    }
}

impl<R: Read + Seek> Stream for IoStream<R> {
    fn read(&mut self, buf: &mut [u8], error_on_eos: bool) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        if filled < buf.len() && error_on_eos {
            return Err(Error::UnexpectedEof {
                context: self.label.clone(),
                wanted: buf.len() as u64,
                got: filled as u64,
            });
        }
        Ok(filled)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(Error::not_implemented("write", &self.label))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        Ok(self.inner.seek(pos)?)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    fn size(&mut self) -> Result<u64> {
        let current = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        if current != end {
            self.inner.seek(SeekFrom::Start(current))?;
        }
        Ok(end)
    }

    fn attributes(&self) -> Attributes {
        self.attributes
    }

    fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(Error::not_implemented("truncate", &self.label))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Exposes a [`Stream`] through `std::io::Read` and `std::io::Seek`.
///
/// Errors are converted with `From<Error> for io::Error`, so CRC failures
/// surface as `InvalidData` and short reads as `UnexpectedEof`.
///
/// ```rust
/// use arcstream::stream::{IoStream, StreamReader};
/// use std::io::Read;
///
/// let mut reader = StreamReader::new(IoStream::from_bytes(b"abc".to_vec()));
/// let mut text = String::new();
/// reader.read_to_string(&mut text).unwrap();
/// assert_eq!(text, "abc");
/// ```
#[derive(Debug)]
pub struct StreamReader<S> {
    inner: S,
}

impl<S: Stream> StreamReader<S> {
    /// Wraps a stream.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Consumes the adapter and returns the stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Stream> Read for StreamReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.inner.read(buf, false)?)
    }
}

impl<S: Stream> Seek for StreamReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.inner.seek(pos)?)
    }
}
