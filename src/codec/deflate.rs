//! Deflate codec implementation.
//!
//! [`InflateDecoder`] drives `flate2`'s low-level [`Decompress`] state
//! machine directly so it can be reset and replayed by a
//! [`DecompressFilter`]. ZIP entries are raw deflate; zlib and gzip
//! wrappers are understood too, including concatenated members.

use flate2::{Decompress, FlushDecompress, Status};

use crate::filter::{CompressedInput, DecompressFilter, Decompressor};
use crate::stream::Source;
use crate::{Error, Result};

/// Compressed input is pulled from the source in chunks of this size.
const INPUT_CHUNK: usize = 8192;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const GZIP_TRAILER_LEN: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;

/// Framing around the deflate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InflateFormat {
    /// Bare deflate blocks, as stored in ZIP entries.
    #[default]
    Raw,
    /// RFC 1950 zlib wrapper.
    Zlib,
    /// RFC 1952 gzip wrapper.
    Gzip,
    /// Detect gzip or zlib from the first bytes, else raw.
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before a member (or the first stream) starts.
    Header,
    Body,
    /// Skipping a gzip member's CRC and length.
    Trailer,
    Done,
}

/// A resettable inflater.
pub struct InflateDecoder {
    format: InflateFormat,
    resolved: Option<InflateFormat>,
    inflater: Decompress,
    input: Box<[u8]>,
    start: usize,
    end: usize,
    phase: Phase,
}

impl std::fmt::Debug for InflateDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflateDecoder")
            .field("format", &self.format)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl InflateDecoder {
    /// Creates a decoder for the given framing.
    pub fn new(format: InflateFormat) -> Self {
        Self {
            format,
            resolved: Self::initial_format(format),
            inflater: Decompress::new(false),
            input: vec![0u8; INPUT_CHUNK].into_boxed_slice(),
            start: 0,
            end: 0,
            phase: Phase::Header,
        }
    }

    /// The framing this decoder was created with.
    pub fn format(&self) -> InflateFormat {
        self.format
    }

    fn initial_format(format: InflateFormat) -> Option<InflateFormat> {
        match format {
            InflateFormat::Auto => None,
            other => Some(other),
        }
    }

    /// Ensures at least `min` buffered bytes if the source has them;
    /// returns the number buffered.
    fn fill(&mut self, input: &mut CompressedInput<'_>, min: usize) -> Result<usize> {
        while self.end - self.start < min {
            if self.start > 0 {
                self.input.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                self.start = 0;
            }
            let n = input.read(&mut self.input[self.end..])?;
            if n == 0 {
                break;
            }
            self.end += n;
        }
        Ok(self.end - self.start)
    }

    fn next_byte(&mut self, input: &mut CompressedInput<'_>) -> Result<u8> {
        if self.fill(input, 1)? == 0 {
            return Err(corrupt(input, "truncated gzip header"));
        }
        let byte = self.input[self.start];
        self.start += 1;
        Ok(byte)
    }

    /// Skips up to `n` bytes; returns false if input ran out first.
    fn skip(&mut self, input: &mut CompressedInput<'_>, mut n: usize) -> Result<bool> {
        while n > 0 {
            let avail = self.fill(input, 1)?;
            if avail == 0 {
                return Ok(false);
            }
            let step = avail.min(n);
            self.start += step;
            n -= step;
        }
        Ok(true)
    }

    fn sniff(&self) -> InflateFormat {
        let head = &self.input[self.start..self.end];
        match head {
            [a, b, ..] if [*a, *b] == GZIP_MAGIC => InflateFormat::Gzip,
            [cmf, flg, ..] if is_zlib_header(*cmf, *flg) => InflateFormat::Zlib,
            _ => InflateFormat::Raw,
        }
    }

    fn skip_gzip_header(&mut self, input: &mut CompressedInput<'_>) -> Result<()> {
        let mut fixed = [0u8; 10];
        for byte in fixed.iter_mut() {
            *byte = self.next_byte(input)?;
        }
        if fixed[..2] != GZIP_MAGIC || fixed[2] != 8 {
            return Err(corrupt(input, "invalid gzip member header"));
        }
        let flags = fixed[3];
        if flags & FEXTRA != 0 {
            let xlen = u16::from_le_bytes([self.next_byte(input)?, self.next_byte(input)?]);
            if !self.skip(input, xlen as usize)? {
                return Err(corrupt(input, "truncated gzip header"));
            }
        }
        for flag in [FNAME, FCOMMENT] {
            if flags & flag != 0 {
                while self.next_byte(input)? != 0 {}
            }
        }
        if flags & FHCRC != 0 && !self.skip(input, 2)? {
            return Err(corrupt(input, "truncated gzip header"));
        }
        Ok(())
    }

    /// Starts the next stream or member. Returns false at end of input.
    fn begin_member(&mut self, input: &mut CompressedInput<'_>) -> Result<bool> {
        if self.fill(input, 2)? == 0 {
            return Ok(false);
        }
        let format = match self.resolved {
            Some(format) => format,
            None => {
                let format = self.sniff();
                log::trace!("{}: detected {:?} framing", input.context(), format);
                self.resolved = Some(format);
                format
            }
        };
        match format {
            InflateFormat::Zlib => self.inflater.reset(true),
            InflateFormat::Gzip => {
                self.skip_gzip_header(input)?;
                self.inflater.reset(false);
            }
            _ => self.inflater.reset(false),
        }
        Ok(true)
    }
}

impl Decompressor for InflateDecoder {
    fn read_decompress(
        &mut self,
        input: &mut CompressedInput<'_>,
        buf: &mut [u8],
    ) -> Result<usize> {
        let mut produced = 0;
        while produced < buf.len() {
            match self.phase {
                Phase::Done => break,
                Phase::Header => {
                    self.phase = if self.begin_member(input)? {
                        Phase::Body
                    } else {
                        Phase::Done
                    };
                }
                Phase::Trailer => {
                    self.phase = if self.skip(input, GZIP_TRAILER_LEN)? {
                        Phase::Header
                    } else {
                        Phase::Done
                    };
                }
                Phase::Body => {
                    let avail = self.fill(input, 1)?;
                    let in_len = avail.min(u32::MAX as usize);
                    let out_len = (buf.len() - produced).min(u32::MAX as usize);

                    let before_in = self.inflater.total_in();
                    let before_out = self.inflater.total_out();
                    let status = self
                        .inflater
                        .decompress(
                            &self.input[self.start..self.start + in_len],
                            &mut buf[produced..produced + out_len],
                            FlushDecompress::None,
                        )
                        .map_err(|e| corrupt(input, &e.to_string()))?;
                    let consumed = (self.inflater.total_in() - before_in) as usize;
                    let written = (self.inflater.total_out() - before_out) as usize;
                    self.start += consumed;
                    produced += written;

                    match status {
                        Status::StreamEnd => {
                            self.phase = match self.resolved {
                                Some(InflateFormat::Gzip) => Phase::Trailer,
                                _ => Phase::Header,
                            };
                        }
                        Status::Ok | Status::BufError if consumed == 0 && written == 0 => {
                            if avail == 0 {
                                // Source exhausted before the stream end marker
                                break;
                            }
                            return Err(corrupt(input, "inflate made no progress"));
                        }
                        Status::Ok | Status::BufError => {}
                    }
                }
            }
        }
        Ok(produced)
    }

    fn reset_decompress(&mut self) -> Result<()> {
        self.inflater.reset(false);
        self.resolved = Self::initial_format(self.format);
        self.start = 0;
        self.end = 0;
        self.phase = Phase::Header;
        Ok(())
    }
}

fn is_zlib_header(cmf: u8, flg: u8) -> bool {
    cmf & 0x0F == 8
        && cmf >> 4 <= 7
        && flg & 0x20 == 0
        && (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0
}

fn corrupt(input: &CompressedInput<'_>, reason: &str) -> Error {
    Error::CorruptData {
        context: input.context().to_string(),
        reason: reason.to_string(),
    }
}

/// A [`DecompressFilter`] that inflates deflate data.
pub type ZlInflateFilter<'a> = DecompressFilter<'a, InflateDecoder>;

impl<'a> DecompressFilter<'a, InflateDecoder> {
    /// Builds an inflating filter over `compressed_size` bytes of `source`
    /// starting at its current position.
    pub fn new_inflate(
        source: Source<'a>,
        label: impl Into<String>,
        format: InflateFormat,
        compressed_size: u64,
        expected_size: Option<u64>,
        expected_crc: Option<u32>,
    ) -> Result<Self> {
        DecompressFilter::new(
            source,
            label,
            compressed_size,
            expected_size,
            expected_crc,
            InflateDecoder::new(format),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{Checksum, Crc32};
    use crate::stream::{IoStream, Stream};
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use std::io::{SeekFrom, Write};

    fn text() -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..2_000 {
            data.extend_from_slice(format!("line {} of the test corpus\n", i).as_bytes());
        }
        data
    }

    fn raw(data: &[u8]) -> Vec<u8> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn inflate(compressed: Vec<u8>, format: InflateFormat) -> ZlInflateFilter<'static> {
        let len = compressed.len() as u64;
        let source = Source::owned(IoStream::from_bytes(compressed));
        ZlInflateFilter::new_inflate(source, "test.gz", format, len, None, None).unwrap()
    }

    #[test]
    fn test_raw_inflate_with_crc() {
        let data = text();
        let compressed = raw(&data);
        let len = compressed.len() as u64;
        let mut filter = ZlInflateFilter::new_inflate(
            Source::owned(IoStream::from_bytes(compressed)),
            "a.zip/text.txt",
            InflateFormat::Raw,
            len,
            Some(data.len() as u64),
            Some(Crc32::compute(&data)),
        )
        .unwrap();
        assert_eq!(filter.read_to_end().unwrap(), data);
    }

    #[test]
    fn test_zlib_and_gzip() {
        let data = text();
        assert_eq!(inflate(zlib(&data), InflateFormat::Zlib).read_to_end().unwrap(), data);
        assert_eq!(inflate(gzip(&data), InflateFormat::Gzip).read_to_end().unwrap(), data);
    }

    #[test]
    fn test_auto_detection() {
        let data = text();
        for compressed in [raw(&data), zlib(&data), gzip(&data)] {
            assert_eq!(inflate(compressed, InflateFormat::Auto).read_to_end().unwrap(), data);
        }
    }

    #[test]
    fn test_gzip_optional_header_fields() {
        let data = text();
        let mut enc = flate2::GzBuilder::new()
            .filename("name.txt")
            .comment("a comment")
            .extra(vec![1, 2, 3, 4])
            .write(Vec::new(), Compression::default());
        enc.write_all(&data).unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(inflate(compressed, InflateFormat::Auto).read_to_end().unwrap(), data);
    }

    #[test]
    fn test_concatenated_gzip_members() {
        let mut compressed = gzip(b"first member, ");
        compressed.extend(gzip(b"second member"));
        let out = inflate(compressed, InflateFormat::Gzip).read_to_end().unwrap();
        assert_eq!(out, b"first member, second member");
    }

    #[test]
    fn test_concatenated_raw_streams() {
        let mut compressed = raw(b"one");
        compressed.extend(raw(b"two"));
        let out = inflate(compressed, InflateFormat::Raw).read_to_end().unwrap();
        assert_eq!(out, b"onetwo");
    }

    #[test]
    fn test_truncated_stream_is_short_read() {
        let data = text();
        let mut compressed = raw(&data);
        compressed.truncate(compressed.len() / 2);
        let mut filter = inflate(compressed, InflateFormat::Raw);
        let out = filter.read_to_end().unwrap();
        assert!(!out.is_empty());
        assert!(out.len() < data.len());
        assert_eq!(&out[..], &data[..out.len()]);
    }

    #[test]
    fn test_garbage_is_corrupt_data() {
        let mut filter = inflate(vec![0xFF; 64], InflateFormat::Raw);
        let err = filter.read_to_end().unwrap_err();
        assert!(matches!(err, Error::CorruptData { .. }));
    }

    #[test]
    fn test_seek_backward_replays_gzip() {
        let data = text();
        let mut filter = inflate(gzip(&data), InflateFormat::Auto);
        let mut buf = [0u8; 64];
        filter.seek(SeekFrom::Start(30_000)).unwrap();
        filter.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..], &data[30_000..30_064]);
        filter.seek(SeekFrom::Start(10)).unwrap();
        filter.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..], &data[10..74]);
    }

    #[test]
    fn test_zlib_header_check() {
        assert!(is_zlib_header(0x78, 0x9C));
        assert!(is_zlib_header(0x78, 0x01));
        assert!(!is_zlib_header(0x78, 0x00));
        assert!(!is_zlib_header(0x1F, 0x8B));
    }
}
