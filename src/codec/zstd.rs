//! Zstandard codec implementation.

use zstd::stream::raw::{Decoder as RawDecoder, InBuffer, Operation, OutBuffer};

use crate::filter::{CompressedInput, DecompressFilter, Decompressor};
use crate::stream::Source;
use crate::{Error, Result};

/// Staging buffer size, the input size zstd recommends for streaming.
const STAGING_SIZE: usize = 128 * 1024 + 3;

/// A resettable streaming Zstandard decoder.
///
/// One decompression context is kept for the decoder's whole life and
/// reinitialized on reset. Concatenated frames decode as one stream.
pub struct ZstdDecoder {
    context: RawDecoder<'static>,
    staging: Box<[u8]>,
    start: usize,
    end: usize,
}

impl std::fmt::Debug for ZstdDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZstdDecoder")
            .field("buffered", &(self.end - self.start))
            .finish_non_exhaustive()
    }
}

impl ZstdDecoder {
    /// Creates a decoder.
    pub fn new() -> Result<Self> {
        Ok(Self {
            context: RawDecoder::new()?,
            staging: vec![0u8; STAGING_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
        })
    }
}

impl Decompressor for ZstdDecoder {
    fn read_decompress(
        &mut self,
        input: &mut CompressedInput<'_>,
        buf: &mut [u8],
    ) -> Result<usize> {
        let mut produced = 0;
        while produced < buf.len() {
            if self.start == self.end {
                self.start = 0;
                self.end = input.read(&mut self.staging)?;
            }

            let mut src = InBuffer::around(&self.staging[self.start..self.end]);
            let mut dst = OutBuffer::around(&mut buf[produced..]);
            self.context
                .run(&mut src, &mut dst)
                .map_err(|e| Error::CorruptData {
                    context: input.context().to_string(),
                    reason: e.to_string(),
                })?;
            let consumed = src.pos();
            let written = dst.pos();
            self.start += consumed;
            produced += written;

            if consumed == 0 && written == 0 {
                // Source exhausted and nothing left to flush
                break;
            }
        }
        Ok(produced)
    }

    fn reset_decompress(&mut self) -> Result<()> {
        self.context.reinit()?;
        self.start = 0;
        self.end = 0;
        Ok(())
    }
}

/// A [`DecompressFilter`] that decodes Zstandard data.
pub type ZstdDecompressFilter<'a> = DecompressFilter<'a, ZstdDecoder>;

impl<'a> DecompressFilter<'a, ZstdDecoder> {
    /// Builds a Zstandard filter over `compressed_size` bytes of `source`
    /// starting at its current position.
    pub fn new_zstd(
        source: Source<'a>,
        label: impl Into<String>,
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
            ZstdDecoder::new()?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{Checksum, Crc32};
    use crate::stream::{IoStream, Stream};
    use rand::{Rng, SeedableRng};
    use std::io::SeekFrom;

    fn sample() -> Vec<u8> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(93);
        (0..300_000).map(|i| if i % 3 == 0 { rng.r#gen::<u8>() } else { b'z' }).collect()
    }

    fn filter(
        compressed: Vec<u8>,
        size: Option<u64>,
        crc: Option<u32>,
    ) -> ZstdDecompressFilter<'static> {
        let len = compressed.len() as u64;
        ZstdDecompressFilter::new_zstd(
            Source::owned(IoStream::from_bytes(compressed)),
            "a.zip/data.zst",
            len,
            size,
            crc,
        )
        .unwrap()
    }

    #[test]
    fn test_decode_with_crc() {
        let data = sample();
        let compressed = zstd::encode_all(&data[..], 3).unwrap();
        let mut f = filter(compressed, Some(data.len() as u64), Some(Crc32::compute(&data)));
        assert_eq!(f.read_to_end().unwrap(), data);
    }

    #[test]
    fn test_concatenated_frames() {
        let mut compressed = zstd::encode_all(&b"frame one "[..], 1).unwrap();
        compressed.extend(zstd::encode_all(&b"frame two"[..], 1).unwrap());
        let mut f = filter(compressed, None, None);
        assert_eq!(f.read_to_end().unwrap(), b"frame one frame two");
    }

    #[test]
    fn test_seek_replay_matches_fresh_read() {
        let data = sample();
        let compressed = zstd::encode_all(&data[..], 3).unwrap();
        let mut f = filter(compressed, None, Some(Crc32::compute(&data)));
        assert_eq!(f.size().unwrap(), data.len() as u64);

        let mut buf = vec![0u8; 5_000];
        f.seek(SeekFrom::Start(250_000)).unwrap();
        f.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..], &data[250_000..255_000]);

        f.seek(SeekFrom::Start(7)).unwrap();
        f.read(&mut buf, true).unwrap();
        assert_eq!(&buf[..], &data[7..5_007]);
    }

    #[test]
    fn test_corrupt_frame() {
        let mut f = filter(b"definitely not a zstd frame".to_vec(), None, None);
        let err = f.read_to_end().unwrap_err();
        assert!(matches!(err, Error::CorruptData { .. }));
    }

    #[test]
    fn test_crc_mismatch() {
        let data = sample();
        let compressed = zstd::encode_all(&data[..], 3).unwrap();
        let mut f = filter(compressed, Some(data.len() as u64), Some(0));
        assert!(matches!(f.read_to_end().unwrap_err(), Error::CrcMismatch { .. }));
    }
}
