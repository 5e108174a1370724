//! Read-only streams layered over a source stream.
//!
//! - [`StreamViewFilter`] exposes a byte range of its source verbatim.
//! - [`DecompressFilter`] turns any [`Decompressor`] into a seekable stream.
//!
//! Both verify an optional CRC-32 once the full length has been read and
//! accept their source either owned or borrowed (see [`Source`](crate::stream::Source)).

mod decompress;
mod view;

pub use decompress::{CompressedInput, DecompressFilter, Decompressor, FilterState};
pub use view::StreamViewFilter;
