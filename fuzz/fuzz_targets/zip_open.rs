//! Fuzz target for ZipReader with arbitrary byte input.
//!
//! Opens the input as a ZIP archive and, if that succeeds, reads every entry
//! to the end, then seeks back into it and reads again. Any panic or hang is
//! a bug; errors are expected.
//!
//! Run with: cargo +nightly fuzz run zip_open

#![no_main]

use std::io::SeekFrom;

use arcstream::stream::{IoStream, Stream};
use arcstream::{ArchiveReader, ReadOptions, ZipReader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Keep declared sizes small so a tiny input cannot demand huge output
    let options = ReadOptions::new().max_entries(256).max_entry_size(1 << 20);
    let stream = IoStream::from_bytes(data.to_vec());
    let Ok(archive) = ZipReader::with_options(Box::new(stream), "fuzz.zip", options) else {
        return;
    };

    for i in 0..archive.num_files() {
        let _ = archive.get_file_path(i);
        let Ok(mut entry) = archive.open_entry(i) else {
            continue;
        };
        let _ = entry.read_to_end();
        let mut buf = [0u8; 64];
        if entry.seek(SeekFrom::Start(1)).is_ok() {
            let _ = entry.read(&mut buf, false);
        }
    }
});
