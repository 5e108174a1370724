//! Fuzz target for entry path canonicalization.
//!
//! Run with: cargo +nightly fuzz run canonicalize
//!
//! Properties checked:
//! - The result is absolute
//! - Canonicalizing twice changes nothing
//! - No directory segment is empty, `.` or `..`

#![no_main]

use arcstream::archive_path::{PathComponents, canonicalize};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let name = String::from_utf8_lossy(data);
    let canonical = canonicalize(&name);

    assert!(canonical.starts_with('/'), "not absolute: {:?}", canonical);
    assert_eq!(canonicalize(&canonical), canonical);

    let segments: Vec<&str> = canonical[1..].split('/').collect();
    if let Some((_, dirs)) = segments.split_last() {
        for dir in dirs {
            assert!(
                !dir.is_empty() && *dir != "." && *dir != "..",
                "unclean directory segment in {:?}",
                canonical
            );
        }
    }

    // Disambiguated names stay in the same directory
    let components = PathComponents::of_archive_path(&canonical);
    let renamed = components.with_counter(1);
    assert_eq!(
        PathComponents::of_archive_path(&renamed).dir,
        components.dir,
        "{:?} -> {:?}",
        canonical,
        renamed
    );
});
