//! Entry path canonicalization.
//!
//! Every Central Directory name is stored as an absolute, `/`-separated
//! canonical path so that lookups do not depend on how the archiver spelled
//! it. Canonicalization:
//!
//! - prefixes the name with `/`
//! - collapses runs of `/`
//! - drops `.` segments
//! - lets `..` pop the preceding segment (never above the root)
//!
//! The final segment is kept verbatim, so a trailing `/.` or `/..` (or a
//! trailing `/`) survives.
//!
//! ```
//! use arcstream::archive_path::canonicalize;
//!
//! assert_eq!(canonicalize("dir//sub/./../file.txt"), "/dir/file.txt");
//! assert_eq!(canonicalize("dir/.."), "/dir/..");
//! ```

use std::fmt;

/// Canonicalizes an entry name or lookup path.
pub fn canonicalize(name: &str) -> String {
    let parts: Vec<&str> = name.split('/').collect();
    let (last, init) = match parts.split_last() {
        Some(split) => split,
        None => return "/".to_string(),
    };

    let mut segments: Vec<&str> = Vec::with_capacity(parts.len());
    for &part in init {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.push(last);

    let mut out = String::with_capacity(name.len() + 1);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// A path split into directory, base name and extension.
///
/// `dir` excludes the final separator, `ext` includes its leading dot, and
/// `format!("{}/{}{}", dir, base, ext)` rebuilds a `/`-separated path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathComponents<'a> {
    /// Everything before the last separator.
    pub dir: &'a str,
    /// File name without its extension.
    pub base: &'a str,
    /// Extension including the dot, or empty.
    pub ext: &'a str,
}

impl<'a> PathComponents<'a> {
    /// Splits `path` at the last character for which `is_separator` holds.
    ///
    /// A file name whose only dot is its first character (`.profile`) has no
    /// extension.
    pub fn split(path: &'a str, is_separator: impl Fn(char) -> bool) -> Self {
        let (dir, name) = match path.rfind(|c| is_separator(c)) {
            Some(pos) => {
                let sep_len = path[pos..].chars().next().map_or(1, char::len_utf8);
                (&path[..pos], &path[pos + sep_len..])
            }
            None => ("", path),
        };
        let (base, ext) = match name.rfind('.') {
            Some(pos) if pos > 0 => name.split_at(pos),
            _ => (name, ""),
        };
        Self { dir, base, ext }
    }

    /// Splits a canonical archive path.
    pub fn of_archive_path(path: &'a str) -> Self {
        Self::split(path, |c| c == '/')
    }

    /// Builds the `N`-th disambiguated form of this path: `dir/N:base.ext`.
    pub fn with_counter(&self, counter: u32) -> String {
        format!("{}/{}:{}{}", self.dir, counter, self.base, self.ext)
    }
}

impl fmt::Display for PathComponents<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.dir, self.base, self.ext)
    }
}
