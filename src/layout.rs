//! Output layout: where every variant lands on disk.
//!
//! The location of a variant is a pure function of backend name, category,
//! width and input base name:
//!
//! ```text
//! {output_root}/{backend}/{category}/{width}/{stem}_{category}_{width}.webp
//! ```
//!
//! Running the same batch twice therefore overwrites the same files instead
//! of accumulating duplicates, and two workers never compete for one path
//! unless they process the same input.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Base name of an input file, without directory or extension.
///
/// `photos/001-dawn.jpg` → `001-dawn`. Returns `None` for paths without a
/// usable UTF-8 file stem.
pub fn input_stem(input: &Path) -> Option<&str> {
    input
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
}

/// Directory holding every variant of one (backend, category, width).
pub fn variant_dir(output_root: &Path, backend: &str, category: &str, width: u32) -> PathBuf {
    output_root
        .join(backend)
        .join(category)
        .join(width.to_string())
}

/// File name of one variant.
pub fn variant_file_name(stem: &str, category: &str, width: u32) -> String {
    format!("{stem}_{category}_{width}.webp")
}

/// Full path of one variant.
pub fn variant_path(
    output_root: &Path,
    backend: &str,
    category: &str,
    width: u32,
    stem: &str,
) -> PathBuf {
    variant_dir(output_root, backend, category, width)
        .join(variant_file_name(stem, category, width))
}

/// Write `bytes` to `path`, creating parent directories as needed.
///
/// Directory creation is recursive and tolerates concurrent creation of the
/// same directory by another worker. An existing file is overwritten.
pub fn write_variant(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}
