// src/codec/writer.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use super::BinaryRecord;
use crate::fs::FileSystem;

/// Extension of the packed artifact written beside each descriptor.
pub const OUTPUT_EXTENSION: &str = "file";

/// `<dir>/<stem>.file` for a descriptor at `<dir>/<stem>.<ext>`.
pub fn output_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{OUTPUT_EXTENSION}"))
}

/// Persist `record` at `path`.
///
/// The bytes are fully built before anything touches disk, and the
/// filesystem layer replaces the target atomically.
pub fn write_record(fs: &dyn FileSystem, path: &Path, record: &BinaryRecord) -> Result<()> {
    let bytes = record.to_bytes();
    debug!(path = ?path, bytes = bytes.len(), "writing binary record");
    fs.write(path, &bytes)
}
