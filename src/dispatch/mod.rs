// src/dispatch/mod.rs

//! File watching and change dispatch.
//!
//! This module is responsible for:
//! - Subscribing to each watched directory (`notify`).
//! - Normalizing raw notifications into [`FileChangeEvent`]s.
//! - Debouncing bursts of modifications.
//! - Running the handler registered for the file's extension.
//!
//! It does not know how tools work; handlers go through the
//! [`exec`](crate::exec) layer and the [`codec`](crate::codec).

pub mod debounce;
pub mod dispatcher;
pub mod event;
pub mod handlers;
pub mod watcher;

use std::path::{Path, PathBuf};

use crate::errors::{AssetwatchError, Result};
use crate::fs::FileSystem;

pub use debounce::Debouncer;
pub use dispatcher::{normalize, Dispatcher};
pub use event::{split_filename, ChangeKind, FileChangeEvent};
pub use handlers::{run_handler, HandlerContext, HandlerError};
pub use watcher::{spawn_watchers, RawChange, WatchedDirectory, WatcherHandle};

/// Resolve watch targets to canonical, de-duplicated directories.
///
/// Relative paths are taken against `base`. An empty list means `base`.
pub fn resolve_directories(
    fs: &dyn FileSystem,
    base: &Path,
    dirs: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let requested: Vec<PathBuf> = if dirs.is_empty() {
        vec![base.to_path_buf()]
    } else {
        dirs.iter().map(|d| base.join(d)).collect()
    };

    let mut resolved: Vec<PathBuf> = Vec::with_capacity(requested.len());
    for dir in requested {
        if !fs.is_dir(&dir) {
            return Err(AssetwatchError::ConfigError(format!(
                "not a directory: {}",
                dir.display()
            )));
        }
        let canonical = fs.canonicalize(&dir)?;
        if !resolved.contains(&canonical) {
            resolved.push(canonical);
        }
    }

    Ok(resolved)
}
