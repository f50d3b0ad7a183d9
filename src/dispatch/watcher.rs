// src/dispatch/watcher.rs

use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::{AssetwatchError, Result};

/// A notification from one watched directory, still in notify's terms.
#[derive(Debug)]
pub struct RawChange {
    pub source_dir: PathBuf,
    pub event: notify::Result<Event>,
}

/// A directory under observation. Dropping it releases the subscription.
pub struct WatchedDirectory {
    path: PathBuf,
    _watcher: RecommendedWatcher,
}

impl WatchedDirectory {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for WatchedDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedDirectory")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Handle for all directory subscriptions.
///
/// This exists mainly so the underlying watchers are kept alive for as long
/// as needed. Dropping this handle (or calling [`WatcherHandle::close`])
/// stops file watching.
#[derive(Debug)]
pub struct WatcherHandle {
    dirs: Vec<WatchedDirectory>,
}

impl WatcherHandle {
    pub fn directories(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(WatchedDirectory::path)
    }

    pub fn close(self) {
        for dir in self.dirs {
            debug!(dir = ?dir.path, "closing directory subscription");
        }
        info!("file watchers closed");
    }
}

/// Subscribe to every directory in `dirs` (non-recursively).
///
/// Each notification is tagged with the directory it came from and sent to
/// `tx`. Directories must already be canonical; see
/// [`resolve_directories`](crate::dispatch::resolve_directories).
pub fn spawn_watchers(
    dirs: &[PathBuf],
    tx: mpsc::UnboundedSender<RawChange>,
) -> Result<WatcherHandle> {
    let mut watched = Vec::with_capacity(dirs.len());

    for dir in dirs {
        watched.push(watch_directory(dir.clone(), tx.clone())?);
    }

    Ok(WatcherHandle { dirs: watched })
}

fn watch_directory(
    dir: PathBuf,
    tx: mpsc::UnboundedSender<RawChange>,
) -> Result<WatchedDirectory> {
    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        {
            let source_dir = dir.clone();
            move |res: notify::Result<Event>| {
                let change = RawChange {
                    source_dir: source_dir.clone(),
                    event: res,
                };
                if tx.send(change).is_err() {
                    // Receiver gone: the dispatch loop has shut down.
                    debug!(dir = ?source_dir, "dropping notification after shutdown");
                }
            }
        },
        Config::default(),
    )?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| {
            AssetwatchError::ConfigError(format!("cannot watch {}: {e}", dir.display()))
        })?;

    info!("file watcher started on {:?}", dir);

    Ok(WatchedDirectory {
        path: dir,
        _watcher: watcher,
    })
}
