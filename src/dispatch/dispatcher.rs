// src/dispatch/dispatcher.rs

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::debounce::Debouncer;
use super::event::{ChangeKind, FileChangeEvent};
use super::handlers::{run_handler, HandlerContext};
use super::watcher::RawChange;
use crate::registry::ExtensionRegistry;

/// How often pending debounced events are checked.
const MIN_TICK: Duration = Duration::from_millis(10);

/// Turns raw notifications into handler invocations.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ExtensionRegistry>,
    ctx: HandlerContext,
    debouncer: Debouncer,
}

impl Dispatcher {
    pub fn new(registry: Arc<ExtensionRegistry>, ctx: HandlerContext, debounce: Duration) -> Self {
        Self {
            registry,
            ctx,
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Feed one raw notification.
    ///
    /// Without debouncing, handlers for `Modified` files are spawned right
    /// away and their join handles returned; otherwise the events wait for
    /// [`Dispatcher::flush_ready`].
    pub fn accept(&mut self, change: RawChange) -> Vec<JoinHandle<()>> {
        let mut spawned = Vec::new();

        for event in normalize(change) {
            match event.kind {
                ChangeKind::Renamed => {
                    debug!(file = %event.filename, "rename/create/remove ignored");
                }
                ChangeKind::Modified if self.debouncer.window().is_zero() => {
                    spawned.extend(self.dispatch(event));
                }
                ChangeKind::Modified => self.debouncer.record(event),
            }
        }

        spawned
    }

    /// Dispatch every debounced event whose quiet period has elapsed.
    pub fn flush_ready(&mut self) -> Vec<JoinHandle<()>> {
        let ready = self.debouncer.take_ready();
        ready.into_iter().filter_map(|ev| self.dispatch(ev)).collect()
    }

    /// Look up the handler for `event` and run it on its own task.
    ///
    /// Returns `None` for extensions nobody registered.
    pub fn dispatch(&self, event: FileChangeEvent) -> Option<JoinHandle<()>> {
        let kind = self.registry.lookup(&event.extension)?;
        let ctx = self.ctx.clone();

        debug!(file = %event.filename, handler = %kind, "dispatching");

        Some(tokio::spawn(async move {
            if let Err(err) = run_handler(kind, &event, &ctx).await {
                error!(
                    file = %event.filename,
                    handler = %kind,
                    error = %err,
                    "handler failed"
                );
            }
        }))
    }

    /// Main loop: runs until `shutdown` resolves or every watcher is gone.
    pub async fn run_until<F>(mut self, mut rx: mpsc::UnboundedReceiver<RawChange>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let tick_every = (self.debouncer.window() / 2).max(MIN_TICK);
        let mut tick = tokio::time::interval(tick_every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("dispatch loop started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                change = rx.recv() => match change {
                    Some(change) => {
                        self.accept(change);
                    }
                    None => {
                        info!("watcher channel closed; exiting");
                        break;
                    }
                },
                _ = tick.tick(), if self.debouncer.has_pending() => {
                    self.flush_ready();
                }
            }
        }

        if self.debouncer.has_pending() {
            debug!(
                pending = self.debouncer.pending_count(),
                "dropping debounced events at shutdown"
            );
        }
    }
}

/// Split a notification into per-file events.
///
/// Notifications without a usable filename are reported and dropped.
pub fn normalize(change: RawChange) -> Vec<FileChangeEvent> {
    let RawChange { source_dir, event } = change;

    let event = match event {
        Ok(event) => event,
        Err(err) => {
            warn!(dir = ?source_dir, error = %err, "file watch error");
            return Vec::new();
        }
    };

    let Some(kind) = ChangeKind::from_notify(&event.kind) else {
        return Vec::new();
    };

    if event.paths.is_empty() {
        warn!(dir = ?source_dir, kind = kind.label(), "no filename provided; event dropped");
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter_map(|path| {
            let name = path.file_name().and_then(|n| n.to_str());
            if name.is_none() {
                warn!(dir = ?source_dir, path = ?path, "no usable filename; event dropped");
            }
            name.map(|name| FileChangeEvent::new(kind, &source_dir, name))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, ModifyKind};
    use notify::{Event, EventKind};
    use std::path::PathBuf;

    fn raw(kind: EventKind, paths: &[&str]) -> RawChange {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        RawChange {
            source_dir: PathBuf::from("/d"),
            event: Ok(event),
        }
    }

    #[test]
    fn modification_becomes_event_with_context() {
        let events = normalize(raw(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/d/sprite.xcf"],
        ));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ChangeKind::Modified);
        assert_eq!(events[0].extension, ".xcf");
        assert_eq!(events[0].source_dir, PathBuf::from("/d"));
    }

    #[test]
    fn missing_filename_is_dropped() {
        let events = normalize(raw(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            &[],
        ));
        assert!(events.is_empty());

        let events = normalize(raw(
            EventKind::Modify(ModifyKind::Data(DataChange::Any)),
            &["/"],
        ));
        assert!(events.is_empty());
    }

    #[test]
    fn creation_is_classified_as_renamed() {
        let events = normalize(raw(EventKind::Create(CreateKind::File), &["/d/new.info"]));
        assert_eq!(events[0].kind, ChangeKind::Renamed);
    }

    #[test]
    fn watch_errors_produce_nothing() {
        let change = RawChange {
            source_dir: PathBuf::from("/d"),
            event: Err(notify::Error::generic("boom")),
        };
        assert!(normalize(change).is_empty());
    }
}
