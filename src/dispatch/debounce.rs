// src/dispatch/debounce.rs

//! Collapses bursts of modifications to one file into a single work item.
//!
//! Editors and image tools often write a file several times per save.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::event::FileChangeEvent;

#[derive(Debug)]
pub struct Debouncer {
    /// full path -> (latest event, time of last change)
    pending: HashMap<PathBuf, (FileChangeEvent, Instant)>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a change, resetting the quiet period for its path.
    pub fn record(&mut self, event: FileChangeEvent) {
        self.record_at(event, Instant::now());
    }

    pub fn record_at(&mut self, event: FileChangeEvent, at: Instant) {
        self.pending.insert(event.full_path.clone(), (event, at));
    }

    pub fn take_ready(&mut self) -> Vec<FileChangeEvent> {
        self.take_ready_at(Instant::now())
    }

    /// Remove and return events whose path has been quiet for the window.
    pub fn take_ready_at(&mut self, now: Instant) -> Vec<FileChangeEvent> {
        let mut ready = Vec::new();
        let window = self.window;

        self.pending.retain(|_, (event, last_change)| {
            if now.saturating_duration_since(*last_change) >= window {
                ready.push(event.clone());
                false
            } else {
                true
            }
        });

        ready.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
