// src/dispatch/event.rs

use std::path::{Path, PathBuf};

use notify::event::{MetadataKind, ModifyKind};
use notify::EventKind;

/// What happened to a file, as far as handlers are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Contents changed.
    Modified,
    /// Created, removed or renamed. Modelled, but no handler reacts to it.
    Renamed,
}

impl ChangeKind {
    /// Map a notify event kind; `None` for events we never act on
    /// (access, attribute-only changes).
    pub fn from_notify(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Other)
            | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => {
                Some(ChangeKind::Modified)
            }
            EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Create(_)
            | EventKind::Remove(_) => Some(ChangeKind::Renamed),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChangeKind::Modified => "modified",
            ChangeKind::Renamed => "renamed",
        }
    }
}

/// A change to one file inside a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub kind: ChangeKind,
    pub filename: String,
    /// Including the leading `.`; empty when the name has no `.`.
    pub extension: String,
    pub stem: String,
    pub full_path: PathBuf,
    pub source_dir: PathBuf,
}

impl FileChangeEvent {
    pub fn new(kind: ChangeKind, source_dir: &Path, filename: &str) -> Self {
        let (stem, extension) = split_filename(filename);
        Self {
            kind,
            filename: filename.to_string(),
            extension: extension.to_string(),
            stem: stem.to_string(),
            full_path: source_dir.join(filename),
            source_dir: source_dir.to_path_buf(),
        }
    }

    /// `<source_dir>/<stem>.<ext>`, the sibling artifact path for an output type.
    pub fn sibling(&self, ext: &str) -> PathBuf {
        self.source_dir.join(format!("{}.{ext}", self.stem))
    }
}

/// Split at the last `.`: `"a.b.c.xcf"` -> `("a.b.c", ".xcf")`,
/// `"Makefile"` -> `("Makefile", "")`.
pub fn split_filename(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) => filename.split_at(idx),
        None => (filename, ""),
    }
}
