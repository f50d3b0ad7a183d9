// src/registry.rs

//! Extension → handler lookup table.
//!
//! The registry is built once at startup and never mutated afterwards.
//! Binding the same extension twice is rejected instead of silently letting
//! the later binding win.

use std::collections::HashMap;

use crate::errors::{AssetwatchError, Result};
use crate::types::HandlerKind;

/// Bindings every installation starts with.
pub const DEFAULT_BINDINGS: &[(&str, HandlerKind)] = &[
    (".xcf", HandlerKind::TranscodeImage),
    (".cpp", HandlerKind::Compile),
    (".hpp", HandlerKind::Compile),
    (".info", HandlerKind::TranscodeDescriptor),
];

#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    handlers: HashMap<String, HandlerKind>,
}

impl ExtensionRegistry {
    /// Build a registry from `(extension, handler)` pairs.
    ///
    /// Extensions include the leading `.`. Fails on the first extension that
    /// appears twice or is malformed.
    pub fn from_bindings<I, S>(bindings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, HandlerKind)>,
        S: Into<String>,
    {
        let mut handlers = HashMap::new();

        for (ext, kind) in bindings {
            let ext = ext.into();
            validate_extension(&ext)?;

            if handlers.contains_key(&ext) {
                return Err(AssetwatchError::DuplicateHandler(ext));
            }
            handlers.insert(ext, kind);
        }

        Ok(Self { handlers })
    }

    /// Registry holding only [`DEFAULT_BINDINGS`].
    pub fn with_defaults() -> Result<Self> {
        Self::from_bindings(DEFAULT_BINDINGS.iter().copied())
    }

    pub fn lookup(&self, extension: &str) -> Option<HandlerKind> {
        self.handlers.get(extension).copied()
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn validate_extension(ext: &str) -> Result<()> {
    if !ext.starts_with('.') || ext.len() < 2 {
        return Err(AssetwatchError::ConfigError(format!(
            "handler extension '{ext}' must start with '.' and name a suffix (e.g. \".xcf\")"
        )));
    }
    if ext[1..].contains('.') {
        return Err(AssetwatchError::ConfigError(format!(
            "handler extension '{ext}' must not contain more than one '.'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_handler_kind() {
        let reg = ExtensionRegistry::with_defaults().unwrap();
        assert_eq!(reg.lookup(".xcf"), Some(HandlerKind::TranscodeImage));
        assert_eq!(reg.lookup(".cpp"), Some(HandlerKind::Compile));
        assert_eq!(reg.lookup(".info"), Some(HandlerKind::TranscodeDescriptor));
        assert_eq!(reg.lookup(".txt"), None);
        assert_eq!(reg.lookup(""), None);
    }

    #[test]
    fn duplicate_extension_fails_fast() {
        let err = ExtensionRegistry::from_bindings([
            (".xcf", HandlerKind::TranscodeImage),
            (".xcf", HandlerKind::Compile),
        ])
        .unwrap_err();

        match err {
            AssetwatchError::DuplicateHandler(ext) => assert_eq!(ext, ".xcf"),
            other => panic!("expected DuplicateHandler, got {other:?}"),
        }
    }

    #[test]
    fn malformed_extensions_are_rejected() {
        for bad in ["xcf", ".", "", ".tar.gz"] {
            let res = ExtensionRegistry::from_bindings([(bad, HandlerKind::Compile)]);
            assert!(
                matches!(res, Err(AssetwatchError::ConfigError(_))),
                "expected config error for {bad:?}"
            );
        }
    }

    #[test]
    fn extensions_are_sorted() {
        let reg = ExtensionRegistry::with_defaults().unwrap();
        assert_eq!(reg.extensions(), vec![".cpp", ".hpp", ".info", ".xcf"]);
        assert_eq!(reg.len(), 4);
    }
}
