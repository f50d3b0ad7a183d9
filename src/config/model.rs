// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::CommandSpec;
use crate::registry::ExtensionRegistry;
use crate::types::HandlerKind;

/// Configuration as read from `Assetwatch.toml`, before validation.
///
/// ```toml
/// [config]
/// watch = ["assets"]
/// project_root = "."
/// debounce_ms = 50
/// fields_per_row = 6
///
/// [tools]
/// convert = "convert -flatten"
/// build = "jam"
/// run = "./dist/main"
///
/// [[handler]]
/// extension = ".glsl"
/// kind = "compile"
/// ```
///
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub tools: ToolsSection,

    /// Extra extension bindings on top of the built-in ones.
    #[serde(default)]
    pub handler: Vec<HandlerBinding>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Directories watched when none are given on the command line.
    #[serde(default)]
    pub watch: Vec<PathBuf>,

    /// Where the build tool and the application run. Defaults to the
    /// current working directory.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Window in which repeated modifications of one file collapse into a
    /// single work item. `0` disables debouncing.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Fields expected on every descriptor row. `0` accepts any width as
    /// long as all rows agree.
    #[serde(default = "default_fields_per_row")]
    pub fields_per_row: usize,
}

fn default_debounce_ms() -> u64 {
    50
}

fn default_fields_per_row() -> usize {
    crate::codec::DEFAULT_FIELDS_PER_ROW
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            watch: Vec::new(),
            project_root: None,
            debounce_ms: default_debounce_ms(),
            fields_per_row: default_fields_per_row(),
        }
    }
}

/// `[tools]` section: command lines for the external collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    /// Image flattener; `<input> <output>` are appended.
    #[serde(default = "default_convert")]
    pub convert: String,

    /// Build tool, run in the project root.
    #[serde(default = "default_build")]
    pub build: String,

    /// The produced application, run in the project root.
    #[serde(default = "default_run")]
    pub run: String,
}

fn default_convert() -> String {
    "convert -flatten".to_string()
}

fn default_build() -> String {
    "jam".to_string()
}

fn default_run() -> String {
    "./dist/main".to_string()
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            convert: default_convert(),
            build: default_build(),
            run: default_run(),
        }
    }
}

/// `[[handler]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerBinding {
    pub extension: String,
    pub kind: HandlerKind,
}

/// Parsed tool command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub convert: CommandSpec,
    pub build: CommandSpec,
    pub run: CommandSpec,
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            convert: CommandSpec::new("convert").arg("-flatten"),
            build: CommandSpec::new("jam"),
            run: CommandSpec::new("./dist/main"),
        }
    }
}

/// Validated configuration. Build it via `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub tools: ToolCommands,
    pub registry: ExtensionRegistry,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        tools: ToolCommands,
        registry: ExtensionRegistry,
    ) -> Self {
        Self {
            config,
            tools,
            registry,
        }
    }

    /// `None` when rows may have any (uniform) width.
    pub fn fields_per_row(&self) -> Option<usize> {
        match self.config.fields_per_row {
            0 => None,
            n => Some(n),
        }
    }
}
