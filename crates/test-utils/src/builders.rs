use std::path::Path;
use std::sync::Arc;

use assetwatch::codec::DescriptorCodec;
use assetwatch::config::{ConfigFile, HandlerBinding, RawConfigFile};
use assetwatch::dispatch::HandlerContext;
use assetwatch::exec::{spawn_supervisor, SupervisorHandle};
use assetwatch::fs::FileSystem;
use assetwatch::types::HandlerKind;

use crate::fakes::{FakeLauncher, RecordingInvoker};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_handler(mut self, extension: &str, kind: HandlerKind) -> Self {
        self.config.handler.push(HandlerBinding {
            extension: extension.to_string(),
            kind,
        });
        self
    }

    pub fn with_fields_per_row(mut self, n: usize) -> Self {
        self.config.config.fields_per_row = n;
        self
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.config.config.debounce_ms = ms;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A handler context wired to fakes, plus the fakes themselves.
pub struct TestContext {
    pub ctx: HandlerContext,
    pub invoker: RecordingInvoker,
    pub launcher: FakeLauncher,
    pub supervisor: SupervisorHandle,
}

impl TestContext {
    /// Must be called inside a Tokio runtime (spawns the supervisor task).
    pub fn new(cfg: &ConfigFile, project_root: &Path, fs: Arc<dyn FileSystem>) -> Self {
        let invoker = RecordingInvoker::new();
        let launcher = FakeLauncher::new();
        let supervisor = spawn_supervisor(launcher.clone());

        let ctx = HandlerContext {
            tools: cfg.tools.clone(),
            project_root: project_root.to_path_buf(),
            invoker: Arc::new(invoker.clone()),
            supervisor: supervisor.clone(),
            codec: DescriptorCodec::new(cfg.fields_per_row()),
            fs,
        };

        Self {
            ctx,
            invoker,
            launcher,
            supervisor,
        }
    }
}
