// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, ToolCommands, ToolsSection};
use crate::errors::{AssetwatchError, Result};
use crate::exec::CommandSpec;
use crate::registry::{ExtensionRegistry, DEFAULT_BINDINGS};

/// Upper bound for `[config].debounce_ms`; longer windows make the tool feel dead.
const MAX_DEBOUNCE_MS: u64 = 10_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_global_config(&raw)?;
        let tools = parse_tools(&raw.tools)?;
        let registry = build_registry(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, tools, registry))
    }
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.debounce_ms > MAX_DEBOUNCE_MS {
        return Err(AssetwatchError::ConfigError(format!(
            "[config].debounce_ms must be <= {MAX_DEBOUNCE_MS} (got {})",
            cfg.config.debounce_ms
        )));
    }

    for dir in &cfg.config.watch {
        if dir.as_os_str().is_empty() {
            return Err(AssetwatchError::ConfigError(
                "[config].watch must not contain empty paths".to_string(),
            ));
        }
    }

    Ok(())
}

fn parse_tools(tools: &ToolsSection) -> Result<ToolCommands> {
    Ok(ToolCommands {
        convert: parse_tool("convert", &tools.convert)?,
        build: parse_tool("build", &tools.build)?,
        run: parse_tool("run", &tools.run)?,
    })
}

fn parse_tool(key: &str, line: &str) -> Result<CommandSpec> {
    CommandSpec::from_command_line(line).ok_or_else(|| {
        AssetwatchError::ConfigError(format!("[tools].{key} must not be empty"))
    })
}

/// Built-in bindings followed by `[[handler]]` entries; any repeat fails.
fn build_registry(cfg: &RawConfigFile) -> Result<ExtensionRegistry> {
    let builtin = DEFAULT_BINDINGS
        .iter()
        .map(|(ext, kind)| (ext.to_string(), *kind));
    let configured = cfg
        .handler
        .iter()
        .map(|b| (b.extension.clone(), b.kind));

    ExtensionRegistry::from_bindings(builtin.chain(configured))
}
