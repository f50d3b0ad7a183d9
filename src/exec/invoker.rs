// src/exec/invoker.rs

//! Single-shot external tool runner.
//!
//! Handlers talk to a `ToolInvoker` instead of `tokio::process` directly so
//! tests can record invocations without spawning anything. The invoker
//! never retries and never hides a failure: spawn errors come back as `Err`,
//! exit status and stderr come back in [`ToolOutput`] for the caller to judge.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

use super::command::CommandSpec;

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn exited_ok(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Non-zero exit, or anything written to stderr.
    pub fn is_failure(&self) -> bool {
        !self.exited_ok() || !self.stderr.trim().is_empty()
    }
}

pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = Result<ToolOutput>> + Send + 'a>>;

/// Trait abstracting how external tools are run.
pub trait ToolInvoker: Send + Sync {
    fn run(&self, spec: CommandSpec) -> ToolFuture<'_>;
}

/// Production invoker backed by `tokio::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker;

impl ToolInvoker for ProcessInvoker {
    fn run(&self, spec: CommandSpec) -> ToolFuture<'_> {
        Box::pin(async move {
            let mut cmd = Command::new(&spec.program);
            cmd.args(&spec.args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = &spec.cwd {
                cmd.current_dir(dir);
            }

            debug!(cmd = %spec, cwd = ?spec.cwd, "running tool");

            let output = cmd
                .output()
                .await
                .with_context(|| format!("running '{}'", spec))?;

            Ok(ToolOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
