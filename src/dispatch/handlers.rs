// src/dispatch/handlers.rs

//! The three behaviours an extension can be bound to.
//!
//! Each invocation runs to completion or to its first failure; a failure
//! halts the rest of that chain (a failed build never runs the binary) and
//! is reported to the caller, which logs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::event::FileChangeEvent;
use crate::codec::{self, BinaryRecord, CodecError, DescriptorCodec};
use crate::config::ToolCommands;
use crate::exec::{CommandSpec, SupervisorError, SupervisorHandle, ToolInvoker, ToolOutput};
use crate::fs::FileSystem;
use crate::types::HandlerKind;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("'{command}' failed (exit code {exit_code:?}): {stderr}")]
    ToolFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{}: {source}", .path.display())]
    Codec {
        path: PathBuf,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything a handler may touch besides its event.
#[derive(Clone)]
pub struct HandlerContext {
    pub tools: ToolCommands,
    pub project_root: PathBuf,
    pub invoker: Arc<dyn ToolInvoker>,
    pub supervisor: SupervisorHandle,
    pub codec: DescriptorCodec,
    pub fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("tools", &self.tools)
            .field("project_root", &self.project_root)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

pub async fn run_handler(
    kind: HandlerKind,
    event: &FileChangeEvent,
    ctx: &HandlerContext,
) -> Result<(), HandlerError> {
    match kind {
        HandlerKind::TranscodeImage => transcode_image(event, ctx).await,
        HandlerKind::Compile => compile_and_run(ctx).await,
        HandlerKind::TranscodeDescriptor => transcode_descriptor(event, ctx).await,
    }
}

/// `convert -flatten <file> <dir>/<stem>.png`, then rebuild if the project
/// has been run before.
async fn transcode_image(event: &FileChangeEvent, ctx: &HandlerContext) -> Result<(), HandlerError> {
    let output = event.sibling("png");
    info!(file = %event.filename, "transforming to png");

    let spec = ctx
        .tools
        .convert
        .clone()
        .arg(event.full_path.to_string_lossy())
        .arg(output.to_string_lossy());
    run_tool(ctx, spec).await?;

    info!(file = %event.filename, output = ?output, "finished png conversion");

    // Only rebuild automatically once the project has been built and run.
    if ctx.supervisor.is_tracking().await {
        compile_and_run(ctx).await
    } else {
        debug!("no application process tracked; skipping rebuild");
        Ok(())
    }
}

/// Build in the project root, then replace the running application.
async fn compile_and_run(ctx: &HandlerContext) -> Result<(), HandlerError> {
    info!(root = ?ctx.project_root, "compiling");
    let build = ctx.tools.build.clone().current_dir(&ctx.project_root);
    let output = run_tool(ctx, build).await?;
    if !output.stdout.trim().is_empty() {
        debug!(output = %output.stdout.trim_end(), "build output");
    }

    let run = ctx.tools.run.clone().current_dir(&ctx.project_root);
    let id = ctx.supervisor.supersede(run).await?;
    info!(run = id, "build succeeded; application restarted");
    Ok(())
}

/// Pack `<file>` into `<dir>/<stem>.file`.
///
/// Reading, encoding and the synced write run on the blocking pool.
async fn transcode_descriptor(
    event: &FileChangeEvent,
    ctx: &HandlerContext,
) -> Result<(), HandlerError> {
    let fs = Arc::clone(&ctx.fs);
    let encoder = ctx.codec;
    let input = event.full_path.clone();
    let output = codec::output_path(&event.source_dir, &event.stem);

    let record = tokio::task::spawn_blocking({
        let output = output.clone();
        move || pack_descriptor(fs.as_ref(), encoder, &input, &output)
    })
    .await
    .map_err(|e| HandlerError::Other(anyhow::Error::new(e).context("descriptor task failed")))??;

    info!(
        file = %event.filename,
        output = ?output,
        fields = record.payload().len(),
        bytes = record.byte_len(),
        "descriptor packed"
    );
    Ok(())
}

fn pack_descriptor(
    fs: &dyn FileSystem,
    encoder: DescriptorCodec,
    input: &Path,
    output: &Path,
) -> Result<BinaryRecord, HandlerError> {
    let content = fs.read_to_string(input)?;

    let record = encoder
        .transcode(&content)
        .map_err(|source| HandlerError::Codec {
            path: input.to_path_buf(),
            source,
        })?;

    codec::write_record(fs, output, &record)?;
    Ok(record)
}

/// Run a tool and turn a non-zero exit or stderr output into an error.
async fn run_tool(ctx: &HandlerContext, spec: CommandSpec) -> Result<ToolOutput, HandlerError> {
    let command = spec.to_string();
    let output = ctx.invoker.run(spec).await?;

    if output.is_failure() {
        return Err(HandlerError::ToolFailed {
            command,
            exit_code: output.exit_code,
            stderr: output.stderr.trim_end().to_string(),
        });
    }

    Ok(output)
}
