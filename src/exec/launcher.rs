// src/exec/launcher.rs

//! Spawning of the supervised application process.

use std::fmt;
use std::process::Stdio;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::command::CommandSpec;

/// Starts processes on behalf of the supervisor.
pub trait ProcessLauncher: Send + 'static {
    fn launch(&mut self, spec: &CommandSpec) -> Result<Box<dyn ProcessHandle>>;
}

/// A launched process as seen by the supervisor.
pub trait ProcessHandle: Send + fmt::Debug {
    fn pid(&self) -> Option<u32>;

    /// Ask the process to terminate. Does not wait for it to exit.
    fn terminate(&mut self);

    fn has_exited(&self) -> bool;
}

/// Tag on forwarded application output, whatever `[tools].run` points at.
const OUTPUT_TAG: &str = "main";

/// Production launcher: real child processes whose output is forwarded to
/// our own stdout/stderr, one prefixed line at a time.
#[derive(Debug, Clone, Default)]
pub struct ChildLauncher;

impl ProcessLauncher for ChildLauncher {
    fn launch(&mut self, spec: &CommandSpec) -> Result<Box<dyn ProcessHandle>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning '{}'", spec))?;

        let pid = child.id();
        let label = spec.to_string();

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, Stream::Stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, Stream::Stderr);
        }

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(watch_child(child, label, cancel_rx));

        info!(cmd = %spec, pid = ?pid, "application process started");

        Ok(Box::new(ChildHandle {
            pid,
            cancel: Some(cancel_tx),
            task,
        }))
    }
}

/// Handle for a child owned by a [`watch_child`] task.
///
/// Termination is requested over `cancel`; the owning task kills and reaps.
pub struct ChildHandle {
    pid: Option<u32>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl fmt::Debug for ChildHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildHandle")
            .field("pid", &self.pid)
            .field("exited", &self.task.is_finished())
            .finish_non_exhaustive()
    }
}

impl ProcessHandle for ChildHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn terminate(&mut self) {
        match self.cancel.take() {
            Some(cancel) => {
                if cancel.send(()).is_err() {
                    debug!(pid = ?self.pid, "process already exited before termination request");
                }
            }
            None => debug!(pid = ?self.pid, "termination already requested"),
        }
    }

    fn has_exited(&self) -> bool {
        self.task.is_finished()
    }
}

/// Wait for either a natural exit or a termination request.
async fn watch_child(mut child: Child, label: String, mut cancel_rx: oneshot::Receiver<()>) {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => info!(
                process = %label,
                exit_code = ?status.code(),
                success = status.success(),
                "application process exited"
            ),
            Err(e) => warn!(process = %label, error = %e, "failed waiting for application process"),
        },

        cancel = &mut cancel_rx => match cancel {
            Ok(()) => {
                info!(process = %label, "superseded; killing application process");
                if let Err(e) = child.kill().await {
                    warn!(process = %label, error = %e, "failed to kill application process");
                }
            }
            Err(_) => {
                // Handle dropped without an explicit request; kill_on_drop
                // takes care of the child.
                debug!(process = %label, "handle dropped; releasing application process");
            }
        },
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn prefix(self) -> String {
        match self {
            Stream::Stdout => format!("{OUTPUT_TAG}-stdout:"),
            Stream::Stderr => format!("{OUTPUT_TAG}-stderr:"),
        }
    }
}

fn forward_lines<R>(reader: R, stream: Stream)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let prefix = stream.prefix();
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match stream {
                Stream::Stdout => println!("{prefix} {line}"),
                Stream::Stderr => eprintln!("{} {line}", prefix.red().bold()),
            }
        }
        debug!(%prefix, "output stream closed");
    });
}
