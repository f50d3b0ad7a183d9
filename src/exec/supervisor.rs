// src/exec/supervisor.rs

//! Single-slot process supervisor.
//!
//! At most one application process is tracked at a time. Replacing it
//! ("supersession") signals the old process first and only then launches
//! the new one; the old one is not waited for.
//!
//! [`ProcessSupervisor`] is the plain state machine. [`spawn_supervisor`]
//! moves it into a Tokio task and hands out a cloneable
//! [`SupervisorHandle`], so every state change is serialized through one
//! channel and no lock is held across an await.

use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::command::CommandSpec;
use super::launcher::{ProcessHandle, ProcessLauncher};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    #[error("a process (run #{id}) is already running; supersede it instead of starting another")]
    AlreadyRunning { id: u64 },

    #[error("supervisor has been shut down")]
    Stopped,

    #[error("failed to launch '{command}': {reason}")]
    Launch { command: String, reason: String },

    #[error("supervisor task is no longer running")]
    Unavailable,
}

/// The one live process.
#[derive(Debug)]
pub struct RunningProcess {
    pub id: u64,
    pub command: CommandSpec,
    pub started_at: Instant,
    handle: Box<dyn ProcessHandle>,
}

impl RunningProcess {
    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }
}

#[derive(Debug, Default)]
pub enum SupervisorState {
    #[default]
    Idle,
    Running(RunningProcess),
    Stopped,
}

/// Copyable view of the supervisor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    Idle,
    Running { id: u64, pid: Option<u32> },
    Stopped,
}

#[derive(Debug)]
pub struct ProcessSupervisor<L: ProcessLauncher> {
    launcher: L,
    state: SupervisorState,
    next_id: u64,
}

impl<L: ProcessLauncher> ProcessSupervisor<L> {
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            state: SupervisorState::Idle,
            next_id: 1,
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn status(&self) -> SupervisorStatus {
        match &self.state {
            SupervisorState::Idle => SupervisorStatus::Idle,
            SupervisorState::Running(p) => SupervisorStatus::Running {
                id: p.id,
                pid: p.pid(),
            },
            SupervisorState::Stopped => SupervisorStatus::Stopped,
        }
    }

    /// True once a launch has succeeded and not been shut down. A process
    /// that exited on its own is still tracked.
    pub fn is_tracking(&self) -> bool {
        matches!(self.state, SupervisorState::Running(_))
    }

    /// Launch a process from `Idle`.
    pub fn start(&mut self, spec: CommandSpec) -> Result<u64, SupervisorError> {
        match &self.state {
            SupervisorState::Running(p) => {
                return Err(SupervisorError::AlreadyRunning { id: p.id });
            }
            SupervisorState::Stopped => return Err(SupervisorError::Stopped),
            SupervisorState::Idle => {}
        }

        let handle = self
            .launcher
            .launch(&spec)
            .map_err(|e| SupervisorError::Launch {
                command: spec.to_string(),
                reason: format!("{e:#}"),
            })?;

        let id = self.next_id;
        self.next_id += 1;

        debug!(run = id, pid = ?handle.pid(), cmd = %spec, "supervisor: Idle -> Running");
        self.state = SupervisorState::Running(RunningProcess {
            id,
            command: spec,
            started_at: Instant::now(),
            handle,
        });

        Ok(id)
    }

    /// Signal the current process (if any), then launch `spec`.
    ///
    /// If the launch fails the supervisor is left `Idle`.
    pub fn supersede(&mut self, spec: CommandSpec) -> Result<u64, SupervisorError> {
        if matches!(self.state, SupervisorState::Stopped) {
            return Err(SupervisorError::Stopped);
        }

        if let SupervisorState::Running(mut old) = std::mem::take(&mut self.state) {
            if old.handle.has_exited() {
                debug!(run = old.id, "previous process already exited");
            } else {
                info!(
                    run = old.id,
                    pid = ?old.pid(),
                    uptime_ms = old.started_at.elapsed().as_millis() as u64,
                    "superseding running process"
                );
                old.handle.terminate();
            }
        }

        self.start(spec)
    }

    /// Signal the current process (if any) and refuse further launches.
    pub fn shutdown(&mut self) {
        match std::mem::replace(&mut self.state, SupervisorState::Stopped) {
            SupervisorState::Running(mut p) => {
                info!(run = p.id, pid = ?p.pid(), "stopping application process");
                p.handle.terminate();
            }
            SupervisorState::Idle => debug!("supervisor stopped with no running process"),
            SupervisorState::Stopped => {}
        }
    }
}

enum SupervisorCommand {
    Start {
        spec: CommandSpec,
        reply: oneshot::Sender<Result<u64, SupervisorError>>,
    },
    Supersede {
        spec: CommandSpec,
        reply: oneshot::Sender<Result<u64, SupervisorError>>,
    },
    Status {
        reply: oneshot::Sender<SupervisorStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable front-end to a supervisor running in its own task.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<SupervisorCommand>,
}

impl std::fmt::Debug for SupervisorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorCommand::Start { spec, .. } => write!(f, "Start({spec})"),
            SupervisorCommand::Supersede { spec, .. } => write!(f, "Supersede({spec})"),
            SupervisorCommand::Status { .. } => f.write_str("Status"),
            SupervisorCommand::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}

/// Spawn the supervisor task.
///
/// The task runs until [`SupervisorHandle::shutdown`] is called or every
/// handle has been dropped; either way the tracked process is signaled.
pub fn spawn_supervisor<L: ProcessLauncher>(launcher: L) -> SupervisorHandle {
    let (tx, mut rx) = mpsc::channel::<SupervisorCommand>(16);

    tokio::spawn(async move {
        let mut supervisor = ProcessSupervisor::new(launcher);
        debug!("supervisor loop started");

        while let Some(command) = rx.recv().await {
            match command {
                SupervisorCommand::Start { spec, reply } => {
                    let _ = reply.send(supervisor.start(spec));
                }
                SupervisorCommand::Supersede { spec, reply } => {
                    let _ = reply.send(supervisor.supersede(spec));
                }
                SupervisorCommand::Status { reply } => {
                    let _ = reply.send(supervisor.status());
                }
                SupervisorCommand::Shutdown { reply } => {
                    supervisor.shutdown();
                    let _ = reply.send(());
                }
            }
        }

        supervisor.shutdown();
        debug!("supervisor loop finished (channel closed)");
    });

    SupervisorHandle { tx }
}

impl SupervisorHandle {
    pub async fn start(&self, spec: CommandSpec) -> Result<u64, SupervisorError> {
        self.request(|reply| SupervisorCommand::Start { spec, reply })
            .await?
    }

    pub async fn supersede(&self, spec: CommandSpec) -> Result<u64, SupervisorError> {
        self.request(|reply| SupervisorCommand::Supersede { spec, reply })
            .await?
    }

    pub async fn status(&self) -> Result<SupervisorStatus, SupervisorError> {
        self.request(|reply| SupervisorCommand::Status { reply }).await
    }

    /// Whether a process is tracked. An unreachable supervisor tracks nothing.
    pub async fn is_tracking(&self) -> bool {
        match self.status().await {
            Ok(SupervisorStatus::Running { .. }) => true,
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "could not query supervisor");
                false
            }
        }
    }

    /// Idempotent; also succeeds if the supervisor task is already gone.
    pub async fn shutdown(&self) {
        if let Err(e) = self.request(|reply| SupervisorCommand::Shutdown { reply }).await {
            debug!(error = %e, "supervisor already gone at shutdown");
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SupervisorCommand,
    ) -> Result<T, SupervisorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(make(reply_tx)).await.is_err() {
            error!("supervisor channel closed");
            return Err(SupervisorError::Unavailable);
        }
        reply_rx.await.map_err(|_| SupervisorError::Unavailable)
    }
}
