// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] describes what to run (`CommandSpec`).
//! - [`invoker`] runs one-shot tools (`convert`, `jam`) and captures their
//!   output. Tests swap in a recording `ToolInvoker`.
//! - [`launcher`] spawns the long-running application and forwards its
//!   output with a per-stream prefix.
//! - [`supervisor`] owns the single "current application process" slot.

pub mod command;
pub mod invoker;
pub mod launcher;
pub mod supervisor;

pub use command::CommandSpec;
pub use invoker::{ProcessInvoker, ToolFuture, ToolInvoker, ToolOutput};
pub use launcher::{ChildLauncher, ProcessHandle, ProcessLauncher};
pub use supervisor::{
    spawn_supervisor, ProcessSupervisor, RunningProcess, SupervisorError, SupervisorHandle,
    SupervisorState, SupervisorStatus,
};
