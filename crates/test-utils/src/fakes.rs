use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use assetwatch::exec::{CommandSpec, ProcessHandle, ProcessLauncher, ToolFuture, ToolInvoker, ToolOutput};

/// A fake tool invoker that:
/// - records every command it was asked to run
/// - answers with queued outputs, or success when the queue is empty.
#[derive(Clone, Default)]
pub struct RecordingInvoker {
    calls: Arc<Mutex<Vec<CommandSpec>>>,
    responses: Arc<Mutex<VecDeque<ToolOutput>>>,
}

impl RecordingInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the output returned by the next invocation.
    pub fn respond_with(&self, output: ToolOutput) {
        self.responses.lock().unwrap().push_back(output);
    }

    /// Queue a failing invocation with the given exit code and stderr.
    pub fn fail_next(&self, exit_code: i32, stderr: &str) {
        self.respond_with(ToolOutput {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        });
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered command lines, e.g. `"convert -flatten /d/a.xcf /d/a.png"`.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }
}

impl ToolInvoker for RecordingInvoker {
    fn run(&self, spec: CommandSpec) -> ToolFuture<'_> {
        let calls = Arc::clone(&self.calls);
        let responses = Arc::clone(&self.responses);

        Box::pin(async move {
            calls.lock().unwrap().push(spec);
            let output = responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(ToolOutput::success);
            Ok(output)
        })
    }
}

#[derive(Debug)]
struct FakeProcess {
    pid: u32,
    terminated: Arc<AtomicBool>,
}

impl ProcessHandle for FakeProcess {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn terminate(&mut self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn has_exited(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

/// A fake launcher that records launches and lets tests check which of
/// them are still "alive" (launched and never terminated).
#[derive(Clone, Default)]
pub struct FakeLauncher {
    launches: Arc<Mutex<Vec<(CommandSpec, Arc<AtomicBool>)>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> Vec<CommandSpec> {
        let launches = self.launches.lock().unwrap();
        launches.iter().map(|(spec, _)| spec.clone()).collect()
    }

    /// Indices (in launch order) of processes that were never terminated.
    pub fn live(&self) -> Vec<usize> {
        let launches = self.launches.lock().unwrap();
        launches
            .iter()
            .enumerate()
            .filter(|(_, (_, t))| !t.load(Ordering::SeqCst))
            .map(|(i, _)| i)
            .collect()
    }
}

impl ProcessLauncher for FakeLauncher {
    fn launch(&mut self, spec: &CommandSpec) -> anyhow::Result<Box<dyn ProcessHandle>> {
        let terminated = Arc::new(AtomicBool::new(false));
        let mut launches = self.launches.lock().unwrap();
        launches.push((spec.clone(), Arc::clone(&terminated)));

        Ok(Box::new(FakeProcess {
            pid: 4000 + launches.len() as u32,
            terminated,
        }))
    }
}
