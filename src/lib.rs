// src/lib.rs

pub mod cli;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod registry;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::codec::DescriptorCodec;
use crate::config::{load_or_default, ConfigFile};
use crate::dispatch::{resolve_directories, spawn_watchers, Dispatcher, HandlerContext};
use crate::errors::Result;
use crate::exec::{spawn_supervisor, ChildLauncher, ProcessInvoker};
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the extension registry
/// - the process supervisor
/// - one file watcher per directory
/// - the dispatch loop
/// - Ctrl-C handling and orderly shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let cwd = std::env::current_dir()?;

    let requested = if args.dirs.is_empty() {
        cfg.config.watch.clone()
    } else {
        args.dirs.clone()
    };
    let dirs = resolve_directories(fs.as_ref(), &cwd, &requested)?;
    let project_root = project_root(&cfg, &cwd);

    if args.dry_run {
        print_dry_run(&cfg, &dirs, &project_root);
        return Ok(());
    }

    let supervisor = spawn_supervisor(ChildLauncher);

    let ctx = HandlerContext {
        tools: cfg.tools.clone(),
        project_root,
        invoker: Arc::new(ProcessInvoker),
        supervisor: supervisor.clone(),
        codec: DescriptorCodec::new(cfg.fields_per_row()),
        fs,
    };

    let (raw_tx, raw_rx) = mpsc::unbounded_channel();
    let watchers = spawn_watchers(&dirs, raw_tx)?;

    print_banner(&cfg, &dirs);

    let dispatcher = Dispatcher::new(
        Arc::new(cfg.registry.clone()),
        ctx,
        Duration::from_millis(cfg.config.debounce_ms),
    );
    dispatcher.run_until(raw_rx, interrupted()).await;

    // Subscriptions first, so nothing new is dispatched while the
    // application process is being stopped.
    watchers.close();
    supervisor.shutdown().await;

    info!("assetwatch exiting");
    Ok(())
}

/// Resolves on Ctrl-C. If the signal cannot be listened for, never resolves.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// `[config].project_root` relative to the working directory, or the
/// working directory itself.
fn project_root(cfg: &ConfigFile, cwd: &Path) -> PathBuf {
    match &cfg.config.project_root {
        Some(root) => cwd.join(root),
        None => cwd.to_path_buf(),
    }
}

fn print_banner(cfg: &ConfigFile, dirs: &[PathBuf]) {
    for dir in dirs {
        println!("Listening for changes to \"{}\"", dir.display());
    }
    println!(
        "Currently performing operations on the following filetypes: {}",
        cfg.registry.extensions().join(",")
    );
    println!("Press Control + C to exit.\n");
}

/// Simple dry-run output: directories, handlers and tool commands.
fn print_dry_run(cfg: &ConfigFile, dirs: &[PathBuf], project_root: &Path) {
    println!("assetwatch dry-run");
    println!("  config.debounce_ms = {}", cfg.config.debounce_ms);
    match cfg.fields_per_row() {
        Some(n) => println!("  config.fields_per_row = {n}"),
        None => println!("  config.fields_per_row = any"),
    }
    println!("  project root: {}", project_root.display());
    println!();

    println!("directories ({}):", dirs.len());
    for dir in dirs {
        println!("  - {}", dir.display());
    }
    println!();

    println!("handlers ({}):", cfg.registry.len());
    for ext in cfg.registry.extensions() {
        if let Some(kind) = cfg.registry.lookup(ext) {
            println!("  {ext:<8} -> {kind}");
        }
    }
    println!();

    println!("tools:");
    println!("  convert: {} <input> <output>", cfg.tools.convert);
    println!("  build:   {}", cfg.tools.build);
    println!("  run:     {}", cfg.tools.run);

    debug!("dry-run complete (nothing watched)");
}
