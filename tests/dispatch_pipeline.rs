// tests/dispatch_pipeline.rs

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;

use notify::event::{CreateKind, DataChange, ModifyKind};
use notify::{Event, EventKind};
use tokio::task::JoinHandle;

use assetwatch::dispatch::{run_handler, ChangeKind, Dispatcher, FileChangeEvent, RawChange};
use assetwatch::exec::{CommandSpec, SupervisorStatus};
use assetwatch::fs::mock::MockFileSystem;
use assetwatch::fs::FileSystem;
use assetwatch::types::HandlerKind;
use assetwatch_test_utils::builders::{ConfigFileBuilder, TestContext};
use assetwatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const DIR: &str = "/game/assets";
const ROOT: &str = "/game";

fn modified(path: &str) -> RawChange {
    RawChange {
        source_dir: PathBuf::from(DIR),
        event: Ok(Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(PathBuf::from(path))),
    }
}

fn setup() -> (Dispatcher, TestContext, MockFileSystem) {
    let cfg = ConfigFileBuilder::new().with_fields_per_row(0).build();
    let fs = MockFileSystem::new();
    let tc = TestContext::new(&cfg, Path::new(ROOT), Arc::new(fs.clone()));
    let dispatcher = Dispatcher::new(Arc::new(cfg.registry.clone()), tc.ctx.clone(), Duration::ZERO);
    (dispatcher, tc, fs)
}

/// Filesystem whose reads park until the test opens the gate.
#[derive(Debug)]
struct GatedFs {
    inner: MockFileSystem,
    gate: Mutex<std_mpsc::Receiver<()>>,
}

impl FileSystem for GatedFs {
    fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
        self.gate
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(2))
            .map_err(|_| anyhow!("read gate never opened"))?;
        self.inner.read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.inner.is_dir(path)
    }

    fn canonicalize(&self, path: &Path) -> anyhow::Result<PathBuf> {
        self.inner.canonicalize(path)
    }
}

async fn join_all(handles: Vec<JoinHandle<()>>) {
    for h in handles {
        with_timeout(h).await.expect("handler task panicked");
    }
}

#[tokio::test]
async fn image_change_converts_without_rebuild_when_nothing_ran_yet() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();

    let handles = dispatcher.accept(modified("/game/assets/sprite.xcf"));
    assert_eq!(handles.len(), 1);
    join_all(handles).await;

    assert_eq!(
        tc.invoker.command_lines(),
        vec!["convert -flatten /game/assets/sprite.xcf /game/assets/sprite.png"]
    );
    assert!(tc.launcher.launched().is_empty());
    assert_eq!(tc.supervisor.status().await?, SupervisorStatus::Idle);
    Ok(())
}

#[tokio::test]
async fn image_change_rebuilds_and_supersedes_once_a_run_exists() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();

    // A previous build/run cycle.
    tc.supervisor
        .supersede(CommandSpec::new("./dist/main").current_dir(ROOT))
        .await?;

    join_all(dispatcher.accept(modified("/game/assets/sprite.xcf"))).await;

    let calls = tc.invoker.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, "convert");
    assert_eq!(calls[1].to_string(), "jam");
    assert_eq!(calls[1].cwd, Some(PathBuf::from(ROOT)));

    let launched = tc.launcher.launched();
    assert_eq!(launched.len(), 2);
    assert_eq!(launched[1].program, "./dist/main");
    assert_eq!(launched[1].cwd, Some(PathBuf::from(ROOT)));
    assert_eq!(tc.launcher.live(), vec![1]);
    Ok(())
}

#[tokio::test]
async fn failed_conversion_halts_the_chain() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();
    tc.supervisor.supersede(CommandSpec::new("./dist/main")).await?;

    tc.invoker.fail_next(1, "convert: unable to open image");
    join_all(dispatcher.accept(modified("/game/assets/sprite.xcf"))).await;

    assert_eq!(tc.invoker.calls().len(), 1, "no build after failed convert");
    assert_eq!(tc.launcher.launched().len(), 1);
    Ok(())
}

#[tokio::test]
async fn source_change_compiles_then_runs() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();

    join_all(dispatcher.accept(modified("/game/assets/main.cpp"))).await;

    assert_eq!(tc.invoker.command_lines(), vec!["jam"]);
    assert_eq!(tc.launcher.live(), vec![0]);
    assert!(matches!(
        tc.supervisor.status().await?,
        SupervisorStatus::Running { .. }
    ));

    // Second change replaces the first run.
    join_all(dispatcher.accept(modified("/game/assets/main.cpp"))).await;
    assert_eq!(tc.launcher.launched().len(), 2);
    assert_eq!(tc.launcher.live(), vec![1]);
    Ok(())
}

#[tokio::test]
async fn failed_build_keeps_previous_run_alive() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();
    join_all(dispatcher.accept(modified("/game/assets/main.cpp"))).await;

    tc.invoker.fail_next(1, "main.cpp:3: error: expected ';'");
    join_all(dispatcher.accept(modified("/game/assets/main.cpp"))).await;

    assert_eq!(tc.launcher.launched().len(), 1);
    assert_eq!(tc.launcher.live(), vec![0]);
    Ok(())
}

#[tokio::test]
async fn build_warnings_on_stderr_count_as_failure() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();

    tc.invoker.respond_with(assetwatch::exec::ToolOutput {
        exit_code: Some(0),
        stdout: String::new(),
        stderr: "warning: unused variable".into(),
    });
    join_all(dispatcher.accept(modified("/game/assets/main.cpp"))).await;

    assert!(tc.launcher.launched().is_empty());
    Ok(())
}

#[tokio::test]
async fn descriptor_change_writes_packed_file() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, fs) = setup();
    fs.add_file("/game/assets/stuff.info", "pos: (0.0, 0.4),2.0w\nsize: 120, 64w, 0.5\n");

    join_all(dispatcher.accept(modified("/game/assets/stuff.info"))).await;

    let bytes = fs.contents("/game/assets/stuff.file").expect("output written");
    assert_eq!(bytes.len(), 8 + 4 * 2 * 3);
    assert_eq!(&bytes[0..4], &24u32.to_le_bytes());
    assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
    // Row 2 starts at byte 8 + 12: 120 -> 1 - 120/240.
    assert_eq!(&bytes[20..24], &0.5f32.to_le_bytes());

    assert!(tc.invoker.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_descriptor_leaves_no_output() -> TestResult {
    init_tracing();
    let (mut dispatcher, _tc, fs) = setup();
    fs.add_file("/game/assets/stuff.info", "1, 2, 3\n4, five, 6\n");

    join_all(dispatcher.accept(modified("/game/assets/stuff.info"))).await;

    assert!(fs.contents("/game/assets/stuff.file").is_none());
    Ok(())
}

#[tokio::test]
async fn unwritable_output_leaves_no_descriptor_file() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().with_fields_per_row(0).build();
    let fs = MockFileSystem::new();
    fs.add_file("/game/assets/stuff.info", "1, 2, 3\n");
    fs.deny_writes("/game/assets/stuff.file");
    let tc = TestContext::new(&cfg, Path::new(ROOT), Arc::new(fs.clone()));

    let event = FileChangeEvent::new(ChangeKind::Modified, Path::new(DIR), "stuff.info");
    let result = run_handler(HandlerKind::TranscodeDescriptor, &event, &tc.ctx).await;

    assert!(result.is_err());
    assert!(fs.contents("/game/assets/stuff.file").is_none());
    Ok(())
}

#[tokio::test]
async fn descriptor_io_runs_off_the_event_loop() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().with_fields_per_row(0).build();
    let inner = MockFileSystem::new();
    inner.add_file("/game/assets/stuff.info", "1, 2\n3, 4\n");
    let (open_tx, open_rx) = std_mpsc::channel();
    let gated = GatedFs {
        inner: inner.clone(),
        gate: Mutex::new(open_rx),
    };
    let tc = TestContext::new(&cfg, Path::new(ROOT), Arc::new(gated));
    let mut dispatcher =
        Dispatcher::new(Arc::new(cfg.registry.clone()), tc.ctx.clone(), Duration::ZERO);

    let handles = dispatcher.accept(modified("/game/assets/stuff.info"));
    assert_eq!(handles.len(), 1);

    // The handler is parked on the gate; this task must still get to run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    open_tx.send(())?;
    join_all(handles).await;

    let bytes = inner.contents("/game/assets/stuff.file").expect("output written");
    assert_eq!(bytes.len(), 8 + 4 * 2 * 2);
    Ok(())
}

#[tokio::test]
async fn unregistered_extension_invokes_nothing() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, fs) = setup();
    fs.add_file("/game/assets/notes.txt", "hello");

    let handles = dispatcher.accept(modified("/game/assets/notes.txt"));
    assert!(handles.is_empty());

    let handles = dispatcher.accept(modified("/game/assets/Jamfile"));
    assert!(handles.is_empty());

    assert!(tc.invoker.calls().is_empty());
    assert!(tc.launcher.launched().is_empty());
    Ok(())
}

#[tokio::test]
async fn renamed_events_are_not_wired() -> TestResult {
    init_tracing();
    let (mut dispatcher, tc, _fs) = setup();

    let change = RawChange {
        source_dir: PathBuf::from(DIR),
        event: Ok(Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/game/assets/sprite.xcf"))),
    };
    assert!(dispatcher.accept(change).is_empty());
    assert!(tc.invoker.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn debounced_burst_runs_handler_once() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().with_debounce_ms(30).build();
    let tc = TestContext::new(&cfg, Path::new(ROOT), Arc::new(MockFileSystem::new()));
    let mut dispatcher =
        Dispatcher::new(Arc::new(cfg.registry.clone()), tc.ctx.clone(), Duration::from_millis(30));

    for _ in 0..3 {
        assert!(dispatcher.accept(modified("/game/assets/sprite.xcf")).is_empty());
    }
    assert!(dispatcher.flush_ready().is_empty());

    tokio::time::sleep(Duration::from_millis(50)).await;
    let handles = dispatcher.flush_ready();
    assert_eq!(handles.len(), 1);
    join_all(handles).await;

    assert_eq!(tc.invoker.calls().len(), 1);
    Ok(())
}
