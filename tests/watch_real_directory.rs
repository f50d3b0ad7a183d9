// tests/watch_real_directory.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use assetwatch::codec::BinaryRecord;
use assetwatch::dispatch::{resolve_directories, spawn_watchers, Dispatcher};
use assetwatch::fs::RealFileSystem;
use assetwatch_test_utils::builders::{ConfigFileBuilder, TestContext};
use assetwatch_test_utils::{init_tracing, with_timeout};

async fn wait_for_file(path: &Path) -> Vec<u8> {
    loop {
        if let Ok(bytes) = std::fs::read(path) {
            return bytes;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn writing_a_descriptor_produces_its_packed_sibling() {
    init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let fs = Arc::new(RealFileSystem);
    let dirs = resolve_directories(fs.as_ref(), tmp.path(), &[]).unwrap();
    let dir = dirs[0].clone();

    let cfg = ConfigFileBuilder::new().with_debounce_ms(0).build();
    let tc = TestContext::new(&cfg, &dir, fs);
    let dispatcher = Dispatcher::new(Arc::new(cfg.registry.clone()), tc.ctx.clone(), Duration::ZERO);

    let (tx, rx) = mpsc::unbounded_channel();
    let watchers = spawn_watchers(&dirs, tx).unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let loop_task = tokio::spawn(dispatcher.run_until(rx, async {
        let _ = stop_rx.await;
    }));

    // Unregistered files are ignored.
    std::fs::write(dir.join("notes.txt"), "not an asset").unwrap();
    std::fs::write(
        dir.join("sprites.info"),
        "hero: (0, 0, 32w, 48, 16w, 24)\nenemy: (32w, 0, 64w, 48, 48w, 24)\n",
    )
    .unwrap();

    let bytes = with_timeout(wait_for_file(&dir.join("sprites.file"))).await;
    let record = BinaryRecord::from_bytes(&bytes).unwrap();
    assert_eq!(record.payload().len(), 12);
    assert_eq!(record.payload()[0], 1.0);
    assert_eq!(record.payload()[2], 0.1);

    assert!(tc.invoker.calls().is_empty());
    assert!(!dir.join("notes.file").exists());

    stop_tx.send(()).unwrap();
    with_timeout(loop_task).await.unwrap();
    watchers.close();
}
