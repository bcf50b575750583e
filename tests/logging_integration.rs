use assert_fs::TempDir;
use assert_fs::prelude::*;
use filetime::{FileTime, set_file_mtime};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::tempdir;
use timefops::config::path_has_symlink_ancestor;
use timefops::platform::open_log_file_secure_append;
use timefops::{Selection, TimeKind, TransferSettings, copy_items};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt as tsfmt, registry};

#[test]
fn skipped_items_are_logged_as_warnings() {
    let temp = TempDir::new().unwrap();
    let capture = temp.path().join("capture.log");
    let layer = tsfmt::layer()
        .with_writer(Mutex::new(File::create(&capture).unwrap()))
        .with_target(false)
        .with_ansi(false)
        .compact();
    let subscriber = registry().with(EnvFilter::new("info")).with(layer);

    let src = temp.child("incoming");
    let dest = temp.child("sorted");
    src.child("dup.txt").write_str("new").unwrap();
    set_file_mtime(src.child("dup.txt").path(), FileTime::from_unix_time(1_584_273_600, 0)).unwrap();
    dest.child("2020/dup.txt").write_str("old").unwrap();

    let mut selection = Selection::new(vec![src.path().to_path_buf()], TimeKind::Modified);
    selection.formats = vec!["%Y".into()];
    let settings = TransferSettings {
        selection,
        destination: dest.path().to_path_buf(),
        dry_run: false,
    };

    // Scoped dispatch; the global subscriber stays untouched.
    let dispatch = tracing::Dispatch::new(subscriber);
    let report = tracing::dispatcher::with_default(&dispatch, || copy_items(&settings).unwrap());
    drop(dispatch);
    assert_eq!(report.warning_count(), 1);

    let contents = std::fs::read_to_string(&capture).unwrap();
    assert!(contents.contains("WARN"), "contents={contents}");
    assert!(contents.contains("already exists, skipping"), "contents={contents}");
    assert!(contents.contains("copy finished"), "contents={contents}");
}

#[test]
fn file_logging_writes_to_custom_path_and_verifies_output() {
    let td = tempdir().expect("tempdir");
    let log_path: PathBuf = td.path().join("timefops_test.log");

    // Production refuses file logging below a symlinked ancestor (macOS /var).
    if path_has_symlink_ancestor(&log_path).unwrap() {
        eprintln!(
            "Skipping file logging test: path has symlink ancestor: {}",
            log_path.display()
        );
        return;
    }

    let file = open_log_file_secure_append(&log_path).expect("open_log_file_secure_append");
    let (writer, guard): (tracing_appender::non_blocking::NonBlocking, WorkerGuard) =
        tracing_appender::non_blocking(file);

    let file_layer = tsfmt::layer()
        .with_writer(move || writer.clone())
        .with_target(false)
        .compact();
    let subscriber = registry().with(EnvFilter::new("info")).with(file_layer);
    let dispatch = tracing::Dispatch::new(subscriber);

    tracing::dispatcher::with_default(&dispatch, || {
        tracing::info!("file-logging-test: written");
    });

    // Flush the non-blocking worker.
    drop(guard);

    let contents = std::fs::read_to_string(&log_path).expect("read log file");
    assert!(
        contents.contains("file-logging-test"),
        "log file did not contain expected text; contents={}",
        contents
    );
}
