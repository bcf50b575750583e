use assert_fs::TempDir;
use assert_fs::prelude::*;
use filetime::{FileTime, set_file_mtime};
use std::fs;
use std::path::{Path, PathBuf};

use timefops::{Selection, TimeKind, TransferSettings, copy_items};

const MID_MARCH_2020: i64 = 1_584_273_600;

fn stamp(path: &Path) {
    set_file_mtime(path, FileTime::from_unix_time(MID_MARCH_2020, 0)).unwrap();
}

fn settings(sources: Vec<PathBuf>, dest: &Path) -> TransferSettings {
    let mut selection = Selection::new(sources, TimeKind::Modified);
    selection.formats = vec!["%Y".into(), "%m".into()];
    TransferSettings {
        selection,
        destination: dest.to_path_buf(),
        dry_run: false,
    }
}

#[test]
fn copies_files_and_trees_and_keeps_sources() {
    let temp = TempDir::new().unwrap();
    let src = temp.child("incoming");
    let dest = temp.child("sorted");
    dest.create_dir_all().unwrap();
    src.child("photo.jpg").write_str("jpg").unwrap();
    src.child("album/one.jpg").write_str("1").unwrap();
    src.child("album/nested/two.jpg").write_str("2").unwrap();
    stamp(src.child("photo.jpg").path());
    stamp(src.child("album").path());

    let report = copy_items(&settings(vec![src.path().to_path_buf()], dest.path())).unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.warning_count(), 0);
    dest.child("2020/03/photo.jpg").assert("jpg");
    dest.child("2020/03/album/one.jpg").assert("1");
    dest.child("2020/03/album/nested/two.jpg").assert("2");
    src.child("photo.jpg").assert("jpg");
    src.child("album/one.jpg").assert("1");
}

#[test]
fn copied_file_keeps_its_timestamp() {
    let temp = TempDir::new().unwrap();
    let src = temp.child("incoming");
    let dest = temp.child("sorted");
    dest.create_dir_all().unwrap();
    src.child("old.txt").write_str("old").unwrap();
    stamp(src.child("old.txt").path());

    copy_items(&settings(vec![src.path().to_path_buf()], dest.path())).unwrap();

    let meta = fs::metadata(dest.child("2020/03/old.txt").path()).unwrap();
    assert_eq!(
        FileTime::from_last_modification_time(&meta),
        FileTime::from_unix_time(MID_MARCH_2020, 0)
    );
}

#[test]
fn copied_directory_keeps_its_timestamp() {
    let temp = TempDir::new().unwrap();
    let src = temp.child("incoming");
    let dest = temp.child("sorted");
    dest.create_dir_all().unwrap();
    src.child("dir/file.txt").write_str("f").unwrap();
    stamp(src.child("dir").path());

    copy_items(&settings(vec![src.path().to_path_buf()], dest.path())).unwrap();

    let meta = fs::metadata(dest.child("2020/03/dir").path()).unwrap();
    assert_eq!(
        FileTime::from_last_modification_time(&meta),
        FileTime::from_unix_time(MID_MARCH_2020, 0)
    );
}

#[test]
fn existing_destination_is_not_overwritten() {
    let temp = TempDir::new().unwrap();
    let src = temp.child("incoming");
    let dest = temp.child("sorted");
    src.child("same.txt").write_str("new").unwrap();
    stamp(src.child("same.txt").path());
    dest.child("2020/03/same.txt").write_str("old").unwrap();

    let report = copy_items(&settings(vec![src.path().to_path_buf()], dest.path())).unwrap();

    assert_eq!(report.warning_count(), 1);
    dest.child("2020/03/same.txt").assert("old");
}

#[cfg(unix)]
#[test]
fn unreadable_file_is_skipped_with_warning() {
    use std::os::unix::fs::PermissionsExt;
    if unsafe { libc::geteuid() } == 0 {
        eprintln!("skipping: running as root");
        return;
    }
    let temp = TempDir::new().unwrap();
    let src = temp.child("incoming");
    let dest = temp.child("sorted");
    dest.create_dir_all().unwrap();
    src.child("ok.txt").write_str("ok").unwrap();
    src.child("secret.txt").write_str("s").unwrap();
    stamp(src.child("ok.txt").path());
    stamp(src.child("secret.txt").path());
    fs::set_permissions(src.child("secret.txt").path(), fs::Permissions::from_mode(0o000)).unwrap();

    let report = copy_items(&settings(vec![src.path().to_path_buf()], dest.path())).unwrap();
    fs::set_permissions(src.child("secret.txt").path(), fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.warning_count(), 1);
    dest.child("2020/03/ok.txt").assert("ok");
}
