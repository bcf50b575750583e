//! Unix implementations of platform helpers.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

/// Open log file for appending; set 0600 only when creating a new file.
/// An existing file keeps its permissions (e.g. group-readable for log shipping).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}

/// FIFO, socket, or character/block device. Opening one can block or fail,
/// and none of them carry file content.
pub fn is_special_file(ft: &fs::FileType) -> bool {
    ft.is_fifo() || ft.is_socket() || ft.is_char_device() || ft.is_block_device()
}

/// Mount point of the filesystem holding `path`.
///
/// Walks upward from the canonical path until the parent sits on another
/// device, or until the root (its own parent) is reached.
pub fn mount_point(path: &Path) -> io::Result<PathBuf> {
    let mut current = dunce::canonicalize(path)?;
    let dev = fs::metadata(&current)?.dev();
    loop {
        let Some(parent) = current.parent() else {
            return Ok(current);
        };
        if fs::metadata(parent)?.dev() != dev {
            return Ok(current);
        }
        current = parent.to_path_buf();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn preserve_existing_log_file_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, b"hello").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        let _f = open_log_file_secure_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640, "existing permissions should be preserved");
    }

    #[test]
    fn new_log_file_gets_0600() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new_log.txt");
        let _f = open_log_file_secure_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "newly created log file should be 0600");
    }

    #[test]
    fn root_is_its_own_mount_point() {
        assert_eq!(mount_point(Path::new("/")).unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn siblings_share_a_mount_point() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir(&a).unwrap();
        fs::write(&b, b"x").unwrap();
        assert_eq!(mount_point(&a).unwrap(), mount_point(&b).unwrap());
    }

    #[test]
    fn fifo_and_socket_are_special() {
        let dir = tempdir().unwrap();
        let fifo = dir.path().join("pipe");
        let c = std::ffi::CString::new(fifo.as_os_str().as_encoded_bytes()).unwrap();
        assert_eq!(unsafe { libc::mkfifo(c.as_ptr(), 0o644) }, 0);
        let sock = dir.path().join("sock");
        let _listener = std::os::unix::net::UnixListener::bind(&sock).unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let kind = |p: &Path| fs::symlink_metadata(p).unwrap().file_type();
        assert!(is_special_file(&kind(&fifo)));
        assert!(is_special_file(&kind(&sock)));
        assert!(!is_special_file(&kind(&file)));
        assert!(!is_special_file(&kind(dir.path())));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn proc_is_a_separate_mount() {
        if !Path::new("/proc/self").exists() {
            return;
        }
        assert_eq!(
            mount_point(Path::new("/proc/self/status")).unwrap(),
            PathBuf::from("/proc")
        );
    }
}
