//! Same-filesystem pre-check for moves.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::TimefopsError;
use crate::fs_ops::helpers::io_error_with_help;
use crate::platform::mount_point;

/// Directory whose filesystem decides where `source` lives. A symlink is
/// renamed as a link, so its own parent directory counts, not its target.
fn anchor(source: &Path) -> PathBuf {
    match fs::symlink_metadata(source) {
        Ok(meta) if meta.file_type().is_symlink() => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        _ => source.to_path_buf(),
    }
}

/// Fail with `CrossFilesystem` when any source sits on a different mount point
/// than `destination`. Runs before any mutation.
pub fn ensure_same_filesystem(sources: &[PathBuf], destination: &Path) -> Result<()> {
    let destination_mount =
        mount_point(destination).map_err(io_error_with_help("find mount point of", destination))?;
    for src in sources {
        let anchored = anchor(src);
        let path_mount =
            mount_point(&anchored).map_err(io_error_with_help("find mount point of", &anchored))?;
        debug!(source = %src.display(), mount = %path_mount.display(), dest_mount = %destination_mount.display(), "mount check");
        if path_mount != destination_mount {
            return Err(TimefopsError::CrossFilesystem {
                path: src.clone(),
                path_mount,
                destination: destination.to_path_buf(),
                destination_mount,
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn same_tempdir_passes() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        let dst = td.path().join("dst");
        fs::create_dir(&src).unwrap();
        fs::create_dir(&dst).unwrap();
        ensure_same_filesystem(&[src], &dst).unwrap();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn proc_is_rejected() {
        if !Path::new("/proc/self").exists() {
            return;
        }
        let td = tempdir().unwrap();
        let err = ensure_same_filesystem(&[PathBuf::from("/proc/self")], td.path()).unwrap_err();
        let te = err.downcast_ref::<TimefopsError>().unwrap();
        assert!(matches!(te, TimefopsError::CrossFilesystem { .. }));
    }
}
