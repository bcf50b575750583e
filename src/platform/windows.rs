//! Windows implementations of platform helpers.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::iter::once;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Anything that is not a file, a directory or a symlink.
pub fn is_special_file(ft: &fs::FileType) -> bool {
    !(ft.is_file() || ft.is_dir() || ft.is_symlink())
}

/// Volume mount point holding `path` (e.g. `C:\` or a mounted folder).
pub fn mount_point(path: &Path) -> io::Result<PathBuf> {
    use windows_sys::Win32::Storage::FileSystem::GetVolumePathNameW;

    let abs = dunce::canonicalize(path)?;
    let wide: Vec<u16> = abs.as_os_str().encode_wide().chain(once(0)).collect();
    let mut buf = vec![0u16; 1024];
    let ok = unsafe { GetVolumePathNameW(wide.as_ptr(), buf.as_mut_ptr(), buf.len() as u32) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    Ok(PathBuf::from(OsString::from_wide(&buf[..len])))
}
