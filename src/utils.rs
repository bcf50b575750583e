use std::env;
use std::fs;
use std::path::Path;

/// Quick writability check: create and remove a small file in `dir`.
/// Uses create_new to avoid clobbering existing files.
pub(crate) fn check_writable(dir: &Path) -> std::io::Result<()> {
    let marker = dir.join(format!(".timefops_check_{}.tmp", std::process::id()));
    match fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&marker)
    {
        Ok(_) => {
            let _ = fs::remove_file(&marker);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Render a path relative to the current directory when it lives below it,
/// otherwise as-is. Used for user-facing listings.
pub fn display_relative(path: &Path) -> String {
    if let Ok(cwd) = env::current_dir()
        && let Ok(rel) = path.strip_prefix(&cwd)
        && !rel.as_os_str().is_empty()
    {
        return rel.display().to_string();
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writable_check_leaves_no_file_behind() {
        let td = tempdir().unwrap();
        check_writable(td.path()).unwrap();
        assert_eq!(fs::read_dir(td.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn writable_check_fails_on_readonly_dir() {
        use std::os::unix::fs::PermissionsExt;
        // root bypasses permission checks
        if unsafe { libc::geteuid() } == 0 {
            eprintln!("skipping: running as root");
            return;
        }
        let td = tempdir().unwrap();
        let ro = td.path().join("ro");
        fs::create_dir(&ro).unwrap();
        fs::set_permissions(&ro, fs::Permissions::from_mode(0o555)).unwrap();
        assert!(check_writable(&ro).is_err());
        fs::set_permissions(&ro, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn display_relative_keeps_outside_paths() {
        let p = Path::new("/definitely/not/below/cwd");
        assert_eq!(display_relative(p), "/definitely/not/below/cwd");
    }
}
