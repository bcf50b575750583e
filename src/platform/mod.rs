//! Platform-specific helpers.
//! Hides OS differences (Unix/Windows) behind a uniform API so the rest of the
//! codebase can remain platform-agnostic.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{is_special_file, mount_point, open_log_file_secure_append};

#[cfg(windows)]
pub use windows::{is_special_file, mount_point, open_log_file_secure_append};
