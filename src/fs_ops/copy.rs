//! Copy strategy: duplicate every entry into its bucket, preserving metadata.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, trace};
use walkdir::WalkDir;

use crate::config::TransferSettings;
use crate::fs_ops::helpers::{io_error_with_help, io_error_with_help_io};
use crate::fs_ops::metadata::{preserve_metadata, preserve_xattrs};
use crate::fs_ops::plan::plan_transfers;
use crate::fs_ops::prepare;
use crate::platform::is_special_file;
use crate::report::{OperationKind, OperationReport, Warnings};

/// Copy the selection into `destination/bucket/final_name`.
pub fn copy_items(settings: &TransferSettings) -> Result<OperationReport> {
    let (buckets, renames) = prepare(&settings.selection)?;
    let planned = plan_transfers(&buckets, &renames, &settings.destination);
    let mut warnings = Warnings::new();

    if settings.dry_run {
        debug!(items = planned.len(), "dry run: nothing copied");
        return Ok(OperationReport {
            kind: OperationKind::Copy,
            dry_run: true,
            planned,
            processed: 0,
            warnings,
        });
    }

    let mut processed = 0;
    for item in &planned {
        if let Some(bucket_dir) = item.destination.parent() {
            match fs::create_dir_all(bucket_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    warnings.skip("copy", &item.source, &e);
                    continue;
                }
                Err(e) => return Err(io_error_with_help("create bucket", bucket_dir)(e)),
            }
        }
        if fs::symlink_metadata(&item.destination).is_ok() {
            warnings.skip_existing(&item.source, &item.destination);
            continue;
        }
        match copy_entry(&item.source, &item.destination, &mut warnings) {
            Ok(true) => {
                processed += 1;
                debug!(src = %item.source.display(), dest = %item.destination.display(), "copied");
            }
            Ok(false) => {}
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warnings.skip("copy", &item.source, &e);
            }
            Err(e) => return Err(io_error_with_help("copy", &item.source)(e)),
        }
    }

    info!(processed, warnings = warnings.count(), "copy finished");
    Ok(OperationReport {
        kind: OperationKind::Copy,
        dry_run: false,
        planned,
        processed,
        warnings,
    })
}

/// Copy one entry: a directory tree, or (when `src` is not a directory) a
/// single file with its metadata. A symlink is recreated, not followed.
///
/// FIFOs, sockets and devices are skipped with a warning, both as the entry
/// itself (returns false) and inside a copied tree.
pub fn copy_entry(src: &Path, dst: &Path, warnings: &mut Warnings) -> io::Result<bool> {
    let ft = fs::symlink_metadata(src)?.file_type();
    if ft.is_symlink() {
        copy_symlink(src, dst)?;
        return Ok(true);
    }
    if is_special_file(&ft) {
        warnings.skip_special("copy", src);
        return Ok(false);
    }
    match copy_tree(src, dst, warnings) {
        Err(e) if e.kind() == io::ErrorKind::NotADirectory => {
            trace!(src = %src.display(), "not a directory, copying as file");
            copy_file_preserving(src, dst)?;
        }
        other => other?,
    }
    Ok(true)
}

/// Recursive directory copy. Directory metadata is applied deepest-first once
/// their contents are in place.
fn copy_tree(src: &Path, dst: &Path, warnings: &mut Warnings) -> io::Result<()> {
    fs::read_dir(src)?;

    let mut dirs = Vec::new();
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = dst.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            fs::create_dir(&target).map_err(io_error_with_help_io("create directory", &target))?;
            dirs.push((entry.path().to_path_buf(), target));
        } else if ft.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else if is_special_file(&ft) {
            warnings.skip_special("copy", entry.path());
        } else {
            copy_file_preserving(entry.path(), &target)?;
        }
    }

    for (src_dir, dst_dir) in dirs.iter().rev() {
        let meta = fs::symlink_metadata(src_dir)?;
        preserve_metadata(dst_dir, &meta);
        preserve_xattrs(src_dir, dst_dir);
    }
    Ok(())
}

fn copy_file_preserving(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst)?;
    let meta = fs::symlink_metadata(src)?;
    preserve_metadata(dst, &meta);
    preserve_xattrs(src, dst);
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    std::os::unix::fs::symlink(&target, dst)?;
    if let Ok(meta) = fs::symlink_metadata(src) {
        preserve_metadata(dst, &meta);
    }
    Ok(())
}

#[cfg(windows)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let target = fs::read_link(src)?;
    if fs::metadata(src).map(|m| m.is_dir()).unwrap_or(false) {
        std::os::windows::fs::symlink_dir(&target, dst)
    } else {
        std::os::windows::fs::symlink_file(&target, dst)
    }
}
