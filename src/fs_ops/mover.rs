//! Move strategy: rename every entry into its bucket on the same filesystem.

use anyhow::Result;
use std::fs;
use std::io;
use tracing::{debug, info};

use crate::config::TransferSettings;
use crate::fs_ops::helpers::io_error_with_help;
use crate::fs_ops::mount::ensure_same_filesystem;
use crate::fs_ops::plan::plan_transfers;
use crate::fs_ops::prepare;
use crate::report::{OperationKind, OperationReport, Warnings};

/// Move the selection into `destination/bucket/final_name`.
///
/// - every source must share the destination's mount point (`CrossFilesystem`)
/// - permission denied or an already-present destination skips the entry with a warning
/// - any other IO error aborts the run
pub fn move_items(settings: &TransferSettings) -> Result<OperationReport> {
    ensure_same_filesystem(&settings.selection.sources, &settings.destination)?;

    let (buckets, renames) = prepare(&settings.selection)?;
    let planned = plan_transfers(&buckets, &renames, &settings.destination);
    let mut warnings = Warnings::new();

    if settings.dry_run {
        debug!(items = planned.len(), "dry run: nothing moved");
        return Ok(OperationReport {
            kind: OperationKind::Move,
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
                    warnings.skip("move", &item.source, &e);
                    continue;
                }
                Err(e) => return Err(io_error_with_help("create bucket", bucket_dir)(e)),
            }
        }
        if fs::symlink_metadata(&item.destination).is_ok() {
            warnings.skip_existing(&item.source, &item.destination);
            continue;
        }
        match fs::rename(&item.source, &item.destination) {
            Ok(()) => {
                processed += 1;
                debug!(src = %item.source.display(), dest = %item.destination.display(), "moved");
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warnings.skip("move", &item.source, &e);
            }
            Err(e) => return Err(io_error_with_help("move", &item.source)(e)),
        }
    }

    info!(processed, warnings = warnings.count(), "move finished");
    Ok(OperationReport {
        kind: OperationKind::Move,
        dry_run: false,
        planned,
        processed,
        warnings,
    })
}
