//! Transfer executors: move, copy and archive.
//!
//! Every operation runs the same pipeline: bucket the selection, resolve
//! duplicate names, plan `(source, destination)` pairs, then either report the
//! plan (dry run) or execute it.

mod archive;
mod copy;
pub mod helpers;
mod metadata;
mod mount;
mod mover;
mod plan;

pub use archive::archive_items;
pub use copy::{copy_entry, copy_items};
pub use helpers::{io_error_with_help, io_error_with_help_io};
pub use metadata::{preserve_metadata, preserve_xattrs};
pub use mount::ensure_same_filesystem;
pub use mover::move_items;
pub use plan::plan_transfers;

use anyhow::Result;
use tracing::{debug, info};

use crate::bucket::{BucketMap, compute_buckets};
use crate::config::Selection;
use crate::duplicate::{RenameMap, resolve};

/// Bucket the selection and resolve name collisions.
pub(crate) fn prepare(selection: &Selection) -> Result<(BucketMap, RenameMap)> {
    let buckets = compute_buckets(selection)?;
    let (renames, collisions) = resolve(&buckets);
    for (bucket, names) in &collisions {
        for (name, paths) in names {
            debug!(bucket = %bucket, name = ?name, count = paths.len(), "duplicate names in bucket");
        }
    }
    if !renames.is_empty() {
        info!(
            renamed = renames.len(),
            "Duplicate names found; enumerated copies will be renamed."
        );
    }
    Ok((buckets, renames))
}
