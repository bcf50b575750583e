//! Transfer planning shared by real runs and dry runs.
//!
//! Both paths call `plan_transfers`, so the destinations a dry run prints are
//! exactly the ones a real run uses.

use std::path::Path;

use crate::bucket::{BucketMap, bucket_path};
use crate::duplicate::RenameMap;
use crate::report::PlannedTransfer;

/// Pair every entry with `root/bucket/final_name`, numbered from 1 in
/// enumeration order. Archives pass an empty root to get internal paths.
pub fn plan_transfers(buckets: &BucketMap, renames: &RenameMap, root: &Path) -> Vec<PlannedTransfer> {
    buckets
        .iter()
        .enumerate()
        .map(|(i, entry)| PlannedTransfer {
            index: i + 1,
            source: entry.path.clone(),
            destination: root
                .join(bucket_path(&entry.bucket))
                .join(renames.final_name(&entry.path)),
        })
        .collect()
}
