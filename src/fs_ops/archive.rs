//! Archive strategy: write every entry into one tar or zip archive.

use anyhow::Result;
use std::path::Path;
use tracing::{debug, error, info};

use crate::archive::ArchiveSink;
use crate::config::ArchiveSettings;
use crate::fs_ops::plan::plan_transfers;
use crate::fs_ops::prepare;
use crate::report::{OperationKind, OperationReport, Warnings};

/// Archive the selection; entries land at `bucket/final_name` inside the archive.
///
/// Permission problems skip the affected entry (or zip node) with a warning.
/// The sink is finished on every exit path, so a failed run still leaves a
/// well-formed archive of what was added.
pub fn archive_items(settings: &ArchiveSettings) -> Result<OperationReport> {
    settings.check_combination()?;

    let (buckets, renames) = prepare(&settings.selection)?;
    let planned = plan_transfers(&buckets, &renames, Path::new(""));
    let mut warnings = Warnings::new();

    if settings.dry_run {
        debug!(items = planned.len(), destination = %settings.destination, "dry run: nothing archived");
        return Ok(OperationReport {
            kind: OperationKind::Archive,
            dry_run: true,
            planned,
            processed: 0,
            warnings,
        });
    }

    let mut sink = ArchiveSink::open(
        &settings.destination,
        settings.container,
        settings.compression,
        settings.encryption.as_ref(),
    )?;

    let mut processed = 0;
    let added = (|| -> Result<()> {
        for item in &planned {
            if sink.add_entry(&item.source, &item.destination, &mut warnings)? {
                processed += 1;
            }
        }
        Ok(())
    })();

    let finished = sink.finish();
    if let Err(e) = &added {
        error!(error = %e, destination = %settings.destination, "archive aborted; partial archive left in place");
    }
    added?;
    finished?;

    info!(processed, warnings = warnings.count(), destination = %settings.destination, "archive finished");
    Ok(OperationReport {
        kind: OperationKind::Archive,
        dry_run: false,
        planned,
        processed,
        warnings,
    })
}
