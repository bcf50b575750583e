//! Operation results and per-operation warning accounting.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Move,
    Copy,
    Archive,
}

impl OperationKind {
    /// Verb used in user-facing lines ("moved", "copied", "archived").
    pub fn past_tense(&self) -> &'static str {
        match self {
            OperationKind::Move => "moved",
            OperationKind::Copy => "copied",
            OperationKind::Archive => "archived",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Move => "move",
            OperationKind::Copy => "copy",
            OperationKind::Archive => "archive",
        };
        f.write_str(s)
    }
}

/// One planned source -> destination pair (numbered from 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub index: usize,
    pub source: PathBuf,
    /// Filesystem destination for move/copy; archive-internal path for archive.
    pub destination: PathBuf,
}

/// Recoverable per-item failures. Created fresh for each operation.
#[derive(Debug, Default)]
pub struct Warnings {
    count: usize,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped item caused by an IO error (usually permission denied).
    pub fn skip(&mut self, action: &str, path: &Path, err: &io::Error) {
        self.count += 1;
        warn!(
            path = %path.display(),
            error = %err,
            "Insufficient permissions to {action}: '{}', skipping.",
            path.display()
        );
    }

    /// Record a skipped item whose destination is already present.
    pub fn skip_existing(&mut self, source: &Path, destination: &Path) {
        self.count += 1;
        warn!(
            source = %source.display(),
            destination = %destination.display(),
            "Destination '{}' already exists, skipping.",
            destination.display()
        );
    }

    /// Record a skipped FIFO, socket or device node.
    pub fn skip_special(&mut self, action: &str, path: &Path) {
        self.count += 1;
        warn!(
            path = %path.display(),
            "Cannot {action} special file (fifo, socket or device): '{}', skipping.",
            path.display()
        );
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Outcome of one move/copy/archive run.
#[derive(Debug)]
pub struct OperationReport {
    pub kind: OperationKind,
    pub dry_run: bool,
    pub planned: Vec<PlannedTransfer>,
    /// Items actually transferred (0 for a dry run).
    pub processed: usize,
    pub warnings: Warnings,
}

impl OperationReport {
    pub fn warning_count(&self) -> usize {
        self.warnings.count()
    }
}
