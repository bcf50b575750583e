//! Core library for `timefops`.
//!
//! Organizes files and directories into folders named after one of their
//! timestamps (access, change or modification time), then moves, copies or
//! archives them. Name collisions inside a folder are resolved by
//! deterministic enumeration so nothing is ever overwritten.
//!
//! Pipeline: `compute_buckets` -> `duplicate::resolve` -> `plan_transfers`
//! -> `move_items` / `copy_items` / `archive_items`.

pub mod archive;
pub mod bucket;
pub mod cli;
pub mod config;
pub mod duplicate;
pub mod errors;
pub mod fs_ops;
pub mod output;
pub mod platform;
pub mod report;
pub mod utils;

pub use bucket::{BucketMap, BucketedEntry, compute_buckets, format_bucket, read_timestamp};
pub use config::{
    ArchiveDestination, ArchiveSettings, Config, LogLevel, Selection, TimeKind, TransferSettings,
};
pub use duplicate::{CollisionReport, RenameMap, add_enumerate, resolve};
pub use errors::TimefopsError;
pub use fs_ops::{archive_items, copy_items, move_items, plan_transfers};
pub use report::{OperationKind, OperationReport, PlannedTransfer, Warnings};
