//! Typed error definitions for timefops.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::types::{AesStrength, TimeKind};

#[derive(Debug, Error)]
pub enum TimefopsError {
    #[error("Source path '{path}' not understood: {reason}")]
    InvalidSource { path: PathBuf, reason: String },

    #[error("Invalid destination '{path}': {reason}")]
    InvalidDestination { path: PathBuf, reason: String },

    #[error("Destination already exists: {0}")]
    DestinationConflict(PathBuf),

    #[error(
        "'{path}' (on {path_mount}) and '{destination}' (on {destination_mount}) are on different filesystems; use copy to transfer across filesystems"
    )]
    CrossFilesystem {
        path: PathBuf,
        path_mount: PathBuf,
        destination: PathBuf,
        destination_mount: PathBuf,
    },

    #[error("Incompatible options: {0}")]
    IncompatibleOptions(String),

    #[error("Encryption strength '{0}' requested but no password was given")]
    MissingPassword(AesStrength),

    #[error("Invalid date format '{format}': {reason}")]
    InvalidFormat { format: String, reason: String },

    #[error("Cannot resolve '{path}' for {kind} bucketing: {error}")]
    PathResolution {
        path: PathBuf,
        kind: TimeKind,
        #[source]
        error: io::Error,
    },
}

impl TimefopsError {
    /// Stable numeric code used in structured logs.
    pub fn code(&self) -> u8 {
        match self {
            TimefopsError::InvalidSource { .. } => 2,
            TimefopsError::InvalidDestination { .. } => 3,
            TimefopsError::DestinationConflict(_) => 4,
            TimefopsError::CrossFilesystem { .. } => 5,
            TimefopsError::IncompatibleOptions(_) => 6,
            TimefopsError::MissingPassword(_) => 7,
            TimefopsError::InvalidFormat { .. } => 8,
            TimefopsError::PathResolution { .. } => 9,
        }
    }

    /// Short machine-friendly kind, used as a `kind` field in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TimefopsError::InvalidSource { .. } => "invalid_source",
            TimefopsError::InvalidDestination { .. } => "invalid_destination",
            TimefopsError::DestinationConflict(_) => "destination_conflict",
            TimefopsError::CrossFilesystem { .. } => "cross_filesystem",
            TimefopsError::IncompatibleOptions(_) => "incompatible_options",
            TimefopsError::MissingPassword(_) => "missing_password",
            TimefopsError::InvalidFormat { .. } => "invalid_format",
            TimefopsError::PathResolution { .. } => "path_resolution",
        }
    }
}
