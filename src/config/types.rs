//! Core configuration types.
//! - Config holds runtime defaults (XML file + CLI overrides).
//! - LogLevel represents verbosity with simple parsing helpers.
//! - Selection, TransferSettings and ArchiveSettings are the immutable,
//!   per-operation settings handed to the executors.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::DEFAULT_FORMAT;

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// Per-item progress ("verbose")
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Which filesystem timestamp drives the bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeKind {
    /// Last access time (atime)
    Access,
    /// Last status change time (ctime)
    Change,
    /// Last modification time (mtime)
    Modified,
}

impl TimeKind {
    /// Long human-readable name, used in previews ("sorted by modified-time").
    pub fn describe(&self) -> &'static str {
        match self {
            TimeKind::Access => "access-time",
            TimeKind::Change => "change-time",
            TimeKind::Modified => "modified-time",
        }
    }
}

impl fmt::Display for TimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeKind::Access => "atime",
            TimeKind::Change => "ctime",
            TimeKind::Modified => "mtime",
        };
        f.write_str(s)
    }
}

impl FromStr for TimeKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atime" | "access" => Ok(TimeKind::Access),
            "ctime" | "change" => Ok(TimeKind::Change),
            "mtime" | "modified" => Ok(TimeKind::Modified),
            _ => Err(format!("invalid time predicate: '{s}'")),
        }
    }
}

/// Stream compression applied to an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Bzip2,
    Xz,
}

impl Compression {
    /// Extension used for `.tar.<ext>` names.
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Gzip => "gz",
            Compression::Bzip2 => "bz2",
            Compression::Xz => "xz",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Compression {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gz" | "gzip" => Ok(Compression::Gzip),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            "xz" => Ok(Compression::Xz),
            _ => Err(format!("invalid compression: '{s}' (expected gz, bz2 or xz)")),
        }
    }
}

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    #[default]
    Tar,
    Zip,
}

/// AES key strength for encrypted zip files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AesStrength {
    /// 128-bit
    Weak,
    /// 192-bit
    #[default]
    Medium,
    /// 256-bit
    Strong,
}

impl AesStrength {
    pub fn bits(&self) -> u16 {
        match self {
            AesStrength::Weak => 128,
            AesStrength::Medium => 192,
            AesStrength::Strong => 256,
        }
    }
}

impl fmt::Display for AesStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AesStrength::Weak => "weak",
            AesStrength::Medium => "medium",
            AesStrength::Strong => "strong",
        };
        f.write_str(s)
    }
}

impl FromStr for AesStrength {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weak" | "128" => Ok(AesStrength::Weak),
            "medium" | "192" => Ok(AesStrength::Medium),
            "strong" | "256" => Ok(AesStrength::Strong),
            _ => Err(format!(
                "invalid encryption strength: '{s}' (expected weak, medium or strong)"
            )),
        }
    }
}

/// Password and key strength for an AES-encrypted zip.
#[derive(Clone, PartialEq, Eq)]
pub struct Encryption {
    pub password: String,
    pub strength: AesStrength,
}

// Never print the password.
impl fmt::Debug for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encryption")
            .field("password", &"<redacted>")
            .field("strength", &self.strength)
            .finish()
    }
}

/// Where an archive is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveDestination {
    File(PathBuf),
    Stdout,
}

impl fmt::Display for ArchiveDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveDestination::File(p) => write!(f, "{}", p.display()),
            ArchiveDestination::Stdout => f.write_str("stdout"),
        }
    }
}

/// What to organize and how to bucket it; shared by every operation.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Source paths as given (directories to scan, or literal items).
    pub sources: Vec<PathBuf>,
    pub time_kind: TimeKind,
    /// Date format components; each one becomes a nested folder.
    pub formats: Vec<String>,
    /// Treat sources as literal entries instead of directories to scan.
    pub individual: bool,
}

impl Selection {
    pub fn new(sources: Vec<PathBuf>, time_kind: TimeKind) -> Self {
        Self {
            sources,
            time_kind,
            formats: vec![DEFAULT_FORMAT.to_string()],
            individual: false,
        }
    }
}

/// Settings for move and copy.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub selection: Selection,
    /// Root directory the buckets are created under.
    pub destination: PathBuf,
    pub dry_run: bool,
}

/// Settings for archive.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub selection: Selection,
    pub destination: ArchiveDestination,
    pub container: Container,
    pub compression: Option<Compression>,
    pub encryption: Option<Encryption>,
    pub dry_run: bool,
}

/// Runtime defaults: loaded from XML, overridden by CLI flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
    /// Default date format components when none are given on the command line
    pub formats: Vec<String>,
    /// Colored console output (only effective on a TTY)
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Normal,
            log_file: None,
            formats: vec![DEFAULT_FORMAT.to_string()],
            color: true,
        }
    }
}
