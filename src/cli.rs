//! CLI definition and parsing.
//!
//! Shape: `timefops [GLOBAL] <atime|ctime|mtime> <archive|copy|move> [ARGS]`.
//! Global flags may appear anywhere on the line.
//!
//! Notes:
//! - --debug is a shorthand for --log-level debug.
//! - `-f` may be repeated; each occurrence becomes one nested folder level.

use clap::{ArgGroup, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::config::types::{
    AesStrength, ArchiveDestination, ArchiveSettings, Compression, Config, Container, LogLevel,
    Selection, TimeKind, TransferSettings,
};
use crate::config::{resolve_archive_destination, resolve_encryption};
use crate::errors::TimefopsError;

/// Move, copy or archive files into folders named after one of their timestamps.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(name = "timefops", author, version, about)]
pub struct Args {
    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, global = true, value_name = "LEVEL", help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<LogLevel>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(short = 'd', long, global = true, help = "Enable debug logging (shorthand for --log-level debug)")]
    pub debug: bool,

    /// Emit logs in structured JSON.
    #[arg(long, global = true, help = "Emit logs in structured JSON")]
    pub json: bool,

    /// Also write logs to this file.
    #[arg(long, global = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Disable colored console output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print where timefops looks for its config file, then exit.
    #[arg(long, help = "Print the config file location used by timefops and exit")]
    pub print_config: bool,

    #[command(subcommand)]
    pub command: Option<TimeCommand>,
}

/// Which timestamp drives the bucketing.
#[derive(Subcommand, Debug, Clone)]
pub enum TimeCommand {
    /// Bucket by last access time
    Atime {
        #[command(subcommand)]
        operation: Operation,
    },
    /// Bucket by last status change time (creation time on Windows)
    Ctime {
        #[command(subcommand)]
        operation: Operation,
    },
    /// Bucket by last modification time
    Mtime {
        #[command(subcommand)]
        operation: Operation,
    },
}

impl TimeCommand {
    pub fn parts(&self) -> (TimeKind, &Operation) {
        match self {
            TimeCommand::Atime { operation } => (TimeKind::Access, operation),
            TimeCommand::Ctime { operation } => (TimeKind::Change, operation),
            TimeCommand::Mtime { operation } => (TimeKind::Modified, operation),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Operation {
    /// Put the items into a tar archive or zip file, nested under date folders
    Archive(ArchiveArgs),
    /// Copy the items into date folders under the target directory
    Copy(TransferArgs),
    /// Move the items into date folders under the target directory (same filesystem only)
    Move(TransferArgs),
}

/// Arguments shared by every operation.
#[derive(clap::Args, Debug, Clone)]
pub struct SelectionArgs {
    /// Directories whose contents are organized (or literal items with -i)
    #[arg(value_name = "SRC", required = true, num_args = 1.., value_hint = ValueHint::AnyPath)]
    pub sources: Vec<PathBuf>,

    /// strftime format for one folder level; repeat for nested folders (default: %Y-%m-%d)
    #[arg(short = 'f', long = "format", value_name = "FMT")]
    pub formats: Vec<String>,

    /// Treat each SRC as an item itself instead of a directory to scan
    #[arg(short = 'i', long)]
    pub individual: bool,

    /// Show what would be done, but do not modify anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SelectionArgs {
    /// Build the selection; formats fall back to the configured default.
    pub fn to_selection(&self, time_kind: TimeKind, cfg: &Config) -> Selection {
        let formats = if self.formats.is_empty() {
            cfg.formats.clone()
        } else {
            self.formats.clone()
        };
        Selection {
            sources: self.sources.clone(),
            time_kind,
            formats,
            individual: self.individual,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct TransferArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory the date folders are created in
    #[arg(short = 't', long = "target-directory", value_name = "DIR", required = true, value_hint = ValueHint::DirPath)]
    pub target: PathBuf,
}

impl TransferArgs {
    pub fn to_settings(&self, time_kind: TimeKind, cfg: &Config) -> TransferSettings {
        TransferSettings {
            selection: self.selection.to_selection(time_kind, cfg),
            destination: self.target.clone(),
            dry_run: self.selection.dry_run,
        }
    }
}

#[derive(clap::Args, Clone)]
#[command(group(ArgGroup::new("output").required(true).args(["archive", "stdout"])))]
pub struct ArchiveArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Archive file name; the extension is added when missing
    #[arg(short = 'a', long, value_name = "NAME", value_hint = ValueHint::FilePath)]
    pub archive: Option<PathBuf>,

    /// Write the archive to stdout
    #[arg(long)]
    pub stdout: bool,

    /// Compression: gz, bz2 or xz (zip files accept bz2 only)
    #[arg(short = 'c', long, value_name = "gz|bz2|xz")]
    pub compression: Option<Compression>,

    /// Create a zip file instead of a tar archive
    #[arg(short = 'z', long)]
    pub zip: bool,

    /// Password for an AES-encrypted zip file
    #[arg(long, value_name = "PW", conflicts_with = "aes")]
    pub password: Option<String>,

    /// Prompt for the password of an AES-encrypted zip file
    #[arg(long)]
    pub aes: bool,

    /// AES key strength: weak (128), medium (192, default) or strong (256)
    #[arg(long, value_name = "weak|medium|strong")]
    pub encryption: Option<AesStrength>,
}

// Keep the password out of debug output.
impl std::fmt::Debug for ArchiveArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveArgs")
            .field("selection", &self.selection)
            .field("archive", &self.archive)
            .field("stdout", &self.stdout)
            .field("compression", &self.compression)
            .field("zip", &self.zip)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("aes", &self.aes)
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl ArchiveArgs {
    pub fn container(&self) -> Container {
        if self.zip { Container::Zip } else { Container::Tar }
    }

    /// Build validated-shape archive settings.
    ///
    /// `prompted` is a password read interactively (`--aes`); otherwise
    /// `--password` is used. Option combinations are checked before the archive
    /// name is resolved against the filesystem.
    pub fn to_settings(
        &self,
        time_kind: TimeKind,
        cfg: &Config,
        prompted: Option<String>,
    ) -> Result<ArchiveSettings, TimefopsError> {
        let container = self.container();
        let encryption = resolve_encryption(prompted.or_else(|| self.password.clone()), self.encryption)?;
        let mut settings = ArchiveSettings {
            selection: self.selection.to_selection(time_kind, cfg),
            destination: ArchiveDestination::Stdout,
            container,
            compression: self.compression,
            encryption,
            dry_run: self.selection.dry_run,
        };
        settings.check_combination()?;

        if !self.stdout
            && let Some(name) = &self.archive
        {
            settings.destination = ArchiveDestination::File(resolve_archive_destination(
                name,
                container,
                self.compression,
            )?);
        }
        Ok(settings)
    }
}

impl Args {
    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.clone()
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
        if let Some(path) = &self.log_file {
            cfg.log_file = Some(path.clone());
        }
        if self.no_color {
            cfg.color = false;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
