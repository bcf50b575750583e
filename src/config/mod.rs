//! Config module.
//! Provides configuration types, default paths, XML loading, and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, path_has_symlink_ancestor};
pub use types::{
    AesStrength, ArchiveDestination, ArchiveSettings, Compression, Config, Container, Encryption,
    LogLevel, Selection, TimeKind, TransferSettings,
};
pub use validate::{resolve_archive_destination, resolve_encryption, validate_formats};
pub use xml::{load_config, load_config_from_xml_path};

/// Folder name format used when none is configured (yyyy-mm-dd).
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d";

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV: &str = "TIMEFOPS_CONFIG";
