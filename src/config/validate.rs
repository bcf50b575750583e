//! Config validation logic.
//! Everything here runs before the first filesystem mutation: sources, destinations,
//! date formats, archive naming and option combinations.

use anyhow::Result;
use chrono::format::{Item, StrftimeItems};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::TimefopsError;
use crate::utils::check_writable;

use super::types::{
    AesStrength, ArchiveDestination, ArchiveSettings, Compression, Container, Encryption,
    Selection, TransferSettings,
};

/// Reject empty components and unknown strftime directives.
pub fn validate_formats(formats: &[String]) -> Result<(), TimefopsError> {
    if formats.is_empty() {
        return Err(TimefopsError::InvalidFormat {
            format: String::new(),
            reason: "at least one format component is required".into(),
        });
    }
    for f in formats {
        if f.is_empty() {
            return Err(TimefopsError::InvalidFormat {
                format: f.clone(),
                reason: "format component is empty".into(),
            });
        }
        if StrftimeItems::new(f).any(|item| matches!(item, Item::Error)) {
            return Err(TimefopsError::InvalidFormat {
                format: f.clone(),
                reason: "contains an unsupported strftime directive".into(),
            });
        }
    }
    Ok(())
}

impl Selection {
    /// Individual mode: every source must exist. Otherwise every source must be a
    /// readable directory (its children become the entries).
    pub fn validate(&self) -> Result<(), TimefopsError> {
        validate_formats(&self.formats)?;
        if self.sources.is_empty() {
            return Err(TimefopsError::InvalidSource {
                path: PathBuf::new(),
                reason: "no source paths given".into(),
            });
        }
        for src in &self.sources {
            if self.individual {
                if fs::symlink_metadata(src).is_err() {
                    return Err(TimefopsError::InvalidSource {
                        path: src.clone(),
                        reason: "does not exist".into(),
                    });
                }
                continue;
            }
            if !src.is_dir() {
                return Err(TimefopsError::InvalidSource {
                    path: src.clone(),
                    reason: "not a directory; use individual mode (-i) for files".into(),
                });
            }
            if let Err(e) = fs::read_dir(src) {
                return Err(TimefopsError::InvalidSource {
                    path: src.clone(),
                    reason: format!("cannot be traversed: {e}"),
                });
            }
        }
        debug!(count = self.sources.len(), individual = self.individual, "sources validated");
        Ok(())
    }
}

impl TransferSettings {
    /// Validate sources, formats and the destination directory (must exist and be writable).
    pub fn validate(&self) -> Result<(), TimefopsError> {
        self.selection.validate()?;
        let dest = &self.destination;
        if !dest.is_dir() {
            return Err(TimefopsError::InvalidDestination {
                path: dest.clone(),
                reason: "does not exist or is not a directory".into(),
            });
        }
        if let Err(e) = check_writable(dest) {
            return Err(TimefopsError::InvalidDestination {
                path: dest.clone(),
                reason: format!("not writable: {e}"),
            });
        }
        debug!(destination = %dest.display(), "destination validated");
        Ok(())
    }
}

impl ArchiveSettings {
    /// Pure option checks: container/compression and encryption combinations.
    pub fn check_combination(&self) -> Result<(), TimefopsError> {
        if self.container == Container::Zip {
            match self.compression {
                Some(Compression::Gzip) => {
                    return Err(TimefopsError::IncompatibleOptions(
                        "gz compression cannot be used with a zip file; use bz2 or a tar archive"
                            .into(),
                    ));
                }
                Some(Compression::Xz) => {
                    return Err(TimefopsError::IncompatibleOptions(
                        "xz compression is only available for tar archives; use bz2 for zip files"
                            .into(),
                    ));
                }
                _ => {}
            }
        }
        if let Some(enc) = &self.encryption {
            if self.container != Container::Zip {
                return Err(TimefopsError::IncompatibleOptions(
                    "AES encryption requires the zip container".into(),
                ));
            }
            if enc.password.is_empty() {
                return Err(TimefopsError::MissingPassword(enc.strength));
            }
        }
        Ok(())
    }

    /// Full validation: option combinations, sources and (for files) a resolved,
    /// non-existing destination inside a writable directory.
    pub fn validate(&self) -> Result<(), TimefopsError> {
        self.check_combination()?;
        self.selection.validate()?;
        if let ArchiveDestination::File(path) = &self.destination {
            if fs::symlink_metadata(path).is_ok() {
                return Err(TimefopsError::DestinationConflict(path.clone()));
            }
            let parent = path.parent().unwrap_or_else(|| Path::new("."));
            check_parent_writable(parent)?;
        }
        Ok(())
    }
}

/// Suffix an archive name must end with for the chosen container/compression.
fn expected_suffix(container: Container, compression: Option<Compression>) -> String {
    match (container, compression) {
        (Container::Zip, _) => ".zip".to_string(),
        (Container::Tar, None) => ".tar".to_string(),
        (Container::Tar, Some(c)) => format!(".tar.{}", c.extension()),
    }
}

/// Resolve the archive file path:
/// - a bare name is placed in the current directory
/// - the extension is normalized (`.tar`, `.tar.<compression>` or `.zip`)
/// - the resolved path must not exist, and its parent must be a writable directory
pub fn resolve_archive_destination(
    name: &Path,
    container: Container,
    compression: Option<Compression>,
) -> Result<PathBuf, TimefopsError> {
    let raw = name.as_os_str().to_string_lossy();
    if raw.is_empty() || raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR) {
        return Err(TimefopsError::InvalidDestination {
            path: name.to_path_buf(),
            reason: "archive name must name a file".into(),
        });
    }

    let suffix = expected_suffix(container, compression);
    let mut file_name = name
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| TimefopsError::InvalidDestination {
            path: name.to_path_buf(),
            reason: "archive name must name a file".into(),
        })?;
    let lossy = file_name.to_string_lossy().into_owned();
    if !lossy.ends_with(&suffix) {
        match compression {
            // "backup.tar" + gz -> "backup.tar.gz"
            Some(c) if container == Container::Tar && lossy.ends_with(".tar") => {
                file_name.push(format!(".{}", c.extension()));
            }
            _ => file_name.push(&suffix),
        }
    }

    let parent = match name.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => env::current_dir().map_err(|e| TimefopsError::InvalidDestination {
            path: name.to_path_buf(),
            reason: format!("cannot determine current directory: {e}"),
        })?,
    };
    let resolved = parent.join(file_name);

    check_parent_writable(&parent)?;
    if fs::symlink_metadata(&resolved).is_ok() {
        return Err(TimefopsError::DestinationConflict(resolved));
    }
    debug!(archive = %resolved.display(), "archive destination resolved");
    Ok(resolved)
}

fn check_parent_writable(parent: &Path) -> Result<(), TimefopsError> {
    if !parent.is_dir() {
        return Err(TimefopsError::InvalidDestination {
            path: parent.to_path_buf(),
            reason: "parent directory does not exist".into(),
        });
    }
    check_writable(parent).map_err(|e| TimefopsError::InvalidDestination {
        path: parent.to_path_buf(),
        reason: format!("directory is not writable: {e}"),
    })
}

/// Combine the password/strength inputs into encryption parameters.
/// - no password, no strength: no encryption
/// - strength without password: `MissingPassword`
/// - password without strength: medium (192-bit)
pub fn resolve_encryption(
    password: Option<String>,
    strength: Option<AesStrength>,
) -> Result<Option<Encryption>, TimefopsError> {
    match (password, strength) {
        (None, None) => Ok(None),
        (None, Some(s)) => Err(TimefopsError::MissingPassword(s)),
        (Some(p), s) => {
            let strength = s.unwrap_or_default();
            if p.is_empty() {
                return Err(TimefopsError::MissingPassword(strength));
            }
            Ok(Some(Encryption {
                password: p,
                strength,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::TimeKind;
    use tempfile::tempdir;

    fn archive_settings(container: Container, compression: Option<Compression>) -> ArchiveSettings {
        ArchiveSettings {
            selection: Selection::new(vec![], TimeKind::Modified),
            destination: ArchiveDestination::Stdout,
            container,
            compression,
            encryption: None,
            dry_run: true,
        }
    }

    #[test]
    fn formats_reject_empty_and_bad_directives() {
        assert!(validate_formats(&["%Y".into(), "%m".into()]).is_ok());
        assert!(matches!(
            validate_formats(&[]),
            Err(TimefopsError::InvalidFormat { .. })
        ));
        assert!(matches!(
            validate_formats(&["".into()]),
            Err(TimefopsError::InvalidFormat { .. })
        ));
        assert!(matches!(
            validate_formats(&["%Y-%!".into()]),
            Err(TimefopsError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn archive_name_gets_normalized_extension() {
        let td = tempdir().unwrap();
        let base = td.path();

        let tar = resolve_archive_destination(&base.join("backup"), Container::Tar, None).unwrap();
        assert_eq!(tar, base.join("backup.tar"));

        let gz = resolve_archive_destination(
            &base.join("backup"),
            Container::Tar,
            Some(Compression::Gzip),
        )
        .unwrap();
        assert_eq!(gz, base.join("backup.tar.gz"));

        let already =
            resolve_archive_destination(&base.join("backup.tar"), Container::Tar, Some(Compression::Xz))
                .unwrap();
        assert_eq!(already, base.join("backup.tar.xz"));

        let zip = resolve_archive_destination(&base.join("backup"), Container::Zip, None).unwrap();
        assert_eq!(zip, base.join("backup.zip"));

        let kept = resolve_archive_destination(&base.join("x.zip"), Container::Zip, None).unwrap();
        assert_eq!(kept, base.join("x.zip"));
    }

    #[test]
    fn archive_name_conflict_and_missing_parent() {
        let td = tempdir().unwrap();
        fs::write(td.path().join("taken.tar"), b"x").unwrap();

        let err = resolve_archive_destination(&td.path().join("taken"), Container::Tar, None)
            .unwrap_err();
        assert!(matches!(err, TimefopsError::DestinationConflict(_)));

        let err = resolve_archive_destination(
            &td.path().join("missing").join("out"),
            Container::Tar,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, TimefopsError::InvalidDestination { .. }));
    }

    #[test]
    fn gz_and_xz_are_incompatible_with_zip() {
        let s = archive_settings(Container::Zip, Some(Compression::Gzip));
        assert!(matches!(
            s.check_combination(),
            Err(TimefopsError::IncompatibleOptions(_))
        ));
        let s = archive_settings(Container::Zip, Some(Compression::Xz));
        assert!(s.check_combination().is_err());
        let s = archive_settings(Container::Zip, Some(Compression::Bzip2));
        assert!(s.check_combination().is_ok());
        let s = archive_settings(Container::Tar, Some(Compression::Gzip));
        assert!(s.check_combination().is_ok());
    }

    #[test]
    fn encryption_requires_zip() {
        let mut s = archive_settings(Container::Tar, None);
        s.encryption = Some(Encryption {
            password: "pw".into(),
            strength: AesStrength::Strong,
        });
        assert!(matches!(
            s.check_combination(),
            Err(TimefopsError::IncompatibleOptions(_))
        ));
        s.container = Container::Zip;
        assert!(s.check_combination().is_ok());
    }

    #[test]
    fn encryption_resolution() {
        assert!(resolve_encryption(None, None).unwrap().is_none());
        assert!(matches!(
            resolve_encryption(None, Some(AesStrength::Weak)),
            Err(TimefopsError::MissingPassword(AesStrength::Weak))
        ));
        let enc = resolve_encryption(Some("secret".into()), None).unwrap().unwrap();
        assert_eq!(enc.strength, AesStrength::Medium);
        assert_eq!(enc.strength.bits(), 192);
        assert!(!format!("{enc:?}").contains("secret"));
    }

    #[test]
    fn selection_requires_directories_unless_individual() {
        let td = tempdir().unwrap();
        let file = td.path().join("f.txt");
        fs::write(&file, b"x").unwrap();

        let mut sel = Selection::new(vec![file.clone()], TimeKind::Modified);
        assert!(matches!(
            sel.validate(),
            Err(TimefopsError::InvalidSource { .. })
        ));
        sel.individual = true;
        assert!(sel.validate().is_ok());

        sel.sources = vec![td.path().join("nope")];
        assert!(sel.validate().is_err());
    }
}
