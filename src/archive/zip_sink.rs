//! Zip sink (stored or bzip2, optionally AES-encrypted).
//!
//! Directories are walked explicitly in sorted order so each directory record
//! precedes its children and an unreadable node only costs that node.
//!
//! Entry names are UTF-8; distinct non-UTF-8 file names can render to the same
//! name, and any name already written is skipped with a warning.

use anyhow::{Context, Result};
use chrono::{Datelike, Timelike};
use std::collections::HashSet;
use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::trace;
use zip::write::FileOptions;
use zip::{AesMode, CompressionMethod, DateTime, ZipWriter};

use super::internal_name;
use crate::bucket::local_time;
use crate::config::{AesStrength, Compression, Encryption};
use crate::errors::TimefopsError;
use crate::platform::is_special_file;
use crate::report::Warnings;

pub struct ZipSink {
    writer: ZipWriter<BufWriter<File>>,
    /// Copy the finished spool file to stdout.
    stream: bool,
    method: CompressionMethod,
    aes: Option<(AesMode, String)>,
    /// Entry names written so far ("dir/" for directories).
    written: HashSet<String>,
}

impl ZipSink {
    pub(super) fn new(
        file: File,
        stream: bool,
        compression: Option<Compression>,
        encryption: Option<&Encryption>,
    ) -> Result<Self> {
        let method = match compression {
            None => CompressionMethod::Stored,
            Some(Compression::Bzip2) => CompressionMethod::Bzip2,
            Some(other) => {
                return Err(TimefopsError::IncompatibleOptions(format!(
                    "{other} compression cannot be used with a zip file"
                ))
                .into());
            }
        };
        let aes = encryption.map(|enc| (aes_mode(enc.strength), enc.password.clone()));
        Ok(Self {
            writer: ZipWriter::new(BufWriter::new(file)),
            stream,
            method,
            aes,
            written: HashSet::new(),
        })
    }

    pub fn add_entry(&mut self, source: &Path, internal: &Path, warnings: &mut Warnings) -> Result<bool> {
        self.add_node(source, &internal_name(internal), warnings)
    }

    fn add_node(&mut self, source: &Path, name: &str, warnings: &mut Warnings) -> Result<bool> {
        let meta = match fs::symlink_metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warnings.skip("archive", source, &e);
                return Ok(false);
            }
            Err(e) => return Err(e).with_context(|| format!("stat '{}'", source.display())),
        };
        let ft = meta.file_type();
        if is_special_file(&ft) {
            warnings.skip_special("archive", source);
            return Ok(false);
        }
        let record = if ft.is_dir() { format!("{name}/") } else { name.to_string() };
        if self.written.contains(&record) {
            warnings.skip_existing(source, Path::new(&record));
            return Ok(false);
        }
        let options = file_options(self.method, self.aes.as_ref(), &meta);

        if ft.is_symlink() {
            let target = fs::read_link(source).with_context(|| format!("read link '{}'", source.display()))?;
            self.writer
                .add_symlink(name.to_string(), target.to_string_lossy().into_owned(), options)
                .with_context(|| format!("add symlink '{name}' to zip"))?;
            self.written.insert(record);
            trace!(src = %source.display(), name, "added symlink to zip");
            return Ok(true);
        }

        if meta.is_dir() {
            let mut children = match fs::read_dir(source).and_then(|rd| rd.collect::<io::Result<Vec<_>>>()) {
                Ok(c) => c,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    warnings.skip("archive", source, &e);
                    return Ok(false);
                }
                Err(e) => return Err(e).with_context(|| format!("read directory '{}'", source.display())),
            };
            children.sort_by_key(|c| c.file_name());

            self.writer
                .add_directory(record.clone(), options)
                .with_context(|| format!("add directory '{name}' to zip"))?;
            self.written.insert(record);
            trace!(src = %source.display(), name, "added directory to zip");
            for child in children {
                let child_name = format!("{name}/{}", child.file_name().to_string_lossy());
                self.add_node(&child.path(), &child_name, warnings)?;
            }
            return Ok(true);
        }

        // Open before writing the header so an unreadable file leaves no record.
        let mut file = match File::open(source) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warnings.skip("archive", source, &e);
                return Ok(false);
            }
            Err(e) => return Err(e).with_context(|| format!("open '{}'", source.display())),
        };
        self.writer
            .start_file(name.to_string(), options)
            .with_context(|| format!("start zip entry '{name}'"))?;
        self.written.insert(record);
        io::copy(&mut file, &mut self.writer).with_context(|| format!("write '{}' into zip", source.display()))?;
        trace!(src = %source.display(), name, "added file to zip");
        Ok(true)
    }

    pub fn finish(self) -> Result<()> {
        let buffered = self.writer.finish().context("write zip central directory")?;
        let mut file = buffered.into_inner().map_err(|e| e.into_error()).context("flush zip file")?;
        if self.stream {
            file.seek(SeekFrom::Start(0))?;
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            io::copy(&mut file, &mut lock).context("stream zip to stdout")?;
            lock.flush()?;
        } else {
            file.flush()?;
        }
        Ok(())
    }
}

fn aes_mode(strength: AesStrength) -> AesMode {
    match strength {
        AesStrength::Weak => AesMode::Aes128,
        AesStrength::Medium => AesMode::Aes192,
        AesStrength::Strong => AesMode::Aes256,
    }
}

fn file_options<'k>(
    method: CompressionMethod,
    aes: Option<&'k (AesMode, String)>,
    meta: &Metadata,
) -> FileOptions<'k, ()> {
    let mut options = FileOptions::<()>::default()
        .compression_method(method)
        .large_file(meta.len() >= u32::MAX as u64);
    if let Some(ts) = meta.modified().ok().and_then(zip_time) {
        options = options.last_modified_time(ts);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options = options.unix_permissions(meta.permissions().mode() & 0o7777);
    }
    if let Some((mode, password)) = aes {
        options = options.with_aes_encryption(*mode, password.as_str());
    }
    options
}

/// Zip timestamps are local, two-second resolution, and start in 1980.
fn zip_time(ts: std::time::SystemTime) -> Option<DateTime> {
    let local = local_time(ts)?;
    DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}
