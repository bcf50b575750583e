//! Archive writers.
//!
//! `ArchiveSink` is chosen once per archive run and exposes the same two calls
//! for every container: `add_entry(source, internal_path)` and `finish()`.
//! AES encryption is a zip option, not a separate sink.

mod tar_sink;
mod zip_sink;

use anyhow::Result;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::config::{ArchiveDestination, Compression, Container, Encryption};
use crate::errors::TimefopsError;
use crate::fs_ops::io_error_with_help;
use crate::report::Warnings;

pub use tar_sink::TarSink;
pub use zip_sink::ZipSink;

pub enum ArchiveSink {
    Tar(TarSink),
    Zip(ZipSink),
}

impl ArchiveSink {
    /// Open the destination and build the writer for `container`.
    pub fn open(
        destination: &ArchiveDestination,
        container: Container,
        compression: Option<Compression>,
        encryption: Option<&Encryption>,
    ) -> Result<Self> {
        match container {
            Container::Tar => {
                if encryption.is_some() {
                    return Err(TimefopsError::IncompatibleOptions(
                        "AES encryption requires the zip container".into(),
                    )
                    .into());
                }
                let out = match destination {
                    ArchiveDestination::File(path) => Output::File(io::BufWriter::new(create_new(path)?)),
                    ArchiveDestination::Stdout => Output::Stdout(io::stdout()),
                };
                Ok(ArchiveSink::Tar(TarSink::new(out, compression)))
            }
            Container::Zip => {
                let (file, stream) = match destination {
                    ArchiveDestination::File(path) => (create_new(path)?, false),
                    // The central directory needs a seekable writer; spool, then stream.
                    ArchiveDestination::Stdout => (tempfile::tempfile()?, true),
                };
                Ok(ArchiveSink::Zip(ZipSink::new(file, stream, compression, encryption)?))
            }
        }
    }

    /// Add one planned entry. Returns false when it was skipped with a warning.
    pub fn add_entry(&mut self, source: &Path, internal: &Path, warnings: &mut Warnings) -> Result<bool> {
        match self {
            ArchiveSink::Tar(t) => t.add_entry(source, internal, warnings),
            ArchiveSink::Zip(z) => z.add_entry(source, internal, warnings),
        }
    }

    /// Write trailers and flush everything to the destination.
    pub fn finish(self) -> Result<()> {
        match self {
            ArchiveSink::Tar(t) => t.finish(),
            ArchiveSink::Zip(z) => z.finish(),
        }
    }
}

fn create_new(path: &Path) -> Result<File> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => Ok(f),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(TimefopsError::DestinationConflict(path.to_path_buf()).into())
        }
        Err(e) => Err(io_error_with_help("create archive", path)(e)),
    }
}

/// Byte destination of a streamed archive.
pub enum Output {
    File(io::BufWriter<File>),
    Stdout(io::Stdout),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::File(f) => f.write(buf),
            Output::Stdout(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::File(f) => f.flush(),
            Output::Stdout(s) => s.flush(),
        }
    }
}

/// Archive-internal name: components joined with `/` on every platform.
pub(crate) fn internal_name(internal: &Path) -> String {
    internal
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
