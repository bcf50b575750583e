//! Tar stream sink, optionally compressed with gzip, bzip2 or xz.

use anyhow::{Context, Result};
use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tar::Builder;
use tracing::trace;
use walkdir::WalkDir;
use xz2::write::XzEncoder;

use super::Output;
use crate::config::Compression;
use crate::platform::is_special_file;
use crate::report::Warnings;

enum TarEncoder {
    Plain(Output),
    Gzip(GzEncoder<Output>),
    Bzip2(BzEncoder<Output>),
    Xz(XzEncoder<Output>),
}

impl TarEncoder {
    fn new(out: Output, compression: Option<Compression>) -> Self {
        match compression {
            None => TarEncoder::Plain(out),
            Some(Compression::Gzip) => TarEncoder::Gzip(GzEncoder::new(out, flate2::Compression::default())),
            Some(Compression::Bzip2) => TarEncoder::Bzip2(BzEncoder::new(out, bzip2::Compression::default())),
            Some(Compression::Xz) => TarEncoder::Xz(XzEncoder::new(out, 6)),
        }
    }

    fn finish(self) -> io::Result<Output> {
        match self {
            TarEncoder::Plain(o) => Ok(o),
            TarEncoder::Gzip(e) => e.finish(),
            TarEncoder::Bzip2(e) => e.finish(),
            TarEncoder::Xz(e) => e.finish(),
        }
    }
}

impl Write for TarEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TarEncoder::Plain(w) => w.write(buf),
            TarEncoder::Gzip(w) => w.write(buf),
            TarEncoder::Bzip2(w) => w.write(buf),
            TarEncoder::Xz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TarEncoder::Plain(w) => w.flush(),
            TarEncoder::Gzip(w) => w.flush(),
            TarEncoder::Bzip2(w) => w.flush(),
            TarEncoder::Xz(w) => w.flush(),
        }
    }
}

pub struct TarSink {
    builder: Builder<TarEncoder>,
}

impl TarSink {
    pub(super) fn new(out: Output, compression: Option<Compression>) -> Self {
        let mut builder = Builder::new(TarEncoder::new(out, compression));
        builder.follow_symlinks(false);
        Self { builder }
    }

    /// Directories are walked node by node in sorted order, so an unreadable or
    /// special node inside one costs only that node.
    pub fn add_entry(&mut self, source: &Path, internal: &Path, warnings: &mut Warnings) -> Result<bool> {
        let meta = match fs::symlink_metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warnings.skip("archive", source, &e);
                return Ok(false);
            }
            Err(e) => return Err(e).with_context(|| format!("stat '{}'", source.display())),
        };
        if !meta.is_dir() {
            return self.add_node(source, internal, &meta.file_type(), warnings);
        }

        let mut added = false;
        for entry in WalkDir::new(source).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e.path().unwrap_or(source).to_path_buf();
                    match e.into_io_error() {
                        Some(io) if io.kind() == io::ErrorKind::PermissionDenied => {
                            warnings.skip("archive", &path, &io);
                            continue;
                        }
                        Some(io) => return Err(io).with_context(|| format!("walk '{}'", path.display())),
                        None => anyhow::bail!("filesystem loop at '{}'", path.display()),
                    }
                }
            };
            let rel = entry.path().strip_prefix(source).unwrap_or(entry.path());
            let name = internal.join(rel);
            let ok = self.add_node(entry.path(), &name, &entry.file_type(), warnings)?;
            if entry.depth() == 0 {
                added = ok;
            }
        }
        Ok(added)
    }

    fn add_node(&mut self, path: &Path, name: &Path, ft: &fs::FileType, warnings: &mut Warnings) -> Result<bool> {
        if is_special_file(ft) {
            warnings.skip_special("archive", path);
            return Ok(false);
        }
        let result = if ft.is_dir() {
            self.builder.append_dir(name, path)
        } else {
            self.builder.append_path_with_name(path, name)
        };
        match result {
            Ok(()) => {
                trace!(src = %path.display(), internal = %name.display(), "added to tar");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warnings.skip("archive", path, &e);
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("add '{}' to tar archive", path.display())),
        }
    }

    pub fn finish(self) -> Result<()> {
        let encoder = self.builder.into_inner().context("write tar trailer")?;
        let mut out = encoder.finish().context("finish compressed stream")?;
        out.flush().context("flush archive output")?;
        Ok(())
    }
}
