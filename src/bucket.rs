//! Time bucketing.
//!
//! Maps every entry (a literal item, or a child of a scanned directory) to a bucket
//! string built from one of its timestamps and the configured date format
//! components. Each component becomes one folder level; the last one is the
//! innermost folder (`["%Y", "%m"]` -> `2020/03`).
//!
//! Enumeration order is fixed so duplicate resolution is reproducible: sources in
//! the order given, children of a scanned directory sorted by file name.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

use crate::config::types::{Selection, TimeKind};
use crate::config::validate_formats;
use crate::errors::TimefopsError;

/// One entry and the bucket it falls in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketedEntry {
    /// Absolute path (symlinks not resolved).
    pub path: PathBuf,
    /// Normalized bucket, segments joined with `/`.
    pub bucket: String,
}

/// Ordered entry -> bucket mapping. Each path appears at most once.
#[derive(Debug, Clone, Default)]
pub struct BucketMap {
    entries: Vec<BucketedEntry>,
    index: HashMap<PathBuf, usize>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; returns false (and keeps the first position) if the path
    /// is already mapped.
    pub fn insert(&mut self, path: PathBuf, bucket: impl Into<String>) -> bool {
        if self.index.contains_key(&path) {
            return false;
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push(BucketedEntry {
            path,
            bucket: bucket.into(),
        });
        true
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.index
            .get(path)
            .map(|&i| self.entries[i].bucket.as_str())
    }

    /// Position of `path` in enumeration order.
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<PathBuf>, B: Into<String>> FromIterator<(P, B)> for BucketMap {
    fn from_iter<I: IntoIterator<Item = (P, B)>>(iter: I) -> Self {
        let mut map = BucketMap::new();
        for (p, b) in iter {
            map.insert(p.into(), normalize_bucket(&b.into()));
        }
        map
    }
}

/// Build the bucket map for a selection.
///
/// Fails with `PathResolution` when a source cannot be scanned or an entry's
/// timestamp cannot be read; a partial map would hide entries from collision
/// detection, so nothing is skipped here.
pub fn compute_buckets(selection: &Selection) -> Result<BucketMap> {
    validate_formats(&selection.formats)?;
    debug!(
        levels = selection.formats.len(),
        sample = %bucket_preview(&selection.formats),
        kind = %selection.time_kind,
        "format predicate"
    );

    let entries = enumerate_entries(&selection.sources, selection.individual, selection.time_kind)?;
    let mut map = BucketMap::new();
    for path in entries {
        let ts = read_timestamp(&path, selection.time_kind).map_err(|error| {
            TimefopsError::PathResolution {
                path: path.clone(),
                kind: selection.time_kind,
                error,
            }
        })?;
        let local = local_time(ts).ok_or_else(|| TimefopsError::PathResolution {
            path: path.clone(),
            kind: selection.time_kind,
            error: io::Error::new(io::ErrorKind::InvalidData, "timestamp out of range"),
        })?;
        let bucket = format_bucket(&local, &selection.formats)?;
        trace!(path = %path.display(), %bucket, "bucketed");
        if !map.insert(path.clone(), bucket) {
            trace!(path = %path.display(), "duplicate source entry ignored");
        }
    }
    debug!(entries = map.len(), "bucket map computed");
    Ok(map)
}

/// Expand the source list into absolute entry paths, in enumeration order.
fn enumerate_entries(
    sources: &[PathBuf],
    individual: bool,
    kind: TimeKind,
) -> Result<Vec<PathBuf>, TimefopsError> {
    let resolution = |path: &Path, error: io::Error| TimefopsError::PathResolution {
        path: path.to_path_buf(),
        kind,
        error,
    };

    let mut out = Vec::new();
    for src in sources {
        let abs = std::path::absolute(src).map_err(|e| resolution(src, e))?;
        if individual {
            out.push(abs);
            continue;
        }
        let mut children: Vec<PathBuf> = fs::read_dir(&abs)
            .map_err(|e| resolution(&abs, e))?
            .map(|res| res.map(|e| e.path()))
            .collect::<io::Result<_>>()
            .map_err(|e| resolution(&abs, e))?;
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        out.extend(children);
    }
    Ok(out)
}

/// Read the requested timestamp without following a final symlink.
pub fn read_timestamp(path: &Path, kind: TimeKind) -> io::Result<SystemTime> {
    let meta = fs::symlink_metadata(path)?;
    match kind {
        TimeKind::Access => meta.accessed(),
        TimeKind::Modified => meta.modified(),
        TimeKind::Change => change_time(&meta),
    }
}

#[cfg(unix)]
fn change_time(meta: &fs::Metadata) -> io::Result<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;
    let secs = meta.ctime();
    let nanos = Duration::from_nanos(meta.ctime_nsec().clamp(0, 999_999_999) as u64);
    let ts = if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64) + nanos
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + nanos
    };
    Ok(ts)
}

/// Convert to local time, or `None` when the instant is outside chrono's range.
pub fn local_time(ts: SystemTime) -> Option<DateTime<Local>> {
    let utc = match ts.duration_since(UNIX_EPOCH) {
        Ok(d) => DateTime::from_timestamp(i64::try_from(d.as_secs()).ok()?, d.subsec_nanos())?,
        Err(e) => {
            let d = e.duration();
            let secs = i64::try_from(d.as_secs()).ok()?;
            match d.subsec_nanos() {
                0 => DateTime::from_timestamp(-secs, 0)?,
                n => DateTime::from_timestamp(-secs - 1, 1_000_000_000 - n)?,
            }
        }
    };
    Some(utc.with_timezone(&Local))
}

// No inode change time here; the platform reports creation time in its place.
#[cfg(not(unix))]
fn change_time(meta: &fs::Metadata) -> io::Result<SystemTime> {
    meta.created()
}

/// Format `ts` once per component and join the results into a normalized bucket.
pub fn format_bucket<Tz>(ts: &DateTime<Tz>, formats: &[String]) -> Result<String, TimefopsError>
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let mut joined = String::new();
    for (i, f) in formats.iter().enumerate() {
        if i > 0 {
            joined.push('/');
        }
        write!(joined, "{}", ts.format(f)).map_err(|_| TimefopsError::InvalidFormat {
            format: f.clone(),
            reason: "could not be rendered".into(),
        })?;
    }

    if joined.split(['/', '\\']).any(|seg| seg == "..") {
        return Err(TimefopsError::InvalidFormat {
            format: formats.join(" "),
            reason: format!("renders to '{joined}', which escapes the destination"),
        });
    }
    let bucket = normalize_bucket(&joined);
    if bucket.is_empty() {
        return Err(TimefopsError::InvalidFormat {
            format: formats.join(" "),
            reason: "renders to an empty folder name".into(),
        });
    }
    Ok(bucket)
}

/// Drop empty and `.` segments so equal folders compare equal.
fn normalize_bucket(raw: &str) -> String {
    raw.split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Relative path for a bucket string.
pub fn bucket_path(bucket: &str) -> PathBuf {
    bucket.split('/').filter(|s| !s.is_empty()).collect()
}

/// Render the formats against the current time; used for debug output.
pub fn bucket_preview(formats: &[String]) -> String {
    format_bucket(&Local::now(), formats).unwrap_or_else(|e| format!("<{e}>"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use filetime::{FileTime, set_file_mtime};
    use tempfile::tempdir;

    // 2020-03-15T12:00:00Z
    const MID_MARCH_2020: i64 = 1_584_273_600;

    fn fmts(f: &[&str]) -> Vec<String> {
        f.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn components_become_nested_segments() {
        let ts = Utc.timestamp_opt(MID_MARCH_2020, 0).unwrap();
        assert_eq!(format_bucket(&ts, &fmts(&["%Y", "%m"])).unwrap(), "2020/03");
        assert_eq!(format_bucket(&ts, &fmts(&["%Y-%m-%d"])).unwrap(), "2020-03-15");
        assert_eq!(format_bucket(&ts, &fmts(&["%Y/%m", "%d"])).unwrap(), "2020/03/15");
    }

    #[test]
    fn escaping_and_empty_buckets_rejected() {
        let ts = Utc.timestamp_opt(MID_MARCH_2020, 0).unwrap();
        assert!(format_bucket(&ts, &fmts(&["..", "%Y"])).is_err());
        assert!(format_bucket(&ts, &fmts(&["/"])).is_err());
        // leading slash cannot make the bucket absolute
        assert_eq!(format_bucket(&ts, &fmts(&["/%Y"])).unwrap(), "2020");
    }

    #[test]
    fn bucket_path_splits_segments() {
        assert_eq!(bucket_path("2020/03"), Path::new("2020").join("03"));
    }

    #[test]
    fn scan_mode_lists_children_sorted_and_not_recursive() {
        let td = tempdir().unwrap();
        let src = td.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("b.txt"), "b").unwrap();
        fs::write(src.join("a.txt"), "a").unwrap();
        fs::write(src.join("sub").join("deep.txt"), "d").unwrap();
        for name in ["a.txt", "b.txt", "sub"] {
            set_file_mtime(src.join(name), FileTime::from_unix_time(MID_MARCH_2020, 0)).unwrap();
        }

        let mut sel = Selection::new(vec![src.clone()], TimeKind::Modified);
        sel.formats = fmts(&["%Y"]);
        let map = compute_buckets(&sel).unwrap();

        let paths: Vec<_> = map.iter().map(|e| e.path.clone()).collect();
        assert_eq!(paths, vec![src.join("a.txt"), src.join("b.txt"), src.join("sub")]);
        assert!(map.iter().all(|e| e.bucket == "2020"));
        assert!(map.get(&src.join("sub").join("deep.txt")).is_none());
    }

    #[test]
    fn individual_mode_takes_sources_literally() {
        let td = tempdir().unwrap();
        let dir = td.path().join("folder");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("inner.txt"), "x").unwrap();
        let file = td.path().join("loose.txt");
        fs::write(&file, "y").unwrap();

        let mut sel = Selection::new(vec![file.clone(), dir.clone(), file.clone()], TimeKind::Modified);
        sel.individual = true;
        let map = compute_buckets(&sel).unwrap();

        assert_eq!(map.len(), 2, "repeated source is mapped once");
        assert_eq!(map.position(&file), Some(0));
        assert_eq!(map.position(&dir), Some(1));
    }

    #[test]
    fn vanished_entry_is_path_resolution_error() {
        let td = tempdir().unwrap();
        let mut sel = Selection::new(vec![td.path().join("gone")], TimeKind::Access);
        sel.individual = true;
        let err = compute_buckets(&sel).unwrap_err();
        let te = err.downcast_ref::<TimefopsError>().expect("typed error");
        assert!(matches!(te, TimefopsError::PathResolution { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn change_time_is_readable() {
        let td = tempdir().unwrap();
        let f = td.path().join("c.txt");
        fs::write(&f, "c").unwrap();
        let ts = read_timestamp(&f, TimeKind::Change).unwrap();
        assert!(ts > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn out_of_range_times_do_not_convert() {
        use std::time::Duration;
        let far = UNIX_EPOCH + Duration::from_secs(100_000_000_000_000);
        assert!(local_time(far).is_none());

        let ts = UNIX_EPOCH + Duration::from_secs(MID_MARCH_2020 as u64);
        assert_eq!(local_time(ts).unwrap().timestamp(), MID_MARCH_2020);
        let before = UNIX_EPOCH - Duration::from_millis(1500);
        let dt = local_time(before).unwrap();
        assert_eq!((dt.timestamp(), dt.timestamp_subsec_millis()), (-2, 500));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn far_future_mtime_is_path_resolution_error() {
        let Ok(dir) = tempfile::tempdir_in("/dev/shm") else {
            return;
        };
        let f = dir.path().join("future.txt");
        fs::write(&f, "x").unwrap();
        let far = 100_000_000_000_000;
        if set_file_mtime(&f, FileTime::from_unix_time(far, 0)).is_err()
            || FileTime::from_last_modification_time(&fs::metadata(&f).unwrap()).unix_seconds() != far
        {
            return;
        }
        let mut sel = Selection::new(vec![f], TimeKind::Modified);
        sel.individual = true;
        sel.formats = fmts(&["%Y"]);
        let err = compute_buckets(&sel).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TimefopsError>(),
            Some(TimefopsError::PathResolution { .. })
        ));
    }
}
