//! Duplicate-name resolution.
//!
//! Two entries collide when they share a basename and land in the same bucket.
//! Within each colliding group the first entry (enumeration order) keeps its
//! name; the others get an enumeration suffix `(k)` before the extension, with k
//! strictly increasing from 1. A candidate that is already used in the bucket is
//! skipped, so no two entries ever end up with the same (bucket, name) pair.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::bucket::BucketMap;

/// Entry -> final basename, for renamed entries only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    renamed: HashMap<PathBuf, OsString>,
}

impl RenameMap {
    /// Final basename for `path`: the assigned one, or its own.
    pub fn final_name(&self, path: &Path) -> OsString {
        self.renamed
            .get(path)
            .cloned()
            .or_else(|| path.file_name().map(OsStr::to_os_string))
            .unwrap_or_default()
    }

    pub fn is_renamed(&self, path: &Path) -> bool {
        self.renamed.contains_key(path)
    }

    pub fn renamed(&self) -> impl Iterator<Item = (&PathBuf, &OsString)> {
        self.renamed.iter()
    }

    pub fn len(&self) -> usize {
        self.renamed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renamed.is_empty()
    }
}

/// bucket -> basename -> original paths sharing the pair (only groups of 2+).
pub type CollisionReport = BTreeMap<String, BTreeMap<OsString, Vec<PathBuf>>>;

/// Detect collisions and assign deterministic new names.
pub fn resolve(buckets: &BucketMap) -> (RenameMap, CollisionReport) {
    // (bucket, basename) -> members in enumeration order
    let mut groups: BTreeMap<(&str, OsString), Vec<&Path>> = BTreeMap::new();
    // every name already present per bucket, for candidate skipping
    let mut taken: HashMap<&str, HashSet<OsString>> = HashMap::new();

    for entry in buckets.iter() {
        let Some(name) = entry.path.file_name() else {
            continue;
        };
        groups
            .entry((entry.bucket.as_str(), name.to_os_string()))
            .or_default()
            .push(entry.path.as_path());
        taken
            .entry(entry.bucket.as_str())
            .or_default()
            .insert(name.to_os_string());
    }

    let mut renames = RenameMap::default();
    let mut report = CollisionReport::new();

    for ((bucket, name), members) in groups {
        if members.len() < 2 {
            continue;
        }
        trace!(bucket, name = ?name, count = members.len(), "collision group");
        report
            .entry(bucket.to_string())
            .or_default()
            .insert(name.clone(), members.iter().map(|p| p.to_path_buf()).collect());

        let used = taken.entry(bucket).or_default();
        let mut k: u64 = 0;
        for path in members.into_iter().skip(1) {
            let candidate = loop {
                k += 1;
                let c = add_enumerate(&name, k);
                if !used.contains(&c) {
                    break c;
                }
                trace!(candidate = ?c, "enumeration candidate taken, skipping");
            };
            used.insert(candidate.clone());
            debug!(path = %path.display(), new_name = ?candidate, bucket, "renaming duplicate");
            renames.renamed.insert(path.to_path_buf(), candidate);
        }
    }

    (renames, report)
}

/// Insert `(k)` before the final extension separator, or append it.
///
/// - "dir" -> "dir(1)"
/// - "file.txt" -> "file(3).txt"
/// - ".env" -> ".env(1)"
/// - "a.tar.gz" -> "a.tar(1).gz"
pub fn add_enumerate(name: &OsStr, k: u64) -> OsString {
    let base = Path::new(name);
    let stem: OsString = base
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| name.to_os_string());
    let ext = base.extension();
    build_name_with_suffix(&stem, ext, &format!("({k})"))
}

// Conservative filename limits (bytes/characters, platform-specific and approximate).
#[cfg(windows)]
const MAX_FILENAME_LEN: usize = 240;
#[cfg(not(windows))]
const MAX_FILENAME_LEN: usize = 255;

#[cfg(unix)]
fn name_len_units(s: &OsStr) -> usize {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().len()
}

#[cfg(not(unix))]
fn name_len_units(s: &OsStr) -> usize {
    s.to_string_lossy().len()
}

/// Truncate the stem if needed so `stem + suffix + ["." + ext]` fits MAX_FILENAME_LEN.
fn build_name_with_suffix(stem: &OsStr, ext: Option<&OsStr>, suffix: &str) -> OsString {
    let mut overhead = name_len_units(OsStr::new(suffix));
    let mut ext_part = OsString::new();
    if let Some(e) = ext {
        overhead = overhead.saturating_add(1 + name_len_units(e));
        ext_part.push(".");
        ext_part.push(e);
    }

    let mut stem_os = stem.to_os_string();
    if name_len_units(&stem_os) + overhead > MAX_FILENAME_LEN {
        let budget = MAX_FILENAME_LEN.saturating_sub(overhead).max(1);
        stem_os = truncate_units(stem, budget);
    }

    let mut new_name = stem_os;
    new_name.push(suffix);
    new_name.push(&ext_part);
    new_name
}

fn truncate_units(stem: &OsStr, budget: usize) -> OsString {
    if let Some(s) = stem.to_str() {
        let mut acc = String::new();
        for ch in s.chars() {
            if acc.len() + ch.len_utf8() > budget {
                break;
            }
            acc.push(ch);
        }
        if acc.is_empty() {
            acc.push('f');
        }
        return OsString::from(acc);
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};
        let bytes = stem.as_bytes();
        OsString::from_vec(bytes[..bytes.len().min(budget)].to_vec())
    }
    #[cfg(not(unix))]
    {
        let lossy = stem.to_string_lossy().into_owned();
        truncate_units(OsStr::new(&lossy), budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enumerate(name: &str, k: u64) -> String {
        add_enumerate(OsStr::new(name), k).to_string_lossy().into_owned()
    }

    #[test]
    fn enumeration_suffix_placement() {
        assert_eq!(enumerate("dir", 1), "dir(1)");
        assert_eq!(enumerate("file.txt", 3), "file(3).txt");
        assert_eq!(enumerate(".env", 1), ".env(1)");
        assert_eq!(enumerate("a.tar.gz", 1), "a.tar(1).gz");
    }

    #[test]
    fn long_names_stay_within_limit() {
        let long = format!("{}.mkv", "x".repeat(300));
        let out = add_enumerate(OsStr::new(&long), 12);
        assert!(name_len_units(&out) <= MAX_FILENAME_LEN);
        assert!(out.to_string_lossy().ends_with("(12).mkv"));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_preserved() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};
        let raw = OsString::from_vec(vec![0x66, 0xff, 0x2e, 0x74, 0x78, 0x74]); // f\xff.txt
        let out = add_enumerate(&raw, 2);
        assert_eq!(out.as_bytes(), &[0x66, 0xff, b'(', b'2', b')', b'.', b't', b'x', b't']);
    }

    fn map(entries: &[(&str, &str)]) -> BucketMap {
        entries.iter().map(|(p, b)| (PathBuf::from(p), *b)).collect()
    }

    #[test]
    fn first_keeps_name_rest_enumerated() {
        let m = map(&[
            ("/a/report.txt", "2020-03-15"),
            ("/b/report.txt", "2020-03-15"),
            ("/c/report.txt", "2020-03-15"),
            ("/d/report.txt", "2020-03-16"),
        ]);
        let (renames, report) = resolve(&m);

        assert!(!renames.is_renamed(Path::new("/a/report.txt")));
        assert_eq!(renames.final_name(Path::new("/b/report.txt")), "report(1).txt");
        assert_eq!(renames.final_name(Path::new("/c/report.txt")), "report(2).txt");
        // different bucket: no collision
        assert!(!renames.is_renamed(Path::new("/d/report.txt")));
        assert_eq!(renames.len(), 2);

        let group = &report["2020-03-15"][OsStr::new("report.txt")];
        assert_eq!(group.len(), 3);
        assert!(!report.contains_key("2020-03-16"));
    }

    #[test]
    fn unique_basenames_never_renamed() {
        let m = map(&[("/a/one", "x"), ("/a/two", "x"), ("/b/one", "y")]);
        let (renames, report) = resolve(&m);
        assert!(renames.is_empty());
        assert!(report.is_empty());
        assert_eq!(renames.final_name(Path::new("/a/one")), "one");
    }

    #[test]
    fn literal_enumerated_name_is_not_overwritten() {
        let m = map(&[
            ("/a/a.txt", "b"),
            ("/b/a.txt", "b"),
            ("/c/a(1).txt", "b"),
        ]);
        let (renames, _) = resolve(&m);
        assert_eq!(renames.final_name(Path::new("/b/a.txt")), "a(2).txt");
        assert!(!renames.is_renamed(Path::new("/c/a(1).txt")));
    }

    #[test]
    fn final_pairs_are_unique_and_stable() {
        let mut entries = Vec::new();
        for dir in 0..6 {
            for name in ["x.txt", "x(1).txt", "x(2).txt", "y"] {
                entries.push((format!("/s{dir}/{name}"), "bucket"));
            }
        }
        let m: BucketMap = entries.iter().map(|(p, b)| (PathBuf::from(p), *b)).collect();

        let (first, _) = resolve(&m);
        let (second, _) = resolve(&m);
        assert_eq!(first, second);

        let mut seen = HashSet::new();
        for e in m.iter() {
            let pair = (e.bucket.clone(), first.final_name(&e.path));
            assert!(seen.insert(pair.clone()), "duplicate destination {pair:?}");
        }
    }
}
