//! Path comparators used to order files inside a group.
//!
//! # Overview
//!
//! The default order understands numbered filenames: a decimal index wrapped
//! in matched delimiters (`(2)`, `[2]`, `{2}` or `_2_`) sorts numerically, so
//! `scan_(2).jpg` comes before `scan_(10).jpg`. Names without an index sort
//! ahead of numbered ones, and everything else falls back to a
//! case-insensitive comparison of the full filename.
//!
//! The time- and size-based variants exist for re-sorting unique-mode
//! results. All comparators are strict weak orders; empty paths and paths
//! whose metadata cannot be read compare as equivalent.
//!
//! The compiled filename pattern is a lazily-initialized process-wide
//! singleton, safe to read from any number of workers.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::SystemTime;

use regex::Regex;
use serde::{Deserialize, Serialize};

static INDEX_RE: OnceLock<Regex> = OnceLock::new();

/// The first decimal index wrapped in matched delimiters, if any.
fn filename_index(name: &str) -> Option<u64> {
    let re = INDEX_RE.get_or_init(|| {
        Regex::new(r"\((\d+)\)|\[(\d+)\]|\{(\d+)\}|_(\d+)_").expect("index pattern is valid")
    });
    let caps = re.captures(name)?;
    let digits = caps.iter().skip(1).find_map(|m| m)?.as_str();
    digits.parse().ok()
}

/// Ordering predicate selector for paths within a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    /// Numbered-filename order, then case-insensitive filename order.
    #[default]
    FileName,
    /// Ascending last-modification time.
    LastWriteTime,
    /// Ascending creation time, where the platform records one.
    CreationTime,
    /// Ascending file size.
    FileSize,
}

impl SortOrder {
    /// Compare two paths under this order.
    ///
    /// Empty paths, and paths whose metadata cannot be read for the
    /// metadata-based variants, compare as `Equal`.
    #[must_use]
    pub fn compare(self, lhs: &Path, rhs: &Path) -> Ordering {
        if lhs.as_os_str().is_empty() || rhs.as_os_str().is_empty() {
            return Ordering::Equal;
        }
        if lhs == rhs {
            return Ordering::Equal;
        }

        match self {
            Self::FileName => compare_filenames(lhs, rhs),
            Self::LastWriteTime => compare_times(lhs, rhs, |m| m.modified()),
            Self::CreationTime => compare_times(lhs, rhs, |m| m.created()),
            Self::FileSize => compare_sizes(lhs, rhs),
        }
    }
}

fn compare_filenames(lhs: &Path, rhs: &Path) -> Ordering {
    let n1 = lhs.file_name().unwrap_or_default().to_string_lossy();
    let n2 = rhs.file_name().unwrap_or_default().to_string_lossy();

    match (filename_index(&n1), filename_index(&n2)) {
        (Some(i1), Some(i2)) if i1 != i2 => i1.cmp(&i2),
        // A name without an index sorts ahead of a numbered one.
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => n1.to_lowercase().cmp(&n2.to_lowercase()),
    }
}

fn compare_times(
    lhs: &Path,
    rhs: &Path,
    probe: impl Fn(&fs::Metadata) -> std::io::Result<SystemTime>,
) -> Ordering {
    let t1 = fs::metadata(lhs).and_then(|m| probe(&m));
    let t2 = fs::metadata(rhs).and_then(|m| probe(&m));
    match (t1, t2) {
        (Ok(t1), Ok(t2)) => t1.cmp(&t2),
        _ => Ordering::Equal,
    }
}

fn compare_sizes(lhs: &Path, rhs: &Path) -> Ordering {
    match (fs::metadata(lhs), fs::metadata(rhs)) {
        (Ok(m1), Ok(m2)) => m1.len().cmp(&m2.len()),
        _ => Ordering::Equal,
    }
}

/// Whether two paths refer to the same on-disk object.
///
/// Canonical equality catches alias paths; the inode probe catches hard
/// links under distinct names. A probe failure counts as "not equivalent"
/// so a vanished file never poisons an insertion.
pub(crate) fn paths_equivalent(lhs: &Path, rhs: &Path) -> bool {
    if lhs == rhs {
        return true;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match (fs::symlink_metadata(lhs), fs::symlink_metadata(rhs)) {
            (Ok(m1), Ok(m2)) => m1.dev() == m2.dev() && m1.ino() == m2.ino(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_index_extraction() {
        assert_eq!(filename_index("scan_(10).jpg"), Some(10));
        assert_eq!(filename_index("scan[3].jpg"), Some(3));
        assert_eq!(filename_index("scan{7}.jpg"), Some(7));
        assert_eq!(filename_index("scan_12_.jpg"), Some(12));
        assert_eq!(filename_index("scan.jpg"), None);
        assert_eq!(filename_index("scan12.jpg"), None);
    }

    #[test]
    fn test_index_requires_matched_delimiters() {
        assert_eq!(filename_index("scan(5].jpg"), None);
        assert_eq!(filename_index("scan_9).jpg"), None);
    }

    #[test]
    fn test_first_index_wins() {
        assert_eq!(filename_index("a(1)b(2)"), Some(1));
    }

    #[test]
    fn test_numeric_order_beats_lexicographic() {
        let order = SortOrder::FileName;
        let a = PathBuf::from("/x/scan_(2).jpg");
        let b = PathBuf::from("/x/scan_(10).jpg");

        assert_eq!(order.compare(&a, &b), Ordering::Less);
        assert_eq!(order.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_unindexed_sorts_first() {
        let order = SortOrder::FileName;
        let plain = PathBuf::from("/x/scan.jpg");
        let numbered = PathBuf::from("/x/scan_(1).jpg");

        assert_eq!(order.compare(&plain, &numbered), Ordering::Less);
        assert_eq!(order.compare(&numbered, &plain), Ordering::Greater);
    }

    #[test]
    fn test_equal_indices_fall_back_to_name() {
        let order = SortOrder::FileName;
        let a = PathBuf::from("/x/alpha_(3).jpg");
        let b = PathBuf::from("/x/beta_(3).jpg");

        assert_eq!(order.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_case_insensitive_fallback() {
        let order = SortOrder::FileName;
        let a = PathBuf::from("/x/Apple.txt");
        let b = PathBuf::from("/x/banana.txt");

        assert_eq!(order.compare(&a, &b), Ordering::Less);
        assert_eq!(order.compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_empty_paths_incomparable() {
        let order = SortOrder::FileName;
        let empty = PathBuf::new();
        let real = PathBuf::from("/x/file.txt");

        assert_eq!(order.compare(&empty, &real), Ordering::Equal);
        assert_eq!(order.compare(&real, &empty), Ordering::Equal);
    }

    #[test]
    fn test_same_path_equal() {
        let order = SortOrder::FileName;
        let p = PathBuf::from("/x/file.txt");
        assert_eq!(order.compare(&p, &p), Ordering::Equal);
    }

    #[test]
    fn test_size_order() {
        let dir = TempDir::new().unwrap();
        let small = dir.path().join("small");
        let large = dir.path().join("large");
        File::create(&small).unwrap().write_all(b"ab").unwrap();
        File::create(&large).unwrap().write_all(b"abcdef").unwrap();

        assert_eq!(SortOrder::FileSize.compare(&small, &large), Ordering::Less);
        assert_eq!(
            SortOrder::FileSize.compare(&large, &small),
            Ordering::Greater
        );
    }

    #[test]
    fn test_metadata_failure_is_equal() {
        let a = PathBuf::from("/nonexistent/a");
        let b = PathBuf::from("/nonexistent/b");
        assert_eq!(SortOrder::FileSize.compare(&a, &b), Ordering::Equal);
        assert_eq!(SortOrder::LastWriteTime.compare(&a, &b), Ordering::Equal);
    }

    #[test]
    #[cfg(unix)]
    fn test_hardlinks_are_equivalent() {
        let dir = TempDir::new().unwrap();
        let original = dir.path().join("data");
        File::create(&original).unwrap().write_all(b"x").unwrap();
        let link = dir.path().join("alias");
        fs::hard_link(&original, &link).unwrap();

        assert!(paths_equivalent(&original, &link));
    }

    #[test]
    fn test_distinct_files_not_equivalent() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        File::create(&a).unwrap();
        File::create(&b).unwrap();

        assert!(!paths_equivalent(&a, &b));
        assert!(paths_equivalent(&a, &a));
    }

    #[test]
    fn test_missing_paths_not_equivalent() {
        assert!(!paths_equivalent(
            Path::new("/nonexistent/a"),
            Path::new("/nonexistent/b")
        ));
    }
}
