//! End-to-end duplicate scan behavior over real temporary trees.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use dupescan::scanner::DuplicateScanner;
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    File::create(&path).unwrap().write_all(content).unwrap();
    path
}

#[test]
fn test_identical_pair_full_contract() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"hello\n");
    write_file(dir.path(), "b.txt", b"hello\n");

    let completed = Arc::new(Mutex::new(None));
    let completed_sink = Arc::clone(&completed);

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.set_scan_completed_callback(move |root, files, dups, groups, wasted| {
        *completed_sink.lock().unwrap() = Some((root.to_path_buf(), files, dups, groups, wasted));
    });
    scanner.perform_scan(true).unwrap();

    // One group of two, principal a.txt, six wasted bytes.
    assert_eq!(scanner.group_count(), 1);
    let view = scanner.groups();
    let (fingerprint, set) = view.iter().next().unwrap();
    assert_eq!(fingerprint.size, 6);
    assert_eq!(set.len(), 2);
    assert_eq!(set.principal().unwrap().file_name().unwrap(), "a.txt");
    drop(view);

    let (root, files, dups, groups, wasted) = completed.lock().unwrap().take().unwrap();
    assert_eq!(root, fs::canonicalize(dir.path()).unwrap());
    assert_eq!((files, dups, groups, wasted), (2, 1, 1, 6));
}

#[test]
fn test_same_size_different_content_yields_nothing() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "x.bin", &[0x00u8; 16]);
    write_file(dir.path(), "y.bin", &[0xFFu8; 16]);

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.perform_scan(true).unwrap();

    assert!(scanner.is_empty());
    assert_eq!(scanner.files_encountered(), 2);
}

#[test]
fn test_groups_hold_bytewise_identical_files() {
    let dir = TempDir::new().unwrap();
    // Three content classes, two of them duplicated.
    write_file(dir.path(), "a1.dat", b"alpha alpha alpha");
    write_file(dir.path(), "a2.dat", b"alpha alpha alpha");
    write_file(dir.path(), "b1.dat", b"beta beta");
    write_file(dir.path(), "b2.dat", b"beta beta");
    write_file(dir.path(), "b3.dat", b"beta beta");
    write_file(dir.path(), "solo.dat", b"gamma");

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.perform_scan(true).unwrap();

    let view = scanner.groups();
    assert_eq!(view.len(), 2);

    let mut seen_fingerprints = Vec::new();
    for (fingerprint, set) in view.iter() {
        assert!(set.len() >= 2);
        assert!(
            !seen_fingerprints.contains(fingerprint),
            "fingerprints must be unique per group"
        );
        seen_fingerprints.push(fingerprint.clone());

        let reference = fs::read(set.principal().unwrap()).unwrap();
        for path in set {
            let bytes = fs::read(path).unwrap();
            assert_eq!(bytes.len() as u64, fingerprint.size);
            assert_eq!(bytes, reference, "group member differs from principal");
        }
    }
}

#[test]
fn test_recursive_scan_spans_subdirectories() {
    let dir = TempDir::new().unwrap();
    let deep = dir.path().join("one").join("two");
    fs::create_dir_all(&deep).unwrap();
    write_file(dir.path(), "top.bin", b"mirrored");
    write_file(&deep, "bottom.bin", b"mirrored");

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.perform_scan(true).unwrap();

    assert_eq!(scanner.group_count(), 1);
    let view = scanner.groups();
    let (_, set) = view.iter().next().unwrap();
    assert_eq!(set.len(), 2);
}

#[test]
fn test_progress_counters_are_monotonic() {
    let dir = TempDir::new().unwrap();
    for i in 0..8 {
        write_file(dir.path(), &format!("p{i}_a"), format!("content {i}").as_bytes());
        write_file(dir.path(), &format!("p{i}_b"), format!("content {i}").as_bytes());
    }

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.set_scan_progress_callback(move |_root, files, groups| {
        sink.lock().unwrap().push((files, groups));
    });
    scanner.perform_scan(true).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 8);
    let mut sorted_groups: Vec<u64> = events.iter().map(|(_, g)| *g).collect();
    sorted_groups.sort_unstable();
    // Each event carries a distinct, monotonically assigned group count.
    assert_eq!(sorted_groups, (1..=8).collect::<Vec<u64>>());
    for (files, groups) in events.iter() {
        assert!(*files >= 1);
        assert!(*groups >= 1);
    }
}

#[test]
fn test_min_size_excludes_empty_files() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "e1", b"");
    write_file(dir.path(), "e2", b"");

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.set_minimum_size(1);
    scanner.perform_scan(true).unwrap();

    assert!(scanner.is_empty());
    assert_eq!(scanner.files_encountered(), 0);
}

#[test]
#[cfg(unix)]
fn test_symlinks_never_group_when_ignored() {
    let dir = TempDir::new().unwrap();
    let target = write_file(dir.path(), "real", b"pointed-at");
    std::os::unix::fs::symlink(&target, dir.path().join("link1")).unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("link2")).unwrap();

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.set_follow_symlinks(false);
    scanner.perform_scan(true).unwrap();

    assert!(scanner.is_empty());
    assert_eq!(scanner.files_encountered(), 1);
}

#[test]
#[cfg(unix)]
fn test_followed_symlink_collapses_with_target() {
    let dir = TempDir::new().unwrap();
    let target = write_file(dir.path(), "real", b"pointed-at");
    std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.set_follow_symlinks(true);
    scanner.perform_scan(true).unwrap();

    // The link canonicalizes to the target; one canonical entry, no group.
    assert!(scanner.is_empty());
}

#[test]
fn test_wasted_bytes_counts_all_extra_copies() {
    let dir = TempDir::new().unwrap();
    let payload = vec![9u8; 1000];
    write_file(dir.path(), "c1", &payload);
    write_file(dir.path(), "c2", &payload);
    write_file(dir.path(), "c3", &payload);

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.perform_scan(true).unwrap();

    assert_eq!(scanner.duplicate_count(), 2);
    assert_eq!(scanner.wasted_bytes(), 2000);
}

#[test]
fn test_extension_filter_restricts_scan() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.txt", b"shared payload");
    write_file(dir.path(), "b.txt", b"shared payload");
    write_file(dir.path(), "c.log", b"shared payload");

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.add_filter("txt");
    scanner.perform_scan(true).unwrap();

    assert_eq!(scanner.files_encountered(), 2);
    let view = scanner.groups();
    let (_, set) = view.iter().next().unwrap();
    assert_eq!(set.len(), 2);
    for path in set {
        assert_eq!(path.extension().unwrap(), "txt");
    }
}

#[test]
fn test_cancellation_mid_configuration_yields_clean_empty_run() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"data");
    write_file(dir.path(), "b", b"data");

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    let flag = scanner.cancel_flag();
    flag.store(true, Ordering::SeqCst);
    scanner.perform_scan(true).unwrap();

    assert_eq!(scanner.files_encountered(), 0);
    assert!(scanner.is_empty());
}

#[test]
fn test_results_accumulate_until_cleared() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a", b"persistent");
    write_file(dir.path(), "b", b"persistent");

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.perform_scan(true).unwrap();
    assert_eq!(scanner.files_encountered(), 2);
    assert_eq!(scanner.group_count(), 1);

    // A second run over the same tree re-reads the same canonical paths;
    // the group set is unchanged but the examined counter accumulates.
    scanner.perform_scan(true).unwrap();
    assert_eq!(scanner.files_encountered(), 4);
    assert_eq!(scanner.group_count(), 1);

    scanner.clear();
    assert_eq!(scanner.files_encountered(), 0);
    assert!(scanner.is_empty());
}

#[test]
fn test_short_and_streamed_files_coexist() {
    let dir = TempDir::new().unwrap();
    // Shorter than the 64-byte digest: self-identifying path.
    write_file(dir.path(), "tiny1", b"short content");
    write_file(dir.path(), "tiny2", b"short content");
    // Longer than the digest: streamed path.
    let long = vec![0x42u8; 5000];
    write_file(dir.path(), "long1", &long);
    write_file(dir.path(), "long2", &long);

    let mut scanner = DuplicateScanner::new(dir.path()).unwrap();
    scanner.perform_scan(true).unwrap();

    let view = scanner.groups();
    assert_eq!(view.len(), 2);
    for (fingerprint, set) in view.iter() {
        assert_eq!(set.len(), 2);
        assert_eq!(fingerprint.digest.len(), 128);
    }
}
