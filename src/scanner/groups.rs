//! Concurrent grouping of files by content fingerprint.
//!
//! # Overview
//!
//! A [`Fingerprint`] is the `(size, digest)` pair identifying one content
//! equivalence class; size is part of the key so files of different lengths
//! can never land in the same group whatever the digest does. The
//! [`GroupMap`] maps fingerprints to [`DuplicateSet`]s, ordered sets of
//! canonical paths whose first element is the group's *principal*.
//!
//! All mutation goes through a single lock on the map. Workers insert as
//! they finish hashing; read iteration happens only after the worker pool
//! has quiesced.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::order::{paths_equivalent, SortOrder};

/// Content identity of a file: byte length and uppercase hex digest.
///
/// Empty files share the sentinel digest `"0:0"`, which can never collide
/// with a hex string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Fingerprint {
    /// File size in bytes
    pub size: u64,
    /// Uppercase hexadecimal digest, two characters per byte
    pub digest: String,
}

impl Fingerprint {
    /// Create a fingerprint from a size and digest string.
    #[must_use]
    pub fn new(size: u64, digest: impl Into<String>) -> Self {
        Self {
            size,
            digest: digest.into(),
        }
    }

    /// The sentinel fingerprint shared by all empty files.
    #[must_use]
    pub fn empty_file() -> Self {
        Self::new(0, "0:0")
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.size, self.digest)
    }
}

/// Signal returned by [`GroupMap::insert`] describing the post-insert state
/// of the target group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The path opened a brand-new group and became its principal.
    FirstInGroup,
    /// The path is the first duplicate; a new duplicate group now exists.
    SecondInGroup,
    /// The path joined a group that already held `n - 1` members.
    NthInGroup(usize),
}

/// An ordered set of canonical paths sharing one fingerprint.
///
/// Paths are kept sorted under the set's [`SortOrder`]; the first element is
/// the principal and the rest are its duplicates. Insertion refuses paths
/// the filesystem considers equivalent to a member already present, so two
/// names for one inode occupy a single slot.
#[derive(Debug, Clone)]
pub struct DuplicateSet {
    order: SortOrder,
    paths: Vec<PathBuf>,
}

impl DuplicateSet {
    fn new(order: SortOrder) -> Self {
        Self {
            order,
            paths: Vec::new(),
        }
    }

    /// The first path under the set's order, if the set is nonempty.
    #[must_use]
    pub fn principal(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    /// Number of paths in the set, principal included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set holds no paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// All paths in order, principal first.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Iterate the paths in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    /// The paths that duplicate the principal.
    pub fn duplicates(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().skip(1).map(PathBuf::as_path)
    }

    /// Insert a path at its ordered position.
    ///
    /// Returns `false` without modifying the set when the path is empty or
    /// is filesystem-equivalent to an existing member.
    pub(crate) fn insert(&mut self, path: PathBuf) -> bool {
        if path.as_os_str().is_empty() {
            return false;
        }
        if self.paths.iter().any(|p| paths_equivalent(p, &path)) {
            return false;
        }

        // Paths the order cannot distinguish (same filename in different
        // directories) tie-break on the full path, so set layout does not
        // depend on worker completion order.
        let order = self.order;
        let at = match self.paths.binary_search_by(|p| {
            order
                .compare(p, &path)
                .then_with(|| p.as_path().cmp(path.as_path()))
        }) {
            Ok(i) | Err(i) => i,
        };
        self.paths.insert(at, path);
        true
    }
}

impl<'a> IntoIterator for &'a DuplicateSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

#[derive(Debug)]
struct MapInner {
    sets: BTreeMap<Fingerprint, DuplicateSet>,
    duplicate_groups: u64,
    order: SortOrder,
}

/// Thread-safe mapping from fingerprint to its ordered path set.
///
/// A single mutex serializes every mutation. Lock poisoning is recovered by
/// taking the inner value; the map stays consistent because each insert is
/// applied atomically under the lock, and a worker panic independently fails
/// the scan that owned it.
#[derive(Debug)]
pub struct GroupMap {
    inner: Mutex<MapInner>,
}

impl GroupMap {
    /// Create an empty map whose sets order paths by `order`.
    #[must_use]
    pub fn new(order: SortOrder) -> Self {
        Self {
            inner: Mutex::new(MapInner {
                sets: BTreeMap::new(),
                duplicate_groups: 0,
                order,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MapInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `path` into the group keyed by `fingerprint`.
    ///
    /// Returns the post-insert signal, or `None` when the path was rejected
    /// as equivalent to a member already present. [`InsertOutcome::SecondInGroup`]
    /// also bumps the duplicate-group counter; the returned counter value is
    /// taken under the same lock as the insert.
    pub(crate) fn insert(
        &self,
        fingerprint: Fingerprint,
        path: PathBuf,
    ) -> Option<(InsertOutcome, u64)> {
        // Reject empty paths before entry() so a failed first insert cannot
        // leave an empty group behind.
        if path.as_os_str().is_empty() {
            return None;
        }

        let mut inner = self.lock();
        let order = inner.order;

        let set = inner
            .sets
            .entry(fingerprint)
            .or_insert_with(|| DuplicateSet::new(order));
        if !set.insert(path) {
            return None;
        }
        let new_len = set.len();

        let outcome = match new_len {
            1 => InsertOutcome::FirstInGroup,
            2 => {
                inner.duplicate_groups += 1;
                InsertOutcome::SecondInGroup
            }
            n => InsertOutcome::NthInGroup(n),
        };
        Some((outcome, inner.duplicate_groups))
    }

    /// Remove every group that holds a single path.
    pub(crate) fn drop_singletons(&self) {
        let mut inner = self.lock();
        inner.sets.retain(|_, set| set.len() >= 2);
    }

    /// Number of groups currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().sets.len()
    }

    /// Whether the map holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().sets.is_empty()
    }

    /// Number of `SecondInGroup` events observed since the last clear.
    #[must_use]
    pub fn duplicate_groups(&self) -> u64 {
        self.lock().duplicate_groups
    }

    /// Drop all groups and reset the duplicate-group counter.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.sets.clear();
        inner.duplicate_groups = 0;
    }

    /// A read-only view of the groups.
    ///
    /// The view holds the map lock; take it only after the scan has
    /// returned, and drop it before starting another.
    #[must_use]
    pub fn view(&self) -> GroupsView<'_> {
        GroupsView { guard: self.lock() }
    }
}

/// Read-only, lock-holding view over the group map.
#[derive(Debug)]
pub struct GroupsView<'a> {
    guard: MutexGuard<'a, MapInner>,
}

impl GroupsView<'_> {
    /// Iterate groups in ascending fingerprint order.
    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &DuplicateSet)> {
        self.guard.sets.iter()
    }

    /// Iterate groups in descending fingerprint order.
    pub fn iter_rev(&self) -> impl Iterator<Item = (&Fingerprint, &DuplicateSet)> {
        self.guard.sets.iter().rev()
    }

    /// Number of groups in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guard.sets.len()
    }

    /// Whether the view holds no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard.sets.is_empty()
    }
}
