//! Tree comparison: classify every path across two or three snapshots.
//!
//! Entries are value snapshots taken by an external scanner, never live
//! filesystem handles. Comparison keys by relative path and reports one
//! [`TreeVerdict`] per path, sorted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a scanned tree snapshot.
///
/// `path` is relative to the tree root, '/'-separated on every platform.
/// `content_hash` is empty for directories.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub content_hash: String,
}

/// Classification of one path across the compared trees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    /// Present on both sides with matching kind, size, and content hash.
    /// Two directories with the same path are always identical.
    Identical,
    /// Present on both sides with differing content, or with a
    /// file/directory kind mismatch.
    Modified { type_mismatch: bool },
    LeftOnly,
    RightOnly,
    /// Present only in the base snapshot: deleted on both sides.
    BaseOnly,
}

/// The verdict for one path, with the entries that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeVerdict {
    pub path: String,
    pub status: VerdictStatus,
    pub base: Option<TreeEntry>,
    pub left: Option<TreeEntry>,
    pub right: Option<TreeEntry>,
}

fn by_path(entries: &[TreeEntry]) -> BTreeMap<&str, &TreeEntry> {
    entries.iter().map(|e| (e.path.as_str(), e)).collect()
}

fn pair_status(left: &TreeEntry, right: &TreeEntry) -> VerdictStatus {
    if left.kind != right.kind {
        return VerdictStatus::Modified { type_mismatch: true };
    }
    if left.kind == EntryKind::Directory {
        return VerdictStatus::Identical;
    }
    if left.size == right.size && left.content_hash == right.content_hash {
        VerdictStatus::Identical
    } else {
        VerdictStatus::Modified { type_mismatch: false }
    }
}

/// Compare two tree snapshots. Verdicts come back path-sorted.
pub fn compare_trees(left: &[TreeEntry], right: &[TreeEntry]) -> Vec<TreeVerdict> {
    compare_with_base(&BTreeMap::new(), &by_path(left), &by_path(right))
}

/// Compare two tree snapshots against a prior base snapshot.
///
/// The base distinguishes additions from deletions: a path present only in
/// the base was deleted on both sides and reports [`VerdictStatus::BaseOnly`].
pub fn compare_trees_three_way(
    base: &[TreeEntry],
    left: &[TreeEntry],
    right: &[TreeEntry],
) -> Vec<TreeVerdict> {
    compare_with_base(&by_path(base), &by_path(left), &by_path(right))
}

fn compare_with_base(
    base: &BTreeMap<&str, &TreeEntry>,
    left: &BTreeMap<&str, &TreeEntry>,
    right: &BTreeMap<&str, &TreeEntry>,
) -> Vec<TreeVerdict> {
    let mut paths: Vec<&str> = Vec::new();
    paths.extend(base.keys());
    paths.extend(left.keys());
    paths.extend(right.keys());
    paths.sort_unstable();
    paths.dedup();

    let mut verdicts = Vec::with_capacity(paths.len());
    for path in paths {
        let b = base.get(path).copied();
        let l = left.get(path).copied();
        let r = right.get(path).copied();
        let status = match (l, r) {
            (Some(l), Some(r)) => pair_status(l, r),
            (Some(_), None) => VerdictStatus::LeftOnly,
            (None, Some(_)) => VerdictStatus::RightOnly,
            (None, None) => VerdictStatus::BaseOnly,
        };
        verdicts.push(TreeVerdict {
            path: path.to_string(),
            status,
            base: b.cloned(),
            left: l.cloned(),
            right: r.cloned(),
        });
    }
    tracing::debug!(verdicts = verdicts.len(), "trees compared");
    verdicts
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn file(path: &str, size: u64, hash: &str, mtime: i64) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: EntryKind::File,
            size,
            modified: DateTime::from_timestamp(mtime, 0).unwrap(),
            content_hash: hash.to_string(),
        }
    }

    pub(crate) fn dir(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: EntryKind::Directory,
            size: 0,
            modified: DateTime::from_timestamp(0, 0).unwrap(),
            content_hash: String::new(),
        }
    }

    #[test]
    fn identical_and_modified_and_one_sided() {
        let left = vec![
            file("a.txt", 3, "h1", 100),
            file("b.txt", 5, "h2", 100),
            file("only-left.txt", 1, "h3", 100),
        ];
        let right = vec![
            file("a.txt", 3, "h1", 200),
            file("b.txt", 5, "h2-changed", 200),
            file("only-right.txt", 1, "h4", 200),
        ];
        let verdicts = compare_trees(&left, &right);
        let statuses: Vec<(&str, &VerdictStatus)> =
            verdicts.iter().map(|v| (v.path.as_str(), &v.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("a.txt", &VerdictStatus::Identical),
                ("b.txt", &VerdictStatus::Modified { type_mismatch: false }),
                ("only-left.txt", &VerdictStatus::LeftOnly),
                ("only-right.txt", &VerdictStatus::RightOnly),
            ]
        );
    }

    #[test]
    fn mtime_alone_does_not_make_modified() {
        let verdicts = compare_trees(&[file("a", 3, "h", 100)], &[file("a", 3, "h", 999)]);
        assert_eq!(verdicts[0].status, VerdictStatus::Identical);
    }

    #[test]
    fn kind_mismatch_is_flagged() {
        let verdicts = compare_trees(&[file("x", 3, "h", 100)], &[dir("x")]);
        assert_eq!(verdicts[0].status, VerdictStatus::Modified { type_mismatch: true });
    }

    #[test]
    fn directories_with_same_path_are_identical() {
        let verdicts = compare_trees(&[dir("sub")], &[dir("sub")]);
        assert_eq!(verdicts[0].status, VerdictStatus::Identical);
    }

    #[test]
    fn base_only_requires_the_base_snapshot() {
        let base = vec![file("gone.txt", 3, "h", 50)];
        let verdicts = compare_trees_three_way(&base, &[], &[]);
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].status, VerdictStatus::BaseOnly);
        assert!(verdicts[0].base.is_some());
    }

    #[test]
    fn verdicts_are_path_sorted() {
        let left = vec![file("z", 1, "h", 0), file("a", 1, "h", 0)];
        let right = vec![file("m", 1, "h", 0)];
        let paths: Vec<String> =
            compare_trees(&left, &right).into_iter().map(|v| v.path).collect();
        assert_eq!(paths, vec!["a", "m", "z"]);
    }
}
