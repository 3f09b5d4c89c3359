//! Shortest-edit-script computation.
//!
//! The primary path is an explicit Myers O((N+M)·D) greedy algorithm with a
//! full trace and backtrack, so tie-break behavior is verifiable rather
//! than hidden behind a library call. Above a configurable unit ceiling the
//! engine switches to a coarser unique-anchor strategy bounded by
//! O(n log n) instead of blocking indefinitely.
//!
//! Tie-breaking at equal-cost choice points prefers deletions before
//! insertions, matching conventional diff tools. Results are
//! orientation-independent: `diff(b, a)` is exactly the transposition of
//! `diff(a, b)`.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::cancel::{CancelCounter, CancellationToken};
use crate::error::Result;
use crate::ops::{DiffResult, EditOp};

/// Default unit-count ceiling above which the engine falls back from Myers
/// to the unique-anchor strategy. Documented and overridable via
/// [`crate::DiffOptions::max_units`].
pub const DEFAULT_MAX_UNITS: usize = 50_000;

/// Compute a minimal edit script between two unit slices.
///
/// Equality is decided by `K`'s `Eq`; callers pass pre-normalized
/// comparison keys when ignore options are in effect. If
/// `old.len() + new.len()` exceeds `max_units` the coarser anchor strategy
/// is used instead of Myers.
pub fn diff_slices<K: Eq + Hash>(
    old: &[K],
    new: &[K],
    max_units: usize,
    token: &CancellationToken,
) -> Result<DiffResult> {
    token.check()?;

    // Identical sequences, including both empty: one spanning Equal op.
    if old.len() == new.len() && old.iter().zip(new).all(|(a, b)| a == b) {
        return Ok(DiffResult {
            ops: vec![EditOp::Equal { old: 0..old.len(), new: 0..new.len() }],
            old_len: old.len(),
            new_len: new.len(),
        });
    }

    // Canonical operand orientation makes the result symmetric: computing
    // against the swapped pair and transposing yields the same alignment
    // either way the caller ordered the arguments.
    if orientation_swapped(old, new) {
        let flipped = diff_slices(new, old, max_units, token)?;
        return Ok(flipped.transposed());
    }

    let tags = if old.len() + new.len() > max_units {
        tracing::debug!(
            old_len = old.len(),
            new_len = new.len(),
            max_units,
            "unit ceiling exceeded, using anchor fallback"
        );
        anchored_tags(old, new, token)?
    } else {
        myers_tags(old, new, token)?
    };

    Ok(ops_from_tags(&tags, old.len(), new.len()))
}

/// Character-level diff of two strings, used for inline diffs within a
/// replaced region.
pub fn diff_chars(old: &str, new: &str, token: &CancellationToken) -> Result<DiffResult> {
    let a: Vec<char> = old.chars().collect();
    let b: Vec<char> = new.chars().collect();
    diff_slices(&a, &b, DEFAULT_MAX_UNITS, token)
}

/// One unit step in the edit path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Equal,
    Delete,
    Insert,
}

fn hash_unit<K: Hash>(k: &K) -> u64 {
    let mut h = DefaultHasher::new();
    k.hash(&mut h);
    h.finish()
}

/// Deterministic operand order: longer sequence first is "swapped"; equal
/// lengths break the tie on elementwise unit hashes.
fn orientation_swapped<K: Eq + Hash>(old: &[K], new: &[K]) -> bool {
    use std::cmp::Ordering;
    match old.len().cmp(&new.len()) {
        Ordering::Less => false,
        Ordering::Greater => true,
        Ordering::Equal => {
            for (a, b) in old.iter().zip(new) {
                match hash_unit(a).cmp(&hash_unit(b)) {
                    Ordering::Less => return false,
                    Ordering::Greater => return true,
                    Ordering::Equal => {}
                }
            }
            false
        }
    }
}

/// The greedy forward Myers algorithm with a per-depth trace.
fn myers_tags<K: Eq>(old: &[K], new: &[K], token: &CancellationToken) -> Result<Vec<Tag>> {
    let n = old.len() as isize;
    let m = new.len() as isize;
    let max = n + m;
    let offset = max;
    let idx = |k: isize| (k + offset) as usize;

    let mut v = vec![0isize; (2 * max + 1) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();
    let mut counter = CancelCounter::new(token);

    let mut final_d = None;
    'outer: for d in 0..=max {
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            counter.tick()?;
            // Tie-break: when both predecessors reach the same column,
            // extend the k-1 path (a deletion) rather than the k+1 path.
            let mut x = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
                v[idx(k + 1)]
            } else {
                v[idx(k - 1)] + 1
            };
            let mut y = x - k;
            while x < n && y < m && old[x as usize] == new[y as usize] {
                x += 1;
                y += 1;
                counter.tick()?;
            }
            v[idx(k)] = x;
            if x >= n && y >= m {
                final_d = Some(d);
                break 'outer;
            }
            k += 2;
        }
    }
    let final_d = final_d.expect("edit path search must terminate within n + m steps");

    // Backtrack through the trace, collecting unit steps in reverse.
    let mut tags: Vec<Tag> = Vec::with_capacity((n + m) as usize);
    let mut x = n;
    let mut y = m;
    for d in (0..=final_d).rev() {
        let v = &trace[d as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && v[idx(k - 1)] < v[idx(k + 1)]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[idx(prev_k)];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            tags.push(Tag::Equal);
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            if x == prev_x {
                tags.push(Tag::Insert);
            } else {
                tags.push(Tag::Delete);
            }
        }
        x = prev_x;
        y = prev_y;
    }
    debug_assert!(x <= 0 && y <= 0);
    tags.reverse();
    Ok(tags)
}

/// Coarse fallback for very large inputs: anchor on lines unique to both
/// sides, fix the longest increasing chain of anchor pairings (patience
/// style, O(n log n)), and emit the inter-anchor gaps wholesale.
fn anchored_tags<K: Eq + Hash>(
    old: &[K],
    new: &[K],
    token: &CancellationToken,
) -> Result<Vec<Tag>> {
    let mut counter = CancelCounter::new(token);

    // Common prefix and suffix are always safe anchors.
    let mut prefix = 0;
    while prefix < old.len() && prefix < new.len() && old[prefix] == new[prefix] {
        prefix += 1;
        counter.tick()?;
    }
    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && old[old.len() - 1 - suffix] == new[new.len() - 1 - suffix]
    {
        suffix += 1;
        counter.tick()?;
    }
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    // Units occurring exactly once on both sides are anchor candidates.
    let mut old_seen: HashMap<&K, Option<usize>> = HashMap::new();
    for (i, k) in old_mid.iter().enumerate() {
        counter.tick()?;
        old_seen
            .entry(k)
            .and_modify(|slot| *slot = None)
            .or_insert(Some(i));
    }
    let mut new_seen: HashMap<&K, Option<usize>> = HashMap::new();
    for (j, k) in new_mid.iter().enumerate() {
        counter.tick()?;
        new_seen
            .entry(k)
            .and_modify(|slot| *slot = None)
            .or_insert(Some(j));
    }

    // Pairings in old order; keep the longest chain increasing in new order.
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    for (i, k) in old_mid.iter().enumerate() {
        counter.tick()?;
        if old_seen.get(k) != Some(&Some(i)) {
            continue;
        }
        if let Some(Some(j)) = new_seen.get(k) {
            pairs.push((i, *j));
        }
    }
    let anchors = longest_increasing_chain(&pairs);

    let mut tags = vec![Tag::Equal; prefix];
    let mut old_pos = 0;
    let mut new_pos = 0;
    for &(i, j) in &anchors {
        counter.tick()?;
        tags.extend(std::iter::repeat(Tag::Delete).take(i - old_pos));
        tags.extend(std::iter::repeat(Tag::Insert).take(j - new_pos));
        tags.push(Tag::Equal);
        old_pos = i + 1;
        new_pos = j + 1;
    }
    tags.extend(std::iter::repeat(Tag::Delete).take(old_mid.len() - old_pos));
    tags.extend(std::iter::repeat(Tag::Insert).take(new_mid.len() - new_pos));
    tags.extend(std::iter::repeat(Tag::Equal).take(suffix));
    Ok(tags)
}

/// Longest subsequence of `pairs` (sorted by first element) whose second
/// elements strictly increase.
fn longest_increasing_chain(pairs: &[(usize, usize)]) -> Vec<(usize, usize)> {
    if pairs.is_empty() {
        return Vec::new();
    }
    // tails[len] = index into pairs of the smallest second element ending a
    // chain of that length; back links recover the chain.
    let mut tails: Vec<usize> = Vec::new();
    let mut back: Vec<Option<usize>> = vec![None; pairs.len()];
    for (idx, &(_, j)) in pairs.iter().enumerate() {
        let pos = tails.partition_point(|&t| pairs[t].1 < j);
        if pos > 0 {
            back[idx] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(idx);
        } else {
            tails[pos] = idx;
        }
    }
    let mut chain = Vec::new();
    let mut cur = tails.last().copied();
    while let Some(idx) = cur {
        chain.push(pairs[idx]);
        cur = back[idx];
    }
    chain.reverse();
    chain
}

/// Coalesce unit steps into canonical ops: each maximal changed run becomes
/// one `Delete`, one `Insert`, or one `Replace` when both sides changed.
fn ops_from_tags(tags: &[Tag], old_len: usize, new_len: usize) -> DiffResult {
    let mut ops = Vec::new();
    let mut old_pos = 0;
    let mut new_pos = 0;
    let mut i = 0;
    while i < tags.len() {
        if tags[i] == Tag::Equal {
            let old_start = old_pos;
            let new_start = new_pos;
            while i < tags.len() && tags[i] == Tag::Equal {
                old_pos += 1;
                new_pos += 1;
                i += 1;
            }
            ops.push(EditOp::Equal { old: old_start..old_pos, new: new_start..new_pos });
        } else {
            let old_start = old_pos;
            let new_start = new_pos;
            while i < tags.len() && tags[i] != Tag::Equal {
                match tags[i] {
                    Tag::Delete => old_pos += 1,
                    Tag::Insert => new_pos += 1,
                    Tag::Equal => unreachable!(),
                }
                i += 1;
            }
            let deleted = old_start..old_pos;
            let inserted = new_start..new_pos;
            match (deleted.is_empty(), inserted.is_empty()) {
                (false, true) => ops.push(EditOp::Delete { old: deleted }),
                (true, false) => ops.push(EditOp::Insert { new: inserted }),
                (false, false) => {
                    ops.push(EditOp::Replace { old: deleted, new: inserted, inline: None })
                }
                (true, true) => unreachable!(),
            }
        }
    }
    let result = DiffResult { ops, old_len, new_len };
    debug_assert!(result.check_invariants());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiffError;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn diff(old: &[&str], new: &[&str]) -> DiffResult {
        diff_slices(&keys(old), &keys(new), DEFAULT_MAX_UNITS, &CancellationToken::new())
            .unwrap()
    }

    #[test]
    fn identical_sequences_single_equal_op() {
        let d = diff(&["a", "b", "c"], &["a", "b", "c"]);
        assert_eq!(d.ops, vec![EditOp::Equal { old: 0..3, new: 0..3 }]);
        assert!(d.is_identity());
    }

    #[test]
    fn empty_sequences_single_equal_op() {
        let d = diff(&[], &[]);
        assert_eq!(d.ops, vec![EditOp::Equal { old: 0..0, new: 0..0 }]);
        assert!(d.is_identity());
    }

    #[test]
    fn single_replacement_scenario() {
        let d = diff(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(
            d.ops,
            vec![
                EditOp::Equal { old: 0..1, new: 0..1 },
                EditOp::Replace { old: 1..2, new: 1..2, inline: None },
                EditOp::Equal { old: 2..3, new: 2..3 },
            ]
        );
    }

    #[test]
    fn pure_insertion() {
        let d = diff(&["a", "c"], &["a", "b", "c"]);
        assert_eq!(
            d.ops,
            vec![
                EditOp::Equal { old: 0..1, new: 0..1 },
                EditOp::Insert { new: 1..2 },
                EditOp::Equal { old: 1..2, new: 2..3 },
            ]
        );
    }

    #[test]
    fn pure_deletion() {
        let d = diff(&["a", "b", "c"], &["a", "c"]);
        assert_eq!(
            d.ops,
            vec![
                EditOp::Equal { old: 0..1, new: 0..1 },
                EditOp::Delete { old: 1..2 },
                EditOp::Equal { old: 2..3, new: 1..2 },
            ]
        );
    }

    #[test]
    fn empty_to_content() {
        let d = diff(&[], &["a", "b"]);
        assert_eq!(d.ops, vec![EditOp::Insert { new: 0..2 }]);
        assert_eq!(d.additions(), 2);
    }

    #[test]
    fn content_to_empty() {
        let d = diff(&["a", "b"], &[]);
        assert_eq!(d.ops, vec![EditOp::Delete { old: 0..2 }]);
        assert_eq!(d.deletions(), 2);
    }

    #[test]
    fn round_trip_reconstruction() {
        let old = keys(&["a", "b", "c", "d", "e"]);
        let new = keys(&["a", "x", "c", "y", "z", "e"]);
        let d = diff_slices(&old, &new, DEFAULT_MAX_UNITS, &CancellationToken::new()).unwrap();
        let rebuilt: Vec<String> = d.apply(&old, &new).into_iter().cloned().collect();
        assert_eq!(rebuilt, new);
    }

    #[test]
    fn symmetry_under_transposition() {
        let a = keys(&["a", "b", "c", "d"]);
        let b = keys(&["b", "c", "x", "d", "e"]);
        let token = CancellationToken::new();
        let ab = diff_slices(&a, &b, DEFAULT_MAX_UNITS, &token).unwrap();
        let ba = diff_slices(&b, &a, DEFAULT_MAX_UNITS, &token).unwrap();
        assert_eq!(ab.transposed(), ba);
    }

    #[test]
    fn edit_distance_is_minimal() {
        // One substitution: two units touched, nothing more.
        let d = diff(&["a", "b", "c"], &["a", "x", "c"]);
        assert_eq!(d.change_count(), 2);
        // Known distance for insertion-only change.
        let d = diff(&["a"], &["a", "b", "c"]);
        assert_eq!(d.change_count(), 2);
    }

    #[test]
    fn cancelled_token_returns_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let old: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        let new: Vec<String> = (0..100).rev().map(|i| i.to_string()).collect();
        assert_eq!(
            diff_slices(&old, &new, DEFAULT_MAX_UNITS, &token),
            Err(DiffError::Cancelled)
        );
    }

    #[test]
    fn anchor_fallback_round_trips() {
        let old: Vec<String> = (0..200).map(|i| format!("line {i}")).collect();
        let mut new = old.clone();
        new[50] = "changed".to_string();
        new.insert(120, "inserted".to_string());
        // Force the fallback with a tiny ceiling.
        let d = diff_slices(&old, &new, 10, &CancellationToken::new()).unwrap();
        assert!(d.check_invariants());
        let rebuilt: Vec<String> = d.apply(&old, &new).into_iter().cloned().collect();
        assert_eq!(rebuilt, new);
        assert!(!d.is_identity());
    }

    #[test]
    fn anchor_fallback_keeps_unique_anchor_lines_equal() {
        let old = keys(&["u1", "a", "u2", "b", "u3"]);
        let new = keys(&["u1", "x", "u2", "y", "u3"]);
        let d = diff_slices(&old, &new, 2, &CancellationToken::new()).unwrap();
        let equal_units: usize = d
            .ops
            .iter()
            .filter(|op| op.is_equal())
            .map(|op| op.old_len())
            .sum();
        assert_eq!(equal_units, 3);
    }

    #[test]
    fn char_diff_finds_common_core() {
        let d = diff_chars("hello world", "hello brave world", &CancellationToken::new())
            .unwrap();
        assert!(d.check_invariants());
        assert_eq!(d.deletions(), 0);
        assert_eq!(d.additions(), "brave ".len());
    }

    #[test]
    fn longest_increasing_chain_basics() {
        assert_eq!(longest_increasing_chain(&[]), Vec::new());
        let chain = longest_increasing_chain(&[(0, 3), (1, 1), (2, 2), (3, 0)]);
        assert_eq!(chain, vec![(1, 1), (2, 2)]);
    }
}
