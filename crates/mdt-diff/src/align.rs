//! Line alignment pass.
//!
//! Raw minimal edit scripts sometimes leave a deletion and an insertion
//! adjacent that are really "the same line changed", which confuses
//! downstream inline highlighting. This pass re-pairs such ops as
//! `Replace` when the spans are similar enough, and attaches nested
//! character-level diffs to similar replaced spans.
//!
//! The similarity metric is the longest-common-subsequence ratio
//! `2·lcs(a, b) / (|a| + |b|)` over characters, equivalent in spirit to a
//! Levenshtein ratio. The pairing threshold is fixed at
//! [`SIMILARITY_THRESHOLD`]. The pass is idempotent: re-running it on its
//! own output is a no-op, and it never changes which lines are reported as
//! changed.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::myers::diff_chars;
use crate::ops::{DiffResult, EditOp, Line};

/// Minimum similarity for pairing a deleted span with an inserted span and
/// for attaching an inline character diff to a replaced span.
pub const SIMILARITY_THRESHOLD: f64 = 0.5;

/// Run the alignment pass over a line diff.
pub fn align(
    diff: DiffResult,
    old: &[Line<'_>],
    new: &[Line<'_>],
    token: &CancellationToken,
) -> Result<DiffResult> {
    let mut ops: Vec<EditOp> = Vec::with_capacity(diff.ops.len());
    let mut iter = diff.ops.into_iter().peekable();
    while let Some(op) = iter.next() {
        token.check()?;
        match op {
            // An adjacent Delete+Insert pair whose leading lines are similar
            // is really a replacement split in two.
            EditOp::Delete { old: old_range } => {
                let pair_up = match iter.peek() {
                    Some(EditOp::Insert { new: new_range }) => {
                        similarity(old[old_range.start].text, new[new_range.start].text)
                            >= SIMILARITY_THRESHOLD
                    }
                    _ => false,
                };
                if pair_up {
                    let Some(EditOp::Insert { new: new_range }) = iter.next() else {
                        unreachable!()
                    };
                    ops.push(make_replace(old_range, new_range, old, new, token)?);
                } else {
                    ops.push(EditOp::Delete { old: old_range });
                }
            }
            EditOp::Replace { old: old_range, new: new_range, .. } => {
                ops.push(make_replace(old_range, new_range, old, new, token)?);
            }
            other => ops.push(other),
        }
    }
    Ok(DiffResult { ops, old_len: diff.old_len, new_len: diff.new_len })
}

/// Build a `Replace` op, attaching an inline char diff when the joined
/// spans are similar enough.
fn make_replace(
    old_range: std::ops::Range<usize>,
    new_range: std::ops::Range<usize>,
    old: &[Line<'_>],
    new: &[Line<'_>],
    token: &CancellationToken,
) -> Result<EditOp> {
    let old_text = join_span(old, &old_range);
    let new_text = join_span(new, &new_range);
    let inline = if similarity(&old_text, &new_text) >= SIMILARITY_THRESHOLD {
        Some(Box::new(diff_chars(&old_text, &new_text, token)?))
    } else {
        None
    };
    Ok(EditOp::Replace { old: old_range, new: new_range, inline })
}

fn join_span(lines: &[Line<'_>], range: &std::ops::Range<usize>) -> String {
    let mut out = String::new();
    for (i, line) in lines[range.clone()].iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line.text);
    }
    out
}

/// LCS ratio of two strings over characters, in `[0, 1]`.
///
/// Two empty strings are fully similar; one empty string is fully
/// dissimilar to any non-empty one.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(&a, &b);
    (2 * lcs) as f64 / (a.len() + b.len()) as f64
}

/// Classic LCS length with one-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let mut row = vec![0usize; short.len() + 1];
    for &lc in long {
        let mut prev_diag = 0;
        for (j, &sc) in short.iter().enumerate() {
            let tmp = row[j + 1];
            row[j + 1] = if lc == sc {
                prev_diag + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev_diag = tmp;
        }
    }
    row[short.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::myers::{diff_slices, DEFAULT_MAX_UNITS};
    use crate::normalize::{keys_for, IgnoreOptions};
    use crate::ops::split_lines;

    fn line_diff(old_text: &str, new_text: &str) -> DiffResult {
        let old = split_lines(old_text);
        let new = split_lines(new_text);
        let opts = IgnoreOptions::default();
        let token = CancellationToken::new();
        let raw = diff_slices(
            &keys_for(&old, &opts),
            &keys_for(&new, &opts),
            DEFAULT_MAX_UNITS,
            &token,
        )
        .unwrap();
        align(raw, &old, &new, &token).unwrap()
    }

    #[test]
    fn similarity_metric_bounds() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert!(similarity("hello world", "hello walrus") >= 0.5);
        assert!(similarity("b", "x") < 0.5);
    }

    #[test]
    fn similar_replace_gets_inline_diff() {
        let d = line_diff("fn main() {\nlet x = 1;\n}\n", "fn main() {\nlet x = 2;\n}\n");
        let replace = d
            .ops
            .iter()
            .find(|op| matches!(op, EditOp::Replace { .. }))
            .expect("changed line should be a replace");
        let EditOp::Replace { inline, .. } = replace else { unreachable!() };
        let inline = inline.as_ref().expect("similar lines get an inline diff");
        assert!(inline.check_invariants());
        assert!(!inline.is_identity());
    }

    #[test]
    fn dissimilar_replace_has_no_inline_diff() {
        let d = line_diff("a\nb\nc\n", "a\nx\nc\n");
        let EditOp::Replace { inline, .. } = &d.ops[1] else {
            panic!("expected replace, got {:?}", d.ops)
        };
        assert!(inline.is_none());
    }

    #[test]
    fn alignment_is_idempotent() {
        let old_text = "one\ntwo\nthree\nfour\n";
        let new_text = "one\ntwo edited\nthree\nfive\n";
        let old = split_lines(old_text);
        let new = split_lines(new_text);
        let token = CancellationToken::new();
        let once = line_diff(old_text, new_text);
        let twice = align(once.clone(), &old, &new, &token).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn pairs_adjacent_delete_insert_when_similar() {
        // Hand-built script in non-canonical form.
        let old = split_lines("hello world\n");
        let new = split_lines("hello walrus\n");
        let raw = DiffResult {
            ops: vec![EditOp::Delete { old: 0..1 }, EditOp::Insert { new: 0..1 }],
            old_len: 1,
            new_len: 1,
        };
        let aligned = align(raw, &old, &new, &CancellationToken::new()).unwrap();
        assert_eq!(aligned.ops.len(), 1);
        assert!(matches!(&aligned.ops[0], EditOp::Replace { inline: Some(_), .. }));
    }

    #[test]
    fn leaves_dissimilar_delete_insert_split() {
        let old = split_lines("abcdef\n");
        let new = split_lines("xyz\n");
        let raw = DiffResult {
            ops: vec![EditOp::Delete { old: 0..1 }, EditOp::Insert { new: 0..1 }],
            old_len: 1,
            new_len: 1,
        };
        let aligned = align(raw.clone(), &old, &new, &CancellationToken::new()).unwrap();
        assert_eq!(aligned, raw);
    }

    #[test]
    fn alignment_does_not_change_which_lines_changed() {
        let d = line_diff("a\nb\nc\nd\n", "a\nB!\nc\nD!\n");
        assert_eq!(d.additions(), 2);
        assert_eq!(d.deletions(), 2);
        assert!(d.check_invariants());
    }
}
