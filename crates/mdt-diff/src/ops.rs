//! Edit-script data model: units, operations, and the diff result.
//!
//! An edit script is an ordered list of [`EditOp`]s whose half-open ranges
//! partition both input index spaces exactly once, contiguously, with no
//! gaps or overlaps. Concatenating the ops in order reconstructs both full
//! sequences.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A line unit: borrowed text plus position metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line<'a> {
    /// Line content without the trailing terminator.
    pub text: &'a str,
    /// 1-based line number in the source text.
    pub number: usize,
    /// Whether the line was terminated by a newline in the source.
    pub has_newline: bool,
}

/// Split text into [`Line`] units, preserving terminator information.
///
/// A trailing `\r` before the newline is stripped, so CRLF and LF inputs
/// compare equal line by line.
pub fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut number = 1;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            let mut end = i;
            if end > start && text.as_bytes()[end - 1] == b'\r' {
                end -= 1;
            }
            lines.push(Line {
                text: &text[start..end],
                number,
                has_newline: true,
            });
            start = i + 1;
            number += 1;
        }
    }
    if start < text.len() {
        lines.push(Line {
            text: &text[start..],
            number,
            has_newline: false,
        });
    }
    lines
}

/// A single operation in an edit script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditOp {
    /// Units equal in both sequences. The ranges have the same length.
    Equal { old: Range<usize>, new: Range<usize> },
    /// Units present only in the old sequence.
    Delete { old: Range<usize> },
    /// Units present only in the new sequence.
    Insert { new: Range<usize> },
    /// A paired change: `old` was rewritten as `new`.
    ///
    /// `inline` optionally carries a nested character-level diff of the two
    /// spans, attached by the alignment pass for similar-enough spans.
    Replace {
        old: Range<usize>,
        new: Range<usize>,
        inline: Option<Box<DiffResult>>,
    },
}

impl EditOp {
    /// Number of old-sequence units covered by this op.
    pub fn old_len(&self) -> usize {
        match self {
            EditOp::Equal { old, .. } => old.len(),
            EditOp::Delete { old } => old.len(),
            EditOp::Insert { .. } => 0,
            EditOp::Replace { old, .. } => old.len(),
        }
    }

    /// Number of new-sequence units covered by this op.
    pub fn new_len(&self) -> usize {
        match self {
            EditOp::Equal { new, .. } => new.len(),
            EditOp::Delete { .. } => 0,
            EditOp::Insert { new } => new.len(),
            EditOp::Replace { new, .. } => new.len(),
        }
    }

    pub fn is_equal(&self) -> bool {
        matches!(self, EditOp::Equal { .. })
    }
}

/// The result of diffing two sequences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// The edit script, in order.
    pub ops: Vec<EditOp>,
    /// Length of the old input sequence.
    pub old_len: usize,
    /// Length of the new input sequence.
    pub new_len: usize,
}

impl DiffResult {
    /// Returns `true` if the two inputs were identical.
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(EditOp::is_equal)
    }

    /// Number of units inserted into the new sequence.
    pub fn additions(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                EditOp::Insert { new } => new.len(),
                EditOp::Replace { new, .. } => new.len(),
                _ => 0,
            })
            .sum()
    }

    /// Number of units removed from the old sequence.
    pub fn deletions(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                EditOp::Delete { old } => old.len(),
                EditOp::Replace { old, .. } => old.len(),
                _ => 0,
            })
            .sum()
    }

    /// Total number of non-equal units touched on either side.
    pub fn change_count(&self) -> usize {
        self.additions() + self.deletions()
    }

    /// Reconstruct the new sequence from the old and new inputs.
    ///
    /// Equal units are drawn from `old`, inserted and replaced units from
    /// `new`. For a script produced by this crate the result equals `new`
    /// exactly.
    pub fn apply<'a, T>(&self, old: &'a [T], new: &'a [T]) -> Vec<&'a T> {
        let mut out = Vec::with_capacity(self.new_len);
        for op in &self.ops {
            match op {
                EditOp::Equal { old: r, .. } => out.extend(old[r.clone()].iter()),
                EditOp::Delete { .. } => {}
                EditOp::Insert { new: r } => out.extend(new[r.clone()].iter()),
                EditOp::Replace { new: r, .. } => out.extend(new[r.clone()].iter()),
            }
        }
        out
    }

    /// The same script with the roles of the two sequences swapped.
    ///
    /// `Insert` becomes `Delete` and vice versa; `Equal` and `Replace` swap
    /// their ranges. Within a changed region the delete-before-insert order
    /// is restored, so the result equals `diff(new, old)`.
    pub fn transposed(&self) -> DiffResult {
        let mut ops: Vec<EditOp> = Vec::with_capacity(self.ops.len());
        for op in &self.ops {
            let flipped = match op {
                EditOp::Equal { old, new } => EditOp::Equal {
                    old: new.clone(),
                    new: old.clone(),
                },
                EditOp::Delete { old } => EditOp::Insert { new: old.clone() },
                EditOp::Insert { new } => EditOp::Delete { old: new.clone() },
                EditOp::Replace { old, new, inline } => EditOp::Replace {
                    old: new.clone(),
                    new: old.clone(),
                    inline: inline.as_ref().map(|d| Box::new(d.transposed())),
                },
            };
            // Flipping turns a Delete+Insert pair into Insert+Delete; swap
            // back so deletions keep preceding insertions.
            if let (Some(EditOp::Insert { .. }), EditOp::Delete { .. }) = (ops.last(), &flipped) {
                let prev = ops.pop().unwrap();
                ops.push(flipped);
                ops.push(prev);
            } else {
                ops.push(flipped);
            }
        }
        DiffResult {
            ops,
            old_len: self.new_len,
            new_len: self.old_len,
        }
    }

    /// Verify the partition invariant: ranges cover both index spaces in
    /// order with no gaps or overlaps.
    pub fn check_invariants(&self) -> bool {
        let mut old_pos = 0;
        let mut new_pos = 0;
        for op in &self.ops {
            let (old, new) = match op {
                EditOp::Equal { old, new } => (Some(old), Some(new)),
                EditOp::Delete { old } => (Some(old), None),
                EditOp::Insert { new } => (None, Some(new)),
                EditOp::Replace { old, new, .. } => (Some(old), Some(new)),
            };
            if let Some(r) = old {
                if r.start != old_pos || r.end < r.start {
                    return false;
                }
                old_pos = r.end;
            }
            if let Some(r) = new {
                if r.start != new_pos || r.end < r.start {
                    return false;
                }
                new_pos = r.end;
            }
        }
        old_pos == self.old_len && new_pos == self.new_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_preserves_terminator_flag() {
        let lines = split_lines("a\nb\nc");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].has_newline);
        assert!(lines[1].has_newline);
        assert!(!lines[2].has_newline);
        assert_eq!(lines[2].text, "c");
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn split_strips_carriage_returns() {
        let lines = split_lines("a\r\nb\r\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "a");
        assert_eq!(lines[1].text, "b");
    }

    #[test]
    fn split_empty_text() {
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn transpose_swaps_insert_and_delete() {
        let diff = DiffResult {
            ops: vec![
                EditOp::Equal { old: 0..1, new: 0..1 },
                EditOp::Delete { old: 1..2 },
                EditOp::Insert { new: 1..3 },
            ],
            old_len: 2,
            new_len: 3,
        };
        let t = diff.transposed();
        assert_eq!(
            t.ops,
            vec![
                EditOp::Equal { old: 0..1, new: 0..1 },
                EditOp::Delete { old: 1..3 },
                EditOp::Insert { new: 1..2 },
            ]
        );
        assert_eq!(t.old_len, 3);
        assert_eq!(t.new_len, 2);
        assert!(t.check_invariants());
        assert_eq!(t.transposed(), diff);
    }

    #[test]
    fn invariant_catches_gaps() {
        let diff = DiffResult {
            ops: vec![EditOp::Equal { old: 1..2, new: 0..1 }],
            old_len: 2,
            new_len: 1,
        };
        assert!(!diff.check_invariants());
    }
}
