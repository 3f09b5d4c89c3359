//! Hunk grouping and rendering of a line diff.
//!
//! A hunk is a contiguous block of non-equal lines plus surrounding context
//! lines, the unit of display and patch output. Renderers produce
//! unified-diff-compatible text (with or without the `---`/`+++` patch
//! headers) and a structured JSON document.

use std::fmt::Write as _;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::ops::{DiffResult, EditOp, Line};

/// A contiguous region of changes with context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Line number in the old content where this hunk starts (1-based).
    pub old_start: usize,
    /// Number of old-content lines in this hunk.
    pub old_count: usize,
    /// Line number in the new content where this hunk starts (1-based).
    pub new_start: usize,
    /// Number of new-content lines in this hunk.
    pub new_count: usize,
    /// The individual hunk lines, in display order.
    pub lines: Vec<HunkLine>,
}

/// A single line in a hunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunkLine {
    #[serde(rename = "type")]
    pub kind: LineKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub old_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub new_line: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub missing_newline: bool,
}

/// Classification of a hunk line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Equal,
    Insert,
    Delete,
    Replace,
}

/// The structured document emitted by the JSON output mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonDiff {
    pub hunks: Vec<DiffHunk>,
}

/// Group a line diff into hunks with `context` surrounding lines.
///
/// Hunks whose context regions touch or overlap are merged, matching
/// conventional unified diff grouping.
pub fn hunks(
    diff: &DiffResult,
    old: &[Line<'_>],
    new: &[Line<'_>],
    context: usize,
) -> Vec<DiffHunk> {
    // Changed blocks in old/new coordinates.
    let mut blocks: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    let mut old_pos = 0;
    let mut new_pos = 0;
    for op in &diff.ops {
        let old_next = old_pos + op.old_len();
        let new_next = new_pos + op.new_len();
        if !op.is_equal() {
            blocks.push((old_pos..old_next, new_pos..new_next));
        }
        old_pos = old_next;
        new_pos = new_next;
    }
    if blocks.is_empty() {
        return Vec::new();
    }

    // Expand by context and merge overlapping groups.
    let mut groups: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    for (old_block, new_block) in blocks {
        let old_lo = old_block.start.saturating_sub(context);
        let new_lo = new_block.start.saturating_sub(context);
        let old_hi = (old_block.end + context).min(old.len());
        let new_hi = (new_block.end + context).min(new.len());
        match groups.last_mut() {
            Some((prev_old, prev_new)) if old_lo <= prev_old.end => {
                prev_old.end = old_hi;
                prev_new.end = new_hi;
            }
            _ => groups.push((old_lo..old_hi, new_lo..new_hi)),
        }
    }

    groups
        .into_iter()
        .map(|(old_range, new_range)| build_hunk(diff, old, new, old_range, new_range))
        .collect()
}

fn build_hunk(
    diff: &DiffResult,
    old: &[Line<'_>],
    new: &[Line<'_>],
    old_range: Range<usize>,
    new_range: Range<usize>,
) -> DiffHunk {
    let mut lines = Vec::new();
    let mut old_pos = 0;
    let mut new_pos = 0;
    for op in &diff.ops {
        let old_span = old_pos..old_pos + op.old_len();
        let new_span = new_pos..new_pos + op.new_len();
        old_pos = old_span.end;
        new_pos = new_span.end;
        match op {
            EditOp::Equal { .. } => {
                // Context lines come in pairs; clip to the hunk window.
                for offset in 0..old_span.len() {
                    let oi = old_span.start + offset;
                    let ni = new_span.start + offset;
                    if oi >= old_range.start && oi < old_range.end {
                        lines.push(hunk_line(LineKind::Equal, &old[oi], Some(oi), Some(ni)));
                    }
                }
            }
            EditOp::Delete { .. } => {
                if old_span.start >= old_range.start && old_span.start < old_range.end {
                    for oi in old_span.clone() {
                        lines.push(hunk_line(LineKind::Delete, &old[oi], Some(oi), None));
                    }
                }
            }
            EditOp::Insert { .. } => {
                if new_span.start >= new_range.start && new_span.start < new_range.end {
                    for ni in new_span.clone() {
                        lines.push(hunk_line(LineKind::Insert, &new[ni], None, Some(ni)));
                    }
                }
            }
            EditOp::Replace { .. } => {
                if old_span.start >= old_range.start && old_span.start < old_range.end {
                    for oi in old_span.clone() {
                        lines.push(hunk_line(LineKind::Replace, &old[oi], Some(oi), None));
                    }
                    for ni in new_span.clone() {
                        lines.push(hunk_line(LineKind::Replace, &new[ni], None, Some(ni)));
                    }
                }
            }
        }
    }

    DiffHunk {
        old_start: unified_start(&old_range),
        old_count: old_range.len(),
        new_start: unified_start(&new_range),
        new_count: new_range.len(),
        lines,
    }
}

fn hunk_line(
    kind: LineKind,
    line: &Line<'_>,
    old_index: Option<usize>,
    new_index: Option<usize>,
) -> HunkLine {
    HunkLine {
        kind,
        text: line.text.to_string(),
        old_line: old_index.map(|i| i + 1),
        new_line: new_index.map(|i| i + 1),
        missing_newline: !line.has_newline,
    }
}

/// 1-based hunk start; an empty range reports the line before it, matching
/// unified diff conventions.
fn unified_start(range: &Range<usize>) -> usize {
    if range.is_empty() {
        range.start
    } else {
        range.start + 1
    }
}

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Render hunks as a patch: `---`/`+++` headers plus the unified body.
pub fn render_patch(hunks: &[DiffHunk], old_label: &str, new_label: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- {old_label}");
    let _ = writeln!(out, "+++ {new_label}");
    out.push_str(&render_unified(hunks));
    out
}

/// Render hunks as a plain unified listing without patch-apply headers.
pub fn render_unified(hunks: &[DiffHunk]) -> String {
    let mut out = String::new();
    for hunk in hunks {
        let _ = writeln!(
            out,
            "@@ -{},{} +{},{} @@",
            hunk.old_start, hunk.old_count, hunk.new_start, hunk.new_count
        );
        for line in &hunk.lines {
            let prefix = match line.kind {
                LineKind::Equal => ' ',
                LineKind::Insert => '+',
                LineKind::Delete => '-',
                // Replace lines carry their side in the line numbers.
                LineKind::Replace => {
                    if line.old_line.is_some() {
                        '-'
                    } else {
                        '+'
                    }
                }
            };
            let _ = writeln!(out, "{prefix}{}", line.text);
            if line.missing_newline {
                let _ = writeln!(out, "{NO_NEWLINE_MARKER}");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::ops::split_lines;
    use crate::{diff_lines, DiffOptions};

    fn full(old_text: &str, new_text: &str, context: usize) -> Vec<DiffHunk> {
        let diff = diff_lines(
            old_text,
            new_text,
            &DiffOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let old = split_lines(old_text);
        let new = split_lines(new_text);
        hunks(&diff, &old, &new, context)
    }

    #[test]
    fn identical_content_no_hunks() {
        assert!(full("a\nb\n", "a\nb\n", 3).is_empty());
    }

    #[test]
    fn single_change_with_context() {
        let hs = full(
            "a\nb\nc\nd\ne\nf\ng\nh\ni\nj\n",
            "a\nb\nc\nd\nX\nf\ng\nh\ni\nj\n",
            3,
        );
        assert_eq!(hs.len(), 1);
        let h = &hs[0];
        assert_eq!(h.old_start, 2);
        assert_eq!(h.old_count, 7);
        assert_eq!(h.new_start, 2);
        assert_eq!(h.new_count, 7);
        let context = h.lines.iter().filter(|l| l.kind == LineKind::Equal).count();
        assert_eq!(context, 6);
    }

    #[test]
    fn distant_changes_make_separate_hunks() {
        let mut old = String::new();
        let mut new = String::new();
        for i in 0..30 {
            old.push_str(&format!("line {i}\n"));
            if i == 2 || i == 25 {
                new.push_str("changed\n");
            } else {
                new.push_str(&format!("line {i}\n"));
            }
        }
        let hs = full(&old, &new, 3);
        assert_eq!(hs.len(), 2);
    }

    #[test]
    fn nearby_changes_merge_into_one_hunk() {
        let hs = full("a\nb\nc\nd\ne\n", "a\nB\nc\nD\ne\n", 3);
        assert_eq!(hs.len(), 1);
    }

    #[test]
    fn unified_output_shape() {
        let hs = full("a\nb\nc\n", "a\nx\nc\n", 1);
        let text = render_unified(&hs);
        assert_eq!(text, "@@ -1,3 +1,3 @@\n a\n-b\n+x\n c\n");
    }

    #[test]
    fn patch_output_has_file_headers() {
        let hs = full("a\n", "b\n", 3);
        let text = render_patch(&hs, "a/left.txt", "b/right.txt");
        assert!(text.starts_with("--- a/left.txt\n+++ b/right.txt\n@@ "));
    }

    #[test]
    fn missing_trailing_newline_marker() {
        let hs = full("a\nb", "a\nc", 3);
        let text = render_unified(&hs);
        assert!(text.contains("-b\n\\ No newline at end of file\n"));
        assert!(text.contains("+c\n\\ No newline at end of file\n"));
    }

    #[test]
    fn newline_only_difference_renders_the_marker() {
        let hs = full("a", "a\n", 3);
        assert_eq!(hs.len(), 1);
        let text = render_unified(&hs);
        assert_eq!(text, "@@ -1,1 +1,1 @@\n-a\n\\ No newline at end of file\n+a\n");
    }

    #[test]
    fn insertion_into_empty_file_uses_zero_start() {
        let hs = full("", "a\nb\n", 3);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs[0].old_start, 0);
        assert_eq!(hs[0].old_count, 0);
        assert_eq!(hs[0].new_start, 1);
        assert_eq!(hs[0].new_count, 2);
    }

    #[test]
    fn json_round_trips_through_serde() {
        let hs = full("a\nb\nc\n", "a\nx\nc\n", 1);
        let doc = JsonDiff { hunks: hs.clone() };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"type\":\"replace\""));
        let back: JsonDiff = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hunks, hs);
    }
}
