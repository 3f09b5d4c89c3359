//! Diff engine for mdt.
//!
//! Computes minimal edit scripts between line or character sequences,
//! applies ignore-option normalization, improves raw scripts with a line
//! alignment pass, and renders results as hunks, unified text, or JSON.
//!
//! # Key Types
//!
//! - [`DiffResult`] / [`EditOp`] — Edit script over two sequences
//! - [`IgnoreOptions`] / [`CommentSyntax`] — Comparison-key normalization
//! - [`DiffHunk`] / [`HunkLine`] — Grouped display/patch output
//! - [`CancellationToken`] — Cooperative cancellation for long comparisons
//!
//! The engine is pure and stateless per invocation: every call is a
//! deterministic function of its inputs and returns a complete immutable
//! value, never a structure mutated while visible to the caller.

pub mod align;
pub mod cancel;
pub mod error;
pub mod hunks;
pub mod myers;
pub mod normalize;
pub mod ops;

pub use align::{align, similarity, SIMILARITY_THRESHOLD};
pub use cancel::{CancellationToken, CANCEL_CHECK_INTERVAL};
pub use error::{DiffError, Result};
pub use hunks::{hunks, render_patch, render_unified, DiffHunk, HunkLine, JsonDiff, LineKind};
pub use myers::{diff_chars, diff_slices, DEFAULT_MAX_UNITS};
pub use normalize::{keys_for, normalize, CommentSyntax, ComparisonKey, IgnoreOptions};
pub use ops::{split_lines, DiffResult, EditOp, Line};

/// Options controlling a line diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiffOptions {
    /// Normalization applied to comparison keys.
    pub ignore: IgnoreOptions,
    /// Unit-count ceiling for the optimal Myers path; larger inputs use the
    /// coarser anchor fallback. See [`DEFAULT_MAX_UNITS`].
    pub max_units: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self { ignore: IgnoreOptions::default(), max_units: DEFAULT_MAX_UNITS }
    }
}

/// Diff two texts line by line and run the alignment pass.
///
/// Comparison keys are derived per line through [`normalize`]; the original
/// text is used for display and inline diffs.
pub fn diff_lines(
    old_text: &str,
    new_text: &str,
    options: &DiffOptions,
    token: &CancellationToken,
) -> Result<DiffResult> {
    let old = split_lines(old_text);
    let new = split_lines(new_text);
    let old_keys = keys_for(&old, &options.ignore);
    let new_keys = keys_for(&new, &options.ignore);
    let raw = diff_slices(&old_keys, &new_keys, options.max_units, token)?;
    align(raw, &old, &new, token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_lines_identical_is_identity() {
        let token = CancellationToken::new();
        let d = diff_lines("a\nb\n", "a\nb\n", &DiffOptions::default(), &token).unwrap();
        assert!(d.is_identity());
        assert_eq!(d.ops.len(), 1);
    }

    #[test]
    fn ignore_whitespace_makes_spacing_variants_equal() {
        let token = CancellationToken::new();
        let options = DiffOptions {
            ignore: IgnoreOptions { whitespace: true, ..Default::default() },
            ..Default::default()
        };
        let d = diff_lines("a b\n", "a  b\n", &options, &token).unwrap();
        assert!(d.is_identity());
    }

    #[test]
    fn ignore_blank_lines_collapses_runs() {
        let token = CancellationToken::new();
        let options = DiffOptions {
            ignore: IgnoreOptions { blank_lines: true, ..Default::default() },
            ..Default::default()
        };
        let d = diff_lines("a\n\nb\n", "a\n   \nb\n", &options, &token).unwrap();
        assert!(d.is_identity());
    }

    #[test]
    fn trailing_newline_difference_is_a_change() {
        let token = CancellationToken::new();
        let d = diff_lines("a", "a\n", &DiffOptions::default(), &token).unwrap();
        assert!(!d.is_identity());
        let d = diff_lines("a\nb", "a\nb\n", &DiffOptions::default(), &token).unwrap();
        assert!(!d.is_identity());
        assert_eq!(d.change_count(), 2);
    }

    #[test]
    fn default_options_detect_changes() {
        let token = CancellationToken::new();
        let d = diff_lines("a\nb\nc\n", "a\nx\nc\n", &DiffOptions::default(), &token).unwrap();
        assert!(!d.is_identity());
        assert_eq!(d.change_count(), 2);
    }
}
