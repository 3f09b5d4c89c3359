//! Three-way merge: region classification and output materialization.
//!
//! `diff(base, left)` and `diff(base, right)` are computed independently,
//! then both edit scripts are walked in lockstep over base positions. A
//! region changed by neither side passes the base through; a region
//! changed by one side auto-merges to that side; a region changed by both
//! sides conflicts unless the two changes are identical.

use std::ops::Range;

use mdt_diff::{diff_slices, keys_for, split_lines, CancellationToken, DiffOptions, EditOp};

use crate::conflict::{BothOrder, Conflict, Resolution, ResolveCommand};
use crate::error::{MergeError, Result};

/// One classified region of the merge, in base order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeRegion {
    /// Neither side changed this base span.
    Unchanged { base: Range<usize> },
    /// Only the left side changed; its lines pass through.
    TakeLeft { base: Range<usize>, left: Range<usize> },
    /// Only the right side changed; its lines pass through.
    TakeRight { base: Range<usize>, right: Range<usize> },
    /// Both sides changed with different content.
    Conflict(Conflict),
}

/// The result of a three-way merge.
///
/// Every base line appears in exactly one region, conflicts never overlap,
/// and resolving all conflicts then concatenating the regions yields the
/// merged text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeResult {
    pub regions: Vec<MergeRegion>,
    base_lines: Vec<String>,
    left_lines: Vec<String>,
    right_lines: Vec<String>,
    base_terminated: bool,
    left_terminated: bool,
    right_terminated: bool,
}

/// Compute a three-way merge of base, left, and right texts.
///
/// Comparison uses the same normalization options as a two-way diff, so
/// identical-modulo-ignore changes on both sides auto-merge.
pub fn merge(
    base: &str,
    left: &str,
    right: &str,
    options: &DiffOptions,
    token: &CancellationToken,
) -> Result<MergeResult> {
    let base_units = split_lines(base);
    let left_units = split_lines(left);
    let right_units = split_lines(right);
    let base_keys = keys_for(&base_units, &options.ignore);
    let left_keys = keys_for(&left_units, &options.ignore);
    let right_keys = keys_for(&right_units, &options.ignore);

    let left_diff = diff_slices(&base_keys, &left_keys, options.max_units, token)?;
    let right_diff = diff_slices(&base_keys, &right_keys, options.max_units, token)?;
    let left_chunks = change_chunks(&left_diff.ops);
    let right_chunks = change_chunks(&right_diff.ops);

    let regions = sweep(
        base_keys.len(),
        &left_chunks,
        &right_chunks,
        &left_keys,
        &right_keys,
        token,
    )?;
    let conflict_count =
        regions.iter().filter(|r| matches!(r, MergeRegion::Conflict(_))).count();
    tracing::debug!(
        regions = regions.len(),
        conflicts = conflict_count,
        "merge regions classified"
    );

    Ok(MergeResult {
        regions,
        base_lines: base_units.iter().map(|l| l.text.to_string()).collect(),
        left_lines: left_units.iter().map(|l| l.text.to_string()).collect(),
        right_lines: right_units.iter().map(|l| l.text.to_string()).collect(),
        base_terminated: base.ends_with('\n'),
        left_terminated: left.ends_with('\n'),
        right_terminated: right.ends_with('\n'),
    })
}

/// A changed span of one side's diff, in base coordinates plus the
/// corresponding side span. Insertions have an empty base range.
#[derive(Clone, Debug)]
struct Chunk {
    base: Range<usize>,
    side: Range<usize>,
}

fn change_chunks(ops: &[EditOp]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut base_pos = 0;
    let mut side_pos = 0;
    for op in ops {
        let base_next = base_pos + op.old_len();
        let side_next = side_pos + op.new_len();
        if !op.is_equal() {
            chunks.push(Chunk { base: base_pos..base_next, side: side_pos..side_next });
        }
        base_pos = base_next;
        side_pos = side_next;
    }
    chunks
}

/// Whether a chunk belongs to the region `[start, end)` under
/// construction. Insertions occupy a zero-width point: two insertions at
/// the same base position collide, an insertion strictly inside a changed
/// span collides, and everything merely touching at a boundary stays
/// independent.
fn joins(start: usize, end: usize, chunk: &Chunk) -> bool {
    let (cs, ce) = (chunk.base.start, chunk.base.end);
    if start == end && cs == ce {
        return cs == start;
    }
    if cs == ce {
        return cs > start && cs < end;
    }
    if start == end {
        return start > cs && start < ce;
    }
    cs < end && start < ce
}

fn sweep(
    base_len: usize,
    left_chunks: &[Chunk],
    right_chunks: &[Chunk],
    left_keys: &[String],
    right_keys: &[String],
    token: &CancellationToken,
) -> Result<Vec<MergeRegion>> {
    let mut regions = Vec::new();
    let mut i = 0;
    let mut j = 0;
    let mut base_pos = 0;
    // Side position outside any chunk is base position plus these offsets.
    let mut left_offset = 0isize;
    let mut right_offset = 0isize;

    loop {
        token.check()?;
        // Seed the next region with the earliest remaining chunk;
        // insertions sort before chunks consuming the same base line.
        let seed_left = match (left_chunks.get(i), right_chunks.get(j)) {
            (None, None) => break,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(l), Some(r)) => {
                if l.base.start != r.base.start {
                    l.base.start < r.base.start
                } else if l.base.is_empty() != r.base.is_empty() {
                    l.base.is_empty()
                } else {
                    true
                }
            }
        };

        let seed = if seed_left { &left_chunks[i] } else { &right_chunks[j] };
        let start = seed.base.start;
        if start > base_pos {
            regions.push(MergeRegion::Unchanged { base: base_pos..start });
        }

        let left_start = (start as isize + left_offset) as usize;
        let right_start = (start as isize + right_offset) as usize;
        let mut end = seed.base.end;
        let mut left_taken = 0usize;
        let mut right_taken = 0usize;
        if seed_left {
            left_offset += seed.side.len() as isize - seed.base.len() as isize;
            left_taken += 1;
            i += 1;
        } else {
            right_offset += seed.side.len() as isize - seed.base.len() as isize;
            right_taken += 1;
            j += 1;
        }

        // Absorb chunks from either side until the region stops growing.
        let mut grew = true;
        while grew {
            grew = false;
            while let Some(chunk) = left_chunks.get(i) {
                if !joins(start, end, chunk) {
                    break;
                }
                end = end.max(chunk.base.end);
                left_offset += chunk.side.len() as isize - chunk.base.len() as isize;
                left_taken += 1;
                i += 1;
                grew = true;
            }
            while let Some(chunk) = right_chunks.get(j) {
                if !joins(start, end, chunk) {
                    break;
                }
                end = end.max(chunk.base.end);
                right_offset += chunk.side.len() as isize - chunk.base.len() as isize;
                right_taken += 1;
                j += 1;
                grew = true;
            }
        }

        let left_range = left_start..(end as isize + left_offset) as usize;
        let right_range = right_start..(end as isize + right_offset) as usize;
        let region = match (left_taken > 0, right_taken > 0) {
            (true, false) => MergeRegion::TakeLeft { base: start..end, left: left_range },
            (false, true) => MergeRegion::TakeRight { base: start..end, right: right_range },
            (true, true) => {
                if left_keys[left_range.clone()] == right_keys[right_range.clone()] {
                    // Both sides made the identical change: auto-merge once.
                    MergeRegion::TakeLeft { base: start..end, left: left_range }
                } else {
                    MergeRegion::Conflict(Conflict {
                        base: start..end,
                        left: left_range,
                        right: right_range,
                        resolution: Resolution::Unresolved,
                    })
                }
            }
            (false, false) => unreachable!("region always seeded from a chunk"),
        };
        regions.push(region);
        base_pos = end;
    }

    if base_pos < base_len {
        regions.push(MergeRegion::Unchanged { base: base_pos..base_len });
    }
    Ok(regions)
}

impl MergeResult {
    /// All conflicts, in base order.
    pub fn conflicts(&self) -> Vec<&Conflict> {
        self.regions
            .iter()
            .filter_map(|r| match r {
                MergeRegion::Conflict(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts().len()
    }

    /// Number of conflicts still in the `Unresolved` state.
    pub fn unresolved_count(&self) -> usize {
        self.conflicts()
            .iter()
            .filter(|c| c.resolution == Resolution::Unresolved)
            .count()
    }

    /// Returns `true` if the merge produced no conflicts at all.
    pub fn is_clean(&self) -> bool {
        self.conflict_count() == 0
    }

    /// Apply a resolution command to the conflict with the given ordinal.
    pub fn resolve(&mut self, index: usize, command: ResolveCommand) -> Result<()> {
        self.set_resolution(index, command.into_resolution())
    }

    pub(crate) fn set_resolution(&mut self, index: usize, resolution: Resolution) -> Result<()> {
        let conflict = self
            .conflict_mut(index)
            .ok_or(MergeError::NoSuchConflict { index })?;
        conflict.resolution = resolution;
        Ok(())
    }

    /// Resolution state of the conflict with the given ordinal.
    pub fn resolution(&self, index: usize) -> Result<&Resolution> {
        self.conflicts()
            .get(index)
            .map(|c| &c.resolution)
            .ok_or(MergeError::NoSuchConflict { index })
    }

    fn conflict_mut(&mut self, index: usize) -> Option<&mut Conflict> {
        self.regions
            .iter_mut()
            .filter_map(|r| match r {
                MergeRegion::Conflict(c) => Some(c),
                _ => None,
            })
            .nth(index)
    }

    /// Lines of the left span of a conflict, for display.
    pub fn left_text(&self, conflict: &Conflict) -> &[String] {
        &self.left_lines[conflict.left.clone()]
    }

    /// Lines of the right span of a conflict, for display.
    pub fn right_text(&self, conflict: &Conflict) -> &[String] {
        &self.right_lines[conflict.right.clone()]
    }

    /// Lines of the base span of a conflict, for display.
    pub fn base_text(&self, conflict: &Conflict) -> &[String] {
        &self.base_lines[conflict.base.clone()]
    }

    /// Materialize the merged text.
    ///
    /// Fails with [`MergeError::UnresolvedConflict`] while any conflict is
    /// unresolved; output is blocked rather than guessed. The trailing
    /// terminator follows whichever input supplies the final output line.
    pub fn materialize(&self) -> Result<String> {
        let mut lines: Vec<&str> = Vec::new();
        let mut terminated = true;
        let mut conflict_index = 0;
        for region in &self.regions {
            match region {
                MergeRegion::Unchanged { base } => {
                    push_span(&mut lines, &mut terminated, &self.base_lines, base, self.base_terminated);
                }
                MergeRegion::TakeLeft { left, .. } => {
                    push_span(&mut lines, &mut terminated, &self.left_lines, left, self.left_terminated);
                }
                MergeRegion::TakeRight { right, .. } => {
                    push_span(&mut lines, &mut terminated, &self.right_lines, right, self.right_terminated);
                }
                MergeRegion::Conflict(conflict) => {
                    if conflict.resolution == Resolution::Unresolved {
                        return Err(MergeError::UnresolvedConflict { index: conflict_index });
                    }
                    self.push_resolution(&mut lines, &mut terminated, conflict);
                    conflict_index += 1;
                }
            }
        }
        Ok(join_lines(&lines, terminated))
    }

    fn push_resolution<'a>(
        &'a self,
        lines: &mut Vec<&'a str>,
        terminated: &mut bool,
        conflict: &'a Conflict,
    ) {
        match &conflict.resolution {
            Resolution::Unresolved => unreachable!("caller handles unresolved conflicts"),
            Resolution::Left => {
                push_span(lines, terminated, &self.left_lines, &conflict.left, self.left_terminated);
            }
            Resolution::Right => {
                push_span(lines, terminated, &self.right_lines, &conflict.right, self.right_terminated);
            }
            Resolution::Both(BothOrder::LeftFirst) => {
                push_span(lines, terminated, &self.left_lines, &conflict.left, self.left_terminated);
                push_span(lines, terminated, &self.right_lines, &conflict.right, self.right_terminated);
            }
            Resolution::Both(BothOrder::RightFirst) => {
                push_span(lines, terminated, &self.right_lines, &conflict.right, self.right_terminated);
                push_span(lines, terminated, &self.left_lines, &conflict.left, self.left_terminated);
            }
            Resolution::Custom(text) => {
                let before = lines.len();
                lines.extend(text.lines());
                if lines.len() > before {
                    *terminated = text.ends_with('\n');
                }
            }
        }
    }

    /// Render the merge with git-style conflict markers for unresolved
    /// conflicts, usable as reviewable output even while conflicts remain.
    pub fn render_marked(&self, left_label: &str, right_label: &str) -> String {
        let open = format!("<<<<<<< {left_label}");
        let close = format!(">>>>>>> {right_label}");
        let mut lines: Vec<&str> = Vec::new();
        let mut terminated = true;
        for region in &self.regions {
            match region {
                MergeRegion::Unchanged { base } => {
                    push_span(&mut lines, &mut terminated, &self.base_lines, base, self.base_terminated);
                }
                MergeRegion::TakeLeft { left, .. } => {
                    push_span(&mut lines, &mut terminated, &self.left_lines, left, self.left_terminated);
                }
                MergeRegion::TakeRight { right, .. } => {
                    push_span(&mut lines, &mut terminated, &self.right_lines, right, self.right_terminated);
                }
                MergeRegion::Conflict(conflict)
                    if conflict.resolution == Resolution::Unresolved =>
                {
                    lines.push(&open);
                    lines.extend(self.left_text(conflict).iter().map(String::as_str));
                    lines.push("=======");
                    lines.extend(self.right_text(conflict).iter().map(String::as_str));
                    lines.push(&close);
                    // Marker lines are always terminated.
                    terminated = true;
                }
                MergeRegion::Conflict(conflict) => {
                    self.push_resolution(&mut lines, &mut terminated, conflict);
                }
            }
        }
        join_lines(&lines, terminated)
    }
}

/// Append one span's lines and update the trailing-terminator state:
/// mid-file lines always end with a newline, a source's final line follows
/// that source's own terminator.
fn push_span<'a>(
    lines: &mut Vec<&'a str>,
    terminated: &mut bool,
    source: &'a [String],
    range: &Range<usize>,
    source_terminated: bool,
) {
    lines.extend(source[range.clone()].iter().map(String::as_str));
    if !range.is_empty() {
        *terminated = if range.end == source.len() { source_terminated } else { true };
    }
}

fn join_lines(lines: &[&str], terminated: bool) -> String {
    let mut out = lines.join("\n");
    if terminated && !lines.is_empty() {
        out.push('\n');
    }
    out
}
