//! Conflict resolution state and the resolution command log.
//!
//! Each conflict carries an explicit resolution state machine driven by
//! discrete commands. Commands applied through a [`ResolutionLog`] can be
//! undone and redone, replacing ad hoc mutable UI state with a command
//! history.

use std::ops::Range;

use crate::error::Result;
use crate::resolver::MergeResult;

/// A region where left and right both diverge from base and from each
/// other. Ranges are half-open line indices into the respective inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub base: Range<usize>,
    pub left: Range<usize>,
    pub right: Range<usize>,
    pub resolution: Resolution,
}

/// Resolution state of one conflict.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Resolution {
    #[default]
    Unresolved,
    /// Take the left side's lines.
    Left,
    /// Take the right side's lines.
    Right,
    /// Take both sides, in the given order.
    Both(BothOrder),
    /// Take caller-supplied replacement text.
    Custom(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BothOrder {
    LeftFirst,
    RightFirst,
}

/// A discrete resolution command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveCommand {
    Left,
    Right,
    Both(BothOrder),
    Custom(String),
    /// Return the conflict to the unresolved state.
    Unresolve,
}

impl ResolveCommand {
    pub(crate) fn into_resolution(self) -> Resolution {
        match self {
            ResolveCommand::Left => Resolution::Left,
            ResolveCommand::Right => Resolution::Right,
            ResolveCommand::Both(order) => Resolution::Both(order),
            ResolveCommand::Custom(text) => Resolution::Custom(text),
            ResolveCommand::Unresolve => Resolution::Unresolved,
        }
    }
}

const MAX_HISTORY: usize = 64;

#[derive(Clone, Debug)]
struct LogEntry {
    index: usize,
    before: Resolution,
    after: Resolution,
}

/// Command log for conflict resolution with bounded undo/redo history.
#[derive(Clone, Debug, Default)]
pub struct ResolutionLog {
    undo: Vec<LogEntry>,
    redo: Vec<LogEntry>,
}

impl ResolutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a command to a conflict, recording it for undo.
    pub fn apply(
        &mut self,
        merge: &mut MergeResult,
        index: usize,
        command: ResolveCommand,
    ) -> Result<()> {
        let before = merge.resolution(index)?.clone();
        merge.resolve(index, command)?;
        let after = merge.resolution(index)?.clone();
        self.undo.push(LogEntry { index, before, after });
        if self.undo.len() > MAX_HISTORY {
            self.undo.remove(0);
        }
        // A new command invalidates the redo branch.
        self.redo.clear();
        Ok(())
    }

    /// Revert the most recent command. Returns `false` with nothing to undo.
    pub fn undo(&mut self, merge: &mut MergeResult) -> Result<bool> {
        let Some(entry) = self.undo.pop() else {
            return Ok(false);
        };
        merge.set_resolution(entry.index, entry.before.clone())?;
        self.redo.push(entry);
        Ok(true)
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self, merge: &mut MergeResult) -> Result<bool> {
        let Some(entry) = self.redo.pop() else {
            return Ok(false);
        };
        merge.set_resolution(entry.index, entry.after.clone())?;
        self.undo.push(entry);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge;
    use mdt_diff::{CancellationToken, DiffOptions};

    fn conflicted() -> MergeResult {
        merge(
            "1\n2\n3\n",
            "1\nA\n3\n",
            "1\nB\n3\n",
            &DiffOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn apply_then_undo_restores_state() {
        let mut m = conflicted();
        let mut log = ResolutionLog::new();
        assert_eq!(m.unresolved_count(), 1);

        log.apply(&mut m, 0, ResolveCommand::Left).unwrap();
        assert_eq!(m.unresolved_count(), 0);
        assert!(log.can_undo());

        assert!(log.undo(&mut m).unwrap());
        assert_eq!(m.unresolved_count(), 1);
        assert!(log.can_redo());

        assert!(log.redo(&mut m).unwrap());
        assert_eq!(*m.resolution(0).unwrap(), Resolution::Left);
    }

    #[test]
    fn new_command_clears_redo_branch() {
        let mut m = conflicted();
        let mut log = ResolutionLog::new();
        log.apply(&mut m, 0, ResolveCommand::Left).unwrap();
        log.undo(&mut m).unwrap();
        log.apply(&mut m, 0, ResolveCommand::Right).unwrap();
        assert!(!log.can_redo());
        assert_eq!(*m.resolution(0).unwrap(), Resolution::Right);
    }

    #[test]
    fn undo_on_empty_log_is_a_noop() {
        let mut m = conflicted();
        let mut log = ResolutionLog::new();
        assert!(!log.undo(&mut m).unwrap());
        assert!(!log.redo(&mut m).unwrap());
    }

    #[test]
    fn unresolve_command_reopens_conflict() {
        let mut m = conflicted();
        m.resolve(0, ResolveCommand::Custom("merged line".into())).unwrap();
        assert_eq!(m.unresolved_count(), 0);
        m.resolve(0, ResolveCommand::Unresolve).unwrap();
        assert_eq!(m.unresolved_count(), 1);
    }

    #[test]
    fn resolving_missing_conflict_fails() {
        let mut m = conflicted();
        let err = m.resolve(5, ResolveCommand::Left).unwrap_err();
        assert_eq!(err, crate::MergeError::NoSuchConflict { index: 5 });
    }
}
