//! Sync planning: convert tree verdicts into an ordered action plan.
//!
//! The planner performs no I/O. It emits a [`SyncPlan`] for an external
//! executor, which must run actions in list order: copies are sorted
//! parents before children, deletions children before parents, and
//! conflicts come last so everything unambiguous lands first.

use serde::{Deserialize, Serialize};

use mdt_diff::CancellationToken;

use crate::compare::{TreeVerdict, VerdictStatus};
use crate::error::Result;

/// How the planner resolves paths that differ between the sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPolicy {
    /// The side with the newer modification time wins; equal times conflict.
    PreferNewer,
    PreferLeft,
    PreferRight,
    /// Every difference becomes a conflict for external resolution.
    Manual,
}

/// Which tree an action targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// The operation of one planned action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    CopyLeftToRight,
    CopyRightToLeft,
    /// Propagate a deletion: remove the path from the named side.
    Delete { side: Side },
    /// No mutation planned; the reason records why the path was left alone.
    Skip,
    /// Requires external resolution before the plan can fully execute.
    Conflict,
}

impl SyncOp {
    /// Whether executing this action mutates a tree.
    pub fn is_effective(&self) -> bool {
        !matches!(self, SyncOp::Skip | SyncOp::Conflict)
    }
}

/// One planned action for a single path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAction {
    pub path: String,
    pub op: SyncOp,
    pub reason: String,
}

/// An ordered, inspectable synchronization plan.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    /// True when the plan mutates nothing and raises no conflicts.
    pub fn is_empty(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a.op, SyncOp::Skip))
    }

    pub fn conflict_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.op == SyncOp::Conflict)
            .count()
    }
}

/// Plan synchronization actions for a list of verdicts under a policy.
pub fn plan_sync(
    verdicts: &[TreeVerdict],
    policy: SyncPolicy,
    token: &CancellationToken,
) -> Result<SyncPlan> {
    let mut copies = Vec::new();
    let mut deletes = Vec::new();
    let mut skips = Vec::new();
    let mut conflicts = Vec::new();

    for verdict in verdicts {
        token.check()?;
        match plan_verdict(verdict, policy) {
            None => {}
            Some(action) => match action.op {
                SyncOp::CopyLeftToRight | SyncOp::CopyRightToLeft => copies.push(action),
                SyncOp::Delete { .. } => deletes.push(action),
                SyncOp::Skip => skips.push(action),
                SyncOp::Conflict => conflicts.push(action),
            },
        }
    }

    // Verdicts arrive path-sorted, so copies are already parents-first.
    // Deletions must remove children before their parents.
    deletes.reverse();

    let mut actions = copies;
    actions.append(&mut deletes);
    actions.append(&mut skips);
    actions.append(&mut conflicts);
    tracing::debug!(actions = actions.len(), "sync plan built");
    Ok(SyncPlan { actions })
}

fn plan_verdict(verdict: &TreeVerdict, policy: SyncPolicy) -> Option<SyncAction> {
    let action = |op: SyncOp, reason: &str| {
        Some(SyncAction { path: verdict.path.clone(), op, reason: reason.to_string() })
    };
    match &verdict.status {
        VerdictStatus::Identical | VerdictStatus::BaseOnly => None,
        VerdictStatus::LeftOnly => plan_one_sided(verdict, policy, Side::Left),
        VerdictStatus::RightOnly => plan_one_sided(verdict, policy, Side::Right),
        VerdictStatus::Modified { type_mismatch: true } => {
            action(SyncOp::Conflict, "file and directory share this path")
        }
        VerdictStatus::Modified { type_mismatch: false } => match policy {
            SyncPolicy::Manual => action(SyncOp::Conflict, "content differs"),
            SyncPolicy::PreferLeft => action(SyncOp::CopyLeftToRight, "content differs, left wins"),
            SyncPolicy::PreferRight => {
                action(SyncOp::CopyRightToLeft, "content differs, right wins")
            }
            SyncPolicy::PreferNewer => {
                let left = verdict.left.as_ref()?;
                let right = verdict.right.as_ref()?;
                if left.modified > right.modified {
                    action(SyncOp::CopyLeftToRight, "content differs, left is newer")
                } else if right.modified > left.modified {
                    action(SyncOp::CopyRightToLeft, "content differs, right is newer")
                } else {
                    action(SyncOp::Conflict, "content differs with equal timestamps")
                }
            }
        },
    }
}

/// A path present on exactly one side. Without a base snapshot this is an
/// addition and copies across. With a base snapshot it may instead be a
/// deletion on the other side: propagate it if the surviving copy is
/// unchanged from base, otherwise it is a delete-versus-modify conflict.
fn plan_one_sided(verdict: &TreeVerdict, policy: SyncPolicy, present: Side) -> Option<SyncAction> {
    let action = |op: SyncOp, reason: &str| {
        Some(SyncAction { path: verdict.path.clone(), op, reason: reason.to_string() })
    };
    let (entry, copy_op, deleted_on) = match present {
        Side::Left => (verdict.left.as_ref()?, SyncOp::CopyLeftToRight, "right"),
        Side::Right => (verdict.right.as_ref()?, SyncOp::CopyRightToLeft, "left"),
    };
    let Some(base) = verdict.base.as_ref() else {
        return match present {
            Side::Left => action(copy_op, "only on left"),
            Side::Right => action(copy_op, "only on right"),
        };
    };
    if base.content_hash == entry.content_hash && base.kind == entry.kind {
        if policy == SyncPolicy::Manual {
            return action(SyncOp::Skip, "deletion not propagated under manual policy");
        }
        return match present {
            Side::Left => action(
                SyncOp::Delete { side: Side::Left },
                "deleted on right, unchanged since base",
            ),
            Side::Right => action(
                SyncOp::Delete { side: Side::Right },
                "deleted on left, unchanged since base",
            ),
        };
    }
    let reason = format!("modified since base but deleted on {deleted_on}");
    action(SyncOp::Conflict, &reason)
}
