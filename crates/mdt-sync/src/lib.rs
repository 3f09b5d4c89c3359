//! Directory comparison and synchronization planning.
//!
//! Two pure stages: [`compare_trees`] classifies every path across two
//! (or, with a base snapshot, three) tree listings, and [`plan_sync`]
//! turns the verdicts into an ordered action plan under a policy. Neither
//! stage touches the filesystem; scanning and execution belong to the
//! caller.
//!
//! # Key Types
//! - [`TreeEntry`] / [`TreeVerdict`]: snapshot entries and per-path verdicts
//! - [`SyncPolicy`]: how differences resolve
//! - [`SyncPlan`] / [`SyncAction`]: the ordered execution contract

pub mod compare;
pub mod error;
pub mod planner;

pub use compare::{compare_trees, compare_trees_three_way, EntryKind, TreeEntry, TreeVerdict, VerdictStatus};
pub use error::{Result, SyncError};
pub use planner::{plan_sync, Side, SyncAction, SyncOp, SyncPlan, SyncPolicy};
