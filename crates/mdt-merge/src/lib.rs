//! Three-way text merge with explicit conflict resolution.
//!
//! Merging diffs a common base against two descendants and classifies
//! every base span as unchanged, changed by exactly one side, or changed
//! by both. Divergent both-side changes become [`Conflict`]s that must be
//! resolved before the merged text can be produced; identical changes on
//! both sides auto-merge.
//!
//! # Key Types
//! - [`MergeResult`]: regions in base order, plus resolution methods
//! - [`MergeRegion`]: one classified span of the merge
//! - [`Conflict`] / [`Resolution`]: per-conflict resolution state
//! - [`ResolutionLog`]: bounded undo/redo history of resolution commands

pub mod conflict;
pub mod error;
pub mod resolver;

pub use conflict::{BothOrder, Conflict, Resolution, ResolutionLog, ResolveCommand};
pub use error::{MergeError, Result};
pub use resolver::{merge, MergeRegion, MergeResult};
