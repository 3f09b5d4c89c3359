//! Error types for the merge crate.

use thiserror::Error;

/// Errors that can occur during three-way merge.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// Merged output was requested while a conflict is still unresolved.
    /// Output generation is blocked rather than guessing a resolution.
    #[error("conflict {index} is unresolved")]
    UnresolvedConflict { index: usize },

    /// A resolution command referenced a conflict that does not exist.
    #[error("no such conflict: {index}")]
    NoSuchConflict { index: usize },

    /// Underlying diff computation failed or was cancelled.
    #[error(transparent)]
    Diff(#[from] mdt_diff::DiffError),
}

/// Convenience alias for merge results.
pub type Result<T> = std::result::Result<T, MergeError>;
