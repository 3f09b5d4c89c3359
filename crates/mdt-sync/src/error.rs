//! Error types for the sync crate.

use thiserror::Error;

/// Errors that can occur during tree comparison or sync planning.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The cancellation token fired before planning finished.
    #[error("sync planning cancelled")]
    Cancelled,
}

impl From<mdt_diff::DiffError> for SyncError {
    fn from(err: mdt_diff::DiffError) -> Self {
        match err {
            mdt_diff::DiffError::Cancelled => SyncError::Cancelled,
        }
    }
}

/// Convenience alias for sync results.
pub type Result<T> = std::result::Result<T, SyncError>;
