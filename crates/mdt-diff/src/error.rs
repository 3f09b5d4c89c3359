//! Error types for the diff crate.

use thiserror::Error;

/// Errors that can occur during diff computation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// The cancellation token fired before the computation finished.
    ///
    /// This is a first-class outcome rather than a failure: no partial
    /// result is ever observable, and the caller may retry with a fresh
    /// token.
    #[error("diff computation cancelled")]
    Cancelled,
}

/// Convenience alias for diff results.
pub type Result<T> = std::result::Result<T, DiffError>;
