//! Cooperative cancellation for long-running comparisons.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{DiffError, Result};

/// Number of processed units between cancellation checks.
pub const CANCEL_CHECK_INTERVAL: usize = 4096;

/// A cheap, clonable cancellation signal.
///
/// The engine checks the token at bounded intervals (every
/// [`CANCEL_CHECK_INTERVAL`] processed units) and returns
/// [`DiffError::Cancelled`] instead of a partial result.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next check point.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Bail out with [`DiffError::Cancelled`] if the token has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DiffError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Counter that calls [`CancellationToken::check`] every
/// [`CANCEL_CHECK_INTERVAL`] ticks.
#[derive(Debug)]
pub(crate) struct CancelCounter<'a> {
    token: &'a CancellationToken,
    ticks: usize,
}

impl<'a> CancelCounter<'a> {
    pub(crate) fn new(token: &'a CancellationToken) -> Self {
        Self { token, ticks: 0 }
    }

    pub(crate) fn tick(&mut self) -> Result<()> {
        self.ticks += 1;
        if self.ticks % CANCEL_CHECK_INTERVAL == 0 {
            self.token.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert_eq!(clone.check(), Err(DiffError::Cancelled));
    }

    #[test]
    fn counter_checks_at_interval() {
        let token = CancellationToken::new();
        token.cancel();
        let mut counter = CancelCounter::new(&token);
        // Not yet at the interval boundary: no check performed.
        for _ in 0..CANCEL_CHECK_INTERVAL - 1 {
            assert!(counter.tick().is_ok());
        }
        assert_eq!(counter.tick(), Err(DiffError::Cancelled));
    }
}
