//! Cooperative cancellation for index operations

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use super::errors::{SearchError, SearchResult};

/// Shared cancellation flag
///
/// Clones observe the same flag. Native index calls are not interruptible,
/// so the flag is only checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation holding a clone of this token
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(SearchError::Cancelled)` once cancellation was requested
    pub fn check(&self) -> SearchResult<()> {
        if self.is_cancelled() {
            Err(SearchError::Cancelled)
        } else {
            Ok(())
        }
    }
}
